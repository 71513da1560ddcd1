//! Value substitution: variable references, `calc()` arithmetic, and
//! color function folding. A failed substitution reports a semantic
//! error and drops the declaration that contained it.

use crate::colors::Color;
use crate::context::EvalContext;
use cascata_parser::ast::{
    BooleanExpr, CalcExpr, CalcOp, CallArg, Declaration, DeclarationList, Expression,
    NestedRuleSet, Sep, Span, Term, TermKind,
};
use tracing::trace;

/// A fully evaluated numeric quantity
#[derive(Debug, Clone, PartialEq)]
pub struct NumberValue {
    pub value: f64,
    pub unit: Option<String>,
}

impl NumberValue {
    fn new(value: f64, unit: Option<String>) -> Self {
        Self { value, unit }
    }

    fn into_term(self, sep: Sep, span: Span) -> Term {
        let mut term = Term::new(TermKind::Number {
            value: self.value,
            unit: self.unit,
        });
        term.sep = sep;
        term.span = span;
        term
    }
}

/// Substitute every term of `expr` against the current scope chain.
/// Returns `None` when any term fails to evaluate; the error has
/// already been reported and the owning declaration must be dropped.
pub fn evaluate_expression(ctx: &mut EvalContext, expr: &Expression) -> Option<Expression> {
    let mut terms = Vec::with_capacity(expr.terms.len());
    for term in &expr.terms {
        terms.extend(evaluate_term(ctx, term)?);
    }
    Some(Expression::new(terms))
}

/// Evaluate a single term. Variable references splice the bound value's
/// whole term list in place, with the reference's separator carried
/// onto the first spliced term.
fn evaluate_term(ctx: &mut EvalContext, term: &Term) -> Option<Vec<Term>> {
    match &term.kind {
        TermKind::Number { .. } | TermKind::Literal { .. } | TermKind::Url { .. } => {
            Some(vec![term.clone()])
        }
        TermKind::VariableRef { name } => {
            if ctx.is_expanding(name) {
                ctx.semantic_error(format!("cyclic variable reference '${}'", name), term.span);
                return None;
            }
            let Some(bound) = ctx.scopes.get(name).cloned() else {
                ctx.semantic_error(format!("undefined variable '${}'", name), term.span);
                return None;
            };
            trace!(name = %name, value = %bound, "variable substituted");
            ctx.with_expansion(name, |ctx| {
                let mut spliced = Vec::with_capacity(bound.terms.len());
                for (i, mut inner) in bound.terms.into_iter().enumerate() {
                    if i == 0 {
                        inner.sep = term.sep;
                    }
                    spliced.extend(evaluate_term(ctx, &inner)?);
                    // re-splicing may flatten further references; keep the
                    // carried separator on the first resulting term
                    if i == 0 {
                        if let Some(first) = spliced.first_mut() {
                            first.sep = term.sep;
                        }
                    }
                }
                Some(spliced)
            })
        }
        TermKind::Calc { expr } => {
            let result = evaluate_calc(ctx, expr, term.span)?;
            Some(vec![result.into_term(term.sep, term.span)])
        }
        TermKind::Function { name, args } => {
            Some(vec![apply_function(ctx, name, args, term)?])
        }
        // class references are meaningful only under extend/apply and
        // are handled there; in plain value position they pass through
        TermKind::ClassRef { .. } | TermKind::SelectorRef { .. } => Some(vec![term.clone()]),
    }
}

// ---- functions ----

fn apply_function(ctx: &mut EvalContext, name: &str, args: &[CallArg], term: &Term) -> Option<Term> {
    match name {
        "rgb" => fold_rgb(ctx, args, term),
        "rgba" => fold_rgba(ctx, args, term),
        "lighten" => fold_shade(ctx, args, term, true),
        "darken" => fold_shade(ctx, args, term, false),
        _ => {
            // unrecognized functions pass through with substituted args
            let mut substituted = Vec::with_capacity(args.len());
            for arg in args {
                substituted.push(CallArg {
                    name: arg.name.clone(),
                    value: evaluate_expression(ctx, &arg.value)?,
                });
            }
            let mut out = Term::new(TermKind::Function {
                name: name.to_string(),
                args: substituted,
            });
            out.sep = term.sep;
            out.span = term.span;
            Some(out)
        }
    }
}

fn fold_rgb(ctx: &mut EvalContext, args: &[CallArg], term: &Term) -> Option<Term> {
    let channels = numeric_args(ctx, args, term, "rgb", 3)?;
    let color = Color::new(
        clamp_channel(channels[0]),
        clamp_channel(channels[1]),
        clamp_channel(channels[2]),
    );
    Some(color_term(color, term))
}

fn fold_rgba(ctx: &mut EvalContext, args: &[CallArg], term: &Term) -> Option<Term> {
    let channels = numeric_args(ctx, args, term, "rgba", 4)?;
    // a fully opaque rgba collapses to hex; translucency keeps the
    // functional form
    if channels[3] >= 1.0 {
        let color = Color::new(
            clamp_channel(channels[0]),
            clamp_channel(channels[1]),
            clamp_channel(channels[2]),
        );
        return Some(color_term(color, term));
    }
    let mut out = Term::new(TermKind::Function {
        name: "rgba".to_string(),
        args: channels
            .iter()
            .map(|v| CallArg::positional(Expression::single(Term::number(*v, None))))
            .collect(),
    });
    out.sep = term.sep;
    out.span = term.span;
    Some(out)
}

fn fold_shade(ctx: &mut EvalContext, args: &[CallArg], term: &Term, lighten: bool) -> Option<Term> {
    let name = if lighten { "lighten" } else { "darken" };
    if args.len() != 2 {
        ctx.semantic_error(
            format!("{}() expects a color and a percentage", name),
            term.span,
        );
        return None;
    }
    let color_value = evaluate_expression(ctx, &args[0].value)?;
    let Some(color) = color_from_expression(&color_value) else {
        ctx.semantic_error(
            format!("{}() first argument is not a color: {}", name, color_value),
            term.span,
        );
        return None;
    };
    let percent = numeric_arg(ctx, &args[1], term, name)?;
    let shaded = if lighten {
        color.lighten(percent.value)
    } else {
        color.darken(percent.value)
    };
    Some(color_term(shaded, term))
}

fn color_from_expression(expr: &Expression) -> Option<Color> {
    match &expr.single_term()?.kind {
        TermKind::Literal { text, quoted: false } => Color::parse(text),
        _ => None,
    }
}

fn color_term(color: Color, source: &Term) -> Term {
    let mut out = Term::literal(color.to_hex());
    out.sep = source.sep;
    out.span = source.span;
    out
}

fn numeric_args(
    ctx: &mut EvalContext,
    args: &[CallArg],
    term: &Term,
    name: &str,
    expected: usize,
) -> Option<Vec<f64>> {
    if args.len() != expected {
        ctx.semantic_error(
            format!("{}() expects {} arguments, found {}", name, expected, args.len()),
            term.span,
        );
        return None;
    }
    let mut values = Vec::with_capacity(expected);
    for arg in args {
        values.push(numeric_arg(ctx, arg, term, name)?.value);
    }
    Some(values)
}

fn numeric_arg(
    ctx: &mut EvalContext,
    arg: &CallArg,
    term: &Term,
    name: &str,
) -> Option<NumberValue> {
    let value = evaluate_expression(ctx, &arg.value)?;
    match value.single_term() {
        Some(Term {
            kind: TermKind::Number { value, unit },
            ..
        }) => Some(NumberValue::new(*value, unit.clone())),
        _ => {
            ctx.semantic_error(
                format!("{}() argument is not numeric: {}", name, value),
                term.span,
            );
            None
        }
    }
}

fn clamp_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

// ---- calc() ----

/// Evaluate a `calc()` operand tree to a single number, enforcing unit
/// compatibility. Reports and returns `None` on undefined variables,
/// non-numeric operands, incompatible units, and division by zero.
pub fn evaluate_calc(ctx: &mut EvalContext, expr: &CalcExpr, span: Span) -> Option<NumberValue> {
    match expr {
        CalcExpr::Number { value, unit } => Some(NumberValue::new(*value, unit.clone())),
        CalcExpr::VariableRef { name } => {
            if ctx.is_expanding(name) {
                ctx.semantic_error(
                    format!("cyclic variable reference '${}' in calc()", name),
                    span,
                );
                return None;
            }
            let Some(bound) = ctx.scopes.get(name).cloned() else {
                ctx.semantic_error(format!("undefined variable '${}' in calc()", name), span);
                return None;
            };
            ctx.with_expansion(name, |ctx| match bound.single_term() {
                Some(Term {
                    kind: TermKind::Number { value, unit },
                    ..
                }) => Some(NumberValue::new(*value, unit.clone())),
                Some(Term {
                    kind: TermKind::Calc { expr },
                    ..
                }) => {
                    let inner = expr.clone();
                    evaluate_calc(ctx, &inner, span)
                }
                _ => {
                    ctx.semantic_error(
                        format!("variable '${}' is not numeric in calc(): {}", name, bound),
                        span,
                    );
                    None
                }
            })
        }
        CalcExpr::Negate { operand } => {
            let operand = evaluate_calc(ctx, operand, span)?;
            Some(NumberValue::new(-operand.value, operand.unit))
        }
        CalcExpr::Binary { op, left, right } => {
            let left = evaluate_calc(ctx, left, span)?;
            let right = evaluate_calc(ctx, right, span)?;
            apply_calc_op(ctx, *op, left, right, span)
        }
    }
}

fn apply_calc_op(
    ctx: &mut EvalContext,
    op: CalcOp,
    left: NumberValue,
    right: NumberValue,
    span: Span,
) -> Option<NumberValue> {
    let unit = match (&left.unit, &right.unit) {
        (Some(a), Some(b)) if a != b => {
            ctx.semantic_error(
                format!("incompatible units in calc(): {} and {}", a, b),
                span,
            );
            return None;
        }
        (Some(a), Some(b)) if op == CalcOp::Multiply && a == b => {
            ctx.semantic_error(
                format!("cannot multiply two {} quantities", a),
                span,
            );
            return None;
        }
        (Some(unit), _) | (_, Some(unit)) => Some(unit.clone()),
        (None, None) => None,
    };
    let value = match op {
        CalcOp::Add => left.value + right.value,
        CalcOp::Subtract => left.value - right.value,
        CalcOp::Multiply => left.value * right.value,
        CalcOp::Divide => {
            if right.value == 0.0 {
                ctx.semantic_error("division by zero in calc()", span);
                return None;
            }
            if right.unit.is_some() {
                ctx.semantic_error("calc() divisor must be unitless", span);
                return None;
            }
            left.value / right.value
        }
    };
    // division keeps the dividend's unit
    let unit = if op == CalcOp::Divide { left.unit } else { unit };
    Some(NumberValue::new(value, unit))
}

// ---- deep substitution for inherited nested rule sets ----

/// Substitute a nested rule set in the current scope, so values bound
/// to class parameters survive past the parameter frame. Declarations
/// whose values fail to evaluate are dropped; conditions get
/// best-effort substitution and are otherwise left for later
/// evaluation.
pub fn substitute_nested_rule_set(ctx: &mut EvalContext, nested: &NestedRuleSet) -> NestedRuleSet {
    let mut out = nested.clone();
    out.rule_set.block.declarations = substitute_declarations(ctx, &nested.rule_set.block.declarations);
    out.rule_set.block.nested_rule_sets = nested
        .rule_set
        .block
        .nested_rule_sets
        .iter()
        .map(|inner| substitute_nested_rule_set(ctx, inner))
        .collect();
    out.condition = nested.condition.as_ref().map(|c| substitute_condition(ctx, c));
    out
}

fn substitute_declarations(ctx: &mut EvalContext, list: &DeclarationList) -> DeclarationList {
    list.iter()
        .filter_map(|declaration| {
            let value = evaluate_expression(ctx, &declaration.value)?;
            Some(Declaration {
                value,
                condition: declaration
                    .condition
                    .as_ref()
                    .map(|c| substitute_condition(ctx, c)),
                ..declaration.clone()
            })
        })
        .collect()
}

/// Replace variable terms inside a condition with their current
/// bindings where one exists; unresolved names are kept untouched for
/// the later truthiness check.
fn substitute_condition(ctx: &mut EvalContext, condition: &BooleanExpr) -> BooleanExpr {
    match condition {
        BooleanExpr::Const { .. } => condition.clone(),
        BooleanExpr::Not { operand } => BooleanExpr::not(substitute_condition(ctx, operand)),
        BooleanExpr::Binary { op, left, right } => BooleanExpr::binary(
            *op,
            substitute_condition(ctx, left),
            substitute_condition(ctx, right),
        ),
        BooleanExpr::Term { term } => {
            if let TermKind::VariableRef { name } = &term.kind {
                if let Some(bound) = ctx.scopes.get(name) {
                    if let Some(single) = bound.single_term() {
                        let mut replacement = single.clone();
                        replacement.sep = term.sep;
                        return BooleanExpr::Term { term: replacement };
                    }
                }
            }
            condition.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascata_parser::parse;

    fn context_with(name: &str, value: Expression) -> EvalContext {
        let mut ctx = EvalContext::new();
        ctx.scopes.declare(name, value);
        ctx
    }

    fn eval_value(ctx: &mut EvalContext, source: &str) -> Option<Expression> {
        // parse a single declaration to borrow the value grammar
        let doc = parse(&format!("p {{ x: {}; }}", source)).unwrap();
        let rule_sets = doc.rule_sets();
        let declaration = rule_sets[0].block.declarations.iter().next().unwrap().clone();
        evaluate_expression(ctx, &declaration.value)
    }

    #[test]
    fn test_variable_splices_value_list() {
        let mut ctx = context_with(
            "pad",
            Expression::new(vec![
                Term::number(8.0, Some("px")),
                Term::number(16.0, Some("px")),
            ]),
        );
        let result = eval_value(&mut ctx, "$pad").unwrap();
        assert_eq!(result.render(false), "8px 16px");
    }

    #[test]
    fn test_undefined_variable_reports_and_drops() {
        let mut ctx = EvalContext::new();
        assert!(eval_value(&mut ctx, "$missing").is_none());
        assert_eq!(ctx.diagnostics.error_count(), 1);
    }

    #[test]
    fn test_chained_variable_resolution() {
        let mut ctx = EvalContext::new();
        ctx.scopes.declare("a", Expression::single(Term::number(3.0, Some("em"))));
        ctx.scopes
            .declare("b", Expression::single(Term::variable("a")));
        let result = eval_value(&mut ctx, "$b").unwrap();
        assert_eq!(result.render(false), "3em");
    }

    #[test]
    fn test_self_referential_variable_reports_and_drops() {
        let mut ctx = context_with("a", Expression::single(Term::variable("a")));
        assert!(eval_value(&mut ctx, "$a").is_none());
        assert_eq!(ctx.diagnostics.error_count(), 1);
    }

    #[test]
    fn test_mutually_referential_variables_report_and_drop() {
        let mut ctx = EvalContext::new();
        ctx.scopes
            .declare("a", Expression::single(Term::variable("b")));
        ctx.scopes
            .declare("b", Expression::single(Term::variable("a")));
        assert!(eval_value(&mut ctx, "$a").is_none());
        assert_eq!(ctx.diagnostics.error_count(), 1);
    }

    #[test]
    fn test_cyclic_variable_in_calc_reports_and_drops() {
        let mut ctx = context_with(
            "a",
            Expression::single(Term::new(TermKind::Calc {
                expr: CalcExpr::VariableRef {
                    name: "a".to_string(),
                },
            })),
        );
        assert!(eval_value(&mut ctx, "calc($a + 1)").is_none());
        assert_eq!(ctx.diagnostics.error_count(), 1);
    }

    #[test]
    fn test_calc_arithmetic_with_units() {
        let mut ctx = context_with("base", Expression::single(Term::number(10.0, Some("px"))));
        let result = eval_value(&mut ctx, "calc($base * 2 + 4px)").unwrap();
        assert_eq!(result.render(false), "24px");
    }

    #[test]
    fn test_calc_division_by_zero() {
        let mut ctx = EvalContext::new();
        assert!(eval_value(&mut ctx, "calc(4 / 0)").is_none());
        assert_eq!(ctx.diagnostics.error_count(), 1);
    }

    #[test]
    fn test_calc_incompatible_units() {
        let mut ctx = EvalContext::new();
        assert!(eval_value(&mut ctx, "calc(4px + 2em)").is_none());
        assert_eq!(ctx.diagnostics.error_count(), 1);
    }

    #[test]
    fn test_rgb_folds_to_hex() {
        let mut ctx = EvalContext::new();
        let result = eval_value(&mut ctx, "rgb(255, 99, 71)").unwrap();
        assert_eq!(result.render(false), "#ff6347");
    }

    #[test]
    fn test_darken_named_color() {
        let mut ctx = EvalContext::new();
        let result = eval_value(&mut ctx, "darken(white, 50)").unwrap();
        assert_eq!(result.render(false), "#808080");
    }

    #[test]
    fn test_unknown_function_passes_through_with_substitution() {
        let mut ctx = context_with("x", Expression::single(Term::number(2.0, None)));
        let result = eval_value(&mut ctx, "clamp($x, 5, 10)").unwrap();
        assert_eq!(result.render(false), "clamp(2, 5, 10)");
    }
}
