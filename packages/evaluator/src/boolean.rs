//! Three-valued condition evaluation. `Undefined` arises from
//! evaluation failures inside a condition and poisons every operator
//! it reaches: when a binary operator's left side is undefined the
//! right side is never evaluated.

use crate::context::EvalContext;
use crate::term;
use cascata_parser::ast::{BoolOp, BooleanExpr, Expression, Term, TermKind};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Undefined,
}

impl Truth {
    pub fn from_bool(value: bool) -> Self {
        if value {
            Truth::True
        } else {
            Truth::False
        }
    }

    pub fn is_true(self) -> bool {
        self == Truth::True
    }

    fn negate(self) -> Self {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Undefined => Truth::Undefined,
        }
    }

    /// Strict binary application; both operands are already known to be
    /// defined when this runs.
    fn apply(op: BoolOp, left: bool, right: bool) -> Self {
        Self::from_bool(match op {
            BoolOp::And => left && right,
            BoolOp::Or => left || right,
            BoolOp::Xor => left != right,
        })
    }
}

/// Evaluate a condition to a truth value. Never reports diagnostics on
/// its own account: an undefined result silently suppresses whatever
/// the condition gates, while failures inside arithmetic subterms
/// report through the normal term evaluation path.
pub fn evaluate(ctx: &mut EvalContext, condition: &BooleanExpr) -> Truth {
    match condition {
        BooleanExpr::Const { value } => Truth::from_bool(*value),
        BooleanExpr::Not { operand } => evaluate(ctx, operand).negate(),
        BooleanExpr::Binary { op, left, right } => {
            let left = match evaluate(ctx, left) {
                Truth::Undefined => return Truth::Undefined,
                Truth::True => true,
                Truth::False => false,
            };
            match evaluate(ctx, right) {
                Truth::Undefined => Truth::Undefined,
                right => Truth::apply(*op, left, right.is_true()),
            }
        }
        BooleanExpr::Term { term } => term_truth(ctx, term),
    }
}

fn term_truth(ctx: &mut EvalContext, term: &Term) -> Truth {
    match &term.kind {
        TermKind::Number { value, .. } => Truth::from_bool(*value != 0.0),
        TermKind::Literal { text, .. } => text_truth(text),
        TermKind::Url { url } => Truth::from_bool(!url.is_empty()),
        // a bare class name in condition position asks whether the
        // class is registered
        TermKind::ClassRef { name, .. } => Truth::from_bool(ctx.has_class(name)),
        TermKind::SelectorRef { selector_text, .. } => {
            Truth::from_bool(!ctx.matching_rule_groups(selector_text).is_empty())
        }
        TermKind::VariableRef { name } => {
            let Some(bound) = ctx.scopes.get(name).cloned() else {
                debug!(name = %name, "undefined variable in condition treated as false");
                return Truth::False;
            };
            expression_truth(ctx, &bound)
        }
        TermKind::Calc { expr } => match term::evaluate_calc(ctx, expr, term.span) {
            Some(result) => Truth::from_bool(result.value != 0.0),
            None => Truth::Undefined,
        },
        TermKind::Function { .. } => {
            // any function call that still reads as a call is a value,
            // and values are truthy by the string rules
            Truth::True
        }
    }
}

fn expression_truth(ctx: &mut EvalContext, expr: &Expression) -> Truth {
    if expr.is_empty() {
        return Truth::False;
    }
    if let Some(single) = expr.single_term() {
        let single = single.clone();
        return term_truth(ctx, &single);
    }
    match term::evaluate_expression(ctx, expr) {
        Some(evaluated) => text_truth(&evaluated.render(false)),
        None => Truth::Undefined,
    }
}

/// String truthiness: empty, "false" and "no" (case-insensitive) are
/// false, "true" is true, and any other non-empty text is true.
fn text_truth(text: &str) -> Truth {
    let trimmed = text.trim();
    Truth::from_bool(
        !trimmed.is_empty()
            && !trimmed.eq_ignore_ascii_case("false")
            && !trimmed.eq_ignore_ascii_case("no"),
    )
}
