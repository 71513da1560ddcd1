//! Declaration-block resolution: condition gates, value substitution,
//! and dispatch of the `extend`/`apply` pseudo-properties into class
//! expansion.

use crate::boolean::{self, Truth};
use crate::context::EvalContext;
use crate::inheritance;
use crate::term;
use cascata_parser::ast::{
    CallArg, Declaration, DeclarationBlock, DeclarationList, NestedRuleSet, Term, TermKind,
};
use tracing::trace;

/// Pseudo-property names that pull in class or rule-group bodies
/// instead of emitting a declaration.
pub const INHERITANCE_PROPERTIES: [&str; 2] = ["extend", "apply"];

/// The flattened result of resolving one declaration block: the
/// surviving plain declarations, plus nested rule sets spliced in by
/// class expansion.
#[derive(Debug, Default)]
pub struct ResolvedBlock {
    pub declarations: DeclarationList,
    pub nested: Vec<NestedRuleSet>,
}

/// A parsed reference to an inheritance source
#[derive(Debug, Clone)]
pub enum ClassReference {
    /// `extend: name;` or `extend: name(args);`
    Named { name: String, args: Vec<CallArg> },
    /// `extend: "selector text";` referencing every rule group whose
    /// selector list renders exactly as the quoted text
    SelectorText { text: String, args: Vec<CallArg> },
}

impl ClassReference {
    /// Key used on the resolution stack; quoted so a selector-text
    /// reference never collides with a class of the same spelling.
    pub fn resolution_key(&self) -> String {
        match self {
            ClassReference::Named { name, .. } => name.clone(),
            ClassReference::SelectorText { text, .. } => format!("\"{}\"", text),
        }
    }

    fn from_term(term: &Term) -> Option<Self> {
        match &term.kind {
            TermKind::ClassRef { name, args } => Some(ClassReference::Named {
                name: name.clone(),
                args: args.clone(),
            }),
            TermKind::SelectorRef {
                selector_text,
                args,
            } => Some(ClassReference::SelectorText {
                text: selector_text.clone(),
                args: args.clone(),
            }),
            TermKind::Function { name, args } => Some(ClassReference::Named {
                name: name.clone(),
                args: args.clone(),
            }),
            TermKind::Literal { text, quoted } => {
                if *quoted {
                    Some(ClassReference::SelectorText {
                        text: text.clone(),
                        args: Vec::new(),
                    })
                } else {
                    Some(ClassReference::Named {
                        name: text.clone(),
                        args: Vec::new(),
                    })
                }
            }
            _ => None,
        }
    }
}

/// Resolve the declarations of one block in the current scope.
///
/// Gated declarations whose condition is false or undefined are
/// skipped. `extend`/`apply` declarations expand in place; everything
/// else gets its value substituted and survives with its condition
/// cleared. Declarations whose substitution fails are dropped, with
/// the error already reported.
pub fn resolve_block(ctx: &mut EvalContext, block: &DeclarationBlock) -> ResolvedBlock {
    let mut resolved = ResolvedBlock::default();
    for declaration in block.declarations.iter() {
        if let Some(condition) = &declaration.condition {
            if boolean::evaluate(ctx, condition) != Truth::True {
                trace!(name = %declaration.name, "declaration suppressed by condition");
                continue;
            }
        }
        if INHERITANCE_PROPERTIES.contains(&declaration.name.as_str()) {
            expand_references(ctx, declaration, &mut resolved);
            continue;
        }
        let Some(value) = term::evaluate_expression(ctx, &declaration.value) else {
            continue;
        };
        resolved.declarations.push(Declaration {
            name: declaration.name.clone(),
            value,
            important: declaration.important,
            condition: None,
            span: declaration.span,
        });
    }
    resolved
}

/// Each term of an `extend`/`apply` value names one inheritance source.
fn expand_references(ctx: &mut EvalContext, declaration: &Declaration, out: &mut ResolvedBlock) {
    if declaration.value.is_empty() {
        ctx.semantic_error(
            format!("'{}' requires at least one class reference", declaration.name),
            declaration.span,
        );
        return;
    }
    for term in &declaration.value.terms {
        match ClassReference::from_term(term) {
            Some(reference) => inheritance::apply_reference(ctx, &reference, term.span, out),
            None => ctx.semantic_error(
                format!("invalid class reference in '{}': {}", declaration.name, term),
                term.span,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascata_parser::ast::Expression;
    use cascata_parser::parse;

    fn first_block(source: &str) -> DeclarationBlock {
        let doc = parse(source).unwrap();
        doc.rule_sets()[0].block.clone()
    }

    #[test]
    fn test_gates_filter_declarations() {
        let mut ctx = EvalContext::new();
        let block = first_block(
            "p { color: red; @if (false) { margin: 0; } @if (true) { padding: 4px; } }",
        );
        let resolved = resolve_block(&mut ctx, &block);
        let names: Vec<&str> = resolved
            .declarations
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, ["color", "padding"]);
        // surviving gates are cleared
        assert!(resolved.declarations.iter().all(|d| d.condition.is_none()));
    }

    #[test]
    fn test_substitution_failure_drops_only_that_declaration() {
        let mut ctx = EvalContext::new();
        ctx.scopes
            .declare("known", Expression::single(Term::number(4.0, Some("px"))));
        let block = first_block("p { margin: $known; padding: $unknown; color: red; }");
        let resolved = resolve_block(&mut ctx, &block);
        let names: Vec<&str> = resolved
            .declarations
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, ["margin", "color"]);
        assert_eq!(ctx.diagnostics.error_count(), 1);
    }

    #[test]
    fn test_unknown_extend_target_reports() {
        let mut ctx = EvalContext::new();
        let block = first_block("p { extend: missing; }");
        let resolved = resolve_block(&mut ctx, &block);
        assert!(resolved.declarations.is_empty());
        assert_eq!(ctx.diagnostics.error_count(), 1);
    }

    #[test]
    fn test_important_survives_resolution() {
        let mut ctx = EvalContext::new();
        let block = first_block("p { color: red !important; }");
        let resolved = resolve_block(&mut ctx, &block);
        assert!(resolved.declarations.get("color").unwrap().important);
    }
}
