//! Class expansion: resolving `extend`/`apply` references to their
//! source bodies, binding call arguments over declared parameters, and
//! splicing the resolved body into the inheriting block.

use crate::boolean::{self, Truth};
use crate::context::EvalContext;
use crate::declarations::{self, ClassReference, ResolvedBlock};
use crate::scope::FrameKind;
use crate::term;
use cascata_parser::ast::{
    CallArg, ClassDirective, DeclarationBlock, DeclarationList, Expression, Span,
};
use tracing::{debug, instrument};

/// Expand one inheritance reference into `out`.
///
/// Named references resolve through the class registry. Selector-text
/// references resolve against sibling nested rule sets first (innermost
/// visibility level wins) and then against top-level rule groups,
/// merging every group that matches. A reference already being
/// expanded is a cycle and reports without recursing.
#[instrument(skip(ctx, reference, out), fields(reference = %reference.resolution_key()))]
pub fn apply_reference(
    ctx: &mut EvalContext,
    reference: &ClassReference,
    span: Span,
    out: &mut ResolvedBlock,
) {
    let Some(class) = resolve_target(ctx, reference, span) else {
        return;
    };
    let key = reference.resolution_key();
    if ctx.is_resolving(&key) {
        ctx.semantic_error(format!("cyclic class reference '{}'", key), span);
        return;
    }
    let args = match reference {
        ClassReference::Named { args, .. } | ClassReference::SelectorText { args, .. } => args,
    };
    let bound = bind_arguments(ctx, &key, &class.parameters, args, span);
    ctx.with_resolution(&key, |ctx| {
        ctx.with_scope(FrameKind::Params, |ctx| {
            for (name, value) in bound {
                ctx.scopes.declare(name, value);
            }
            expand_body(ctx, &class.block, out);
        });
    });
}

fn resolve_target(
    ctx: &mut EvalContext,
    reference: &ClassReference,
    span: Span,
) -> Option<ClassDirective> {
    match reference {
        ClassReference::Named { name, .. } => match ctx.get_class(name) {
            Some(class) => Some(class.clone()),
            None => {
                ctx.semantic_error(format!("class '{}' is not defined", name), span);
                None
            }
        },
        ClassReference::SelectorText { text, .. } => {
            let mut merged = DeclarationBlock::new();
            let visible = ctx.matching_visible_rule_sets(text);
            if !visible.is_empty() {
                for nested in visible {
                    merge_block(&mut merged, &nested.rule_set.block);
                }
            } else {
                let groups = ctx.matching_rule_groups(text);
                if groups.is_empty() {
                    ctx.semantic_error(
                        format!("no rule group matches selector \"{}\"", text),
                        span,
                    );
                    return None;
                }
                debug!(count = groups.len(), selector = %text, "merging matching rule groups");
                for group in groups {
                    merge_block(&mut merged, &group.block);
                }
            }
            Some(ClassDirective {
                name: text.clone(),
                parameters: DeclarationList::new(),
                block: merged,
                span,
            })
        }
    }
}

fn merge_block(target: &mut DeclarationBlock, source: &DeclarationBlock) {
    for declaration in source.declarations.iter() {
        target.declarations.push(declaration.clone());
    }
    target
        .nested_rule_sets
        .extend(source.nested_rule_sets.iter().cloned());
}

/// Bind call arguments over the declared parameters, in declaration
/// order, defaults first.
///
/// Positional arguments fill parameters left to right; named arguments
/// overwrite by name. A positional argument after a named one aborts
/// binding entirely and the defaults apply. Excess positional and
/// unknown named arguments are dropped with a warning. Argument values
/// evaluate in the caller's scope before the parameter frame exists.
fn bind_arguments(
    ctx: &mut EvalContext,
    class_name: &str,
    parameters: &DeclarationList,
    args: &[CallArg],
    span: Span,
) -> Vec<(String, Expression)> {
    let mut bound: Vec<(String, Expression)> = parameters
        .iter()
        .map(|p| (p.name.clone(), p.value.clone()))
        .collect();

    let mut seen_named = false;
    for arg in args {
        if arg.name.is_some() {
            seen_named = true;
        } else if seen_named {
            ctx.semantic_error(
                format!(
                    "positional argument after named argument in call to '{}'",
                    class_name
                ),
                span,
            );
            return bound;
        }
    }

    let mut next_positional = 0;
    for arg in args {
        let Some(value) = term::evaluate_expression(ctx, &arg.value) else {
            // the error is reported; the parameter keeps its default
            continue;
        };
        match &arg.name {
            None => {
                if next_positional < bound.len() {
                    bound[next_positional].1 = value;
                    next_positional += 1;
                } else {
                    ctx.warning(
                        format!(
                            "'{}' takes {} parameter(s); excess positional argument dropped",
                            class_name,
                            bound.len()
                        ),
                        span,
                    );
                }
            }
            Some(name) => match bound.iter_mut().find(|(param, _)| param == name) {
                Some(slot) => slot.1 = value,
                None => ctx.warning(
                    format!("'{}' has no parameter named '{}'", class_name, name),
                    span,
                ),
            },
        }
    }
    bound
}

/// Resolve a class body inside its parameter frame and splice the
/// result into the inheriting block. The body's own declarations run
/// through normal block resolution, so chained references expand
/// recursively. Nested rule sets are condition-checked now, deeply
/// substituted so parameter bindings outlive the frame, and appended
/// with their condition cleared.
fn expand_body(ctx: &mut EvalContext, body: &DeclarationBlock, out: &mut ResolvedBlock) {
    let inner = declarations::resolve_block(ctx, body);
    for declaration in inner.declarations.iter() {
        out.declarations.push(declaration.clone());
    }
    out.nested.extend(inner.nested);

    for nested in &body.nested_rule_sets {
        if let Some(condition) = &nested.condition {
            if boolean::evaluate(ctx, condition) != Truth::True {
                continue;
            }
        }
        let mut substituted = term::substitute_nested_rule_set(ctx, nested);
        substituted.condition = None;
        out.nested.push(substituted);
    }
}
