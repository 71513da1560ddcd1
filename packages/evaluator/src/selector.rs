//! Selector algebra: flattening composite selectors built up by
//! nesting, and the parent x child cross products that nesting
//! produces.

use cascata_parser::ast::{Combinator, NestedRuleSet, Selector, SimpleSelector};

/// Flatten a selector to its simple-selector sequence.
///
/// A composite joined by a real combinator concatenates the two
/// flattened halves, tagging the child's first part with the
/// combinator. A compound join (`Combinator::None`, the `&` marker)
/// instead splices the child's first part onto the end of the parent's
/// last compound chain, so `div` + `.foo` renders `div.foo`.
pub fn flatten(selector: &Selector) -> Vec<SimpleSelector> {
    match selector {
        Selector::Simple { parts } => parts.clone(),
        Selector::Composite {
            parent,
            combinator,
            child,
        } => {
            let mut parts = flatten(parent);
            let mut child_parts = flatten(child);
            if child_parts.is_empty() {
                return parts;
            }
            match combinator {
                Combinator::None if !parts.is_empty() => {
                    let mut first = child_parts.remove(0);
                    first.combinator = Combinator::None;
                    parts.last_mut().unwrap().last_link_mut().child = Some(Box::new(first));
                }
                _ => {
                    child_parts[0].combinator = *combinator;
                }
            }
            parts.extend(child_parts);
            parts
        }
    }
}

/// A flattened copy of `selector`, ready for output.
pub fn flattened(selector: &Selector) -> Selector {
    Selector::simple(flatten(selector))
}

/// Selectors of a nested rule set in the context of its parents: the
/// cross product of every parent selector with every child selector,
/// joined by the nesting combinator, flattened.
pub fn cross_product(parents: &[Selector], nested: &NestedRuleSet) -> Vec<Selector> {
    let mut out = Vec::with_capacity(parents.len() * nested.rule_set.selectors.len());
    for parent in parents {
        for child in &nested.rule_set.selectors {
            out.push(flattened(&Selector::composite(
                parent.clone(),
                nested.combinator,
                child.clone(),
            )));
        }
    }
    out
}
