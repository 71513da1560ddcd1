use crate::scope::{FrameKind, ScopeChain};
use cascata_common::Diagnostics;
use cascata_parser::ast::{ClassDirective, NestedRuleSet, RuleSet, Span};
use std::collections::HashMap;
use tracing::debug;

/// Shared evaluation state: the scope chain, the class registry, the
/// rule groups visible to selector-text references, and the diagnostics
/// sink.
///
/// The visibility stack tracks which sibling nested rule sets are in
/// scope while a block is being evaluated, so relative selector-text
/// references resolve innermost-first. The resolution stack tracks
/// class expansions in progress for cycle detection; the expansion
/// stack does the same for variable substitutions.
#[derive(Default)]
pub struct EvalContext {
    pub scopes: ScopeChain,
    pub diagnostics: Diagnostics,
    classes: HashMap<String, ClassDirective>,
    rule_groups: Vec<RuleSet>,
    visible: Vec<Vec<NestedRuleSet>>,
    resolving: Vec<String>,
    expanding: Vec<String>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- class registry ----

    pub fn register_class(&mut self, class: ClassDirective) {
        if self.classes.contains_key(&class.name) {
            debug!(name = %class.name, "class redefined");
        }
        self.classes.insert(class.name.clone(), class);
    }

    pub fn get_class(&self, name: &str) -> Option<&ClassDirective> {
        self.classes.get(name)
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    // ---- top-level rule groups ----

    pub fn set_rule_groups(&mut self, groups: Vec<RuleSet>) {
        self.rule_groups = groups;
    }

    pub fn rule_groups(&self) -> &[RuleSet] {
        &self.rule_groups
    }

    /// Every top-level group whose selector list renders exactly as
    /// `selector_text`.
    pub fn matching_rule_groups(&self, selector_text: &str) -> Vec<&RuleSet> {
        self.rule_groups
            .iter()
            .filter(|rs| selector_list_text(rs) == selector_text)
            .collect()
    }

    /// Nested rule sets matching `selector_text`, searched innermost
    /// visibility level first.
    pub fn matching_visible_rule_sets(&self, selector_text: &str) -> Vec<&NestedRuleSet> {
        for level in self.visible.iter().rev() {
            let hits: Vec<&NestedRuleSet> = level
                .iter()
                .filter(|nested| selector_list_text(&nested.rule_set) == selector_text)
                .collect();
            if !hits.is_empty() {
                return hits;
            }
        }
        Vec::new()
    }

    // ---- guarded stacks ----

    /// Run `f` inside a fresh scope frame; the frame is popped on every
    /// exit path.
    pub fn with_scope<T>(&mut self, kind: FrameKind, f: impl FnOnce(&mut Self) -> T) -> T {
        self.scopes.push(kind);
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Run `f` with `level` pushed as the innermost visibility level.
    pub fn with_visible<T>(
        &mut self,
        level: Vec<NestedRuleSet>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.visible.push(level);
        let result = f(self);
        self.visible.pop();
        result
    }

    /// Whether a class expansion for `key` is already on the resolution
    /// stack.
    pub fn is_resolving(&self, key: &str) -> bool {
        self.resolving.iter().any(|name| name == key)
    }

    /// Run `f` with `key` marked as in-progress. The caller checks
    /// [`is_resolving`](Self::is_resolving) first to detect cycles.
    pub fn with_resolution<T>(&mut self, key: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        self.resolving.push(key.to_string());
        let result = f(self);
        self.resolving.pop();
        result
    }

    /// Whether a substitution of variable `name` is already in
    /// progress. Lazy bindings can reference other variables, so a
    /// binding that reaches itself again is a cycle.
    pub fn is_expanding(&self, name: &str) -> bool {
        self.expanding.iter().any(|n| n == name)
    }

    /// Run `f` with variable `name` marked as a substitution in
    /// progress. The caller checks [`is_expanding`](Self::is_expanding)
    /// first to detect cycles.
    pub fn with_expansion<T>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        self.expanding.push(name.to_string());
        let result = f(self);
        self.expanding.pop();
        result
    }

    // ---- diagnostics ----

    pub fn semantic_error(&mut self, message: impl Into<String>, span: Span) {
        let (line, col) = position(span);
        self.diagnostics.semantic_error_at(message, line, col);
    }

    pub fn warning(&mut self, message: impl Into<String>, span: Span) {
        let (line, col) = position(span);
        self.diagnostics.warning_at(message, line, col);
    }
}

fn position(span: Span) -> (Option<usize>, Option<usize>) {
    if span.line == 0 {
        (None, None)
    } else {
        (Some(span.line), Some(span.col))
    }
}

/// Render a rule set's selector list the way it appears in source,
/// normal format, for selector-text comparison.
pub fn selector_list_text(rule_set: &RuleSet) -> String {
    let mut out = String::new();
    for (i, selector) in rule_set.selectors.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        selector.render_into(&mut out, false);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascata_parser::ast::{DeclarationBlock, DeclarationList, Selector, SimpleSelector};

    fn group(selector: &str) -> RuleSet {
        RuleSet {
            selectors: vec![Selector::simple(vec![SimpleSelector::class(selector)])],
            block: DeclarationBlock::new(),
            span: Span::none(),
        }
    }

    #[test]
    fn test_selector_text_matching() {
        let mut ctx = EvalContext::new();
        ctx.set_rule_groups(vec![group("base"), group("other"), group("base")]);

        assert_eq!(ctx.matching_rule_groups(".base").len(), 2);
        assert!(ctx.matching_rule_groups(".missing").is_empty());
    }

    #[test]
    fn test_resolution_stack_detects_reentry() {
        let mut ctx = EvalContext::new();
        assert!(!ctx.is_resolving("a"));
        ctx.with_resolution("a", |ctx| {
            assert!(ctx.is_resolving("a"));
            ctx.with_resolution("b", |ctx| {
                assert!(ctx.is_resolving("a"));
                assert!(ctx.is_resolving("b"));
            });
            assert!(!ctx.is_resolving("b"));
        });
        assert!(!ctx.is_resolving("a"));
    }

    #[test]
    fn test_class_registry() {
        let mut ctx = EvalContext::new();
        ctx.register_class(ClassDirective {
            name: "rounded".to_string(),
            parameters: DeclarationList::new(),
            block: DeclarationBlock::new(),
            span: Span::none(),
        });
        assert!(ctx.has_class("rounded"));
        assert!(ctx.get_class("missing").is_none());
    }
}
