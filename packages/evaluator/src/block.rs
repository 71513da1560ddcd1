//! Document orchestration: include expansion, class registration, and
//! top-down evaluation of rule sets into plain CSS.

use crate::boolean::{self, Truth};
use crate::context::EvalContext;
use crate::declarations;
use crate::scope::FrameKind;
use crate::selector;
use crate::term;
use cascata_common::ResourceLocator;
use cascata_parser::ast::{
    DeclarationBlock, DefineDirective, Document, Rule, RuleSet, Selector, Span,
};
use cascata_parser::parse;
use tracing::{debug, info, instrument};

/// Drives a full document evaluation. Evaluation never aborts: every
/// problem is reported through the context's diagnostics and the
/// offending construct is dropped from the output.
pub struct Evaluator {
    pub context: EvalContext,
    locator: Option<Box<dyn ResourceLocator>>,
    including: Vec<String>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            context: EvalContext::new(),
            locator: None,
            including: Vec::new(),
        }
    }

    /// An evaluator that resolves `@include` references through
    /// `locator`. Without one, every include reports a semantic error.
    pub fn with_locator(locator: Box<dyn ResourceLocator>) -> Self {
        Self {
            locator: Some(locator),
            ..Self::new()
        }
    }

    /// Evaluate a parsed document to its plain-CSS form.
    #[instrument(skip_all)]
    pub fn evaluate(&mut self, document: &Document) -> Document {
        let expanded = self.register(&document.rules);
        let registered = Document { rules: expanded };
        self.context
            .set_rule_groups(registered.rule_sets().into_iter().cloned().collect());

        let mut rules = Vec::new();
        self.evaluate_rules(&registered.rules, &mut rules);
        info!(
            rules = rules.len(),
            errors = self.context.diagnostics.error_count(),
            warnings = self.context.diagnostics.warning_count(),
            "evaluation finished"
        );
        Document { rules }
    }

    // ---- registration ----

    /// Walk `rules`, splicing included documents in place and moving
    /// class definitions into the registry. Classes inside conditional
    /// branches register later, if and when their branch is taken.
    fn register(&mut self, rules: &[Rule]) -> Vec<Rule> {
        let mut out = Vec::with_capacity(rules.len());
        for rule in rules {
            match rule {
                Rule::Class(class) => {
                    debug!(name = %class.name, "class registered");
                    self.context.register_class(class.clone());
                }
                Rule::Include(include) => {
                    if let Some(included) = self.load_include(&include.path, include.span) {
                        self.including.push(include.path.clone());
                        let spliced = self.register(&included.rules);
                        self.including.pop();
                        out.extend(spliced);
                    }
                }
                Rule::Media(media) => {
                    let mut inner = media.clone();
                    inner.rules = self.register(&media.rules);
                    out.push(Rule::Media(inner));
                }
                _ => out.push(rule.clone()),
            }
        }
        out
    }

    fn load_include(&mut self, path: &str, span: Span) -> Option<Document> {
        if self.including.iter().any(|p| p == path) {
            self.context
                .semantic_error(format!("cyclic include of \"{}\"", path), span);
            return None;
        }
        let Some(locator) = &self.locator else {
            self.context
                .semantic_error(format!("cannot include \"{}\": no resource locator", path), span);
            return None;
        };
        let bytes = match locator.locate(path) {
            Ok(bytes) => bytes,
            Err(error) => {
                self.context
                    .semantic_error(format!("cannot include \"{}\": {}", path, error), span);
                return None;
            }
        };
        let source = String::from_utf8_lossy(&bytes);
        match parse(&source) {
            Ok(document) => {
                debug!(path = %path, rules = document.rules.len(), "included document");
                Some(document)
            }
            Err(error) => {
                self.context
                    .semantic_error(format!("cannot parse \"{}\": {}", path, error), span);
                None
            }
        }
    }

    // ---- evaluation ----

    fn evaluate_rules(&mut self, rules: &[Rule], out: &mut Vec<Rule>) {
        for rule in rules {
            match rule {
                Rule::RuleSet(rule_set) => self.evaluate_rule_set(rule_set, out),
                Rule::Media(media) => {
                    let mut inner = Vec::new();
                    self.evaluate_rules(&media.rules, &mut inner);
                    if !inner.is_empty() {
                        let mut evaluated = media.clone();
                        evaluated.rules = inner;
                        out.push(Rule::Media(evaluated));
                    }
                }
                Rule::Define(define) => apply_define(&mut self.context, define),
                Rule::If(directive) => {
                    let branch = match boolean::evaluate(&mut self.context, &directive.condition) {
                        Truth::True => &directive.then_rules,
                        Truth::False => &directive.else_rules,
                        Truth::Undefined => continue,
                    };
                    let expanded = self.register(branch);
                    self.evaluate_rules(&expanded, out);
                }
                Rule::Charset(_) | Rule::Generic(_) => out.push(rule.clone()),
                // classes were registered, includes spliced
                Rule::Class(_) | Rule::Include(_) => {}
            }
        }
    }

    fn evaluate_rule_set(&mut self, rule_set: &RuleSet, out: &mut Vec<Rule>) {
        let selectors: Vec<Selector> = rule_set
            .selectors
            .iter()
            .map(selector::flattened)
            .collect();
        evaluate_block(&mut self.context, selectors, &rule_set.block, out);
    }
}

/// Evaluate one declaration block against its final selectors,
/// emitting the block's own rule set (when any declaration survives)
/// followed by its nested rule sets, cross-produced with the parent
/// selectors.
fn evaluate_block(
    ctx: &mut EvalContext,
    selectors: Vec<Selector>,
    block: &DeclarationBlock,
    out: &mut Vec<Rule>,
) {
    ctx.with_scope(FrameKind::Block, |ctx| {
        for rule in &block.rules {
            match rule {
                Rule::Define(define) => apply_define(ctx, define),
                Rule::Include(include) => ctx.warning(
                    "@include inside a declaration block is ignored",
                    include.span,
                ),
                Rule::Generic(generic) => ctx.warning(
                    format!("directive ignored inside a declaration block: {}", generic.text),
                    generic.span,
                ),
                _ => {}
            }
        }

        let resolved = declarations::resolve_block(ctx, block);

        // inherited nested rule sets precede the block's own
        let mut nested = resolved.nested;
        nested.extend(block.nested_rule_sets.iter().cloned());

        if !resolved.declarations.is_empty() {
            out.push(Rule::RuleSet(RuleSet {
                selectors: selectors.clone(),
                block: DeclarationBlock {
                    declarations: resolved.declarations,
                    ..DeclarationBlock::new()
                },
                span: Span::none(),
            }));
        }

        ctx.with_visible(nested.clone(), |ctx| {
            for child in &nested {
                if let Some(condition) = &child.condition {
                    if boolean::evaluate(ctx, condition) != Truth::True {
                        continue;
                    }
                }
                let child_selectors = selector::cross_product(&selectors, child);
                evaluate_block(ctx, child_selectors, &child.rule_set.block, out);
            }
        });
    });
}

fn apply_define(ctx: &mut EvalContext, define: &DefineDirective) {
    for declaration in define.declarations.iter() {
        if let Some(condition) = &declaration.condition {
            if boolean::evaluate(ctx, condition) != Truth::True {
                continue;
            }
        }
        let Some(value) = term::evaluate_expression(ctx, &declaration.value) else {
            continue;
        };
        if define.global {
            ctx.scopes.declare_global(declaration.name.clone(), value);
        } else {
            ctx.scopes.declare(declaration.name.clone(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascata_common::MockLocator;
    use cascata_parser::serializer::{serialize, Format};

    fn evaluate_to_css(source: &str) -> (String, EvalContext) {
        let document = parse(source).unwrap();
        let mut evaluator = Evaluator::new();
        let output = evaluator.evaluate(&document);
        (serialize(&output, Format::Normal), evaluator.context)
    }

    #[test]
    fn test_plain_css_passes_through() {
        let (css, ctx) = evaluate_to_css("p { color: red; }");
        assert_eq!(css, "p {\n  color: red;\n}\n");
        assert!(ctx.diagnostics.is_clean());
    }

    #[test]
    fn test_nested_rule_sets_flatten() {
        let (css, _) = evaluate_to_css("nav { margin: 0; a { color: blue; } }");
        assert_eq!(
            css,
            "nav {\n  margin: 0;\n}\n\nnav a {\n  color: blue;\n}\n"
        );
    }

    #[test]
    fn test_empty_parent_block_is_not_emitted() {
        let (css, _) = evaluate_to_css("nav { a { color: blue; } }");
        assert_eq!(css, "nav a {\n  color: blue;\n}\n");
    }

    #[test]
    fn test_block_scope_does_not_leak() {
        let (css, ctx) = evaluate_to_css(
            "p { @define { x: 1px; } margin: $x; } em { margin: $x; }",
        );
        assert_eq!(css, "p {\n  margin: 1px;\n}\n");
        assert_eq!(ctx.diagnostics.error_count(), 1);
    }

    #[test]
    fn test_global_define_escapes_block() {
        let (css, ctx) = evaluate_to_css(
            "p { @define global { x: 1px; } margin: $x; } em { margin: $x; }",
        );
        assert_eq!(css, "p {\n  margin: 1px;\n}\n\nem {\n  margin: 1px;\n}\n");
        assert!(ctx.diagnostics.is_clean());
    }

    #[test]
    fn test_top_level_conditional_selects_branch() {
        let source = "@define { wide: true; } \
                      @if ($wide) { p { width: 100%; } } @else { p { width: 50%; } }";
        let (css, _) = evaluate_to_css(source);
        assert_eq!(css, "p {\n  width: 100%;\n}\n");
    }

    #[test]
    fn test_media_groups_survive() {
        let (css, _) = evaluate_to_css("@media screen { p { color: red; } }");
        assert_eq!(css, "@media screen {\n  p {\n    color: red;\n  }\n}\n");
    }

    #[test]
    fn test_include_splices_document() {
        let mut locator = MockLocator::new();
        locator.add_resource(
            "theme.xcss",
            "@define global { accent: #ff0000; } @class tinted { color: $accent; }",
        );
        let document = parse("@include \"theme.xcss\"; p { extend: tinted; }").unwrap();
        let mut evaluator = Evaluator::with_locator(Box::new(locator));
        let output = evaluator.evaluate(&document);
        assert_eq!(
            serialize(&output, Format::Normal),
            "p {\n  color: #ff0000;\n}\n"
        );
        assert!(evaluator.context.diagnostics.is_clean());
    }

    #[test]
    fn test_missing_include_reports_and_continues() {
        let document = parse("@include \"missing.xcss\"; p { color: red; }").unwrap();
        let mut evaluator = Evaluator::with_locator(Box::new(MockLocator::new()));
        let output = evaluator.evaluate(&document);
        assert_eq!(
            serialize(&output, Format::Normal),
            "p {\n  color: red;\n}\n"
        );
        assert_eq!(evaluator.context.diagnostics.error_count(), 1);
    }

    #[test]
    fn test_cyclic_include_reports() {
        let mut locator = MockLocator::new();
        locator.add_resource("a.xcss", "@include \"a.xcss\"; p { color: red; }");
        let document = parse("@include \"a.xcss\";").unwrap();
        let mut evaluator = Evaluator::with_locator(Box::new(locator));
        let output = evaluator.evaluate(&document);
        assert_eq!(
            serialize(&output, Format::Normal),
            "p {\n  color: red;\n}\n"
        );
        assert_eq!(evaluator.context.diagnostics.error_count(), 1);
    }
}
