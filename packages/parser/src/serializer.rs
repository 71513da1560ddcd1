use crate::ast::*;

/// Output mode: indented and newline-separated, or with no optional
/// whitespace at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Normal,
    Compact,
}

/// Serializer converts a document tree back to text.
///
/// The evaluator's output is plain CSS, so the common path is rule sets,
/// media groups and passthrough directives; source-level constructs
/// (defines, classes, gates) serialize in source syntax so any tree can be
/// printed for debugging.
pub struct Serializer {
    format: Format,
    indent_level: usize,
}

/// Convenience function to serialize a document
pub fn serialize(doc: &Document, format: Format) -> String {
    Serializer::new(format).serialize(doc)
}

impl Serializer {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            indent_level: 0,
        }
    }

    fn compact(&self) -> bool {
        self.format == Format::Compact
    }

    pub fn serialize(&mut self, doc: &Document) -> String {
        let mut out = String::new();
        for (i, rule) in doc.rules.iter().enumerate() {
            if i > 0 && !self.compact() {
                out.push('\n');
            }
            self.serialize_rule(rule, &mut out);
        }
        out
    }

    fn serialize_rule(&mut self, rule: &Rule, out: &mut String) {
        match rule {
            Rule::RuleSet(rule_set) => self.serialize_rule_set(rule_set, out),
            Rule::Media(media) => self.serialize_media(media, out),
            Rule::Charset(charset) => {
                self.write_indent(out);
                out.push_str("@charset \"");
                out.push_str(&charset.charset);
                out.push_str("\";");
                self.newline(out);
            }
            Rule::Generic(generic) => {
                self.write_indent(out);
                out.push_str(&generic.text);
                if !generic.text.ends_with('}') {
                    out.push(';');
                }
                self.newline(out);
            }
            Rule::Include(include) => {
                self.write_indent(out);
                out.push_str("@include \"");
                out.push_str(&include.path);
                out.push_str("\";");
                self.newline(out);
            }
            Rule::Define(define) => self.serialize_define(define, out),
            Rule::Class(class) => self.serialize_class(class, out),
            Rule::If(directive) => self.serialize_if(directive, out),
        }
    }

    fn serialize_rule_set(&mut self, rule_set: &RuleSet, out: &mut String) {
        self.write_indent(out);
        for (i, selector) in rule_set.selectors.iter().enumerate() {
            if i > 0 {
                out.push_str(if self.compact() { "," } else { ", " });
            }
            selector.render_into(out, self.compact());
        }
        self.open_block(out);
        self.serialize_block_body(&rule_set.block, out);
        self.close_block(out);
    }

    fn serialize_block_body(&mut self, block: &DeclarationBlock, out: &mut String) {
        let total = block.declarations.len();
        for (i, declaration) in block.declarations.iter().enumerate() {
            self.serialize_declaration(declaration, i + 1 == total, out);
        }
        for rule in &block.rules {
            self.serialize_rule(rule, out);
        }
        for nested in &block.nested_rule_sets {
            self.serialize_nested_rule_set(nested, out);
        }
    }

    fn serialize_declaration(&mut self, declaration: &Declaration, last: bool, out: &mut String) {
        if let Some(condition) = &declaration.condition {
            // re-synthesize the gate the parser lowered
            self.write_indent(out);
            out.push_str("@if (");
            out.push_str(&condition.to_string());
            out.push(')');
            self.open_block(out);
            self.write_indent(out);
            self.write_plain_declaration(declaration, false, out);
            self.close_block(out);
            return;
        }
        self.write_indent(out);
        self.write_plain_declaration(declaration, last, out);
    }

    fn write_plain_declaration(&mut self, declaration: &Declaration, last: bool, out: &mut String) {
        out.push_str(&declaration.name);
        out.push_str(if self.compact() { ":" } else { ": " });
        out.push_str(&declaration.value.render(self.compact()));
        if declaration.important {
            out.push_str(if self.compact() { "!important" } else { " !important" });
        }
        if !self.compact() || !last {
            out.push(';');
        }
        self.newline(out);
    }

    fn serialize_nested_rule_set(&mut self, nested: &NestedRuleSet, out: &mut String) {
        self.write_indent(out);
        match nested.combinator {
            Combinator::None => out.push('&'),
            Combinator::Descendant => {}
            Combinator::ChildOf => out.push_str(if self.compact() { ">" } else { "> " }),
            Combinator::AdjacentSibling => {
                out.push_str(if self.compact() { "+" } else { "+ " })
            }
            Combinator::GeneralSibling => {
                out.push_str(if self.compact() { "~" } else { "~ " })
            }
        }
        for (i, selector) in nested.rule_set.selectors.iter().enumerate() {
            if i > 0 {
                out.push_str(if self.compact() { "," } else { ", " });
            }
            selector.render_into(out, self.compact());
        }
        self.open_block(out);
        self.serialize_block_body(&nested.rule_set.block, out);
        self.close_block(out);
    }

    fn serialize_media(&mut self, media: &MediaDirective, out: &mut String) {
        self.write_indent(out);
        out.push_str("@media ");
        out.push_str(&media.query);
        self.open_block(out);
        for rule in &media.rules {
            self.serialize_rule(rule, out);
        }
        self.close_block(out);
    }

    fn serialize_define(&mut self, define: &DefineDirective, out: &mut String) {
        self.write_indent(out);
        out.push_str("@define");
        if define.global {
            out.push_str(" global");
        }
        self.open_block(out);
        let total = define.declarations.len();
        for (i, declaration) in define.declarations.iter().enumerate() {
            self.write_indent(out);
            self.write_plain_declaration(declaration, i + 1 == total, out);
        }
        self.close_block(out);
    }

    fn serialize_class(&mut self, class: &ClassDirective, out: &mut String) {
        self.write_indent(out);
        out.push_str("@class ");
        out.push_str(&class.name);
        if !class.parameters.is_empty() {
            out.push('(');
            for (i, parameter) in class.parameters.iter().enumerate() {
                if i > 0 {
                    out.push_str(if self.compact() { "," } else { ", " });
                }
                out.push_str(&parameter.name);
                if !parameter.value.is_empty() {
                    out.push_str(if self.compact() { ":" } else { ": " });
                    out.push_str(&parameter.value.render(self.compact()));
                }
            }
            out.push(')');
        }
        self.open_block(out);
        self.serialize_block_body(&class.block, out);
        self.close_block(out);
    }

    fn serialize_if(&mut self, directive: &IfDirective, out: &mut String) {
        self.write_indent(out);
        out.push_str("@if (");
        out.push_str(&directive.condition.to_string());
        out.push(')');
        self.open_block(out);
        for rule in &directive.then_rules {
            self.serialize_rule(rule, out);
        }
        self.close_block(out);
        if !directive.else_rules.is_empty() {
            self.write_indent(out);
            out.push_str("@else");
            self.open_block(out);
            for rule in &directive.else_rules {
                self.serialize_rule(rule, out);
            }
            self.close_block(out);
        }
    }

    // ---- layout helpers ----

    fn open_block(&mut self, out: &mut String) {
        if self.compact() {
            out.push('{');
        } else {
            out.push_str(" {\n");
            self.indent_level += 1;
        }
    }

    fn close_block(&mut self, out: &mut String) {
        if self.compact() {
            out.push('}');
        } else {
            self.indent_level -= 1;
            self.write_indent(out);
            out.push_str("}\n");
        }
    }

    fn newline(&mut self, out: &mut String) {
        if !self.compact() {
            out.push('\n');
        }
    }

    fn write_indent(&self, out: &mut String) {
        if self.compact() {
            return;
        }
        for _ in 0..self.indent_level {
            out.push_str("  ");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_serialize_normal() {
        let doc = parse("div.foo{color:red;padding:8px 16px}").unwrap();
        let css = serialize(&doc, Format::Normal);
        assert_eq!(css, "div.foo {\n  color: red;\n  padding: 8px 16px;\n}\n");
    }

    #[test]
    fn test_serialize_compact() {
        let doc = parse("div.foo { color: red; padding: 8px 16px; }").unwrap();
        let css = serialize(&doc, Format::Compact);
        assert_eq!(css, "div.foo{color:red;padding:8px 16px}");
    }

    #[test]
    fn test_serialize_selector_list_and_combinators() {
        let doc = parse("ul > li, p + em { margin: 0; }").unwrap();
        assert_eq!(
            serialize(&doc, Format::Normal),
            "ul > li, p + em {\n  margin: 0;\n}\n"
        );
        assert_eq!(serialize(&doc, Format::Compact), "ul>li,p+em{margin:0}");
    }

    #[test]
    fn test_serialize_media() {
        let doc = parse("@media screen { p { color: red; } }").unwrap();
        assert_eq!(
            serialize(&doc, Format::Normal),
            "@media screen {\n  p {\n    color: red;\n  }\n}\n"
        );
        assert_eq!(
            serialize(&doc, Format::Compact),
            "@media screen{p{color:red}}"
        );
    }

    #[test]
    fn test_normal_compact_parse_stability() {
        let source = "div.foo { color: red; } @media screen { p { margin: 0 auto; } }";
        let doc = parse(source).unwrap();
        let normal = serialize(&doc, Format::Normal);
        let compact = serialize(&doc, Format::Compact);
        let reparsed = parse(&compact).unwrap();
        assert_eq!(serialize(&reparsed, Format::Normal), normal);
    }

    #[test]
    fn test_serialize_important() {
        let doc = parse("p { color: red !important; }").unwrap();
        assert_eq!(
            serialize(&doc, Format::Normal),
            "p {\n  color: red !important;\n}\n"
        );
        assert_eq!(serialize(&doc, Format::Compact), "p{color:red!important}");
    }

    #[test]
    fn test_serialize_compact_function_args() {
        let doc = parse("p { font-size: clamp(1rem, 2vw, 3rem); }").unwrap();
        assert_eq!(
            serialize(&doc, Format::Compact),
            "p{font-size:clamp(1rem,2vw,3rem)}"
        );
    }
}
