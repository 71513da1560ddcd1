use serde::{Deserialize, Serialize};
use std::fmt;

/// Span information for source location tracking
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub col: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, col: usize) -> Self {
        Self {
            start,
            end,
            line,
            col,
        }
    }

    /// Span for nodes synthesized during evaluation
    pub fn none() -> Self {
        Self {
            start: 0,
            end: 0,
            line: 0,
            col: 0,
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::none()
    }
}

/// Root document node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub rules: Vec<Rule>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rule sets reachable without entering class bodies. Rule sets
    /// nested in media groups count as top-level groups of their medium.
    pub fn rule_sets(&self) -> Vec<&RuleSet> {
        fn walk<'a>(rules: &'a [Rule], out: &mut Vec<&'a RuleSet>) {
            for rule in rules {
                match rule {
                    Rule::RuleSet(rs) => out.push(rs),
                    Rule::Media(media) => walk(&media.rules, out),
                    Rule::If(cond) => {
                        walk(&cond.then_rules, out);
                        walk(&cond.else_rules, out);
                    }
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.rules, &mut out);
        out
    }
}

/// Top-level (or media-grouped) rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Rule {
    RuleSet(RuleSet),
    Class(ClassDirective),
    Define(DefineDirective),
    Media(MediaDirective),
    Include(IncludeDirective),
    If(IfDirective),
    Charset(CharsetDirective),
    Generic(GenericDirective),
}

/// Selectors plus a declaration block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub selectors: Vec<Selector>,
    pub block: DeclarationBlock,
    pub span: Span,
}

/// Named, parameterized class/mixin definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDirective {
    pub name: String,
    /// Formal parameters in declared order; each value is the default.
    pub parameters: DeclarationList,
    pub block: DeclarationBlock,
    pub span: Span,
}

/// Variable declarations for the current (or global) scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefineDirective {
    pub global: bool,
    pub declarations: DeclarationList,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDirective {
    pub query: String,
    pub rules: Vec<Rule>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncludeDirective {
    pub path: String,
    pub span: Span,
}

/// Top-level conditional. Block-level conditionals are lowered by the
/// parser onto per-declaration condition gates instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfDirective {
    pub condition: BooleanExpr,
    pub then_rules: Vec<Rule>,
    pub else_rules: Vec<Rule>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharsetDirective {
    pub charset: String,
    pub span: Span,
}

/// Unknown at-directive preserved verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericDirective {
    pub text: String,
    pub span: Span,
}

/// A declaration block: declarations, nested rule sets, and other nested
/// rules (block-level defines, unknown directives).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeclarationBlock {
    pub declarations: DeclarationList,
    pub nested_rule_sets: Vec<NestedRuleSet>,
    pub rules: Vec<Rule>,
}

impl DeclarationBlock {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A rule set embedded in another block, carrying its own combinator and
/// visibility condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedRuleSet {
    pub combinator: Combinator,
    pub rule_set: RuleSet,
    /// None means always visible
    pub condition: Option<BooleanExpr>,
}

/// name: value [!important], optionally gated by a condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub value: Expression,
    pub important: bool,
    /// None means constant-true
    pub condition: Option<BooleanExpr>,
    pub span: Span,
}

impl Declaration {
    pub fn new(name: impl Into<String>, value: Expression) -> Self {
        Self {
            name: name.into(),
            value,
            important: false,
            condition: None,
            span: Span::none(),
        }
    }
}

/// Ordered declaration sequence with override-aware name lookup
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeclarationList {
    pub items: Vec<Declaration>,
}

impl DeclarationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, declaration: Declaration) {
        self.items.push(declaration);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Declaration> {
        self.items.iter()
    }

    /// Override-aware name lookup: scanning from the end, the first
    /// `!important` match wins outright; otherwise the most recently
    /// declared match wins.
    pub fn get(&self, name: &str) -> Option<&Declaration> {
        let mut latest = None;
        for declaration in self.items.iter().rev() {
            if declaration.name != name {
                continue;
            }
            if declaration.important {
                return Some(declaration);
            }
            if latest.is_none() {
                latest = Some(declaration);
            }
        }
        latest
    }
}

impl FromIterator<Declaration> for DeclarationList {
    fn from_iter<T: IntoIterator<Item = Declaration>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Separator joining a term to the previous one in its expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Sep {
    #[default]
    Space,
    Comma,
    Slash,
}

/// Ordered term sequence (a CSS value list)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Expression {
    pub terms: Vec<Term>,
}

impl Expression {
    pub fn new(terms: Vec<Term>) -> Self {
        Self { terms }
    }

    pub fn single(term: Term) -> Self {
        Self { terms: vec![term] }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The sole term of a one-term expression
    pub fn single_term(&self) -> Option<&Term> {
        match self.terms.as_slice() {
            [term] => Some(term),
            _ => None,
        }
    }

    pub fn render(&self, compact: bool) -> String {
        let mut out = String::new();
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                match term.sep {
                    Sep::Space => out.push(' '),
                    Sep::Comma => out.push_str(if compact { "," } else { ", " }),
                    Sep::Slash => out.push('/'),
                }
            }
            term.render_into(&mut out, compact);
        }
        out
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

/// Leaf of all value expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub sep: Sep,
    pub kind: TermKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TermKind {
    /// Numeric value with optional unit ("8px", "1.5", "50%")
    Number { value: f64, unit: Option<String> },

    /// Bare keyword or quoted string literal
    Literal { text: String, quoted: bool },

    /// url(...) literal
    Url { url: String },

    /// Function call; unrecognized names pass through as text
    Function { name: String, args: Vec<CallArg> },

    /// $name reference resolved through the scope chain
    VariableRef { name: String },

    /// Reference to a registered class, with call arguments
    ClassRef { name: String, args: Vec<CallArg> },

    /// Reference to every rule group matching a selector text
    SelectorRef {
        selector_text: String,
        args: Vec<CallArg>,
    },

    /// calc(...) arithmetic
    Calc { expr: CalcExpr },
}

impl Term {
    pub fn new(kind: TermKind) -> Self {
        Self {
            sep: Sep::Space,
            kind,
            span: Span::none(),
        }
    }

    pub fn with_sep(mut self, sep: Sep) -> Self {
        self.sep = sep;
        self
    }

    pub fn number(value: f64, unit: Option<&str>) -> Self {
        Self::new(TermKind::Number {
            value,
            unit: unit.map(str::to_string),
        })
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Self::new(TermKind::Literal {
            text: text.into(),
            quoted: false,
        })
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Self::new(TermKind::Literal {
            text: text.into(),
            quoted: true,
        })
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::new(TermKind::VariableRef { name: name.into() })
    }

    pub fn class_ref(name: impl Into<String>, args: Vec<CallArg>) -> Self {
        Self::new(TermKind::ClassRef {
            name: name.into(),
            args,
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, false);
        out
    }

    fn render_into(&self, out: &mut String, compact: bool) {
        match &self.kind {
            TermKind::Number { value, unit } => {
                out.push_str(&format_number(*value));
                if let Some(unit) = unit {
                    out.push_str(unit);
                }
            }
            TermKind::Literal { text, quoted } => {
                if *quoted {
                    out.push('"');
                    for c in text.chars() {
                        match c {
                            '"' => out.push_str("\\\""),
                            '\\' => out.push_str("\\\\"),
                            _ => out.push(c),
                        }
                    }
                    out.push('"');
                } else {
                    out.push_str(text);
                }
            }
            TermKind::Url { url } => {
                out.push_str("url(");
                out.push_str(url);
                out.push(')');
            }
            TermKind::Function { name, args } => {
                out.push_str(name);
                render_args(args, out, compact);
            }
            TermKind::VariableRef { name } => {
                out.push('$');
                out.push_str(name);
            }
            TermKind::ClassRef { name, args } => {
                out.push_str(name);
                if !args.is_empty() {
                    render_args(args, out, compact);
                }
            }
            TermKind::SelectorRef { selector_text, .. } => {
                out.push('"');
                out.push_str(selector_text);
                out.push('"');
            }
            TermKind::Calc { expr } => {
                out.push_str("calc(");
                expr.render_into(out);
                out.push(')');
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn render_args(args: &[CallArg], out: &mut String, compact: bool) {
    out.push('(');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(if compact { "," } else { ", " });
        }
        if let Some(name) = &arg.name {
            out.push_str(name);
            out.push('=');
        }
        out.push_str(&arg.value.render(compact));
    }
    out.push(')');
}

/// Positional or named call argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallArg {
    pub name: Option<String>,
    pub value: Expression,
}

impl CallArg {
    pub fn positional(value: Expression) -> Self {
        Self { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: Expression) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }
}

/// Format a number the way CSS output expects: no trailing zeros, no
/// decimal point on integers.
pub fn format_number(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        // Rust's {} never prints trailing zeros
        format!("{}", value)
    }
}

/// Arithmetic-calculation operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalcOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl CalcOp {
    pub fn token(&self) -> char {
        match self {
            CalcOp::Add => '+',
            CalcOp::Subtract => '-',
            CalcOp::Multiply => '*',
            CalcOp::Divide => '/',
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            CalcOp::Add | CalcOp::Subtract => 1,
            CalcOp::Multiply | CalcOp::Divide => 2,
        }
    }
}

/// calc() operand tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CalcExpr {
    Number { value: f64, unit: Option<String> },
    VariableRef { name: String },
    Negate { operand: Box<CalcExpr> },
    Binary {
        op: CalcOp,
        left: Box<CalcExpr>,
        right: Box<CalcExpr>,
    },
}

impl CalcExpr {
    fn precedence(&self) -> u8 {
        match self {
            CalcExpr::Binary { op, .. } => op.precedence(),
            _ => 3,
        }
    }

    fn render_into(&self, out: &mut String) {
        match self {
            CalcExpr::Number { value, unit } => {
                out.push_str(&format_number(*value));
                if let Some(unit) = unit {
                    out.push_str(unit);
                }
            }
            CalcExpr::VariableRef { name } => {
                out.push('$');
                out.push_str(name);
            }
            CalcExpr::Negate { operand } => {
                out.push('-');
                if operand.precedence() < 3 {
                    out.push('(');
                    operand.render_into(out);
                    out.push(')');
                } else {
                    operand.render_into(out);
                }
            }
            CalcExpr::Binary { op, left, right } => {
                if left.precedence() < op.precedence() {
                    out.push('(');
                    left.render_into(out);
                    out.push(')');
                } else {
                    left.render_into(out);
                }
                out.push(' ');
                out.push(op.token());
                out.push(' ');
                // subtraction and division are not associative
                let needs_parens = right.precedence() < op.precedence()
                    || (right.precedence() == op.precedence()
                        && matches!(op, CalcOp::Subtract | CalcOp::Divide));
                if needs_parens {
                    out.push('(');
                    right.render_into(out);
                    out.push(')');
                } else {
                    right.render_into(out);
                }
            }
        }
    }
}

impl fmt::Display for CalcExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render_into(&mut out);
        f.write_str(&out)
    }
}

/// Boolean operators over conditional gates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOp {
    And,
    Or,
    Xor,
}

impl BoolOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            BoolOp::And => "and",
            BoolOp::Or => "or",
            BoolOp::Xor => "xor",
        }
    }

    pub fn precedence(&self) -> u8 {
        match self {
            BoolOp::And => 2,
            BoolOp::Or | BoolOp::Xor => 1,
        }
    }
}

/// Three-valued boolean expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BooleanExpr {
    Const { value: bool },
    Not { operand: Box<BooleanExpr> },
    Binary {
        op: BoolOp,
        left: Box<BooleanExpr>,
        right: Box<BooleanExpr>,
    },
    Term { term: Term },
}

impl BooleanExpr {
    pub fn constant(value: bool) -> Self {
        BooleanExpr::Const { value }
    }

    pub fn not(operand: BooleanExpr) -> Self {
        BooleanExpr::Not {
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BoolOp, left: BooleanExpr, right: BooleanExpr) -> Self {
        BooleanExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: BooleanExpr, right: BooleanExpr) -> Self {
        Self::binary(BoolOp::And, left, right)
    }

    /// Serialization precedence: atoms 4, not 3, and 2, or/xor 1.
    pub fn precedence(&self) -> u8 {
        match self {
            BooleanExpr::Const { .. } | BooleanExpr::Term { .. } => 4,
            BooleanExpr::Not { .. } => 3,
            BooleanExpr::Binary { op, .. } => op.precedence(),
        }
    }
}

impl fmt::Display for BooleanExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BooleanExpr::Const { value } => {
                f.write_str(if *value { "true" } else { "false" })
            }
            BooleanExpr::Not { operand } => {
                f.write_str("not ")?;
                if operand.precedence() < 3 {
                    write!(f, "({})", operand)
                } else {
                    write!(f, "{}", operand)
                }
            }
            BooleanExpr::Binary { op, left, right } => {
                // left parenthesized on strictly-lower precedence, right on
                // lower-or-equal: keeps equal-precedence chains reading
                // left to right
                if left.precedence() < op.precedence() {
                    write!(f, "({})", left)?;
                } else {
                    write!(f, "{}", left)?;
                }
                write!(f, " {} ", op.keyword())?;
                if right.precedence() <= op.precedence() {
                    write!(f, "({})", right)
                } else {
                    write!(f, "{}", right)
                }
            }
            BooleanExpr::Term { term } => write!(f, "{}", term),
        }
    }
}

/// The relationship token joining two selector parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Combinator {
    /// Compound: no separating token (`div.foo`)
    None,
    #[default]
    Descendant,
    ChildOf,
    AdjacentSibling,
    GeneralSibling,
}

impl Combinator {
    /// The single-character token, if the combinator prints one
    pub fn token(&self) -> Option<char> {
        match self {
            Combinator::None | Combinator::Descendant => None,
            Combinator::ChildOf => Some('>'),
            Combinator::AdjacentSibling => Some('+'),
            Combinator::GeneralSibling => Some('~'),
        }
    }
}

/// One qualifier (element/id/class/pseudo-class/attribute) plus an optional
/// linked child qualifier forming a compound chain, and the combinator
/// joining this selector to the previous one in its sequence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimpleSelector {
    pub combinator: Combinator,
    pub element: Option<String>,
    pub id: Option<String>,
    pub class: Option<String>,
    pub pseudo: Option<String>,
    pub attribute: Option<String>,
    pub child: Option<Box<SimpleSelector>>,
}

impl SimpleSelector {
    pub fn element(name: impl Into<String>) -> Self {
        Self {
            element: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self {
            class: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn id(name: impl Into<String>) -> Self {
        Self {
            id: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_combinator(mut self, combinator: Combinator) -> Self {
        self.combinator = combinator;
        self
    }

    /// The deepest link of the compound chain
    pub fn last_link_mut(&mut self) -> &mut SimpleSelector {
        // recursion via loop keeps the borrow checker happy
        let mut current = self;
        loop {
            if current.child.is_none() {
                return current;
            }
            current = current.child.as_mut().unwrap();
        }
    }

    pub fn render_into(&self, out: &mut String) {
        if let Some(element) = &self.element {
            out.push_str(element);
        }
        if let Some(id) = &self.id {
            out.push('#');
            out.push_str(id);
        }
        if let Some(class) = &self.class {
            out.push('.');
            out.push_str(class);
        }
        if let Some(pseudo) = &self.pseudo {
            out.push(':');
            out.push_str(pseudo);
        }
        if let Some(attribute) = &self.attribute {
            out.push('[');
            out.push_str(attribute);
            out.push(']');
        }
        if let Some(child) = &self.child {
            child.render_into(out);
        }
    }
}

impl fmt::Display for SimpleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render_into(&mut out);
        f.write_str(&out)
    }
}

/// Either a flat simple-selector sequence, or a composite that flattens
/// lazily (see the evaluator's selector algebra).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Selector {
    Simple { parts: Vec<SimpleSelector> },
    Composite {
        parent: Box<Selector>,
        combinator: Combinator,
        child: Box<Selector>,
    },
}

impl Selector {
    pub fn simple(parts: Vec<SimpleSelector>) -> Self {
        Selector::Simple { parts }
    }

    pub fn composite(parent: Selector, combinator: Combinator, child: Selector) -> Self {
        Selector::Composite {
            parent: Box::new(parent),
            combinator,
            child: Box::new(child),
        }
    }

    pub fn render(&self, compact: bool) -> String {
        let mut out = String::new();
        self.render_into(&mut out, compact);
        out
    }

    pub fn render_into(&self, out: &mut String, compact: bool) {
        match self {
            Selector::Simple { parts } => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        push_combinator(part.combinator, out, compact);
                    }
                    part.render_into(out);
                }
            }
            Selector::Composite {
                parent,
                combinator,
                child,
            } => {
                parent.render_into(out, compact);
                push_combinator(*combinator, out, compact);
                child.render_into(out, compact);
            }
        }
    }
}

fn push_combinator(combinator: Combinator, out: &mut String, compact: bool) {
    match combinator.token() {
        Some(token) => {
            if compact {
                out.push(token);
            } else {
                out.push(' ');
                out.push(token);
                out.push(' ');
            }
        }
        None => {
            if combinator == Combinator::Descendant {
                out.push(' ');
            }
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(name: &str, value: f64, important: bool) -> Declaration {
        let mut d = Declaration::new(name, Expression::single(Term::number(value, None)));
        d.important = important;
        d
    }

    #[test]
    fn test_important_wins_over_later_plain() {
        let list: DeclarationList =
            vec![decl("A", 1.0, false), decl("A", 2.0, true), decl("A", 3.0, false)]
                .into_iter()
                .collect();
        let found = list.get("A").unwrap();
        assert!(found.important);
        assert_eq!(found.value.render(false), "2");
    }

    #[test]
    fn test_last_plain_wins_without_important() {
        let list: DeclarationList = vec![decl("A", 1.0, false), decl("A", 2.0, false)]
            .into_iter()
            .collect();
        assert_eq!(list.get("A").unwrap().value.render(false), "2");
        assert!(list.get("B").is_none());
    }

    #[test]
    fn test_compound_and_child_selector_rendering() {
        let mut div = SimpleSelector::element("div");
        div.child = Some(Box::new(SimpleSelector::class("foo")));
        assert_eq!(div.to_string(), "div.foo");

        let sel = Selector::simple(vec![
            SimpleSelector::element("div"),
            SimpleSelector::class("foo").with_combinator(Combinator::ChildOf),
        ]);
        assert_eq!(sel.render(false), "div > .foo");
        assert_eq!(sel.render(true), "div>.foo");
    }

    #[test]
    fn test_boolean_precedence_printing() {
        // (a or b) and c: left operand must keep its parentheses
        let a = BooleanExpr::Term {
            term: Term::literal("a"),
        };
        let b = BooleanExpr::Term {
            term: Term::literal("b"),
        };
        let c = BooleanExpr::Term {
            term: Term::literal("c"),
        };
        let expr = BooleanExpr::binary(
            BoolOp::And,
            BooleanExpr::binary(BoolOp::Or, a.clone(), b.clone()),
            c.clone(),
        );
        assert_eq!(expr.to_string(), "(a or b) and c");

        // a or (b or c): equal precedence on the right is parenthesized,
        // a or b on the left is not
        let expr = BooleanExpr::binary(
            BoolOp::Or,
            BooleanExpr::binary(BoolOp::Or, a.clone(), b.clone()),
            c.clone(),
        );
        assert_eq!(expr.to_string(), "a or b or c");
        let expr = BooleanExpr::binary(
            BoolOp::Or,
            a,
            BooleanExpr::binary(BoolOp::Or, b, c),
        );
        assert_eq!(expr.to_string(), "a or (b or c)");
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-3.25), "-3.25");
        assert_eq!(Term::number(8.0, Some("px")).render(), "8px");
    }

    #[test]
    fn test_expression_separators() {
        let expr = Expression::new(vec![
            Term::number(8.0, Some("px")),
            Term::number(16.0, Some("px")),
            Term::literal("serif").with_sep(Sep::Comma),
        ]);
        assert_eq!(expr.render(false), "8px 16px, serif");
        assert_eq!(expr.render(true), "8px 16px,serif");
    }

    #[test]
    fn test_function_argument_separators() {
        let expr = Expression::single(Term::new(TermKind::Function {
            name: "clamp".to_string(),
            args: vec![
                CallArg::positional(Expression::single(Term::number(1.0, Some("rem")))),
                CallArg::positional(Expression::single(Term::number(2.0, Some("vw")))),
                CallArg::positional(Expression::single(Term::number(3.0, Some("rem")))),
            ],
        }));
        assert_eq!(expr.render(false), "clamp(1rem, 2vw, 3rem)");
        assert_eq!(expr.render(true), "clamp(1rem,2vw,3rem)");
    }

    #[test]
    fn test_calc_rendering_parenthesizes_by_precedence() {
        let expr = CalcExpr::Binary {
            op: CalcOp::Multiply,
            left: Box::new(CalcExpr::Binary {
                op: CalcOp::Add,
                left: Box::new(CalcExpr::Number {
                    value: 1.0,
                    unit: Some("px".to_string()),
                }),
                right: Box::new(CalcExpr::Number {
                    value: 2.0,
                    unit: Some("px".to_string()),
                }),
            }),
            right: Box::new(CalcExpr::Number {
                value: 3.0,
                unit: None,
            }),
        };
        assert_eq!(expr.to_string(), "(1px + 2px) * 3");
    }
}
