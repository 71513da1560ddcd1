use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize, Token};
use std::ops::Range;

/// Parser for the CSS-superset grammar
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
    line_starts: Vec<usize>,
}

/// Parse a complete document
pub fn parse(source: &str) -> ParseResult<Document> {
    Parser::new(source)?.parse_document()
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        let tokens = tokenize(source).map_err(|offset| {
            let (line, col) = line_col_of(&line_starts, offset);
            ParseError::LexerError { line, col }
        })?;
        Ok(Self {
            source,
            tokens,
            pos: 0,
            line_starts,
        })
    }

    pub fn parse_document(&mut self) -> ParseResult<Document> {
        let mut doc = Document::new();
        while !self.is_at_end() {
            doc.rules.push(self.parse_rule()?);
        }
        Ok(doc)
    }

    // ---- cursor helpers ----

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token<'src>> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    fn peek_range(&self) -> Option<&Range<usize>> {
        self.tokens.get(self.pos).map(|(_, r)| r)
    }

    fn advance(&mut self) -> ParseResult<(Token<'src>, Range<usize>)> {
        let entry = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ParseError::UnexpectedEof)?;
        self.pos += 1;
        Ok(entry)
    }

    /// True if whitespace (or a comment) separates the current token from
    /// the previous one.
    fn gap_before_current(&self) -> bool {
        if self.pos == 0 {
            return true;
        }
        match (self.tokens.get(self.pos - 1), self.tokens.get(self.pos)) {
            (Some((_, prev)), Some((_, next))) => prev.end < next.start,
            _ => true,
        }
    }

    fn line_col(&self, offset: usize) -> (usize, usize) {
        line_col_of(&self.line_starts, offset)
    }

    fn span_of(&self, range: &Range<usize>) -> Span {
        let (line, col) = self.line_col(range.start);
        Span::new(range.start, range.end, line, col)
    }

    fn current_span(&self) -> Span {
        match self.peek_range() {
            Some(range) => self.span_of(&range.clone()),
            None => {
                let (line, col) = self.line_col(self.source.len());
                Span::new(self.source.len(), self.source.len(), line, col)
            }
        }
    }

    fn error_here(&self, expected: &str) -> ParseError {
        let span = self.current_span();
        let found = match self.peek() {
            Some(token) => format!("{:?}", token),
            None => "end of file".to_string(),
        };
        ParseError::unexpected_token(span.line, span.col, expected, found)
    }

    fn expect(&mut self, token: Token<'src>, expected: &str) -> ParseResult<Range<usize>> {
        match self.peek() {
            Some(t) if *t == token => Ok(self.advance()?.1),
            _ => Err(self.error_here(expected)),
        }
    }

    fn expect_ident(&mut self, expected: &str) -> ParseResult<(&'src str, Range<usize>)> {
        match self.peek() {
            Some(Token::Ident(_)) => {
                let (token, range) = self.advance()?;
                match token {
                    Token::Ident(name) => Ok((name, range)),
                    _ => unreachable!(),
                }
            }
            _ => Err(self.error_here(expected)),
        }
    }

    fn eat(&mut self, token: Token<'src>) -> bool {
        if self.peek() == Some(&token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    // ---- rules ----

    fn parse_rule(&mut self) -> ParseResult<Rule> {
        match self.peek() {
            Some(Token::AtKeyword(keyword)) => match *keyword {
                "define" => Ok(Rule::Define(self.parse_define()?)),
                "class" => Ok(Rule::Class(self.parse_class()?)),
                "media" => Ok(Rule::Media(self.parse_media()?)),
                "include" => Ok(Rule::Include(self.parse_include()?)),
                "if" => Ok(Rule::If(self.parse_if_rule()?)),
                "charset" => Ok(Rule::Charset(self.parse_charset()?)),
                _ => Ok(Rule::Generic(self.parse_generic()?)),
            },
            Some(_) => Ok(Rule::RuleSet(self.parse_rule_set()?)),
            None => Err(ParseError::UnexpectedEof),
        }
    }

    fn parse_define(&mut self) -> ParseResult<DefineDirective> {
        let range = self.expect(Token::AtKeyword("define"), "@define")?;
        let span = self.span_of(&range);
        let global = match self.peek() {
            Some(Token::Ident("global")) => {
                self.advance()?;
                true
            }
            _ => false,
        };
        self.expect(Token::LBrace, "'{'")?;
        let mut declarations = DeclarationList::new();
        while self.peek() != Some(&Token::RBrace) {
            declarations.push(self.parse_declaration()?);
        }
        self.expect(Token::RBrace, "'}'")?;
        Ok(DefineDirective {
            global,
            declarations,
            span,
        })
    }

    fn parse_class(&mut self) -> ParseResult<ClassDirective> {
        let range = self.expect(Token::AtKeyword("class"), "@class")?;
        let span = self.span_of(&range);
        let (name, _) = self.expect_ident("class name")?;
        let mut parameters = DeclarationList::new();
        if self.eat(Token::LParen) {
            while self.peek() != Some(&Token::RParen) {
                let (param, param_range) = self.expect_ident("parameter name")?;
                let default = if self.eat(Token::Colon) {
                    self.parse_expression(true)?
                } else {
                    Expression::default()
                };
                let mut declaration = Declaration::new(param, default);
                declaration.span = self.span_of(&param_range);
                parameters.push(declaration);
                if !self.eat(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RParen, "')'")?;
        }
        let block = self.parse_block()?;
        Ok(ClassDirective {
            name: name.to_string(),
            parameters,
            block,
            span,
        })
    }

    fn parse_media(&mut self) -> ParseResult<MediaDirective> {
        let range = self.expect(Token::AtKeyword("media"), "@media")?;
        let span = self.span_of(&range);
        // the query is kept as raw text up to the opening brace
        let query_start = self
            .peek_range()
            .ok_or(ParseError::UnexpectedEof)?
            .start;
        let mut query_end = query_start;
        while !self.is_at_end() && self.peek() != Some(&Token::LBrace) {
            query_end = self.advance()?.1.end;
        }
        let query = self.source[query_start..query_end].trim().to_string();
        self.expect(Token::LBrace, "'{'")?;
        let mut rules = Vec::new();
        while self.peek() != Some(&Token::RBrace) {
            if self.is_at_end() {
                return Err(ParseError::UnexpectedEof);
            }
            rules.push(self.parse_rule()?);
        }
        self.expect(Token::RBrace, "'}'")?;
        Ok(MediaDirective { query, rules, span })
    }

    fn parse_include(&mut self) -> ParseResult<IncludeDirective> {
        let range = self.expect(Token::AtKeyword("include"), "@include")?;
        let span = self.span_of(&range);
        let path = match self.peek() {
            Some(Token::String(_)) => match self.advance()?.0 {
                Token::String(path) => unescape(path),
                _ => unreachable!(),
            },
            Some(Token::Url(_)) => match self.advance()?.0 {
                Token::Url(path) => path.trim_matches(|c| c == '"' || c == '\'').to_string(),
                _ => unreachable!(),
            },
            _ => return Err(self.error_here("include path string")),
        };
        self.eat(Token::Semicolon);
        Ok(IncludeDirective { path, span })
    }

    fn parse_charset(&mut self) -> ParseResult<CharsetDirective> {
        let range = self.expect(Token::AtKeyword("charset"), "@charset")?;
        let span = self.span_of(&range);
        let charset = match self.advance()? {
            (Token::String(charset), _) => unescape(charset),
            _ => return Err(self.error_here("charset string")),
        };
        self.eat(Token::Semicolon);
        Ok(CharsetDirective { charset, span })
    }

    fn parse_if_rule(&mut self) -> ParseResult<IfDirective> {
        let range = self.expect(Token::AtKeyword("if"), "@if")?;
        let span = self.span_of(&range);
        let condition = self.parse_condition()?;
        self.expect(Token::LBrace, "'{'")?;
        let mut then_rules = Vec::new();
        while self.peek() != Some(&Token::RBrace) {
            if self.is_at_end() {
                return Err(ParseError::UnexpectedEof);
            }
            then_rules.push(self.parse_rule()?);
        }
        self.expect(Token::RBrace, "'}'")?;

        let mut else_rules = Vec::new();
        if self.peek() == Some(&Token::AtKeyword("else")) {
            self.advance()?;
            if self.peek() == Some(&Token::AtKeyword("if")) {
                else_rules.push(Rule::If(self.parse_if_rule()?));
            } else {
                self.expect(Token::LBrace, "'{'")?;
                while self.peek() != Some(&Token::RBrace) {
                    if self.is_at_end() {
                        return Err(ParseError::UnexpectedEof);
                    }
                    else_rules.push(self.parse_rule()?);
                }
                self.expect(Token::RBrace, "'}'")?;
            }
        }
        Ok(IfDirective {
            condition,
            then_rules,
            else_rules,
            span,
        })
    }

    /// Unknown at-directives are preserved verbatim: either through their
    /// balanced block, or through the terminating semicolon.
    fn parse_generic(&mut self) -> ParseResult<GenericDirective> {
        let (_, range) = self.advance()?;
        let span = self.span_of(&range);
        let start = range.start;
        let mut end = range.end;
        let mut depth = 0usize;
        while let Some(token) = self.peek().cloned() {
            match token {
                Token::LBrace => depth += 1,
                Token::RBrace => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    if depth == 0 {
                        end = self.advance()?.1.end;
                        break;
                    }
                }
                Token::Semicolon if depth == 0 => {
                    self.advance()?;
                    break;
                }
                _ => {}
            }
            end = self.advance()?.1.end;
        }
        Ok(GenericDirective {
            text: self.source[start..end].trim().to_string(),
            span,
        })
    }

    fn parse_rule_set(&mut self) -> ParseResult<RuleSet> {
        let span = self.current_span();
        let selectors = self.parse_selector_list()?;
        let block = self.parse_block()?;
        Ok(RuleSet {
            selectors,
            block,
            span,
        })
    }

    // ---- selectors ----

    fn parse_selector_list(&mut self) -> ParseResult<Vec<Selector>> {
        let mut selectors = vec![self.parse_selector()?];
        while self.eat(Token::Comma) {
            selectors.push(self.parse_selector()?);
        }
        Ok(selectors)
    }

    fn parse_selector(&mut self) -> ParseResult<Selector> {
        let mut parts = Vec::new();
        loop {
            let combinator = if parts.is_empty() {
                Combinator::Descendant
            } else {
                match self.peek() {
                    Some(Token::Greater) => {
                        self.advance()?;
                        Combinator::ChildOf
                    }
                    Some(Token::Plus) => {
                        self.advance()?;
                        Combinator::AdjacentSibling
                    }
                    Some(Token::Tilde) => {
                        self.advance()?;
                        Combinator::GeneralSibling
                    }
                    _ => Combinator::Descendant,
                }
            };
            match self.peek() {
                Some(Token::LBrace) | Some(Token::Comma) | None => break,
                _ => {}
            }
            let simple = self.parse_simple_selector()?;
            parts.push(simple.with_combinator(combinator));
            match self.peek() {
                Some(Token::LBrace) | Some(Token::Comma) | Some(Token::RBrace) | None => break,
                _ => {}
            }
        }
        if parts.is_empty() {
            return Err(self.error_here("selector"));
        }
        Ok(Selector::simple(parts))
    }

    /// One compound chunk: an optional element qualifier plus a contiguous
    /// chain of class/id/pseudo/attribute qualifiers linked as children.
    fn parse_simple_selector(&mut self) -> ParseResult<SimpleSelector> {
        let mut root: Option<SimpleSelector> = None;
        let mut first = true;

        loop {
            if !first && self.gap_before_current() {
                break;
            }
            let qualifier = match self.peek() {
                Some(Token::Ident(_)) if first => {
                    let (token, _) = self.advance()?;
                    match token {
                        Token::Ident(name) => SimpleSelector::element(name),
                        _ => unreachable!(),
                    }
                }
                Some(Token::Star) if first => {
                    self.advance()?;
                    SimpleSelector::element("*")
                }
                Some(Token::Dot) => {
                    self.advance()?;
                    let (name, _) = self.expect_ident("class name")?;
                    SimpleSelector::class(name)
                }
                Some(Token::Hash(_)) => {
                    let (token, _) = self.advance()?;
                    match token {
                        Token::Hash(text) => SimpleSelector::id(&text[1..]),
                        _ => unreachable!(),
                    }
                }
                Some(Token::Colon) => {
                    self.advance()?;
                    let mut pseudo = String::new();
                    if self.eat(Token::Colon) {
                        pseudo.push(':');
                    }
                    let (name, _) = self.expect_ident("pseudo-class name")?;
                    pseudo.push_str(name);
                    // functional pseudo-class: keep raw argument text
                    if self.peek() == Some(&Token::LParen) && !self.gap_before_current() {
                        let open = self.advance()?.1;
                        let mut end = open.end;
                        let mut depth = 1usize;
                        while depth > 0 {
                            let (token, range) = self.advance()?;
                            match token {
                                Token::LParen => depth += 1,
                                Token::RParen => depth -= 1,
                                _ => {}
                            }
                            end = range.end;
                        }
                        pseudo.push_str(&self.source[open.start..end]);
                    }
                    SimpleSelector {
                        pseudo: Some(pseudo),
                        ..SimpleSelector::default()
                    }
                }
                Some(Token::LBracket) => {
                    let open = self.advance()?.1;
                    let mut end = open.end;
                    loop {
                        let (token, range) = self.advance()?;
                        if token == Token::RBracket {
                            break;
                        }
                        end = range.end;
                    }
                    SimpleSelector {
                        attribute: Some(self.source[open.end..end].to_string()),
                        ..SimpleSelector::default()
                    }
                }
                _ => break,
            };
            match root.as_mut() {
                None => root = Some(qualifier),
                Some(existing) => {
                    existing.last_link_mut().child = Some(Box::new(qualifier));
                }
            }
            first = false;
        }

        root.ok_or_else(|| self.error_here("selector qualifier"))
    }

    // ---- declaration blocks ----

    fn parse_block(&mut self) -> ParseResult<DeclarationBlock> {
        self.expect(Token::LBrace, "'{'")?;
        let mut block = DeclarationBlock::new();
        loop {
            match self.peek() {
                Some(Token::RBrace) => {
                    self.advance()?;
                    return Ok(block);
                }
                Some(Token::Semicolon) => {
                    self.advance()?;
                }
                Some(Token::AtKeyword(keyword)) => match *keyword {
                    "define" => block.rules.push(Rule::Define(self.parse_define()?)),
                    "include" => block.rules.push(Rule::Include(self.parse_include()?)),
                    "if" => self.parse_block_if(&mut block)?,
                    _ => block.rules.push(Rule::Generic(self.parse_generic()?)),
                },
                Some(Token::Amp) | Some(Token::Greater) | Some(Token::Plus)
                | Some(Token::Tilde) => {
                    block.nested_rule_sets.push(self.parse_nested_rule_set()?);
                }
                Some(_) => {
                    if self.looking_at_nested_rule_set() {
                        block.nested_rule_sets.push(self.parse_nested_rule_set()?);
                    } else {
                        block.declarations.push(self.parse_declaration()?);
                    }
                }
                None => return Err(ParseError::UnexpectedEof),
            }
        }
    }

    /// Disambiguate `name: value;` from `a:hover { … }` by scanning ahead
    /// for whichever of `{`, `;`, `}` comes first.
    fn looking_at_nested_rule_set(&self) -> bool {
        let mut offset = 0;
        loop {
            match self.peek_at(offset) {
                Some(Token::LBrace) => return true,
                Some(Token::Semicolon) | Some(Token::RBrace) | None => return false,
                _ => offset += 1,
            }
        }
    }

    fn parse_nested_rule_set(&mut self) -> ParseResult<NestedRuleSet> {
        let span = self.current_span();
        let (combinator, first) = self.parse_nested_selector()?;
        let mut selectors = vec![first];
        while self.eat(Token::Comma) {
            // later selectors may repeat the marker; it is consumed and
            // the rule set keeps the combinator of the first
            let (_, selector) = self.parse_nested_selector()?;
            selectors.push(selector);
        }
        let block = self.parse_block()?;
        Ok(NestedRuleSet {
            combinator,
            rule_set: RuleSet {
                selectors,
                block,
                span,
            },
            condition: None,
        })
    }

    fn parse_nested_selector(&mut self) -> ParseResult<(Combinator, Selector)> {
        let combinator = match self.peek() {
            Some(Token::Amp) => {
                self.advance()?;
                Combinator::None
            }
            Some(Token::Greater) => {
                self.advance()?;
                Combinator::ChildOf
            }
            Some(Token::Plus) => {
                self.advance()?;
                Combinator::AdjacentSibling
            }
            Some(Token::Tilde) => {
                self.advance()?;
                Combinator::GeneralSibling
            }
            _ => Combinator::Descendant,
        };
        let selector = self.parse_selector()?;
        Ok((combinator, selector))
    }

    /// `@if (cond) { … } [@else …]` inside a block: lower the branches by
    /// attaching the condition to every contained declaration and nested
    /// rule set.
    fn parse_block_if(&mut self, outer: &mut DeclarationBlock) -> ParseResult<()> {
        self.expect(Token::AtKeyword("if"), "@if")?;
        let condition = self.parse_condition()?;
        let inner = self.parse_block()?;
        lower_gated_block(inner, outer, &condition);

        if self.peek() == Some(&Token::AtKeyword("else")) {
            self.advance()?;
            let negated = BooleanExpr::not(condition);
            if self.peek() == Some(&Token::AtKeyword("if")) {
                let mut chained = DeclarationBlock::new();
                self.parse_block_if(&mut chained)?;
                lower_gated_block(chained, outer, &negated);
            } else {
                let inner = self.parse_block()?;
                lower_gated_block(inner, outer, &negated);
            }
        }
        Ok(())
    }

    fn parse_declaration(&mut self) -> ParseResult<Declaration> {
        let (name, range) = self.expect_ident("property name")?;
        let span = self.span_of(&range);
        self.expect(Token::Colon, "':'")?;
        let value = self.parse_expression(false)?;
        let mut important = false;
        if self.eat(Token::Bang) {
            match self.peek() {
                Some(Token::Ident("important")) => {
                    self.advance()?;
                    important = true;
                }
                _ => return Err(self.error_here("'important'")),
            }
        }
        self.eat(Token::Semicolon);
        Ok(Declaration {
            name: name.to_string(),
            value,
            important,
            condition: None,
            span,
        })
    }

    // ---- expressions & terms ----

    fn parse_expression(&mut self, in_args: bool) -> ParseResult<Expression> {
        let mut terms = Vec::new();
        let mut sep = Sep::Space;
        loop {
            match self.peek() {
                Some(Token::Semicolon) | Some(Token::RBrace) | Some(Token::Bang)
                | Some(Token::RParen) | None => break,
                Some(Token::Comma) => {
                    if in_args {
                        break;
                    }
                    self.advance()?;
                    sep = Sep::Comma;
                }
                Some(Token::Slash) => {
                    self.advance()?;
                    sep = Sep::Slash;
                }
                _ => {
                    let mut term = self.parse_term()?;
                    term.sep = sep;
                    sep = Sep::Space;
                    terms.push(term);
                }
            }
        }
        Ok(Expression::new(terms))
    }

    fn parse_term(&mut self) -> ParseResult<Term> {
        let span = self.current_span();
        let kind = match self.peek() {
            Some(Token::Number(_)) => {
                let value = match self.advance()?.0 {
                    Token::Number(value) => value,
                    _ => unreachable!(),
                };
                TermKind::Number { value, unit: None }
            }
            Some(Token::Dimension(_)) => {
                let text = match self.advance()?.0 {
                    Token::Dimension(text) => text,
                    _ => unreachable!(),
                };
                let (value, unit) = split_dimension(text);
                TermKind::Number {
                    value,
                    unit: Some(unit),
                }
            }
            Some(Token::Minus) => {
                self.advance()?;
                match self.peek() {
                    Some(Token::Number(_)) if !self.gap_before_current() => {
                        let value = match self.advance()?.0 {
                            Token::Number(value) => value,
                            _ => unreachable!(),
                        };
                        TermKind::Number {
                            value: -value,
                            unit: None,
                        }
                    }
                    Some(Token::Dimension(_)) if !self.gap_before_current() => {
                        let text = match self.advance()?.0 {
                            Token::Dimension(text) => text,
                            _ => unreachable!(),
                        };
                        let (value, unit) = split_dimension(text);
                        TermKind::Number {
                            value: -value,
                            unit: Some(unit),
                        }
                    }
                    _ => return Err(self.error_here("number after '-'")),
                }
            }
            Some(Token::String(_)) => {
                let text = match self.advance()?.0 {
                    Token::String(text) => unescape(text),
                    _ => unreachable!(),
                };
                TermKind::Literal { text, quoted: true }
            }
            Some(Token::Url(_)) => {
                let url = match self.advance()?.0 {
                    Token::Url(url) => url.to_string(),
                    _ => unreachable!(),
                };
                TermKind::Url { url }
            }
            Some(Token::Hash(_)) => {
                let text = match self.advance()?.0 {
                    Token::Hash(text) => text.to_string(),
                    _ => unreachable!(),
                };
                TermKind::Literal {
                    text,
                    quoted: false,
                }
            }
            Some(Token::Variable(_)) => {
                let name = match self.advance()?.0 {
                    Token::Variable(name) => name.to_string(),
                    _ => unreachable!(),
                };
                TermKind::VariableRef { name }
            }
            Some(Token::Ident("calc")) if self.peek_at(1) == Some(&Token::LParen) => {
                self.advance()?;
                self.advance()?;
                let expr = self.parse_calc_sum()?;
                self.expect(Token::RParen, "')'")?;
                TermKind::Calc { expr }
            }
            Some(Token::Ident(_)) => {
                let name = match self.advance()?.0 {
                    Token::Ident(name) => name.to_string(),
                    _ => unreachable!(),
                };
                if self.peek() == Some(&Token::LParen) && !self.gap_before_current() {
                    self.advance()?;
                    let args = self.parse_call_args()?;
                    TermKind::Function { name, args }
                } else {
                    TermKind::Literal {
                        text: name,
                        quoted: false,
                    }
                }
            }
            _ => return Err(self.error_here("value term")),
        };
        Ok(Term {
            sep: Sep::Space,
            kind,
            span,
        })
    }

    /// Call arguments after the opening paren: positional first, then
    /// `name=value` named arguments. Validity of the ordering is a
    /// semantic question left to the evaluator.
    fn parse_call_args(&mut self) -> ParseResult<Vec<CallArg>> {
        let mut args = Vec::new();
        while self.peek() != Some(&Token::RParen) {
            let name = match (self.peek(), self.peek_at(1)) {
                (Some(Token::Ident(name)), Some(Token::Equals)) => {
                    let name = name.to_string();
                    self.advance()?;
                    self.advance()?;
                    Some(name)
                }
                _ => None,
            };
            let value = self.parse_expression(true)?;
            args.push(CallArg { name, value });
            if !self.eat(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen, "')'")?;
        Ok(args)
    }

    fn parse_calc_sum(&mut self) -> ParseResult<CalcExpr> {
        let mut left = self.parse_calc_product()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => CalcOp::Add,
                Some(Token::Minus) => CalcOp::Subtract,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_calc_product()?;
            left = CalcExpr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_calc_product(&mut self) -> ParseResult<CalcExpr> {
        let mut left = self.parse_calc_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => CalcOp::Multiply,
                Some(Token::Slash) => CalcOp::Divide,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_calc_unary()?;
            left = CalcExpr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_calc_unary(&mut self) -> ParseResult<CalcExpr> {
        if self.eat(Token::Minus) {
            return Ok(CalcExpr::Negate {
                operand: Box::new(self.parse_calc_unary()?),
            });
        }
        match self.peek() {
            Some(Token::Number(_)) => {
                let value = match self.advance()?.0 {
                    Token::Number(value) => value,
                    _ => unreachable!(),
                };
                Ok(CalcExpr::Number { value, unit: None })
            }
            Some(Token::Dimension(_)) => {
                let text = match self.advance()?.0 {
                    Token::Dimension(text) => text,
                    _ => unreachable!(),
                };
                let (value, unit) = split_dimension(text);
                Ok(CalcExpr::Number {
                    value,
                    unit: Some(unit),
                })
            }
            Some(Token::Variable(_)) => {
                let name = match self.advance()?.0 {
                    Token::Variable(name) => name.to_string(),
                    _ => unreachable!(),
                };
                Ok(CalcExpr::VariableRef { name })
            }
            Some(Token::LParen) => {
                self.advance()?;
                let expr = self.parse_calc_sum()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            _ => Err(self.error_here("calc operand")),
        }
    }

    // ---- boolean expressions ----

    fn parse_condition(&mut self) -> ParseResult<BooleanExpr> {
        self.expect(Token::LParen, "'('")?;
        let expr = self.parse_bool_or()?;
        self.expect(Token::RParen, "')'")?;
        Ok(expr)
    }

    fn parse_bool_or(&mut self) -> ParseResult<BooleanExpr> {
        let mut left = self.parse_bool_and()?;
        loop {
            let op = match self.peek() {
                Some(Token::Ident("or")) => BoolOp::Or,
                Some(Token::Ident("xor")) => BoolOp::Xor,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_bool_and()?;
            left = BooleanExpr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_bool_and(&mut self) -> ParseResult<BooleanExpr> {
        let mut left = self.parse_bool_not()?;
        while self.peek() == Some(&Token::Ident("and")) {
            self.advance()?;
            let right = self.parse_bool_not()?;
            left = BooleanExpr::binary(BoolOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_bool_not(&mut self) -> ParseResult<BooleanExpr> {
        if self.peek() == Some(&Token::Ident("not")) {
            self.advance()?;
            return Ok(BooleanExpr::not(self.parse_bool_not()?));
        }
        self.parse_bool_atom()
    }

    fn parse_bool_atom(&mut self) -> ParseResult<BooleanExpr> {
        match self.peek() {
            Some(Token::LParen) => {
                self.advance()?;
                let expr = self.parse_bool_or()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            Some(Token::Ident("true")) => {
                self.advance()?;
                Ok(BooleanExpr::constant(true))
            }
            Some(Token::Ident("false")) => {
                self.advance()?;
                Ok(BooleanExpr::constant(false))
            }
            Some(Token::Ident(_)) => {
                // a bare identifier in boolean position is a
                // class-existence test
                let span = self.current_span();
                let name = match self.advance()?.0 {
                    Token::Ident(name) => name.to_string(),
                    _ => unreachable!(),
                };
                let args = if self.peek() == Some(&Token::LParen) && !self.gap_before_current()
                {
                    self.advance()?;
                    self.parse_call_args()?
                } else {
                    Vec::new()
                };
                Ok(BooleanExpr::Term {
                    term: Term {
                        sep: Sep::Space,
                        kind: TermKind::ClassRef { name, args },
                        span,
                    },
                })
            }
            Some(Token::Variable(_)) | Some(Token::Number(_)) | Some(Token::Dimension(_))
            | Some(Token::String(_)) | Some(Token::Hash(_)) | Some(Token::Minus) => {
                let term = self.parse_term()?;
                Ok(BooleanExpr::Term { term })
            }
            _ => Err(self.error_here("boolean expression")),
        }
    }
}

/// Attach `gate` to every declaration and nested rule set of `block`,
/// splicing the result into `outer`. Existing gates (from nested `@if`)
/// combine with AND. Block-level defines and other nested rules pass
/// through ungated.
fn lower_gated_block(block: DeclarationBlock, outer: &mut DeclarationBlock, gate: &BooleanExpr) {
    for mut declaration in block.declarations.items {
        declaration.condition = Some(match declaration.condition.take() {
            Some(existing) => BooleanExpr::and(gate.clone(), existing),
            None => gate.clone(),
        });
        outer.declarations.push(declaration);
    }
    for mut nested in block.nested_rule_sets {
        nested.condition = Some(match nested.condition.take() {
            Some(existing) => BooleanExpr::and(gate.clone(), existing),
            None => gate.clone(),
        });
        outer.nested_rule_sets.push(nested);
    }
    outer.rules.extend(block.rules);
}

fn split_dimension(text: &str) -> (f64, String) {
    let boundary = text
        .find(|c: char| c.is_ascii_alphabetic() || c == '%')
        .unwrap_or(text.len());
    let value = text[..boundary].parse::<f64>().unwrap_or(0.0);
    (value, text[boundary..].to_string())
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn line_col_of(line_starts: &[usize], offset: usize) -> (usize, usize) {
    let line = match line_starts.binary_search(&offset) {
        Ok(index) => index,
        Err(index) => index - 1,
    };
    (line + 1, offset - line_starts[line] + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_css_rule() {
        let doc = parse("div.foo { color: red; padding: 8px 16px; }").unwrap();
        assert_eq!(doc.rules.len(), 1);
        let rule_set = match &doc.rules[0] {
            Rule::RuleSet(rs) => rs,
            other => panic!("expected rule set, got {:?}", other),
        };
        assert_eq!(rule_set.selectors.len(), 1);
        assert_eq!(rule_set.selectors[0].render(false), "div.foo");
        assert_eq!(rule_set.block.declarations.len(), 2);
        assert_eq!(
            rule_set.block.declarations.items[1].value.render(false),
            "8px 16px"
        );
    }

    #[test]
    fn test_parse_selector_combinators() {
        let doc = parse("ul > li + li ~ em { margin: 0; }").unwrap();
        let rule_set = match &doc.rules[0] {
            Rule::RuleSet(rs) => rs,
            _ => unreachable!(),
        };
        let parts = match &rule_set.selectors[0] {
            Selector::Simple { parts } => parts,
            _ => panic!("expected simple selector"),
        };
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[1].combinator, Combinator::ChildOf);
        assert_eq!(parts[2].combinator, Combinator::AdjacentSibling);
        assert_eq!(parts[3].combinator, Combinator::GeneralSibling);
        assert_eq!(rule_set.selectors[0].render(false), "ul > li + li ~ em");
    }

    #[test]
    fn test_parse_descendant_vs_compound() {
        let doc = parse("div .foo { a: b; } div.foo { a: b; }").unwrap();
        let first = match &doc.rules[0] {
            Rule::RuleSet(rs) => rs.selectors[0].render(false),
            _ => unreachable!(),
        };
        let second = match &doc.rules[1] {
            Rule::RuleSet(rs) => rs.selectors[0].render(false),
            _ => unreachable!(),
        };
        assert_eq!(first, "div .foo");
        assert_eq!(second, "div.foo");
    }

    #[test]
    fn test_parse_class_directive() {
        let doc = parse("@class button(color: red, pad) { background: $color; }").unwrap();
        let class = match &doc.rules[0] {
            Rule::Class(class) => class,
            _ => panic!("expected class"),
        };
        assert_eq!(class.name, "button");
        assert_eq!(class.parameters.len(), 2);
        assert_eq!(class.parameters.items[0].name, "color");
        assert_eq!(class.parameters.items[0].value.render(false), "red");
        assert!(class.parameters.items[1].value.is_empty());
        assert_eq!(class.block.declarations.len(), 1);
    }

    #[test]
    fn test_parse_define_and_variables() {
        let doc = parse("@define global { accent: #ff0000; } p { color: $accent; }").unwrap();
        let define = match &doc.rules[0] {
            Rule::Define(define) => define,
            _ => panic!("expected define"),
        };
        assert!(define.global);
        let rule_set = match &doc.rules[1] {
            Rule::RuleSet(rs) => rs,
            _ => unreachable!(),
        };
        match &rule_set.block.declarations.items[0].value.terms[0].kind {
            TermKind::VariableRef { name } => assert_eq!(name, "accent"),
            other => panic!("expected variable ref, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_nested_rule_sets() {
        let doc = parse("nav { color: red; &:hover { color: blue; } > li { margin: 0; } .deep { a: b; } }")
            .unwrap();
        let rule_set = match &doc.rules[0] {
            Rule::RuleSet(rs) => rs,
            _ => unreachable!(),
        };
        let nested = &rule_set.block.nested_rule_sets;
        assert_eq!(nested.len(), 3);
        assert_eq!(nested[0].combinator, Combinator::None);
        assert_eq!(nested[1].combinator, Combinator::ChildOf);
        assert_eq!(nested[2].combinator, Combinator::Descendant);
    }

    #[test]
    fn test_block_if_lowers_conditions() {
        let doc = parse(
            "@class c { @if ($dark) { color: white; } @else { color: black; } }",
        )
        .unwrap();
        let class = match &doc.rules[0] {
            Rule::Class(class) => class,
            _ => unreachable!(),
        };
        let declarations = &class.block.declarations;
        assert_eq!(declarations.len(), 2);
        assert!(declarations.items[0].condition.is_some());
        let negated = declarations.items[1].condition.as_ref().unwrap();
        assert!(matches!(negated, BooleanExpr::Not { .. }));
    }

    #[test]
    fn test_parse_important() {
        let doc = parse("p { color: red !important; }").unwrap();
        let rule_set = match &doc.rules[0] {
            Rule::RuleSet(rs) => rs,
            _ => unreachable!(),
        };
        assert!(rule_set.block.declarations.items[0].important);
    }

    #[test]
    fn test_parse_calc() {
        let doc = parse("p { width: calc(100% - 2 * $gutter); }").unwrap();
        let rule_set = match &doc.rules[0] {
            Rule::RuleSet(rs) => rs,
            _ => unreachable!(),
        };
        match &rule_set.block.declarations.items[0].value.terms[0].kind {
            TermKind::Calc { expr } => {
                assert_eq!(expr.to_string(), "100% - 2 * $gutter");
            }
            other => panic!("expected calc, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_media_and_charset() {
        let doc = parse("@charset \"utf-8\"; @media screen and (min-width: 600px) { p { a: b; } }")
            .unwrap();
        assert!(matches!(doc.rules[0], Rule::Charset(_)));
        let media = match &doc.rules[1] {
            Rule::Media(media) => media,
            _ => panic!("expected media"),
        };
        assert_eq!(media.query, "screen and (min-width: 600px)");
        assert_eq!(media.rules.len(), 1);
    }

    #[test]
    fn test_parse_extend_with_args() {
        let doc = parse("p { extend: button(blue, pad=2px); }").unwrap();
        let rule_set = match &doc.rules[0] {
            Rule::RuleSet(rs) => rs,
            _ => unreachable!(),
        };
        match &rule_set.block.declarations.items[0].value.terms[0].kind {
            TermKind::Function { name, args } => {
                assert_eq!(name, "button");
                assert_eq!(args.len(), 2);
                assert_eq!(args[0].name, None);
                assert_eq!(args[1].name.as_deref(), Some("pad"));
            }
            other => panic!("expected function term, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_generic_directive_passthrough() {
        let doc = parse("@font-face { font-family: X; src: url(x.woff); }").unwrap();
        let generic = match &doc.rules[0] {
            Rule::Generic(generic) => generic,
            _ => panic!("expected generic"),
        };
        assert!(generic.text.starts_with("@font-face"));
        assert!(generic.text.ends_with('}'));
    }

    #[test]
    fn test_error_positions_are_line_and_col() {
        let err = parse("p {\n  color red;\n}").unwrap_err();
        match err {
            ParseError::UnexpectedToken { line, .. } => assert_eq!(line, 2),
            other => panic!("expected unexpected-token error, got {:?}", other),
        }
    }
}
