use logos::Logos;

/// Tokens of the CSS-superset grammar.
///
/// Whitespace and comments are skipped; the parser recovers significant
/// whitespace (descendant combinators, dimension adjacency) from the gap
/// between consecutive token spans.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"/\*(?:[^*]|\*+[^*/])*\*+/")]
pub enum Token<'src> {
    #[regex(r"@[a-zA-Z][a-zA-Z-]*", |lex| &lex.slice()[1..])]
    AtKeyword(&'src str),

    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_-]*", |lex| &lex.slice()[1..])]
    Variable(&'src str),

    #[regex(r"url\([^)]*\)", |lex| {
        let s = lex.slice();
        &s[4..s.len() - 1]
    })]
    Url(&'src str),

    // a dimension is a number immediately followed by a unit or '%'
    #[regex(r"(?:[0-9]+\.[0-9]+|[0-9]+|\.[0-9]+)(?:[a-zA-Z]+|%)", |lex| lex.slice(), priority = 4)]
    Dimension(&'src str),

    #[regex(r"(?:[0-9]+\.[0-9]+|[0-9]+|\.[0-9]+)", |lex| lex.slice().parse::<f64>().ok(), priority = 3)]
    Number(f64),

    #[regex(r"-?[a-zA-Z_][a-zA-Z0-9_-]*", |lex| lex.slice(), priority = 2)]
    Ident(&'src str),

    #[regex(r##""(?:[^"\\]|\\.)*""##, |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    #[regex(r"'(?:[^'\\]|\\.)*'", |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    String(&'src str),

    #[regex(r"#[a-zA-Z0-9_-]+", |lex| lex.slice())]
    Hash(&'src str),

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(":")]
    Colon,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token(">")]
    Greater,

    #[token("+")]
    Plus,

    #[token("~")]
    Tilde,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("-")]
    Minus,

    #[token("&")]
    Amp,

    #[token("=")]
    Equals,

    #[token("!")]
    Bang,
}

/// Tokenize source into (token, byte-range) pairs. Unlexable input is
/// surfaced as an error by returning the offending offset.
pub fn tokenize(source: &str) -> Result<Vec<(Token<'_>, std::ops::Range<usize>)>, usize> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);
    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(_) => return Err(lexer.span().start),
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_declaration() {
        let tokens = tokenize("color: #ff0000;").unwrap();
        let kinds: Vec<_> = tokens.into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            kinds,
            vec![
                Token::Ident("color"),
                Token::Colon,
                Token::Hash("#ff0000"),
                Token::Semicolon
            ]
        );
    }

    #[test]
    fn test_dimension_vs_number() {
        let tokens = tokenize("8px 1.5 50%").unwrap();
        let kinds: Vec<_> = tokens.into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            kinds,
            vec![
                Token::Dimension("8px"),
                Token::Number(1.5),
                Token::Dimension("50%")
            ]
        );
    }

    #[test]
    fn test_variables_and_at_keywords() {
        let tokens = tokenize("@define { $x: 1; }").unwrap();
        assert_eq!(tokens[0].0, Token::AtKeyword("define"));
        assert_eq!(tokens[2].0, Token::Variable("x"));
    }

    #[test]
    fn test_comments_and_whitespace_skipped() {
        let tokens = tokenize("a /* comment */ b").unwrap();
        assert_eq!(tokens.len(), 2);
        // the gap between spans is what the parser reads as a descendant
        // combinator
        assert!(tokens[0].1.end < tokens[1].1.start);
    }

    #[test]
    fn test_url_and_strings() {
        let tokens = tokenize(r#"url(img/x.png) "hello" 'world'"#).unwrap();
        let kinds: Vec<_> = tokens.into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            kinds,
            vec![
                Token::Url("img/x.png"),
                Token::String("hello"),
                Token::String("world")
            ]
        );
    }

    #[test]
    fn test_selector_punctuation() {
        let tokens = tokenize("div.foo > #bar").unwrap();
        let kinds: Vec<_> = tokens.into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            kinds,
            vec![
                Token::Ident("div"),
                Token::Dot,
                Token::Ident("foo"),
                Token::Greater,
                Token::Hash("#bar"),
            ]
        );
    }
}
