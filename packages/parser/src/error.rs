use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone)]
pub enum ParseError {
    #[error("Unexpected token at {line}:{col}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        col: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of file")]
    UnexpectedEof,

    #[error("Unrecognized input at {line}:{col}")]
    LexerError { line: usize, col: usize },
}

impl ParseError {
    pub fn unexpected_token(
        line: usize,
        col: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::UnexpectedToken {
            line,
            col,
            expected: expected.into(),
            found: found.into(),
        }
    }
}
