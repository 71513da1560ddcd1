pub mod ast;
pub mod error;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

pub use error::{ParseError, ParseResult};
pub use parser::{parse, Parser};
pub use serializer::{serialize, Format, Serializer};
pub use tokenizer::{tokenize, Token};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_reserialize() {
        let doc = parse("p { color: red; }").unwrap();
        assert_eq!(
            serialize(&doc, Format::Normal),
            "p {\n  color: red;\n}\n"
        );
    }
}
