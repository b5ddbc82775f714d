//! Front end: spans, lexemes, the indentation-sensitive lexer and the parser.

pub mod lexeme;
pub mod lexer;
pub mod parser;
pub mod span;
