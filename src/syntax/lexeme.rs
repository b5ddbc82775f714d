/// All lexemes of the calculator language.
#[derive(Clone, Debug, PartialEq)]
pub enum Lexeme {
    // Keywords
    Fn,
    Let,
    If,
    Else,
    For,
    Return,

    // Symbols
    LParen, // (
    RParen, // )
    Comma,  // ,
    Colon,  // :
    Eq,     // =
    EqEq,   // ==
    Plus,   // +
    Minus,  // -
    Star,   // *
    Slash,  // /
    Lt,     // <
    Gt,     // >

    // Literals
    Integer(i64),
    Floating(f64),
    Ident(String),

    // Layout
    Newline,
    Indent,
    Dedent,

    // End of file
    Eof,
}

impl Lexeme {
    /// Try to match an identifier string to a keyword lexeme.
    pub fn from_keyword(s: &str) -> Option<Lexeme> {
        match s {
            "fn" => Some(Lexeme::Fn),
            "let" => Some(Lexeme::Let),
            "if" => Some(Lexeme::If),
            "else" => Some(Lexeme::Else),
            "for" => Some(Lexeme::For),
            "return" => Some(Lexeme::Return),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Lexeme::Fn => "'fn'",
            Lexeme::Let => "'let'",
            Lexeme::If => "'if'",
            Lexeme::Else => "'else'",
            Lexeme::For => "'for'",
            Lexeme::Return => "'return'",
            Lexeme::LParen => "'('",
            Lexeme::RParen => "')'",
            Lexeme::Comma => "','",
            Lexeme::Colon => "':'",
            Lexeme::Eq => "'='",
            Lexeme::EqEq => "'=='",
            Lexeme::Plus => "'+'",
            Lexeme::Minus => "'-'",
            Lexeme::Star => "'*'",
            Lexeme::Slash => "'/'",
            Lexeme::Lt => "'<'",
            Lexeme::Gt => "'>'",
            Lexeme::Integer(_) => "integer literal",
            Lexeme::Floating(_) => "floating literal",
            Lexeme::Ident(_) => "identifier",
            Lexeme::Newline => "end of line",
            Lexeme::Indent => "indentation",
            Lexeme::Dedent => "end of indented block",
            Lexeme::Eof => "end of file",
        }
    }
}
