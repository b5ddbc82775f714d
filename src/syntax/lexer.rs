use crate::diagnostic::Diagnostic;
use crate::lexeme::Lexeme;
use crate::span::{Span, Spanned};

/// Indentation-sensitive lexer.
///
/// Each non-blank logical line is measured against an indent stack before
/// its tokens are scanned. A deeper line produces `Indent`, a shallower one
/// produces one `Dedent` per closed level, and every line ends in `Newline`.
/// Blank lines and `#` comment lines never touch the layout.
pub(crate) struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    line: u32,
    line_start: usize,
    indent_stack: Vec<usize>,
    tokens: Vec<Spanned<Lexeme>>,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    pub(crate) fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            line: 1,
            line_start: 0,
            indent_stack: vec![0],
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn tokenize(mut self) -> (Vec<Spanned<Lexeme>>, Vec<Diagnostic>) {
        while self.pos < self.source.len() {
            self.lex_line();
        }

        let end = self.span(self.pos, self.pos);
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.tokens.push(Spanned::new(Lexeme::Dedent, end));
        }
        self.tokens.push(Spanned::new(Lexeme::Eof, end));
        (self.tokens, self.diagnostics)
    }

    fn lex_line(&mut self) {
        let indent_start = self.pos;
        let mut width = 0usize;
        while let Some(&ch) = self.source.get(self.pos) {
            match ch {
                b' ' => width += 1,
                b'\t' => self.error(
                    "tabs are not allowed in indentation",
                    self.pos,
                    self.pos + 1,
                ),
                b'\r' => {}
                _ => break,
            }
            self.pos += 1;
        }

        // Blank and comment-only lines do not affect layout.
        match self.source.get(self.pos) {
            None => return,
            Some(b'\n') => {
                self.next_line();
                return;
            }
            Some(b'#') => {
                self.skip_comment();
                if self.source.get(self.pos) == Some(&b'\n') {
                    self.next_line();
                }
                return;
            }
            _ => {}
        }

        self.apply_indent(width, indent_start);

        loop {
            self.skip_spaces();
            match self.source.get(self.pos) {
                None => {
                    let span = self.span(self.pos, self.pos);
                    self.tokens.push(Spanned::new(Lexeme::Newline, span));
                    return;
                }
                Some(b'\n') => {
                    let span = self.span(self.pos, self.pos + 1);
                    self.tokens.push(Spanned::new(Lexeme::Newline, span));
                    self.next_line();
                    return;
                }
                Some(b'#') => self.skip_comment(),
                Some(_) => self.scan_token(),
            }
        }
    }

    fn apply_indent(&mut self, width: usize, indent_start: usize) {
        let top = self.indent_stack.last().copied().unwrap_or(0);
        let span = self.span(indent_start, self.pos);
        if width > top {
            self.indent_stack.push(width);
            self.tokens.push(Spanned::new(Lexeme::Indent, span));
            return;
        }
        while self.indent_stack.last().is_some_and(|&level| level > width) {
            self.indent_stack.pop();
            self.tokens.push(Spanned::new(Lexeme::Dedent, span));
        }
        if self.indent_stack.last() != Some(&width) {
            self.diagnostics.push(
                Diagnostic::error("inconsistent indentation".to_string(), span).with_help(
                    "dedent to the same column as an enclosing block".to_string(),
                ),
            );
            // Recover by treating this column as a fresh level.
            self.indent_stack.push(width);
        }
    }

    fn scan_token(&mut self) {
        let start = self.pos;
        let ch = self.source[self.pos];

        if is_ident_start(ch) {
            while self.pos < self.source.len() && is_ident_continue(self.source[self.pos]) {
                self.pos += 1;
            }
            let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
            let tok = Lexeme::from_keyword(&text).unwrap_or(Lexeme::Ident(text));
            self.push(tok, start);
            return;
        }

        if ch.is_ascii_digit() {
            self.scan_number(start);
            return;
        }

        let two = self.source.get(self.pos + 1).copied();
        let tok = match (ch, two) {
            (b'=', Some(b'=')) => {
                self.pos += 2;
                Some(Lexeme::EqEq)
            }
            _ => {
                self.pos += 1;
                match ch {
                    b'(' => Some(Lexeme::LParen),
                    b')' => Some(Lexeme::RParen),
                    b',' => Some(Lexeme::Comma),
                    b':' => Some(Lexeme::Colon),
                    b'=' => Some(Lexeme::Eq),
                    b'+' => Some(Lexeme::Plus),
                    b'-' => Some(Lexeme::Minus),
                    b'*' => Some(Lexeme::Star),
                    b'/' => Some(Lexeme::Slash),
                    b'<' => Some(Lexeme::Lt),
                    b'>' => Some(Lexeme::Gt),
                    _ => None,
                }
            }
        };

        match tok {
            Some(tok) => self.push(tok, start),
            None => {
                // Swallow the rest of a multi-byte character.
                while self.pos < self.source.len() && (self.source[self.pos] & 0xC0) == 0x80 {
                    self.pos += 1;
                }
                self.error("invalid token", start, self.pos);
            }
        }
    }

    fn scan_number(&mut self, start: usize) {
        while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        let is_float = self.source.get(self.pos) == Some(&b'.')
            && self
                .source
                .get(self.pos + 1)
                .is_some_and(|c| c.is_ascii_digit());
        if is_float {
            self.pos += 1;
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
        }

        let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
        if is_float {
            match text.parse::<f64>() {
                Ok(v) => self.push(Lexeme::Floating(v), start),
                Err(_) => self.error("invalid floating literal", start, self.pos),
            }
        } else {
            match text.parse::<i64>() {
                Ok(v) => self.push(Lexeme::Integer(v), start),
                Err(_) => self.error("integer literal out of range", start, self.pos),
            }
        }
    }

    fn skip_spaces(&mut self) {
        while matches!(self.source.get(self.pos), Some(b' ' | b'\t' | b'\r')) {
            self.pos += 1;
        }
    }

    fn skip_comment(&mut self) {
        while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
            self.pos += 1;
        }
    }

    fn next_line(&mut self) {
        self.pos += 1;
        self.line += 1;
        self.line_start = self.pos;
    }

    fn push(&mut self, tok: Lexeme, start: usize) {
        let span = self.span(start, self.pos);
        self.tokens.push(Spanned::new(tok, span));
    }

    fn span(&self, start: usize, end: usize) -> Span {
        let column = start.saturating_sub(self.line_start) + 1;
        Span::new(start as u32, end as u32, self.line, column as u32)
    }

    fn error(&mut self, msg: &str, start: usize, end: usize) {
        let span = self.span(start, end);
        self.diagnostics.push(Diagnostic::error(msg.to_string(), span));
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Lexeme> {
        let (tokens, diags) = Lexer::new(source).tokenize();
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
        tokens.into_iter().map(|t| t.node).collect()
    }

    #[test]
    fn test_simple_expression() {
        assert_eq!(
            lex("3 + 4 * 2"),
            vec![
                Lexeme::Integer(3),
                Lexeme::Plus,
                Lexeme::Integer(4),
                Lexeme::Star,
                Lexeme::Integer(2),
                Lexeme::Newline,
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_and_floats() {
        assert_eq!(
            lex("fn f(a)\n    return a / 2.5\n"),
            vec![
                Lexeme::Fn,
                Lexeme::Ident("f".to_string()),
                Lexeme::LParen,
                Lexeme::Ident("a".to_string()),
                Lexeme::RParen,
                Lexeme::Newline,
                Lexeme::Indent,
                Lexeme::Return,
                Lexeme::Ident("a".to_string()),
                Lexeme::Slash,
                Lexeme::Floating(2.5),
                Lexeme::Newline,
                Lexeme::Dedent,
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_nested_dedent_emits_one_per_level() {
        let toks = lex("if a\n  if b\n    x = 1\ny = 2\n");
        let dedents = toks.iter().filter(|t| **t == Lexeme::Dedent).count();
        let indents = toks.iter().filter(|t| **t == Lexeme::Indent).count();
        assert_eq!(indents, 2);
        assert_eq!(dedents, 2);
    }

    #[test]
    fn test_blank_and_comment_lines_ignored() {
        let toks = lex("fn f()\n\n    # note\n    return 1\n");
        assert!(!toks.windows(2).any(|w| w[0] == Lexeme::Newline && w[1] == Lexeme::Newline));
        assert_eq!(toks.iter().filter(|t| **t == Lexeme::Indent).count(), 1);
    }

    #[test]
    fn test_eqeq_versus_eq() {
        assert_eq!(
            lex("a = b == c"),
            vec![
                Lexeme::Ident("a".to_string()),
                Lexeme::Eq,
                Lexeme::Ident("b".to_string()),
                Lexeme::EqEq,
                Lexeme::Ident("c".to_string()),
                Lexeme::Newline,
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_invalid_token_reported_with_position() {
        let (_, diags) = Lexer::new("let x = 1\nlet y = $\n").tokenize();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "invalid token");
        assert_eq!(diags[0].span.line, 2);
        assert_eq!(diags[0].span.column, 9);
    }

    #[test]
    fn test_inconsistent_dedent_is_an_error() {
        let (_, diags) = Lexer::new("if a\n    x = 1\n  y = 2\n").tokenize();
        assert!(diags.iter().any(|d| d.message == "inconsistent indentation"));
    }

    #[test]
    fn test_integer_out_of_range() {
        let (_, diags) = Lexer::new("99999999999999999999").tokenize();
        assert_eq!(diags[0].message, "integer literal out of range");
    }
}
