mod expr;
mod stmt;

use crate::ast::{Ast, NodeKind};
use crate::diagnostic::Diagnostic;
use crate::lexeme::Lexeme;
use crate::span::{Span, Spanned};

const MAX_NESTING_DEPTH: u32 = 256;

pub(crate) struct Parser {
    tokens: Vec<Spanned<Lexeme>>,
    pos: usize,
    ast: Ast,
    diagnostics: Vec<Diagnostic>,
    depth: u32,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Spanned<Lexeme>>) -> Self {
        Self {
            tokens,
            pos: 0,
            ast: Ast::new(),
            diagnostics: Vec::new(),
            depth: 0,
        }
    }

    /// Parse one input into an arena whose root is a `Program` node.
    pub(crate) fn parse_program(mut self) -> Result<Ast, Vec<Diagnostic>> {
        let start = self.current_span();
        let mut items = Vec::new();
        loop {
            while self.eat(&Lexeme::Newline) {}
            if self.at(&Lexeme::Eof) {
                break;
            }
            if self.at(&Lexeme::Indent) || self.at(&Lexeme::Dedent) {
                self.error_at_current("unexpected indentation");
                self.advance();
                continue;
            }
            let item = if self.at(&Lexeme::Fn) {
                self.parse_fn_def()
            } else {
                self.parse_stmt()
            };
            items.push(item);
            self.end_of_statement();
        }

        let span = start.merge(self.prev_span());
        let root = self.ast.push(NodeKind::Program(items), span);
        self.ast.set_root(root);

        if !self.diagnostics.is_empty() {
            return Err(self.diagnostics);
        }
        Ok(self.ast)
    }

    fn enter_nesting(&mut self) -> bool {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            self.error_with_help(
                "nesting depth exceeded (maximum 256 levels)",
                "simplify the program by extracting deeply nested code into functions",
            );
            return false;
        }
        true
    }

    fn exit_nesting(&mut self) {
        self.depth -= 1;
    }

    /// A statement ends at a newline, at the end of input, or right after the
    /// dedent that closed its own block.
    fn end_of_statement(&mut self) {
        if self.eat(&Lexeme::Newline)
            || self.at(&Lexeme::Eof)
            || self.at(&Lexeme::Dedent)
            || self.prev_is(&Lexeme::Dedent)
        {
            return;
        }
        self.error_at_current(&format!(
            "expected end of line, found {}",
            self.peek().description()
        ));
        // Recover at the next line boundary.
        while !self.at(&Lexeme::Newline) && !self.at(&Lexeme::Eof) && !self.at(&Lexeme::Dedent) {
            self.advance();
        }
        self.eat(&Lexeme::Newline);
    }

    // ── Token helpers ─────────────────────────────────────────────

    fn peek(&self) -> &Lexeme {
        &self.tokens[self.pos].node
    }

    fn peek_nth(&self, n: usize) -> &Lexeme {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx].node
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current_span()
        }
    }

    fn prev_is(&self, token: &Lexeme) -> bool {
        self.pos > 0
            && std::mem::discriminant(&self.tokens[self.pos - 1].node)
                == std::mem::discriminant(token)
    }

    fn advance(&mut self) -> &Spanned<Lexeme> {
        let idx = self.pos;
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        &self.tokens[idx]
    }

    fn at(&self, token: &Lexeme) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn eat(&mut self, token: &Lexeme) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Lexeme) -> Span {
        if self.at(token) {
            let span = self.current_span();
            self.advance();
            span
        } else {
            self.error_at_current(&format!(
                "expected {}, found {}",
                token.description(),
                self.peek().description()
            ));
            self.current_span()
        }
    }

    fn expect_ident(&mut self) -> Spanned<String> {
        if let Lexeme::Ident(name) = self.peek().clone() {
            let span = self.current_span();
            self.advance();
            Spanned::new(name, span)
        } else {
            self.error_at_current(&format!(
                "expected identifier, found {}",
                self.peek().description()
            ));
            Spanned::new("_error_".to_string(), self.current_span())
        }
    }

    fn error_at_current(&mut self, msg: &str) {
        self.diagnostics
            .push(Diagnostic::error(msg.to_string(), self.current_span()));
    }

    fn error_with_help(&mut self, msg: &str, help: &str) {
        self.diagnostics.push(
            Diagnostic::error(msg.to_string(), self.current_span()).with_help(help.to_string()),
        );
    }
}
