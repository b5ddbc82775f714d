use crate::ast::{NodeId, NodeKind};
use crate::lexeme::Lexeme;

use super::Parser;

impl Parser {
    pub(super) fn parse_fn_def(&mut self) -> NodeId {
        let start = self.expect(&Lexeme::Fn);
        let name = self.expect_ident();
        self.expect(&Lexeme::LParen);
        let mut params = Vec::new();
        if !self.at(&Lexeme::RParen) {
            loop {
                params.push(self.expect_ident().node);
                if !self.eat(&Lexeme::Comma) {
                    break;
                }
            }
        }
        self.expect(&Lexeme::RParen);
        let body = self.parse_body();
        let span = start.merge(self.prev_span());
        self.ast.push(
            NodeKind::FnDef {
                name: name.node,
                params,
                body,
            },
            span,
        )
    }

    /// A body is either an indented block on the following lines or a single
    /// statement on the same line, optionally introduced by `:`.
    pub(super) fn parse_body(&mut self) -> NodeId {
        let start = self.current_span();
        self.eat(&Lexeme::Colon);

        if !self.enter_nesting() {
            self.exit_nesting();
            return self.ast.push(NodeKind::List(Vec::new()), start);
        }

        let mut stmts = Vec::new();
        if self.eat(&Lexeme::Newline) {
            self.expect(&Lexeme::Indent);
            loop {
                while self.eat(&Lexeme::Newline) {}
                if self.eat(&Lexeme::Dedent) || self.at(&Lexeme::Eof) {
                    break;
                }
                stmts.push(self.parse_stmt());
                self.end_of_statement();
            }
        } else {
            stmts.push(self.parse_stmt());
        }
        self.exit_nesting();

        let span = start.merge(self.prev_span());
        self.ast.push(NodeKind::List(stmts), span)
    }

    pub(super) fn parse_stmt(&mut self) -> NodeId {
        let start = self.current_span();
        match self.peek().clone() {
            Lexeme::Let => {
                self.advance();
                let name = self.expect_ident();
                self.expect(&Lexeme::Eq);
                let expr = self.parse_expr();
                let span = start.merge(self.prev_span());
                self.ast.push(
                    NodeKind::Let {
                        name: name.node,
                        expr,
                    },
                    span,
                )
            }
            Lexeme::Return => {
                self.advance();
                let expr = self.parse_expr();
                let span = start.merge(self.prev_span());
                self.ast.push(NodeKind::Return(expr), span)
            }
            Lexeme::If => self.parse_if(),
            Lexeme::For => self.parse_for(),
            Lexeme::Fn => {
                self.error_with_help(
                    "functions may only be defined at the top level",
                    "move this definition out of the enclosing body",
                );
                self.parse_fn_def()
            }
            Lexeme::Ident(name) if *self.peek_nth(1) == Lexeme::Eq => {
                self.advance(); // name
                self.advance(); // =
                let expr = self.parse_expr();
                let span = start.merge(self.prev_span());
                self.ast.push(NodeKind::Set { name, expr }, span)
            }
            _ => self.parse_expr(),
        }
    }

    fn parse_if(&mut self) -> NodeId {
        let start = self.expect(&Lexeme::If);
        let cond = self.parse_expr();
        let then_body = self.parse_body();

        // `else` may follow on the same line or start the next one.
        let has_else = if self.at(&Lexeme::Else) {
            true
        } else if self.at(&Lexeme::Newline) && *self.peek_nth(1) == Lexeme::Else {
            self.advance();
            true
        } else {
            false
        };

        let else_body = if has_else {
            self.expect(&Lexeme::Else);
            Some(self.parse_body())
        } else {
            None
        };

        let span = start.merge(self.prev_span());
        self.ast.push(
            NodeKind::If {
                cond,
                then_body,
                else_body,
            },
            span,
        )
    }

    fn parse_for(&mut self) -> NodeId {
        let start = self.expect(&Lexeme::For);
        let index = self.expect_ident();
        self.expect(&Lexeme::Lt);
        let bound = self.parse_expr();
        let body = self.parse_body();
        let span = start.merge(self.prev_span());
        self.ast.push(
            NodeKind::For {
                index: index.node,
                bound,
                body,
            },
            span,
        )
    }
}
