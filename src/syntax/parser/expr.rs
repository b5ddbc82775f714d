use crate::ast::{InfixOp, NodeId, NodeKind, PrefixOp};
use crate::lexeme::Lexeme;

use super::Parser;

/// Binding power of prefix `-`: tighter than every infix operator.
const PREFIX_BP: u8 = 8;

impl Parser {
    pub(super) fn parse_expr(&mut self) -> NodeId {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> NodeId {
        if !self.enter_nesting() {
            self.exit_nesting();
            let span = self.current_span();
            return self.ast.push(NodeKind::Integer(0), span);
        }

        let mut lhs = self.parse_prefix();
        let mut chained_comparison = false;

        loop {
            let op = match self.peek() {
                Lexeme::Plus => InfixOp::Add,
                Lexeme::Minus => InfixOp::Sub,
                Lexeme::Star => InfixOp::Mul,
                Lexeme::Slash => InfixOp::Div,
                Lexeme::Lt => InfixOp::Lt,
                Lexeme::Gt => InfixOp::Gt,
                Lexeme::EqEq => InfixOp::Eq,
                _ => break,
            };

            let (l_bp, r_bp) = op.binding_power();
            if l_bp < min_bp {
                break;
            }

            if op.is_comparison() && chained_comparison {
                self.error_with_help(
                    "comparison operators cannot be chained",
                    "parenthesize the first comparison",
                );
            }
            chained_comparison = op.is_comparison();

            self.advance(); // consume operator
            let rhs = self.parse_expr_bp(r_bp);
            let span = self.ast.span(lhs).merge(self.ast.span(rhs));
            lhs = self.ast.push(
                NodeKind::Infix {
                    op,
                    left: lhs,
                    right: rhs,
                },
                span,
            );
        }

        self.exit_nesting();
        lhs
    }

    fn parse_prefix(&mut self) -> NodeId {
        if self.at(&Lexeme::Minus) {
            let start = self.current_span();
            self.advance();
            let right = self.parse_expr_bp(PREFIX_BP);
            let span = start.merge(self.ast.span(right));
            return self.ast.push(
                NodeKind::Prefix {
                    op: PrefixOp::Neg,
                    right,
                },
                span,
            );
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> NodeId {
        let start = self.current_span();

        match self.peek().clone() {
            Lexeme::Integer(n) => {
                self.advance();
                self.ast.push(NodeKind::Integer(n), start)
            }
            Lexeme::Floating(v) => {
                self.advance();
                self.ast.push(NodeKind::Floating(v), start)
            }
            Lexeme::Ident(name) => {
                self.advance();
                if self.at(&Lexeme::LParen) {
                    self.parse_call(name, start)
                } else {
                    self.ast.push(NodeKind::Ident(name), start)
                }
            }
            Lexeme::LParen => {
                self.advance();
                let inner = self.parse_expr();
                self.expect(&Lexeme::RParen);
                inner
            }
            other => {
                self.error_at_current(&format!("expected expression, found {}", other.description()));
                if !matches!(
                    other,
                    Lexeme::Newline | Lexeme::Eof | Lexeme::Dedent | Lexeme::Indent
                ) {
                    self.advance();
                }
                self.ast.push(NodeKind::Integer(0), start)
            }
        }
    }

    fn parse_call(&mut self, name: String, start: crate::span::Span) -> NodeId {
        let args_start = self.expect(&Lexeme::LParen);
        let mut args = Vec::new();
        if !self.at(&Lexeme::RParen) {
            loop {
                args.push(self.parse_expr());
                if !self.eat(&Lexeme::Comma) {
                    break;
                }
            }
        }
        self.expect(&Lexeme::RParen);
        let args_span = args_start.merge(self.prev_span());
        let args = self.ast.push(NodeKind::List(args), args_span);
        let span = start.merge(self.prev_span());
        self.ast.push(NodeKind::Call { name, args }, span)
    }
}
