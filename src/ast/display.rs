//! S-expression rendering of AST nodes, used by parser tests and `--ast` dumps.

use super::{Ast, NodeId, NodeKind, PrefixOp};

impl Ast {
    /// Render the subtree rooted at `id` as a compact S-expression.
    pub fn sexpr(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_sexpr(id, &mut out);
        out
    }

    fn write_sexpr(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Program(items) => self.write_list("program", items, out),
            NodeKind::List(items) => self.write_list("list", items, out),
            NodeKind::Integer(n) => out.push_str(&n.to_string()),
            NodeKind::Floating(v) => out.push_str(&format!("{:?}", v)),
            NodeKind::Ident(name) => out.push_str(name),
            NodeKind::Infix { op, left, right } => {
                out.push('(');
                out.push_str(op.as_str());
                out.push(' ');
                self.write_sexpr(*left, out);
                out.push(' ');
                self.write_sexpr(*right, out);
                out.push(')');
            }
            NodeKind::Prefix { op, right } => {
                match op {
                    PrefixOp::Neg => out.push_str("(neg "),
                }
                self.write_sexpr(*right, out);
                out.push(')');
            }
            NodeKind::Call { name, args } => {
                out.push_str(&format!("(call {}", name));
                for arg in self.items(*args) {
                    out.push(' ');
                    self.write_sexpr(*arg, out);
                }
                out.push(')');
            }
            NodeKind::Let { name, expr } => {
                out.push_str(&format!("(let {} ", name));
                self.write_sexpr(*expr, out);
                out.push(')');
            }
            NodeKind::Set { name, expr } => {
                out.push_str(&format!("(set {} ", name));
                self.write_sexpr(*expr, out);
                out.push(')');
            }
            NodeKind::If {
                cond,
                then_body,
                else_body,
            } => {
                out.push_str("(if ");
                self.write_sexpr(*cond, out);
                out.push(' ');
                self.write_sexpr(*then_body, out);
                if let Some(else_body) = else_body {
                    out.push(' ');
                    self.write_sexpr(*else_body, out);
                }
                out.push(')');
            }
            NodeKind::For { index, bound, body } => {
                out.push_str(&format!("(for {} ", index));
                self.write_sexpr(*bound, out);
                out.push(' ');
                self.write_sexpr(*body, out);
                out.push(')');
            }
            NodeKind::Return(expr) => {
                out.push_str("(return ");
                self.write_sexpr(*expr, out);
                out.push(')');
            }
            NodeKind::FnDef { name, params, body } => {
                out.push_str(&format!("(fn {} ({}) ", name, params.join(" ")));
                self.write_sexpr(*body, out);
                out.push(')');
            }
        }
    }

    fn write_list(&self, head: &str, items: &[NodeId], out: &mut String) {
        out.push('(');
        out.push_str(head);
        for item in items {
            out.push(' ');
            self.write_sexpr(*item, out);
        }
        out.push(')');
    }
}
