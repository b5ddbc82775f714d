use super::Emitter;
use crate::ast::{InfixOp, NodeId, NodeKind, PrefixOp};
use crate::codegen::error::EmitError;
use crate::ir::{BinaryOp, CmpOp, Ty, Value};
use crate::span::Span;

impl Emitter<'_> {
    /// Emit an expression and return the value holding its result.
    pub(super) fn emit_expr(&mut self, node: NodeId) -> Result<Value, EmitError> {
        let span = self.ast.span(node);
        self.emit_expr_inner(node).map_err(|e| e.at(span))
    }

    fn emit_expr_inner(&mut self, node: NodeId) -> Result<Value, EmitError> {
        let ast = self.ast;
        match ast.kind(node) {
            NodeKind::Integer(n) => Ok(self.builder()?.iconst(*n)),
            NodeKind::Floating(x) => Ok(self.builder()?.fconst(*x)),
            NodeKind::Ident(name) => {
                let var = self.symbols.variable(name)?;
                let block = self.current_block()?;
                self.read(var, block)
            }
            NodeKind::Infix { op, left, right } => {
                let lhs = self.emit_expr(*left)?;
                let rhs = self.emit_expr(*right)?;
                self.emit_infix(*op, lhs, rhs)
            }
            NodeKind::Prefix {
                op: PrefixOp::Neg,
                right,
            } => {
                let value = self.emit_expr(*right)?;
                let ty = self.ty(value)?;
                let b = self.builder()?;
                match ty {
                    Ty::Float => {
                        let zero = b.fconst(0.0);
                        Ok(b.fbinary(BinaryOp::Sub, zero, value))
                    }
                    _ => {
                        let zero = b.iconst(0);
                        Ok(b.ibinary(BinaryOp::Sub, zero, value))
                    }
                }
            }
            NodeKind::Call { name, args } => self.emit_call(name, ast.items(*args)),
            other => Err(EmitError::internal(format!(
                "expected an expression, found {}",
                kind_name(other)
            ))),
        }
    }

    fn emit_infix(&mut self, op: InfixOp, lhs: Value, rhs: Value) -> Result<Value, EmitError> {
        let (lhs, rhs, ty) = self.unify(lhs, rhs)?;
        if op.is_comparison() {
            let cmp = match op {
                InfixOp::Lt => CmpOp::Lt,
                InfixOp::Gt => CmpOp::Gt,
                _ => CmpOp::Eq,
            };
            let b = self.builder()?;
            let flag = match ty {
                Ty::Float => b.fcmp(cmp, lhs, rhs),
                _ => b.icmp(cmp, lhs, rhs),
            };
            return Ok(b.zext(flag));
        }

        let arith = match op {
            InfixOp::Add => BinaryOp::Add,
            InfixOp::Sub => BinaryOp::Sub,
            InfixOp::Mul => BinaryOp::Mul,
            _ => BinaryOp::Div,
        };
        match (arith, ty) {
            (_, Ty::Float) => Ok(self.builder()?.fbinary(arith, lhs, rhs)),
            (BinaryOp::Div, _) => {
                let (quotient, _) =
                    self.fault
                        .checked_div(&mut self.blocks, &mut self.ssa, lhs, rhs)?;
                self.mark_may_fault();
                Ok(quotient)
            }
            _ => Ok(self.builder()?.ibinary(arith, lhs, rhs)),
        }
    }

    /// Bring both operands to a common type; Float wins over Int.
    fn unify(&mut self, lhs: Value, rhs: Value) -> Result<(Value, Value, Ty), EmitError> {
        let ty = match (self.ty(lhs)?, self.ty(rhs)?) {
            (Ty::Float, _) | (_, Ty::Float) => Ty::Float,
            _ => Ty::Int,
        };
        Ok((self.coerce(lhs, ty)?, self.coerce(rhs, ty)?, ty))
    }

    fn emit_call(&mut self, name: &str, args: &[NodeId]) -> Result<Value, EmitError> {
        if name == PI && self.symbols.lookup(PI).is_none() {
            check_arity(name, 0, args.len())?;
            return Ok(self.builder()?.fconst(std::f64::consts::PI));
        }
        let (_, arity, may_fault) = self.symbols.function(name)?;
        check_arity(name, arity, args.len())?;

        let mut values = Vec::with_capacity(args.len());
        for &arg in args {
            let value = self.emit_expr(arg)?;
            values.push(self.coerce(value, Ty::Int)?);
        }

        if may_fault {
            let (result, _) = self
                .fault
                .invoke(&mut self.blocks, &mut self.ssa, name, values)?;
            Ok(result)
        } else {
            Ok(self.builder()?.call(name, values, Ty::Int))
        }
    }
}

/// Built-in constant function, unless a user binding of the same name is visible.
const PI: &str = "pi";

fn check_arity(name: &str, expected: usize, found: usize) -> Result<(), EmitError> {
    if found == expected {
        return Ok(());
    }
    Err(EmitError::ArityMismatch {
        name: name.to_string(),
        expected,
        found,
        span: Span::dummy(),
    })
}

fn kind_name(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Program(_) => "a program",
        NodeKind::List(_) => "a statement list",
        NodeKind::Let { .. } => "`let`",
        NodeKind::Set { .. } => "`set`",
        NodeKind::If { .. } => "`if`",
        NodeKind::For { .. } => "`for`",
        NodeKind::Return(_) => "`return`",
        NodeKind::FnDef { .. } => "a function definition",
        _ => "an expression",
    }
}
