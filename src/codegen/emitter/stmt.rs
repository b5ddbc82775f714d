use tracing::trace;

use super::Emitter;
use crate::ast::{NodeId, NodeKind};
use crate::codegen::error::EmitError;
use crate::codegen::symbols::Binding;
use crate::ir::{CmpOp, Ty, Value};

impl Emitter<'_> {
    /// Emit one statement. Expression statements yield their value.
    pub(super) fn emit_stmt(&mut self, node: NodeId) -> Result<Option<Value>, EmitError> {
        let span = self.ast.span(node);
        self.emit_stmt_inner(node).map_err(|e| e.at(span))
    }

    fn emit_stmt_inner(&mut self, node: NodeId) -> Result<Option<Value>, EmitError> {
        let ast = self.ast;
        match ast.kind(node) {
            NodeKind::Let { name, expr } => {
                let value = self.emit_expr(*expr)?;
                let ty = self.ty(value)?;
                let id = self.symbols.define(name, Binding::Variable)?;
                self.ssa.declare(id, ty);
                let block = self.current_block()?;
                self.ssa.write_variable(id, block, value);
                Ok(None)
            }
            NodeKind::Set { name, expr } => {
                let value = self.emit_expr(*expr)?;
                let id = self.symbols.variable(name)?;
                let ty = self.ssa.var_type(id).ok_or_else(|| {
                    EmitError::internal(format!("variable `{}` has no recorded type", name))
                })?;
                let value = self.coerce(value, ty)?;
                let block = self.current_block()?;
                self.ssa.write_variable(id, block, value);
                Ok(None)
            }
            NodeKind::Return(expr) => {
                let value = self.emit_expr(*expr)?;
                let value = self.coerce(value, Ty::Int)?;
                self.builder()?.ret(value);
                // Later siblings are dead but still need somewhere to go.
                let dead = self.blocks.new_block("after_return")?;
                self.blocks.set_current(dead)?;
                self.seal(dead)?;
                Ok(None)
            }
            NodeKind::If {
                cond,
                then_body,
                else_body,
            } => {
                self.emit_if(*cond, *then_body, *else_body)?;
                Ok(None)
            }
            NodeKind::For { index, bound, body } => {
                self.emit_for(index, *bound, *body)?;
                Ok(None)
            }
            NodeKind::FnDef { name, .. } => Err(EmitError::internal(format!(
                "function `{}` defined inside another body",
                name
            ))),
            NodeKind::Program(_) | NodeKind::List(_) => {
                Err(EmitError::internal("statement list in statement position"))
            }
            NodeKind::Integer(_)
            | NodeKind::Floating(_)
            | NodeKind::Ident(_)
            | NodeKind::Infix { .. }
            | NodeKind::Prefix { .. }
            | NodeKind::Call { .. } => self.emit_expr(node).map(Some),
        }
    }

    /// Emit the statements of `body` in a scope of their own.
    fn emit_scoped_body(&mut self, body: NodeId) -> Result<(), EmitError> {
        let ast = self.ast;
        self.symbols.push_scope();
        for &stmt in ast.items(body) {
            self.emit_stmt(stmt)?;
        }
        self.symbols.pop_scope()
    }

    /// Nonzero test of an Int or Float condition.
    fn emit_truthy(&mut self, value: Value) -> Result<Value, EmitError> {
        let ty = self.ty(value)?;
        let b = self.builder()?;
        match ty {
            Ty::Int => {
                let zero = b.iconst(0);
                Ok(b.icmp(CmpOp::Ne, value, zero))
            }
            Ty::Float => {
                let zero = b.fconst(0.0);
                Ok(b.fcmp(CmpOp::Ne, value, zero))
            }
            other => Err(EmitError::internal(format!("cannot branch on {}", other))),
        }
    }

    fn emit_if(
        &mut self,
        cond: NodeId,
        then_body: NodeId,
        else_body: Option<NodeId>,
    ) -> Result<(), EmitError> {
        let cond = self.emit_expr(cond)?;
        let test = self.emit_truthy(cond)?;

        let then_block = self.blocks.new_block("if.then")?;
        let else_block = self.blocks.new_block("if.else")?;
        let join = self.blocks.new_block("if.join")?;
        self.builder()?.branch(test, then_block, else_block);
        self.seal(then_block)?;
        self.seal(else_block)?;

        self.blocks.set_current(then_block)?;
        self.emit_scoped_body(then_body)?;
        self.jump_to(join)?;

        self.blocks.set_current(else_block)?;
        if let Some(else_body) = else_body {
            self.emit_scoped_body(else_body)?;
        }
        self.jump_to(join)?;

        self.seal(join)?;
        self.blocks.set_current(join)?;
        trace!(%then_block, %else_block, %join, "if");
        Ok(())
    }

    /// `for index < bound body`: the index counts from 0; the bound is
    /// evaluated once, before the loop.
    fn emit_for(&mut self, index: &str, bound: NodeId, body: NodeId) -> Result<(), EmitError> {
        let bound = self.emit_expr(bound)?;
        let bound = self.coerce(bound, Ty::Int)?;

        self.symbols.push_scope();
        let var = self.symbols.define(index, Binding::Variable)?;
        self.ssa.declare(var, Ty::Int);
        let preheader = self.current_block()?;
        let zero = self.builder()?.iconst(0);
        self.ssa.write_variable(var, preheader, zero);

        let header = self.blocks.new_block("for.header")?;
        let body_block = self.blocks.new_block("for.body")?;
        let body_end = self.blocks.new_block("for.body_end")?;
        let end = self.blocks.new_block("for.end")?;
        self.jump_to(header)?;

        // The header stays unsealed until the back edge exists.
        self.blocks.set_current(header)?;
        let current = self.read(var, header)?;
        let b = self.builder()?;
        let in_range = b.icmp(CmpOp::Lt, current, bound);
        b.branch(in_range, body_block, end);
        self.seal(body_block)?;

        self.blocks.set_current(body_block)?;
        self.emit_scoped_body(body)?;
        self.jump_to(body_end)?;
        self.seal(body_end)?;

        self.blocks.set_current(body_end)?;
        let current = self.read(var, body_end)?;
        let b = self.builder()?;
        let one = b.iconst(1);
        let next = b.ibinary(crate::ir::BinaryOp::Add, current, one);
        b.jump(header);
        self.ssa.write_variable(var, body_end, next);

        self.seal(header)?;
        self.seal(end)?;
        self.blocks.set_current(end)?;
        self.symbols.pop_scope()?;
        trace!(%header, %body_block, %body_end, %end, "for");
        Ok(())
    }
}
