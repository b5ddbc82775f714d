//! AST to SSA IR.
//!
//! The emitter walks one parsed compilation unit and drives the symbol
//! table, the block manager and the SSA resolver. Top-level function
//! definitions become functions of the same name; any other top-level
//! statements are gathered, in order, into a unit function whose result is
//! the value of the last top-level expression statement.

mod expr;
mod stmt;

#[cfg(test)]
mod tests;

use tracing::debug;

use super::blocks::BlockManager;
use super::error::EmitError;
use super::fault::FaultLowering;
use super::ssa::SsaResolver;
use super::symbols::{Binding, SymbolId, SymbolTable};
use crate::ast::{Ast, NodeId, NodeKind};
use crate::config::CompileOptions;
use crate::ir::builder::FunctionBuilder;
use crate::ir::cfg::verify;
use crate::ir::{Block, Function, Module, Ty, Value};
use crate::span::Span;

/// A top-level function as seen by later compilation units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Export {
    pub name: String,
    pub arity: usize,
    pub may_fault: bool,
}

/// Output of one compilation unit.
#[derive(Clone, Debug)]
pub struct Emission {
    pub module: Module,
    /// Functions defined by this unit, in definition order.
    pub exports: Vec<Export>,
    /// Name of the unit function, if the unit had top-level statements.
    pub unit: Option<String>,
}

/// The function whose body is being emitted.
struct Current {
    name: String,
    arity: usize,
    may_fault: bool,
    exported: bool,
}

pub struct Emitter<'a> {
    ast: &'a Ast,
    options: CompileOptions,
    symbols: SymbolTable,
    blocks: BlockManager,
    ssa: SsaResolver,
    fault: FaultLowering,
    current: Option<Current>,
    functions: Vec<Function>,
    exports: Vec<Export>,
    unit_name: String,
}

impl<'a> Emitter<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        let options = CompileOptions::default();
        Self {
            ast,
            fault: FaultLowering::new(options.fault),
            options,
            symbols: SymbolTable::new(),
            blocks: BlockManager::new(),
            ssa: SsaResolver::new(),
            current: None,
            functions: Vec::new(),
            exports: Vec::new(),
            unit_name: "__unit0".to_string(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.fault = FaultLowering::new(options.fault);
        self.options = options;
        self
    }

    /// Make functions exported by earlier units callable from this one.
    /// A name exported twice is a `DuplicateSymbol` error.
    pub fn with_exports(mut self, exports: &[Export]) -> Result<Self, EmitError> {
        for export in exports {
            let binding = Binding::Function {
                arity: export.arity,
                may_fault: export.may_fault,
            };
            self.symbols.define(&export.name, binding)?;
        }
        Ok(self)
    }

    pub fn with_unit_name(mut self, name: &str) -> Self {
        self.unit_name = name.to_string();
        self
    }

    /// Emit every item of the program. The first error aborts the unit.
    pub fn emit_program(mut self) -> Result<Emission, EmitError> {
        let ast = self.ast;
        let root = ast
            .root()
            .ok_or_else(|| EmitError::internal("program has no root node"))?;
        debug!(items = ast.items(root).len(), "emit program");

        let mut top_level = Vec::new();
        for &item in ast.items(root) {
            match ast.kind(item) {
                NodeKind::FnDef { .. } => self.emit_fn_def(item)?,
                _ => top_level.push(item),
            }
        }

        let unit = if top_level.is_empty() {
            None
        } else {
            self.emit_unit(&top_level)?;
            Some(self.unit_name.clone())
        };

        Ok(Emission {
            module: Module {
                functions: self.functions,
            },
            exports: self.exports,
            unit,
        })
    }

    fn emit_fn_def(&mut self, node: NodeId) -> Result<(), EmitError> {
        let ast = self.ast;
        let span = ast.span(node);
        let NodeKind::FnDef { name, params, body } = ast.kind(node) else {
            return Err(EmitError::internal("expected a function definition").at(span));
        };

        self.begin(name, params.len(), true).map_err(|e| e.at(span))?;
        let entry = self.current_block()?;

        self.symbols.push_scope();
        for (index, param) in params.iter().enumerate() {
            let id = self
                .symbols
                .define(param, Binding::Variable)
                .map_err(|e| e.at(span))?;
            let value = self.blocks.param(index)?;
            self.ssa.declare(id, Ty::Int);
            self.ssa.write_variable(id, entry, value);
        }
        for &stmt in ast.items(*body) {
            self.emit_stmt(stmt)?;
        }
        self.symbols.pop_scope()?;

        self.end(None).map_err(|e| e.at(span))
    }

    fn emit_unit(&mut self, items: &[NodeId]) -> Result<(), EmitError> {
        let name = self.unit_name.clone();
        let span = items
            .first()
            .map(|first| self.ast.span(*first))
            .unwrap_or_else(Span::dummy);
        self.begin(&name, 0, false).map_err(|e| e.at(span))?;

        self.symbols.push_scope();
        let mut last = None;
        for &item in items {
            if let Some(value) = self.emit_stmt(item)? {
                last = Some(value);
            }
        }
        self.symbols.pop_scope()?;

        let result = match last {
            Some(value) => Some(self.coerce(value, Ty::Int)?),
            None => None,
        };
        self.end(result)
    }

    /// Open a function, give it a fresh SSA state and seal its entry.
    fn begin(&mut self, name: &str, arity: usize, exported: bool) -> Result<(), EmitError> {
        let entry = self.blocks.begin_function(&mut self.symbols, name, arity)?;
        self.ssa = SsaResolver::new();
        self.seal(entry)?;
        self.current = Some(Current {
            name: name.to_string(),
            arity,
            may_fault: false,
            exported,
        });
        Ok(())
    }

    /// Close the open function. If control reaches the end of the body it
    /// returns `fallthrough`, or 0 when there is none.
    fn end(&mut self, fallthrough: Option<Value>) -> Result<(), EmitError> {
        let b = self.builder()?;
        if !b.is_terminated(b.insertion()) {
            let value = match fallthrough {
                Some(value) => value,
                None => b.iconst(0),
            };
            b.ret(value);
        }
        self.ssa.finish()?;
        let func = self.blocks.finish_function()?;
        if self.options.verify {
            verify(&func).map_err(|e| EmitError::internal(e.to_string()))?;
        }

        let current = self
            .current
            .take()
            .ok_or_else(|| EmitError::internal("function closed twice"))?;
        if current.may_fault {
            self.symbols.redefine(
                &current.name,
                Binding::Function {
                    arity: current.arity,
                    may_fault: true,
                },
            )?;
        }
        debug!(
            function = %current.name,
            may_fault = current.may_fault,
            phis = self.ssa.total_phis(),
            "emitted"
        );
        if current.exported {
            self.exports.push(Export {
                name: current.name,
                arity: current.arity,
                may_fault: current.may_fault,
            });
        }
        self.functions.push(func);
        Ok(())
    }

    // ── Shared helpers ────────────────────────────────────────────

    fn builder(&mut self) -> Result<&mut FunctionBuilder, EmitError> {
        self.blocks.builder()
    }

    fn current_block(&self) -> Result<Block, EmitError> {
        self.blocks.current_block()
    }

    fn seal(&mut self, block: Block) -> Result<(), EmitError> {
        let b = self.blocks.builder()?;
        self.ssa.seal_block(b, block)
    }

    fn read(&mut self, var: SymbolId, block: Block) -> Result<Value, EmitError> {
        let b = self.blocks.builder()?;
        self.ssa.read_variable(b, var, block)
    }

    fn jump_to(&mut self, dest: Block) -> Result<(), EmitError> {
        self.builder()?.jump(dest);
        Ok(())
    }

    fn mark_may_fault(&mut self) {
        if let Some(current) = &mut self.current {
            current.may_fault = true;
        }
    }

    fn ty(&self, value: Value) -> Result<Ty, EmitError> {
        Ok(self.blocks.builder_ref()?.value_ty(value))
    }

    /// Convert `value` to `target` (Int <-> Float).
    fn coerce(&mut self, value: Value, target: Ty) -> Result<Value, EmitError> {
        let from = self.ty(value)?;
        let b = self.builder()?;
        match (from, target) {
            (a, b_ty) if a == b_ty => Ok(value),
            (Ty::Int, Ty::Float) => Ok(b.sitofp(value)),
            (Ty::Float, Ty::Int) => Ok(b.fptosi(value)),
            (from, to) => Err(EmitError::internal(format!(
                "cannot convert {} to {}",
                from, to
            ))),
        }
    }
}
