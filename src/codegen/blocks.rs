//! Function and basic-block bookkeeping for the emitter.
//!
//! One function is open at a time. The manager owns its [`FunctionBuilder`]
//! and the insertion point; predecessor edges are recorded by the builder
//! as terminators are set, so reachability is never decided here.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::error::EmitError;
use super::symbols::{Binding, SymbolTable};
use crate::ir::builder::FunctionBuilder;
use crate::ir::{Block, Function, Ty, Value};

#[derive(Default)]
pub struct BlockManager {
    open: Option<FunctionBuilder>,
    entries: HashMap<String, Block>,
}

impl BlockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` as a function symbol, open its body and make the
    /// entry block current.
    pub fn begin_function(
        &mut self,
        symbols: &mut SymbolTable,
        name: &str,
        param_count: usize,
    ) -> Result<Block, EmitError> {
        if let Some(open) = &self.open {
            return Err(EmitError::internal(format!(
                "cannot begin `{}` while `{}` is still open",
                name,
                open.name()
            )));
        }
        symbols.define(
            name,
            Binding::Function {
                arity: param_count,
                may_fault: false,
            },
        )?;
        let builder = FunctionBuilder::new(name, vec![Ty::Int; param_count], Ty::Int);
        let entry = builder.entry();
        self.entries.insert(name.to_string(), entry);
        self.open = Some(builder);
        debug!(function = name, params = param_count, "begin function");
        Ok(entry)
    }

    /// Allocate a block in the open function. It has no predecessors until
    /// some terminator targets it.
    pub fn new_block(&mut self, label: &str) -> Result<Block, EmitError> {
        let block = self.builder()?.create_block(label);
        trace!(%block, label, "new block");
        Ok(block)
    }

    pub fn set_current(&mut self, block: Block) -> Result<(), EmitError> {
        let builder = self.builder()?;
        if block.0 as usize >= builder.block_count() {
            return Err(EmitError::internal(format!("no such block {}", block)));
        }
        builder.set_insertion(block);
        Ok(())
    }

    pub fn current_block(&self) -> Result<Block, EmitError> {
        Ok(self.builder_ref()?.insertion())
    }

    /// Entry block of a function begun by this manager.
    pub fn entry_block_of(&self, function: &str) -> Option<Block> {
        self.entries.get(function).copied()
    }

    pub fn param(&self, index: usize) -> Result<Value, EmitError> {
        let builder = self.builder_ref()?;
        builder.param(index).ok_or_else(|| {
            EmitError::internal(format!("`{}` has no parameter {}", builder.name(), index))
        })
    }

    pub fn current_function(&self) -> Option<&str> {
        self.open.as_ref().map(|b| b.name())
    }

    /// The open function's builder, for instruction emission.
    pub fn builder(&mut self) -> Result<&mut FunctionBuilder, EmitError> {
        self.open
            .as_mut()
            .ok_or_else(|| EmitError::internal("no function is open"))
    }

    pub fn builder_ref(&self) -> Result<&FunctionBuilder, EmitError> {
        self.open
            .as_ref()
            .ok_or_else(|| EmitError::internal("no function is open"))
    }

    /// Close the open function and hand back its IR.
    pub fn finish_function(&mut self) -> Result<Function, EmitError> {
        let builder = self
            .open
            .take()
            .ok_or_else(|| EmitError::internal("no function is open"))?;
        let func = builder.finish();
        debug!(
            function = %func.name,
            blocks = func.blocks.len(),
            values = func.values.len(),
            "finish function"
        );
        Ok(func)
    }
}
