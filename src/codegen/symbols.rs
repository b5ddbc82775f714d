//! Scoped symbol table.
//!
//! Scopes form a stack; lookups scan innermost to outermost, insertions go
//! to the innermost scope. Every inserted symbol gets a process-unique
//! [`SymbolId`], which is what SSA bookkeeping keys on, so popping a scope
//! never invalidates bindings recorded against blocks that still refer to
//! the variable.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use super::error::EmitError;
use crate::span::Span;

static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u64);

impl SymbolId {
    fn fresh() -> Self {
        SymbolId(NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SymbolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sym{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binding {
    Variable,
    Function { arity: usize, may_fault: bool },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub id: SymbolId,
    pub binding: Binding,
}

pub struct SymbolTable {
    scopes: Vec<BTreeMap<String, Symbol>>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// A table with just the outermost scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![BTreeMap::new()],
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(BTreeMap::new());
        trace!(depth = self.scopes.len(), "push scope");
    }

    pub fn pop_scope(&mut self) -> Result<(), EmitError> {
        if self.scopes.len() <= 1 {
            return Err(EmitError::internal("attempted to pop the outermost scope"));
        }
        self.scopes.pop();
        trace!(depth = self.scopes.len(), "pop scope");
        Ok(())
    }

    /// Bind `name` in the innermost scope.
    pub fn define(&mut self, name: &str, binding: Binding) -> Result<SymbolId, EmitError> {
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| EmitError::internal("symbol table has no scope"))?;
        if scope.contains_key(name) {
            return Err(EmitError::DuplicateSymbol {
                name: name.to_string(),
                span: Span::dummy(),
            });
        }
        let id = SymbolId::fresh();
        scope.insert(name.to_string(), Symbol { id, binding });
        trace!(name, %id, ?binding, "define");
        Ok(id)
    }

    /// Replace the binding of the innermost visible `name`, keeping its id.
    pub fn redefine(&mut self, name: &str, binding: Binding) -> Result<SymbolId, EmitError> {
        let symbol = self
            .scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
            .ok_or_else(|| unknown(name, "symbol"))?;
        symbol.binding = binding;
        Ok(symbol.id)
    }

    pub fn resolve(&self, name: &str) -> Result<SymbolId, EmitError> {
        self.lookup(name)
            .map(|s| s.id)
            .ok_or_else(|| unknown(name, "symbol"))
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Resolve `name`, requiring a variable binding.
    pub fn variable(&self, name: &str) -> Result<SymbolId, EmitError> {
        match self.lookup(name) {
            Some(Symbol {
                id,
                binding: Binding::Variable,
            }) => Ok(*id),
            _ => Err(unknown(name, "variable")),
        }
    }

    /// Resolve `name`, requiring a function binding. Returns its id,
    /// arity and fault flag.
    pub fn function(&self, name: &str) -> Result<(SymbolId, usize, bool), EmitError> {
        match self.lookup(name) {
            Some(Symbol {
                id,
                binding: Binding::Function { arity, may_fault },
            }) => Ok((*id, *arity, *may_fault)),
            _ => Err(unknown(name, "function")),
        }
    }
}

fn unknown(name: &str, kind: &'static str) -> EmitError {
    EmitError::UnknownSymbol {
        name: name.to_string(),
        kind,
        span: Span::dummy(),
    }
}
