//! On-the-fly SSA construction.
//!
//! Variable reads are resolved against the block graph as it is being
//! built, without a dominator tree. A block is either sealed (its
//! predecessor set is final) or not. Reads that reach an unsealed block
//! leave an operand-less phi behind and register it as incomplete; sealing
//! the block fills those phis from its predecessors.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, trace};

use super::error::EmitError;
use super::symbols::SymbolId;
use crate::ir::builder::FunctionBuilder;
use crate::ir::{Block, Ty, Value};

/// Per-function SSA state. Created fresh for every function emitted.
#[derive(Default)]
pub struct SsaResolver {
    current_def: HashMap<(SymbolId, Block), Value>,
    incomplete: BTreeMap<Block, Vec<(SymbolId, Value)>>,
    sealed: HashSet<Block>,
    var_types: HashMap<SymbolId, Ty>,
    phi_owner: HashMap<Value, SymbolId>,
}

impl SsaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `var`'s type. Phis created for it carry this type.
    pub fn declare(&mut self, var: SymbolId, ty: Ty) {
        self.var_types.entry(var).or_insert(ty);
    }

    pub fn var_type(&self, var: SymbolId) -> Option<Ty> {
        self.var_types.get(&var).copied()
    }

    pub fn write_variable(&mut self, var: SymbolId, block: Block, value: Value) {
        trace!(%var, %block, %value, "write");
        self.current_def.insert((var, block), value);
    }

    pub fn read_variable(
        &mut self,
        b: &mut FunctionBuilder,
        var: SymbolId,
        block: Block,
    ) -> Result<Value, EmitError> {
        let mut pending = Vec::new();
        let value = self.resolve(b, var, block, &mut pending)?;
        self.fill_phis(b, pending)?;
        Ok(value)
    }

    /// Find the value of `var` at the end of `block` without recursing.
    ///
    /// Single-predecessor chains are walked in a loop and every block on
    /// the chain is bound to the result. A phi placed in a sealed merge
    /// block is bound first and queued on `pending` for its operands.
    fn resolve(
        &mut self,
        b: &mut FunctionBuilder,
        var: SymbolId,
        block: Block,
        pending: &mut Vec<(SymbolId, Block, Value)>,
    ) -> Result<Value, EmitError> {
        let mut chain = Vec::new();
        let mut cursor = block;
        let value = loop {
            if let Some(&value) = self.current_def.get(&(var, cursor)) {
                break value;
            }
            if !self.sealed.contains(&cursor) {
                let phi = self.new_phi(b, var, cursor)?;
                self.incomplete.entry(cursor).or_default().push((var, phi));
                trace!(%var, block = %cursor, %phi, "incomplete phi");
                chain.push(cursor);
                break phi;
            }
            let single = match b.preds(cursor) {
                [pred] => Some(*pred),
                _ => None,
            };
            match single {
                Some(pred) => {
                    chain.push(cursor);
                    cursor = pred;
                }
                None => {
                    let phi = self.new_phi(b, var, cursor)?;
                    // Bound before its operands are read, so a cycle back
                    // into this block stops here.
                    self.write_variable(var, cursor, phi);
                    pending.push((var, cursor, phi));
                    break phi;
                }
            }
        };
        for visited in chain {
            self.write_variable(var, visited, value);
        }
        Ok(value)
    }

    /// Give every queued phi one operand per predecessor, in predecessor
    /// order. Reading an operand may queue further phis.
    fn fill_phis(
        &mut self,
        b: &mut FunctionBuilder,
        mut pending: Vec<(SymbolId, Block, Value)>,
    ) -> Result<(), EmitError> {
        while let Some((var, block, phi)) = pending.pop() {
            let preds = b.preds(block).to_vec();
            for pred in preds {
                let value = self.resolve(b, var, pred, &mut pending)?;
                b.add_incoming(phi, pred, value);
            }
            trace!(%var, %block, %phi, operands = b.phi_operands(phi).len(), "phi filled");
        }
        Ok(())
    }

    fn new_phi(
        &mut self,
        b: &mut FunctionBuilder,
        var: SymbolId,
        block: Block,
    ) -> Result<Value, EmitError> {
        let ty = self.var_type(var).ok_or_else(|| {
            EmitError::internal(format!("read of undeclared variable {} in {}", var, block))
        })?;
        let phi = b.phi(block, ty);
        self.phi_owner.insert(phi, var);
        Ok(phi)
    }

    /// Declare `block`'s predecessor set final and complete its pending phis.
    pub fn seal_block(&mut self, b: &mut FunctionBuilder, block: Block) -> Result<(), EmitError> {
        if self.sealed.contains(&block) {
            return Err(EmitError::internal(format!("block {} sealed twice", block)));
        }
        let incomplete = self.incomplete.remove(&block).unwrap_or_default();
        debug!(%block, preds = b.preds(block).len(), pending = incomplete.len(), "seal");
        let pending = incomplete
            .into_iter()
            .map(|(var, phi)| (var, block, phi))
            .collect();
        self.fill_phis(b, pending)?;
        self.sealed.insert(block);
        Ok(())
    }

    pub fn is_sealed(&self, block: Block) -> bool {
        self.sealed.contains(&block)
    }

    /// Fails if any block still has phis waiting for a seal.
    pub fn finish(&self) -> Result<(), EmitError> {
        match self.incomplete.iter().find(|(_, phis)| !phis.is_empty()) {
            Some((block, phis)) => Err(EmitError::internal(format!(
                "block {} was never sealed ({} incomplete phis)",
                block,
                phis.len()
            ))),
            None => Ok(()),
        }
    }

    /// Number of phis created on behalf of `var`.
    pub fn phi_count(&self, var: SymbolId) -> usize {
        self.phi_owner.values().filter(|v| **v == var).count()
    }

    pub fn total_phis(&self) -> usize {
        self.phi_owner.len()
    }
}
