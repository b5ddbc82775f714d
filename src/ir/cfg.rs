//! Control-flow graph view of a [`Function`] and the structural verifier.
//!
//! The graph mirrors the terminators: one node per block, one edge per
//! successor slot (so a branch with both arms on the same block yields two
//! parallel edges, matching the predecessor list).

use std::collections::HashSet;

use petgraph::algo::dominators::{self, Dominators};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use thiserror::Error;

use super::{Block, Function, Inst, Terminator, Value};

pub struct Cfg {
    graph: DiGraph<Block, ()>,
    nodes: Vec<NodeIndex>,
    entry: NodeIndex,
}

impl Cfg {
    pub fn new(func: &Function) -> Self {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = func.block_ids().map(|b| graph.add_node(b)).collect();
        for block in func.block_ids() {
            for succ in func.successors(block) {
                if let Some(&to) = nodes.get(succ.0 as usize) {
                    graph.add_edge(nodes[block.0 as usize], to, ());
                }
            }
        }
        let entry = nodes[func.entry().0 as usize];
        Self {
            graph,
            nodes,
            entry,
        }
    }

    /// Blocks reachable from the entry along terminator edges.
    pub fn reachable(&self) -> HashSet<Block> {
        let mut seen = HashSet::new();
        let mut dfs = Dfs::new(&self.graph, self.entry);
        while let Some(node) = dfs.next(&self.graph) {
            seen.insert(self.graph[node]);
        }
        seen
    }

    pub fn is_reachable(&self, block: Block) -> bool {
        self.reachable().contains(&block)
    }

    pub fn dominators(&self) -> Dominators<NodeIndex> {
        dominators::simple_fast(&self.graph, self.entry)
    }

    /// Whether `a` dominates `b`. Unreachable blocks dominate nothing.
    pub fn dominates(&self, doms: &Dominators<NodeIndex>, a: Block, b: Block) -> bool {
        let (Some(&na), Some(&nb)) = (self.nodes.get(a.0 as usize), self.nodes.get(b.0 as usize))
        else {
            return false;
        };
        match doms.dominators(nb) {
            Some(mut chain) => chain.any(|n| n == na),
            None => false,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("block {block} of @{function} has no terminator")]
    Unterminated { function: String, block: Block },
    #[error("block {block} of @{function} branches to missing block {target}")]
    MissingTarget {
        function: String,
        block: Block,
        target: Block,
    },
    #[error("block {block} of @{function} records predecessors {recorded:?}, terminators give {actual:?}")]
    PredecessorMismatch {
        function: String,
        block: Block,
        recorded: Vec<Block>,
        actual: Vec<Block>,
    },
    #[error("phi {phi} in {block} of @{function} has {operands} operands for {preds} predecessors")]
    PhiArity {
        function: String,
        block: Block,
        phi: Value,
        operands: usize,
        preds: usize,
    },
    #[error("phi {phi} in {block} of @{function} lists operands out of predecessor order")]
    PhiOrder {
        function: String,
        block: Block,
        phi: Value,
    },
    #[error("use of {value} in {block} of @{function} is not dominated by its definition")]
    NotDominated {
        function: String,
        block: Block,
        value: Value,
    },
}

/// Check the structural invariants the emitter guarantees.
pub fn verify(func: &Function) -> Result<(), VerifyError> {
    let name = || func.name.clone();
    let block_count = func.blocks.len() as u32;

    // Every block terminated, every target present.
    for block in func.block_ids() {
        let Some(term) = &func.block(block).term else {
            return Err(VerifyError::Unterminated {
                function: name(),
                block,
            });
        };
        for target in term.successors() {
            if target.0 >= block_count {
                return Err(VerifyError::MissingTarget {
                    function: name(),
                    block,
                    target,
                });
            }
        }
    }

    // Recorded predecessors agree with terminator edges.
    let mut actual: Vec<Vec<Block>> = vec![Vec::new(); func.blocks.len()];
    for block in func.block_ids() {
        for succ in func.successors(block) {
            actual[succ.0 as usize].push(block);
        }
    }
    for block in func.block_ids() {
        let mut recorded = func.preds(block).to_vec();
        let mut expected = actual[block.0 as usize].clone();
        recorded.sort();
        expected.sort();
        if recorded != expected {
            return Err(VerifyError::PredecessorMismatch {
                function: name(),
                block,
                recorded: func.preds(block).to_vec(),
                actual: actual[block.0 as usize].clone(),
            });
        }
    }

    // Phi operands: one per predecessor, in predecessor order.
    for block in func.block_ids() {
        let preds = func.preds(block);
        for &phi in &func.block(block).phis {
            let Inst::Phi(incoming) = &func.value(phi).inst else {
                continue;
            };
            if incoming.len() != preds.len() {
                return Err(VerifyError::PhiArity {
                    function: name(),
                    block,
                    phi,
                    operands: incoming.len(),
                    preds: preds.len(),
                });
            }
            if incoming.iter().map(|(b, _)| *b).ne(preds.iter().copied()) {
                return Err(VerifyError::PhiOrder {
                    function: name(),
                    block,
                    phi,
                });
            }
        }
    }

    verify_dominance(func)
}

/// Definitions dominate uses on every reachable path.
fn verify_dominance(func: &Function) -> Result<(), VerifyError> {
    let cfg = Cfg::new(func);
    let reachable = cfg.reachable();
    let doms = cfg.dominators();

    for block in func.block_ids() {
        if !reachable.contains(&block) {
            continue;
        }
        let data = func.block(block);

        // Phi operands flow along the edge, so their definition must
        // dominate the predecessor rather than the phi's block.
        for &phi in &data.phis {
            if let Inst::Phi(incoming) = &func.value(phi).inst {
                for &(pred, value) in incoming {
                    if reachable.contains(&pred)
                        && !cfg.dominates(&doms, func.value(value).block, pred)
                    {
                        return Err(VerifyError::NotDominated {
                            function: func.name.clone(),
                            block,
                            value,
                        });
                    }
                }
            }
        }

        let mut defined: HashSet<Value> = data.phis.iter().copied().collect();
        let check = |value: Value, defined: &HashSet<Value>| {
            let def_block = func.value(value).block;
            let ok = if def_block == block {
                defined.contains(&value)
            } else {
                cfg.dominates(&doms, def_block, block)
            };
            if ok {
                Ok(())
            } else {
                Err(VerifyError::NotDominated {
                    function: func.name.clone(),
                    block,
                    value,
                })
            }
        };

        for &v in &data.insts {
            for operand in func.value(v).inst.operands() {
                check(operand, &defined)?;
            }
            defined.insert(v);
        }

        let term_uses = match &data.term {
            Some(Terminator::Branch { cond, .. }) => vec![*cond],
            Some(Terminator::Return(v) | Terminator::Raise(v) | Terminator::Resume(v)) => {
                vec![*v]
            }
            Some(Terminator::Invoke { call, .. }) => func.value(*call).inst.operands(),
            _ => Vec::new(),
        };
        for operand in term_uses {
            check(operand, &defined)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::FunctionBuilder;
    use crate::ir::{CmpOp, Ty};

    fn diamond() -> Function {
        let mut b = FunctionBuilder::new("d", vec![Ty::Int], Ty::Int);
        let then_b = b.create_block("then");
        let else_b = b.create_block("else");
        let join = b.create_block("join");
        let p = b.param(0).unwrap();
        let zero = b.iconst(0);
        let cond = b.icmp(CmpOp::Gt, p, zero);
        b.branch(cond, then_b, else_b);
        b.set_insertion(then_b);
        let one = b.iconst(1);
        b.jump(join);
        b.set_insertion(else_b);
        let two = b.iconst(2);
        b.jump(join);
        b.set_insertion(join);
        let phi = b.phi(join, Ty::Int);
        b.add_incoming(phi, then_b, one);
        b.add_incoming(phi, else_b, two);
        b.ret(phi);
        b.finish()
    }

    #[test]
    fn diamond_verifies() {
        let func = diamond();
        assert_eq!(verify(&func), Ok(()));
        let cfg = Cfg::new(&func);
        assert_eq!(cfg.reachable().len(), 4);
        assert_eq!(cfg.edge_count(), 4);
    }

    #[test]
    fn dead_block_is_unreachable() {
        let mut b = FunctionBuilder::new("f", vec![], Ty::Int);
        let dead = b.create_block("dead");
        let zero = b.iconst(0);
        b.ret(zero);
        b.set_insertion(dead);
        let one = b.iconst(1);
        b.ret(one);
        let func = b.finish();
        let cfg = Cfg::new(&func);
        assert!(!cfg.is_reachable(dead));
        assert_eq!(verify(&func), Ok(()));
    }

    #[test]
    fn missing_terminator_is_reported() {
        let mut b = FunctionBuilder::new("f", vec![], Ty::Int);
        let _dangling = b.create_block("dangling");
        let zero = b.iconst(0);
        b.ret(zero);
        let err = verify(&b.finish()).unwrap_err();
        assert!(matches!(err, VerifyError::Unterminated { block: Block(1), .. }));
    }

    #[test]
    fn phi_operand_count_must_match_preds() {
        let mut func = diamond();
        let join = func.block_by_label("join").unwrap();
        let phi = func.block(join).phis[0];
        if let Inst::Phi(incoming) = &mut func.values[phi.0 as usize].inst {
            incoming.pop();
        }
        assert!(matches!(
            verify(&func),
            Err(VerifyError::PhiArity { operands: 1, preds: 2, .. })
        ));
    }

    #[test]
    fn phi_operand_order_must_match_preds() {
        let mut func = diamond();
        let join = func.block_by_label("join").unwrap();
        let phi = func.block(join).phis[0];
        if let Inst::Phi(incoming) = &mut func.values[phi.0 as usize].inst {
            incoming.reverse();
        }
        assert!(matches!(verify(&func), Err(VerifyError::PhiOrder { .. })));
    }

    #[test]
    fn use_outside_dominance_is_rejected() {
        let mut b = FunctionBuilder::new("f", vec![Ty::Int], Ty::Int);
        let then_b = b.create_block("then");
        let join = b.create_block("join");
        let p = b.param(0).unwrap();
        let cond = b.icmp(CmpOp::Eq, p, p);
        b.branch(cond, then_b, join);
        b.set_insertion(then_b);
        let only_here = b.iconst(5);
        b.jump(join);
        b.set_insertion(join);
        b.ret(only_here);
        assert!(matches!(
            verify(&b.finish()),
            Err(VerifyError::NotDominated { .. })
        ));
    }
}
