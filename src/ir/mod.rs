//! SSA intermediate representation produced by the emitter.
//!
//! A `Function` owns a flat arena of values and a list of basic blocks.
//! Every instruction is a value (possibly of type `Unit`). Blocks keep their
//! phis at the head, then ordinary instructions, then one terminator.
//! Predecessor lists are maintained by the builder as terminators are set,
//! in edge-creation order; phi operands follow that order.

pub mod builder;
pub mod cfg;
mod display;
pub mod interp;

use std::fmt;

// ─── Handles ───────────────────────────────────────────────────────

/// An SSA value handle, local to one function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Value(pub u32);

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// A basic block handle, local to one function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block(pub u32);

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

// ─── Types ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    Int,
    Float,
    Bool,
    /// Opaque in-flight fault object (landing pad result / raised payload).
    Fault,
    Unit,
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Ty::Int => "i64",
            Ty::Float => "f64",
            Ty::Bool => "bool",
            Ty::Fault => "fault",
            Ty::Unit => "unit",
        };
        f.write_str(s)
    }
}

// ─── Instructions ──────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Gt,
    Eq,
    Ne,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Inst {
    IConst(i64),
    FConst(f64),
    Param(u32),
    IBinary {
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
    },
    FBinary {
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
    },
    ICmp {
        op: CmpOp,
        lhs: Value,
        rhs: Value,
    },
    FCmp {
        op: CmpOp,
        lhs: Value,
        rhs: Value,
    },
    /// Bool -> Int (0 or 1).
    ZExt(Value),
    SiToFp(Value),
    FpToSi(Value),
    /// Join node: one `(predecessor, value)` operand per incoming edge.
    Phi(Vec<(Block, Value)>),
    /// Plain call, or the call half of an `invoke` terminator.
    Call {
        callee: String,
        args: Vec<Value>,
    },
    /// Allocate a fault payload carrying `code`, tagged with `type_id`.
    FaultAlloc {
        code: i64,
        type_id: i64,
    },
    /// The in-flight fault arriving at an unwind block.
    LandingPad,
    /// Type selector of an in-flight fault. Negative means foreign/unexpected.
    FaultSelector(Value),
    /// This program's fault type identifier.
    FaultTypeId(i64),
    /// Enter the catch handler; yields the fault code.
    BeginCatch(Value),
    /// Report a caught fault code.
    ReportFault(Value),
    /// Release catch-handler state.
    EndCatch,
    /// Platform hook for faults that match no handler.
    CallUnexpected(Value),
}

impl Inst {
    /// Values read by this instruction, in operand order.
    pub fn operands(&self) -> Vec<Value> {
        match self {
            Inst::IConst(_)
            | Inst::FConst(_)
            | Inst::Param(_)
            | Inst::FaultAlloc { .. }
            | Inst::LandingPad
            | Inst::FaultTypeId(_)
            | Inst::EndCatch => Vec::new(),
            Inst::IBinary { lhs, rhs, .. }
            | Inst::FBinary { lhs, rhs, .. }
            | Inst::ICmp { lhs, rhs, .. }
            | Inst::FCmp { lhs, rhs, .. } => vec![*lhs, *rhs],
            Inst::ZExt(v)
            | Inst::SiToFp(v)
            | Inst::FpToSi(v)
            | Inst::FaultSelector(v)
            | Inst::BeginCatch(v)
            | Inst::ReportFault(v)
            | Inst::CallUnexpected(v) => vec![*v],
            Inst::Phi(incoming) => incoming.iter().map(|(_, v)| *v).collect(),
            Inst::Call { args, .. } => args.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Terminator {
    Jump(Block),
    Branch {
        cond: Value,
        then_dest: Block,
        else_dest: Block,
    },
    Return(Value),
    /// Two-destination call. `call` is the value holding the `Inst::Call`;
    /// it is defined only on the edge to `normal`.
    Invoke {
        call: Value,
        normal: Block,
        unwind: Block,
    },
    /// Non-local raise of a fault payload. Has no successors.
    Raise(Value),
    /// Continue unwinding an in-flight fault to the caller.
    Resume(Value),
    Unreachable,
}

impl Terminator {
    /// Successor blocks in edge order.
    pub fn successors(&self) -> Vec<Block> {
        match self {
            Terminator::Jump(dest) => vec![*dest],
            Terminator::Branch {
                then_dest,
                else_dest,
                ..
            } => vec![*then_dest, *else_dest],
            Terminator::Invoke { normal, unwind, .. } => vec![*normal, *unwind],
            Terminator::Return(_)
            | Terminator::Raise(_)
            | Terminator::Resume(_)
            | Terminator::Unreachable => Vec::new(),
        }
    }
}

// ─── Containers ────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct ValueData {
    pub ty: Ty,
    pub inst: Inst,
    pub block: Block,
}

#[derive(Clone, Debug)]
pub struct BlockData {
    pub label: String,
    pub phis: Vec<Value>,
    pub insts: Vec<Value>,
    pub term: Option<Terminator>,
    pub preds: Vec<Block>,
}

impl BlockData {
    pub(crate) fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            phis: Vec::new(),
            insts: Vec::new(),
            term: None,
            preds: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub params: Vec<Ty>,
    pub ret: Ty,
    pub blocks: Vec<BlockData>,
    pub values: Vec<ValueData>,
}

impl Function {
    pub fn entry(&self) -> Block {
        Block(0)
    }

    pub fn block(&self, block: Block) -> &BlockData {
        &self.blocks[block.0 as usize]
    }

    pub fn value(&self, value: Value) -> &ValueData {
        &self.values[value.0 as usize]
    }

    pub fn preds(&self, block: Block) -> &[Block] {
        &self.block(block).preds
    }

    pub fn successors(&self, block: Block) -> Vec<Block> {
        self.block(block)
            .term
            .as_ref()
            .map(|t| t.successors())
            .unwrap_or_default()
    }

    pub fn block_ids(&self) -> impl Iterator<Item = Block> {
        (0..self.blocks.len() as u32).map(Block)
    }

    /// First block carrying `label`, if any.
    pub fn block_by_label(&self, label: &str) -> Option<Block> {
        self.block_ids().find(|b| self.block(*b).label == label)
    }

    /// All phi values in the function, in block order.
    pub fn phis(&self) -> Vec<Value> {
        self.blocks.iter().flat_map(|b| b.phis.iter().copied()).collect()
    }

    /// Count of values whose instruction satisfies `pred`, including
    /// the call halves of invokes.
    pub fn count_insts(&self, pred: impl Fn(&Inst) -> bool) -> usize {
        self.values.iter().filter(|v| pred(&v.inst)).count()
    }

    /// Number of `invoke` terminators.
    pub fn invoke_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b.term, Some(Terminator::Invoke { .. })))
            .count()
    }
}

/// The functions produced by one compilation.
#[derive(Clone, Debug, Default)]
pub struct Module {
    pub functions: Vec<Function>,
}

impl Module {
    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}
