//! Instruction-level construction of one [`Function`].
//!
//! This is the downstream builder contract the emitter drives: create
//! blocks, pick the insertion block, append instructions, create phis and
//! fill their operands, and set terminators. Setting a terminator records
//! the current block as a predecessor of each successor.

use super::{
    BinaryOp, Block, BlockData, CmpOp, Function, Inst, Terminator, Ty, Value, ValueData,
};

pub struct FunctionBuilder {
    func: Function,
    current: Block,
    params: Vec<Value>,
}

impl FunctionBuilder {
    /// Create a function with an `entry` block holding one `param` per
    /// parameter. The entry block is the insertion point.
    pub fn new(name: &str, params: Vec<Ty>, ret: Ty) -> Self {
        let mut builder = Self {
            func: Function {
                name: name.to_string(),
                params: params.clone(),
                ret,
                blocks: vec![BlockData::new("entry")],
                values: Vec::new(),
            },
            current: Block(0),
            params: Vec::new(),
        };
        for (idx, ty) in params.into_iter().enumerate() {
            let v = builder.push_inst(Inst::Param(idx as u32), ty);
            builder.params.push(v);
        }
        builder
    }

    pub fn name(&self) -> &str {
        &self.func.name
    }

    pub fn entry(&self) -> Block {
        Block(0)
    }

    pub fn param(&self, index: usize) -> Option<Value> {
        self.params.get(index).copied()
    }

    pub fn create_block(&mut self, label: &str) -> Block {
        let block = Block(self.func.blocks.len() as u32);
        self.func.blocks.push(BlockData::new(label));
        block
    }

    pub fn set_insertion(&mut self, block: Block) {
        self.current = block;
    }

    pub fn insertion(&self) -> Block {
        self.current
    }

    pub fn block_count(&self) -> usize {
        self.func.blocks.len()
    }

    pub fn preds(&self, block: Block) -> &[Block] {
        &self.func.blocks[block.0 as usize].preds
    }

    pub fn is_terminated(&self, block: Block) -> bool {
        self.func.blocks[block.0 as usize].term.is_some()
    }

    pub fn value_ty(&self, value: Value) -> Ty {
        self.func.values[value.0 as usize].ty
    }

    pub fn inst(&self, value: Value) -> &Inst {
        &self.func.values[value.0 as usize].inst
    }

    /// Read-only view of the function under construction.
    pub fn function(&self) -> &Function {
        &self.func
    }

    pub fn finish(self) -> Function {
        self.func
    }

    // ── Instructions ──────────────────────────────────────────────

    fn new_value(&mut self, inst: Inst, ty: Ty, block: Block) -> Value {
        let v = Value(self.func.values.len() as u32);
        self.func.values.push(ValueData { ty, inst, block });
        v
    }

    /// Append an instruction to the insertion block.
    pub fn push_inst(&mut self, inst: Inst, ty: Ty) -> Value {
        let block = self.current;
        debug_assert!(
            !self.is_terminated(block),
            "appending to terminated block {}",
            block
        );
        let v = self.new_value(inst, ty, block);
        self.func.blocks[block.0 as usize].insts.push(v);
        v
    }

    pub fn iconst(&mut self, n: i64) -> Value {
        self.push_inst(Inst::IConst(n), Ty::Int)
    }

    pub fn fconst(&mut self, x: f64) -> Value {
        self.push_inst(Inst::FConst(x), Ty::Float)
    }

    pub fn ibinary(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Value {
        self.push_inst(Inst::IBinary { op, lhs, rhs }, Ty::Int)
    }

    pub fn fbinary(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Value {
        self.push_inst(Inst::FBinary { op, lhs, rhs }, Ty::Float)
    }

    pub fn icmp(&mut self, op: CmpOp, lhs: Value, rhs: Value) -> Value {
        self.push_inst(Inst::ICmp { op, lhs, rhs }, Ty::Bool)
    }

    pub fn fcmp(&mut self, op: CmpOp, lhs: Value, rhs: Value) -> Value {
        self.push_inst(Inst::FCmp { op, lhs, rhs }, Ty::Bool)
    }

    pub fn zext(&mut self, v: Value) -> Value {
        self.push_inst(Inst::ZExt(v), Ty::Int)
    }

    pub fn sitofp(&mut self, v: Value) -> Value {
        self.push_inst(Inst::SiToFp(v), Ty::Float)
    }

    pub fn fptosi(&mut self, v: Value) -> Value {
        self.push_inst(Inst::FpToSi(v), Ty::Int)
    }

    pub fn call(&mut self, callee: &str, args: Vec<Value>, ret: Ty) -> Value {
        self.push_inst(
            Inst::Call {
                callee: callee.to_string(),
                args,
            },
            ret,
        )
    }

    // ── Phis ──────────────────────────────────────────────────────

    /// Create an operand-less phi at the head of `block`.
    pub fn phi(&mut self, block: Block, ty: Ty) -> Value {
        let v = self.new_value(Inst::Phi(Vec::new()), ty, block);
        self.func.blocks[block.0 as usize].phis.push(v);
        v
    }

    pub fn add_incoming(&mut self, phi: Value, pred: Block, value: Value) {
        if let Inst::Phi(incoming) = &mut self.func.values[phi.0 as usize].inst {
            incoming.push((pred, value));
        } else {
            debug_assert!(false, "{} is not a phi", phi);
        }
    }

    pub fn phi_operands(&self, phi: Value) -> &[(Block, Value)] {
        match self.inst(phi) {
            Inst::Phi(incoming) => incoming,
            _ => &[],
        }
    }

    // ── Terminators ───────────────────────────────────────────────

    fn terminate(&mut self, term: Terminator) {
        let block = self.current;
        debug_assert!(!self.is_terminated(block), "{} terminated twice", block);
        for succ in term.successors() {
            self.func.blocks[succ.0 as usize].preds.push(block);
        }
        self.func.blocks[block.0 as usize].term = Some(term);
    }

    pub fn jump(&mut self, dest: Block) {
        self.terminate(Terminator::Jump(dest));
    }

    pub fn branch(&mut self, cond: Value, then_dest: Block, else_dest: Block) {
        self.terminate(Terminator::Branch {
            cond,
            then_dest,
            else_dest,
        });
    }

    pub fn ret(&mut self, value: Value) {
        self.terminate(Terminator::Return(value));
    }

    /// Emit a two-destination call. The returned value is the call result,
    /// available in `normal`.
    pub fn invoke(
        &mut self,
        callee: &str,
        args: Vec<Value>,
        ret: Ty,
        normal: Block,
        unwind: Block,
    ) -> Value {
        let block = self.current;
        let call = self.new_value(
            Inst::Call {
                callee: callee.to_string(),
                args,
            },
            ret,
            block,
        );
        self.terminate(Terminator::Invoke {
            call,
            normal,
            unwind,
        });
        call
    }

    pub fn raise(&mut self, payload: Value) {
        self.terminate(Terminator::Raise(payload));
    }

    pub fn resume(&mut self, fault: Value) {
        self.terminate(Terminator::Resume(fault));
    }

    pub fn unreachable(&mut self) {
        self.terminate(Terminator::Unreachable);
    }
}
