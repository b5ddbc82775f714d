//! Reference executor for linked IR.
//!
//! Frames live on an explicit stack, so deep recursion in the source
//! program cannot overflow the host stack; the fuel limit bounds the total
//! number of executed instructions instead.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tracing::{debug, trace};

use super::{BinaryOp, Block, CmpOp, Function, Inst, Module, Terminator, Value};
use crate::config::RunOptions;

// ─── Linked program ────────────────────────────────────────────────

/// Functions available to the executor, accumulated across compilation units.
#[derive(Clone, Debug, Default)]
pub struct Program {
    functions: HashMap<String, Function>,
    order: Vec<String>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_module(module: Module) -> Self {
        let mut program = Self::new();
        program.link(module);
        program
    }

    /// Add every function of `module`. A later definition replaces an
    /// earlier one of the same name.
    pub fn link(&mut self, module: Module) {
        for func in module.functions {
            if !self.functions.contains_key(&func.name) {
                self.order.push(func.name.clone());
            }
            self.functions.insert(func.name.clone(), func);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    /// Function names in link order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// ─── Results ───────────────────────────────────────────────────────

/// A fault code caught and reported by a landing pad.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaultReport {
    pub function: String,
    pub code: i64,
}

impl fmt::Display for FaultReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fault {} caught in @{}", self.code, self.function)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Execution {
    pub value: i64,
    pub reports: Vec<FaultReport>,
    pub steps: u64,
}

#[derive(Debug, Error, PartialEq)]
pub enum RuntimeError {
    #[error("unknown function @{0}")]
    UnknownFunction(String),
    #[error("@{function} expects {expected} arguments, got {found}")]
    ArityMismatch {
        function: String,
        expected: usize,
        found: usize,
    },
    #[error("uncaught fault (code {code}) escaped @{function}")]
    UncaughtFault { function: String, code: i64 },
    #[error("unexpected fault in @{function}")]
    Unexpected { function: String },
    #[error("reached unreachable code in @{function}")]
    Unreachable { function: String },
    #[error("integer division by zero in @{function}")]
    DivisionByZero { function: String },
    #[error("fuel exhausted after {0} instructions")]
    FuelExhausted(u64),
    #[error("malformed IR in @{function}: {detail}")]
    Malformed { function: String, detail: String },
}

// ─── Runtime values ────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
struct Fault {
    code: i64,
    type_id: i64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Fault(Fault),
    Unit,
}

/// Where a callee's outcome is delivered in its caller.
#[derive(Clone, Copy, Debug)]
enum Resume {
    /// A plain call: store the result and continue after it.
    Inst(Value),
    /// An invoke: store the result and jump to `normal`, or land on `unwind`.
    Invoke {
        call: Value,
        normal: Block,
        unwind: Block,
    },
}

struct Frame<'p> {
    func: &'p Function,
    block: Block,
    next: usize,
    values: Vec<Option<Scalar>>,
    in_flight: Option<Fault>,
    waiting: Option<Resume>,
}

enum Outcome {
    Return(Scalar),
    Unwind(Fault),
}

enum Step<'p> {
    Continue,
    Call {
        callee: &'p Function,
        args: Vec<Scalar>,
    },
    Done(Outcome),
}

// ─── Machine ───────────────────────────────────────────────────────

pub struct Interpreter<'p> {
    program: &'p Program,
    options: RunOptions,
    steps: u64,
    reports: Vec<FaultReport>,
}

impl<'p> Interpreter<'p> {
    pub fn new(program: &'p Program, options: RunOptions) -> Self {
        Self {
            program,
            options,
            steps: 0,
            reports: Vec::new(),
        }
    }

    /// Call `entry` with integer arguments and run to completion.
    pub fn run(mut self, entry: &str, args: &[i64]) -> Result<Execution, RuntimeError> {
        let func = self.lookup(entry)?;
        let args: Vec<Scalar> = args.iter().map(|n| Scalar::Int(*n)).collect();
        let mut stack = vec![self.enter(func, &args)?];

        loop {
            let step = {
                let Some(frame) = stack.last_mut() else {
                    return Err(RuntimeError::Malformed {
                        function: entry.to_string(),
                        detail: "empty call stack".to_string(),
                    });
                };
                self.step(frame)?
            };

            match step {
                Step::Continue => {}
                Step::Call { callee, args } => {
                    let frame = self.enter(callee, &args)?;
                    stack.push(frame);
                }
                Step::Done(mut outcome) => {
                    let mut finished = stack.pop();
                    loop {
                        let Some(caller) = stack.last_mut() else {
                            return self.finish(entry, finished, outcome);
                        };
                        match self.deliver(caller, outcome)? {
                            None => break,
                            Some(fault) => {
                                outcome = Outcome::Unwind(fault);
                                finished = stack.pop();
                            }
                        }
                    }
                }
            }
        }
    }

    fn finish(
        self,
        entry: &str,
        frame: Option<Frame<'p>>,
        outcome: Outcome,
    ) -> Result<Execution, RuntimeError> {
        let function = frame.map_or_else(|| entry.to_string(), |f| f.func.name.clone());
        match outcome {
            Outcome::Return(Scalar::Int(value)) => Ok(Execution {
                value,
                reports: self.reports,
                steps: self.steps,
            }),
            Outcome::Return(other) => Err(RuntimeError::Malformed {
                function,
                detail: format!("returned non-integer {:?}", other),
            }),
            Outcome::Unwind(fault) => Err(RuntimeError::UncaughtFault {
                function,
                code: fault.code,
            }),
        }
    }

    /// Hand a callee's outcome to the frame waiting on it. An unwind
    /// arriving at a plain call is returned so the caller's frame is popped
    /// too and the fault moves on down the stack.
    fn deliver(
        &mut self,
        caller: &mut Frame<'p>,
        outcome: Outcome,
    ) -> Result<Option<Fault>, RuntimeError> {
        match (outcome, caller.waiting.take()) {
            (Outcome::Return(value), Some(Resume::Inst(slot))) => {
                caller.values[slot.0 as usize] = Some(value);
                caller.next += 1;
            }
            (Outcome::Return(value), Some(Resume::Invoke { call, normal, .. })) => {
                caller.values[call.0 as usize] = Some(value);
                let from = caller.block;
                self.jump(caller, from, normal)?;
            }
            (Outcome::Unwind(fault), Some(Resume::Invoke { unwind, .. })) => {
                trace!(function = %caller.func.name, code = fault.code, "landing");
                caller.in_flight = Some(fault);
                let from = caller.block;
                self.jump(caller, from, unwind)?;
            }
            (Outcome::Unwind(fault), Some(Resume::Inst(_))) => return Ok(Some(fault)),
            (_, None) => {
                return Err(malformed(
                    caller.func,
                    "callee returned to a frame that was not waiting".to_string(),
                ))
            }
        }
        Ok(None)
    }

    fn lookup(&self, name: &str) -> Result<&'p Function, RuntimeError> {
        self.program
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownFunction(name.to_string()))
    }

    fn enter(&mut self, func: &'p Function, args: &[Scalar]) -> Result<Frame<'p>, RuntimeError> {
        if args.len() != func.params.len() {
            return Err(RuntimeError::ArityMismatch {
                function: func.name.clone(),
                expected: func.params.len(),
                found: args.len(),
            });
        }
        debug!(function = %func.name, "enter");
        let mut values = vec![None; func.values.len()];
        for v in &func.block(func.entry()).insts {
            if let Inst::Param(idx) = func.value(*v).inst {
                values[v.0 as usize] = args.get(idx as usize).copied();
            }
        }
        Ok(Frame {
            func,
            block: func.entry(),
            next: 0,
            values,
            in_flight: None,
            waiting: None,
        })
    }

    fn burn(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;
        if self.steps > self.options.fuel {
            return Err(RuntimeError::FuelExhausted(self.options.fuel));
        }
        Ok(())
    }

    /// Move `frame` from `from` into `to`, evaluating `to`'s phis in parallel.
    fn jump(&mut self, frame: &mut Frame<'p>, from: Block, to: Block) -> Result<(), RuntimeError> {
        let func = frame.func;
        let mut incoming = Vec::with_capacity(func.block(to).phis.len());
        for &phi in &func.block(to).phis {
            self.burn()?;
            let Inst::Phi(operands) = &func.value(phi).inst else {
                return Err(malformed(func, format!("{} is not a phi", phi)));
            };
            let Some(&(_, v)) = operands.iter().find(|(pred, _)| *pred == from) else {
                return Err(malformed(
                    func,
                    format!("phi {} has no operand for edge {} -> {}", phi, from, to),
                ));
            };
            incoming.push((phi, read(frame, v)?));
        }
        for (phi, value) in incoming {
            frame.values[phi.0 as usize] = Some(value);
        }
        frame.block = to;
        frame.next = 0;
        Ok(())
    }

    fn step(&mut self, frame: &mut Frame<'p>) -> Result<Step<'p>, RuntimeError> {
        self.burn()?;
        let func = frame.func;
        let data = func.block(frame.block);

        if let Some(&v) = data.insts.get(frame.next) {
            let inst = &func.value(v).inst;
            if let Inst::Call { callee, args } = inst {
                let callee = self.lookup(callee)?;
                let args = args
                    .iter()
                    .map(|a| read(frame, *a))
                    .collect::<Result<Vec<_>, _>>()?;
                frame.waiting = Some(Resume::Inst(v));
                return Ok(Step::Call { callee, args });
            }
            // Parameters were bound by `enter`.
            if matches!(inst, Inst::Param(_))
                && frame.block == func.entry()
                && frame.values[v.0 as usize].is_some()
            {
                frame.next += 1;
                return Ok(Step::Continue);
            }
            let result = self.eval(frame, inst)?;
            frame.values[v.0 as usize] = Some(result);
            frame.next += 1;
            return Ok(Step::Continue);
        }

        let Some(term) = &data.term else {
            return Err(malformed(func, format!("{} has no terminator", frame.block)));
        };
        let from = frame.block;
        match term {
            Terminator::Jump(dest) => self.jump(frame, from, *dest)?,
            Terminator::Branch {
                cond,
                then_dest,
                else_dest,
            } => {
                let taken = match read(frame, *cond)? {
                    Scalar::Bool(b) => b,
                    Scalar::Int(n) => n != 0,
                    other => return Err(malformed(func, format!("branch on {:?}", other))),
                };
                let dest = if taken { *then_dest } else { *else_dest };
                self.jump(frame, from, dest)?;
            }
            Terminator::Return(v) => {
                let value = read(frame, *v)?;
                debug!(function = %func.name, ?value, "return");
                return Ok(Step::Done(Outcome::Return(value)));
            }
            Terminator::Invoke {
                call,
                normal,
                unwind,
            } => {
                let Inst::Call { callee, args } = &func.value(*call).inst else {
                    return Err(malformed(func, format!("invoke of non-call {}", call)));
                };
                let callee = self.lookup(callee)?;
                let args = args
                    .iter()
                    .map(|a| read(frame, *a))
                    .collect::<Result<Vec<_>, _>>()?;
                frame.waiting = Some(Resume::Invoke {
                    call: *call,
                    normal: *normal,
                    unwind: *unwind,
                });
                return Ok(Step::Call { callee, args });
            }
            Terminator::Raise(v) | Terminator::Resume(v) => {
                let Scalar::Fault(fault) = read(frame, *v)? else {
                    return Err(malformed(func, format!("raise of non-fault {}", v)));
                };
                debug!(function = %func.name, code = fault.code, "unwind");
                return Ok(Step::Done(Outcome::Unwind(fault)));
            }
            Terminator::Unreachable => {
                return Err(RuntimeError::Unreachable {
                    function: func.name.clone(),
                })
            }
        }
        Ok(Step::Continue)
    }

    fn eval(&mut self, frame: &mut Frame<'p>, inst: &Inst) -> Result<Scalar, RuntimeError> {
        let func = frame.func;
        let value = match inst {
            Inst::IConst(n) => Scalar::Int(*n),
            Inst::FConst(x) => Scalar::Float(*x),
            Inst::Param(idx) => {
                return Err(malformed(func, format!("param {} outside the entry block", idx)))
            }
            Inst::IBinary { op, lhs, rhs } => {
                let (a, b) = (int(frame, *lhs)?, int(frame, *rhs)?);
                Scalar::Int(match op {
                    BinaryOp::Add => a.wrapping_add(b),
                    BinaryOp::Sub => a.wrapping_sub(b),
                    BinaryOp::Mul => a.wrapping_mul(b),
                    BinaryOp::Div => {
                        if b == 0 {
                            return Err(RuntimeError::DivisionByZero {
                                function: func.name.clone(),
                            });
                        }
                        a.wrapping_div(b)
                    }
                })
            }
            Inst::FBinary { op, lhs, rhs } => {
                let (a, b) = (float(frame, *lhs)?, float(frame, *rhs)?);
                Scalar::Float(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                })
            }
            Inst::ICmp { op, lhs, rhs } => {
                let (a, b) = (int(frame, *lhs)?, int(frame, *rhs)?);
                Scalar::Bool(compare(*op, a, b))
            }
            Inst::FCmp { op, lhs, rhs } => {
                let (a, b) = (float(frame, *lhs)?, float(frame, *rhs)?);
                Scalar::Bool(compare(*op, a, b))
            }
            Inst::ZExt(v) => match read(frame, *v)? {
                Scalar::Bool(b) => Scalar::Int(b as i64),
                other => return Err(malformed(func, format!("zext of {:?}", other))),
            },
            Inst::SiToFp(v) => Scalar::Float(int(frame, *v)? as f64),
            Inst::FpToSi(v) => Scalar::Int(float(frame, *v)? as i64),
            Inst::Phi(_) => return Err(malformed(func, "phi outside block head".to_string())),
            Inst::Call { .. } => {
                return Err(malformed(func, "call evaluated as a pure instruction".to_string()))
            }
            Inst::FaultAlloc { code, type_id } => Scalar::Fault(Fault {
                code: *code,
                type_id: *type_id,
            }),
            Inst::LandingPad => match frame.in_flight.take() {
                Some(fault) => Scalar::Fault(fault),
                None => return Err(malformed(func, "landingpad without a fault".to_string())),
            },
            Inst::FaultSelector(v) => Scalar::Int(fault(frame, *v)?.type_id),
            Inst::FaultTypeId(id) => Scalar::Int(*id),
            Inst::BeginCatch(v) => Scalar::Int(fault(frame, *v)?.code),
            Inst::ReportFault(v) => {
                let code = int(frame, *v)?;
                debug!(function = %func.name, code, "fault caught");
                self.reports.push(FaultReport {
                    function: func.name.clone(),
                    code,
                });
                Scalar::Unit
            }
            Inst::EndCatch => Scalar::Unit,
            Inst::CallUnexpected(_) => {
                return Err(RuntimeError::Unexpected {
                    function: func.name.clone(),
                })
            }
        };
        Ok(value)
    }
}

fn malformed(func: &Function, detail: String) -> RuntimeError {
    RuntimeError::Malformed {
        function: func.name.clone(),
        detail,
    }
}

fn read(frame: &Frame<'_>, v: Value) -> Result<Scalar, RuntimeError> {
    frame
        .values
        .get(v.0 as usize)
        .copied()
        .flatten()
        .ok_or_else(|| malformed(frame.func, format!("read of undefined {}", v)))
}

fn int(frame: &Frame<'_>, v: Value) -> Result<i64, RuntimeError> {
    match read(frame, v)? {
        Scalar::Int(n) => Ok(n),
        other => Err(malformed(frame.func, format!("expected i64, found {:?}", other))),
    }
}

fn float(frame: &Frame<'_>, v: Value) -> Result<f64, RuntimeError> {
    match read(frame, v)? {
        Scalar::Float(x) => Ok(x),
        other => Err(malformed(frame.func, format!("expected f64, found {:?}", other))),
    }
}

fn fault(frame: &Frame<'_>, v: Value) -> Result<Fault, RuntimeError> {
    match read(frame, v)? {
        Scalar::Fault(f) => Ok(f),
        other => Err(malformed(frame.func, format!("expected fault, found {:?}", other))),
    }
}

fn compare<T: PartialOrd>(op: CmpOp, a: T, b: T) -> bool {
    match op {
        CmpOp::Lt => a < b,
        CmpOp::Gt => a > b,
        CmpOp::Eq => a == b,
        CmpOp::Ne => a != b,
    }
}

/// Run `entry` of `program` with `args`.
pub fn run(
    program: &Program,
    entry: &str,
    args: &[i64],
    options: RunOptions,
) -> Result<Execution, RuntimeError> {
    Interpreter::new(program, options).run(entry, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::FunctionBuilder;
    use crate::ir::Ty;

    fn program(functions: Vec<Function>) -> Program {
        Program::from_module(Module { functions })
    }

    fn const_fn(name: &str, n: i64) -> Function {
        let mut b = FunctionBuilder::new(name, vec![], Ty::Int);
        let v = b.iconst(n);
        b.ret(v);
        b.finish()
    }

    fn raising_fn(name: &str, code: i64) -> Function {
        let mut b = FunctionBuilder::new(name, vec![], Ty::Int);
        let payload = b.push_inst(Inst::FaultAlloc { code, type_id: 1 }, Ty::Fault);
        b.raise(payload);
        b.finish()
    }

    #[test]
    fn arithmetic_wraps() {
        let mut b = FunctionBuilder::new("f", vec![Ty::Int], Ty::Int);
        let p = b.param(0).unwrap();
        let one = b.iconst(1);
        let sum = b.ibinary(BinaryOp::Add, p, one);
        b.ret(sum);
        let prog = program(vec![b.finish()]);
        let exec = run(&prog, "f", &[i64::MAX], RunOptions::default()).unwrap();
        assert_eq!(exec.value, i64::MIN);
    }

    #[test]
    fn parameters_reach_the_body() {
        let mut b = FunctionBuilder::new("sub", vec![Ty::Int, Ty::Int], Ty::Int);
        let (x, y) = (b.param(0).unwrap(), b.param(1).unwrap());
        let diff = b.ibinary(BinaryOp::Sub, x, y);
        b.ret(diff);
        let sub = b.finish();

        let mut b = FunctionBuilder::new("caller", vec![Ty::Int], Ty::Int);
        let p = b.param(0).unwrap();
        let ten = b.iconst(10);
        let r = b.call("sub", vec![ten, p], Ty::Int);
        b.ret(r);
        let prog = program(vec![sub, b.finish()]);

        assert_eq!(run(&prog, "sub", &[9, 4], RunOptions::default()).unwrap().value, 5);
        assert_eq!(run(&prog, "caller", &[3], RunOptions::default()).unwrap().value, 7);
    }

    #[test]
    fn param_outside_entry_is_malformed() {
        let mut b = FunctionBuilder::new("bad", vec![], Ty::Int);
        let next = b.create_block("next");
        b.jump(next);
        b.set_insertion(next);
        let p = b.push_inst(Inst::Param(0), Ty::Int);
        b.ret(p);
        let prog = program(vec![b.finish()]);
        assert!(matches!(
            run(&prog, "bad", &[], RunOptions::default()),
            Err(RuntimeError::Malformed { .. })
        ));
    }

    #[test]
    fn plain_call_returns_value() {
        let mut b = FunctionBuilder::new("g", vec![], Ty::Int);
        let r = b.call("k", vec![], Ty::Int);
        let one = b.iconst(1);
        let sum = b.ibinary(BinaryOp::Add, r, one);
        b.ret(sum);
        let prog = program(vec![const_fn("k", 41), b.finish()]);
        assert_eq!(run(&prog, "g", &[], RunOptions::default()).unwrap().value, 42);
    }

    #[test]
    fn uncaught_raise_is_an_error() {
        let prog = program(vec![raising_fn("boom", 7)]);
        let err = run(&prog, "boom", &[], RunOptions::default()).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::UncaughtFault {
                function: "boom".to_string(),
                code: 7
            }
        );
    }

    #[test]
    fn raise_through_plain_call_propagates() {
        let mut b = FunctionBuilder::new("mid", vec![], Ty::Int);
        let r = b.call("boom", vec![], Ty::Int);
        b.ret(r);
        let prog = program(vec![raising_fn("boom", 3), b.finish()]);
        let err = run(&prog, "mid", &[], RunOptions::default()).unwrap_err();
        assert!(matches!(err, RuntimeError::UncaughtFault { code: 3, .. }));
    }

    #[test]
    fn invoke_lands_on_unwind_block() {
        let mut b = FunctionBuilder::new("outer", vec![], Ty::Int);
        let normal = b.create_block("normal");
        let unwind = b.create_block("unwind");
        let r = b.invoke("boom", vec![], Ty::Int, normal, unwind);
        b.set_insertion(normal);
        b.ret(r);
        b.set_insertion(unwind);
        let pad = b.push_inst(Inst::LandingPad, Ty::Fault);
        let code = b.push_inst(Inst::BeginCatch(pad), Ty::Int);
        b.push_inst(Inst::ReportFault(code), Ty::Unit);
        b.push_inst(Inst::EndCatch, Ty::Unit);
        let zero = b.iconst(0);
        b.ret(zero);
        let prog = program(vec![raising_fn("boom", 9), b.finish()]);
        let exec = run(&prog, "outer", &[], RunOptions::default()).unwrap();
        assert_eq!(exec.value, 0);
        assert_eq!(
            exec.reports,
            vec![FaultReport {
                function: "outer".to_string(),
                code: 9
            }]
        );
    }

    #[test]
    fn fuel_bounds_infinite_loops() {
        let mut b = FunctionBuilder::new("spin", vec![], Ty::Int);
        let lp = b.create_block("loop");
        b.jump(lp);
        b.set_insertion(lp);
        b.jump(lp);
        let prog = program(vec![b.finish()]);
        let err = run(&prog, "spin", &[], RunOptions::default().with_fuel(100)).unwrap_err();
        assert_eq!(err, RuntimeError::FuelExhausted(100));
    }

    #[test]
    fn unknown_entry_is_reported() {
        let prog = Program::new();
        assert_eq!(
            run(&prog, "nope", &[], RunOptions::default()).unwrap_err(),
            RuntimeError::UnknownFunction("nope".to_string())
        );
    }
}
