use std::fmt;

use super::{BinaryOp, CmpOp, Function, Inst, Module, Terminator, Ty, Value};

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
        })
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CmpOp::Lt => "lt",
            CmpOp::Gt => "gt",
            CmpOp::Eq => "eq",
            CmpOp::Ne => "ne",
        })
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Value]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

impl Function {
    fn fmt_inst(&self, f: &mut fmt::Formatter<'_>, v: Value) -> fmt::Result {
        let data = self.value(v);
        if data.ty != Ty::Unit {
            write!(f, "{} = ", v)?;
        }
        match &data.inst {
            Inst::IConst(n) => write!(f, "iconst {}", n),
            Inst::FConst(x) => write!(f, "fconst {:?}", x),
            Inst::Param(idx) => write!(f, "param {}", idx),
            Inst::IBinary { op, lhs, rhs } => write!(f, "{} i64 {}, {}", op, lhs, rhs),
            Inst::FBinary { op, lhs, rhs } => write!(f, "f{} f64 {}, {}", op, lhs, rhs),
            Inst::ICmp { op, lhs, rhs } => write!(f, "icmp {} i64 {}, {}", op, lhs, rhs),
            Inst::FCmp { op, lhs, rhs } => write!(f, "fcmp {} f64 {}, {}", op, lhs, rhs),
            Inst::ZExt(x) => write!(f, "zext bool {} to i64", x),
            Inst::SiToFp(x) => write!(f, "sitofp i64 {} to f64", x),
            Inst::FpToSi(x) => write!(f, "fptosi f64 {} to i64", x),
            Inst::Phi(incoming) => {
                write!(f, "phi {}", data.ty)?;
                for (i, (pred, val)) in incoming.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{}[{}: {}]", sep, pred, val)?;
                }
                Ok(())
            }
            Inst::Call { callee, args } => {
                write!(f, "call {} @{}(", data.ty, callee)?;
                write_args(f, args)?;
                f.write_str(")")
            }
            Inst::FaultAlloc { code, type_id } => {
                write!(f, "fault.alloc {}, type {}", code, type_id)
            }
            Inst::LandingPad => f.write_str("landingpad"),
            Inst::FaultSelector(x) => write!(f, "fault.selector {}", x),
            Inst::FaultTypeId(id) => write!(f, "fault.typeid {}", id),
            Inst::BeginCatch(x) => write!(f, "fault.begin_catch {}", x),
            Inst::ReportFault(x) => write!(f, "fault.report {}", x),
            Inst::EndCatch => f.write_str("fault.end_catch"),
            Inst::CallUnexpected(x) => write!(f, "fault.unexpected {}", x),
        }
    }

    fn fmt_term(&self, f: &mut fmt::Formatter<'_>, term: &Terminator) -> fmt::Result {
        match term {
            Terminator::Jump(dest) => write!(f, "jump {}", dest),
            Terminator::Branch {
                cond,
                then_dest,
                else_dest,
            } => write!(f, "br {}, {}, {}", cond, then_dest, else_dest),
            Terminator::Return(v) => write!(f, "ret {}", v),
            Terminator::Invoke {
                call,
                normal,
                unwind,
            } => {
                let data = self.value(*call);
                match &data.inst {
                    Inst::Call { callee, args } => {
                        write!(f, "{} = invoke {} @{}(", call, data.ty, callee)?;
                        write_args(f, args)?;
                        write!(f, ") to {} unwind {}", normal, unwind)
                    }
                    other => write!(f, "invoke <malformed {:?}>", other),
                }
            }
            Terminator::Raise(v) => write!(f, "fault.raise {}", v),
            Terminator::Resume(v) => write!(f, "resume {}", v),
            Terminator::Unreachable => f.write_str("unreachable"),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn @{}(", self.name)?;
        for (i, ty) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", ty)?;
        }
        writeln!(f, ") -> {} {{", self.ret)?;
        for block in self.block_ids() {
            let data = self.block(block);
            write!(f, "{}.{}:", block, data.label)?;
            if !data.preds.is_empty() {
                f.write_str("  ; preds = ")?;
                for (i, pred) in data.preds.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", pred)?;
                }
            }
            writeln!(f)?;
            for v in data.phis.iter().chain(data.insts.iter()) {
                f.write_str("    ")?;
                self.fmt_inst(f, *v)?;
                writeln!(f)?;
            }
            match &data.term {
                Some(term) => {
                    f.write_str("    ")?;
                    self.fmt_term(f, term)?;
                    writeln!(f)?;
                }
                None => writeln!(f, "    ; <unterminated>")?,
            }
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, func) in self.functions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", func)?;
        }
        Ok(())
    }
}
