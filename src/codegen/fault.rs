//! Lowering of the division-by-zero fault.
//!
//! Two triggers shape the block graph:
//!
//! * an integer division checks its divisor first; the zero path allocates
//!   a fault payload and raises it, the other path divides.
//! * a call to a fault-flagged function becomes an `invoke` whose unwind
//!   edge lands on a handler that catches this program's fault type and
//!   returns 0, forwards other faults up the stack, and traps on foreign
//!   (negative selector) ones.
//!
//! Every block created here has exactly one predecessor, so each is sealed
//! as soon as the branch targeting it is emitted.

use tracing::debug;

use super::blocks::BlockManager;
use super::error::EmitError;
use super::ssa::SsaResolver;
use crate::config::FaultConfig;
use crate::ir::{BinaryOp, Block, CmpOp, Inst, Ty, Value};

/// Stages a fault passes through on its way from a checked operation to
/// a handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultState {
    /// Ordinary control flow.
    Normal,
    /// Testing a divisor or a landed fault's selector.
    Checking,
    /// A fault exists and did not match this program's type.
    Faulted,
    /// Matched: report it and return 0.
    Caught,
    /// Continue unwinding into the caller.
    Cleanup,
    /// Foreign fault; hand it to the platform hook.
    Unexpected,
}

impl FaultState {
    /// Block label used for the block that realizes this state.
    pub fn label(self) -> &'static str {
        match self {
            FaultState::Normal => "fault.normal",
            FaultState::Checking => "fault.landing",
            FaultState::Faulted => "fault.faulted",
            FaultState::Caught => "fault.caught",
            FaultState::Cleanup => "fault.cleanup",
            FaultState::Unexpected => "fault.unexpected",
        }
    }
}

/// Blocks created for one checked division.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DivisionSites {
    /// Block holding the divisor test.
    pub check: Block,
    /// Raises the fault.
    pub zero: Block,
    /// Performs the division; current afterwards.
    pub okay: Block,
}

/// Blocks created for one invoke of a fault-flagged callee.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvokeSites {
    pub normal: Block,
    pub landing: Block,
    pub caught: Block,
    pub faulted: Block,
    pub unexpected: Block,
    pub cleanup: Block,
}

impl InvokeSites {
    pub fn block(&self, state: FaultState) -> Block {
        match state {
            FaultState::Normal => self.normal,
            FaultState::Checking => self.landing,
            FaultState::Faulted => self.faulted,
            FaultState::Caught => self.caught,
            FaultState::Cleanup => self.cleanup,
            FaultState::Unexpected => self.unexpected,
        }
    }
}

pub struct FaultLowering {
    config: FaultConfig,
}

impl FaultLowering {
    pub fn new(config: FaultConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> FaultConfig {
        self.config
    }

    /// `lhs / rhs` on integers, guarded against a zero divisor.
    pub fn checked_div(
        &self,
        blocks: &mut BlockManager,
        ssa: &mut SsaResolver,
        lhs: Value,
        rhs: Value,
    ) -> Result<(Value, DivisionSites), EmitError> {
        let check = blocks.current_block()?;
        let zero_block = blocks.new_block("div.zero")?;
        let okay = blocks.new_block("div.ok")?;

        let b = blocks.builder()?;
        let zero = b.iconst(0);
        let is_zero = b.icmp(CmpOp::Eq, rhs, zero);
        b.branch(is_zero, zero_block, okay);
        ssa.seal_block(b, zero_block)?;
        ssa.seal_block(b, okay)?;

        b.set_insertion(zero_block);
        let payload = b.push_inst(
            Inst::FaultAlloc {
                code: self.config.code,
                type_id: self.config.type_id,
            },
            Ty::Fault,
        );
        b.raise(payload);

        b.set_insertion(okay);
        let quotient = b.ibinary(BinaryOp::Div, lhs, rhs);
        debug!(
            function = b.name(),
            %check,
            zero = %zero_block,
            okay = %okay,
            "checked division"
        );
        Ok((
            quotient,
            DivisionSites {
                check,
                zero: zero_block,
                okay,
            },
        ))
    }

    /// Call `callee` through an invoke and build its landing pad. The
    /// normal continuation is current afterwards.
    pub fn invoke(
        &self,
        blocks: &mut BlockManager,
        ssa: &mut SsaResolver,
        callee: &str,
        args: Vec<Value>,
    ) -> Result<(Value, InvokeSites), EmitError> {
        let sites = InvokeSites {
            normal: blocks.new_block(FaultState::Normal.label())?,
            landing: blocks.new_block(FaultState::Checking.label())?,
            caught: blocks.new_block(FaultState::Caught.label())?,
            faulted: blocks.new_block(FaultState::Faulted.label())?,
            unexpected: blocks.new_block(FaultState::Unexpected.label())?,
            cleanup: blocks.new_block(FaultState::Cleanup.label())?,
        };

        let b = blocks.builder()?;
        let result = b.invoke(callee, args, Ty::Int, sites.normal, sites.landing);
        ssa.seal_block(b, sites.normal)?;
        ssa.seal_block(b, sites.landing)?;

        // Checking: does the landed fault belong to this program?
        b.set_insertion(sites.landing);
        let pad = b.push_inst(Inst::LandingPad, Ty::Fault);
        let selector = b.push_inst(Inst::FaultSelector(pad), Ty::Int);
        let type_id = b.push_inst(Inst::FaultTypeId(self.config.type_id), Ty::Int);
        let matches = b.icmp(CmpOp::Eq, selector, type_id);
        b.branch(matches, sites.caught, sites.faulted);
        ssa.seal_block(b, sites.caught)?;
        ssa.seal_block(b, sites.faulted)?;

        // Caught: report, release, return 0.
        b.set_insertion(sites.caught);
        let code = b.push_inst(Inst::BeginCatch(pad), Ty::Int);
        b.push_inst(Inst::ReportFault(code), Ty::Unit);
        b.push_inst(Inst::EndCatch, Ty::Unit);
        let zero = b.iconst(0);
        b.ret(zero);

        // Faulted: foreign faults carry a negative selector.
        b.set_insertion(sites.faulted);
        let zero = b.iconst(0);
        let foreign = b.icmp(CmpOp::Lt, selector, zero);
        b.branch(foreign, sites.unexpected, sites.cleanup);
        ssa.seal_block(b, sites.unexpected)?;
        ssa.seal_block(b, sites.cleanup)?;

        b.set_insertion(sites.unexpected);
        b.push_inst(Inst::CallUnexpected(pad), Ty::Unit);
        b.unreachable();

        b.set_insertion(sites.cleanup);
        b.resume(pad);

        b.set_insertion(sites.normal);
        debug!(
            function = b.name(),
            callee,
            normal = %sites.normal,
            landing = %sites.landing,
            "invoke"
        );
        Ok((result, sites))
    }
}
