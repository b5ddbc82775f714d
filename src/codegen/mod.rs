//! The compiler core: symbol scopes, block bookkeeping, on-the-fly SSA
//! construction, fault lowering and the AST walker that drives them.

pub mod blocks;
pub mod emitter;
pub mod error;
pub mod fault;
pub mod ssa;
pub mod symbols;

pub use emitter::{Emission, Emitter, Export};
pub use error::EmitError;
