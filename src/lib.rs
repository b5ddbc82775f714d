pub mod api;
pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostic;
pub mod ir;
pub mod syntax;

// Re-exports: flat paths for the front end
pub use syntax::lexeme;
pub(crate) use syntax::lexer;
pub(crate) use syntax::parser;
pub use syntax::span;

// Re-export public API: `jitcalc::compile()`, `jitcalc::Session` etc.
pub use api::{
    compile, compile_file, compile_with_options, function_hashes, module_hash, parse_source,
    parse_source_silent, Session, SessionError,
};
pub use codegen::{EmitError, Emission, Export};
pub use config::{CompileOptions, FaultConfig, RunOptions};
pub use diagnostic::{render_diagnostics, Diagnostic};
pub use ir::interp::{run, Execution, FaultReport, Program, RuntimeError};
pub use ir::Module;
