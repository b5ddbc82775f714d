//! Incremental compilation for the REPL.
//!
//! Each input is its own compilation unit with fresh core state. The only
//! thing carried from one unit to the next is the list of exported
//! functions, copied into the new unit's symbol table, and the linked
//! program the interpreter runs against.

use thiserror::Error;
use tracing::debug;

use super::{compile_ast, parse_source_silent, CompileOptions, Diagnostic, Emission, Export};
use crate::config::RunOptions;
use crate::ir::interp::{run, Execution, Program, RuntimeError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{} compile error(s)", .0.len())]
    Compile(Vec<Diagnostic>),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

#[derive(Default)]
pub struct Session {
    options: CompileOptions,
    run_options: RunOptions,
    exports: Vec<Export>,
    program: Program,
    units: usize,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_run_options(mut self, run_options: RunOptions) -> Self {
        self.run_options = run_options;
        self
    }

    /// Compile one unit and link it. A failing unit leaves the session
    /// untouched.
    pub fn compile_unit(&mut self, source: &str) -> Result<Emission, Vec<Diagnostic>> {
        let ast = parse_source_silent(source)?;
        let unit_name = format!("__repl_{}", self.units);
        let emission = compile_ast(&ast, &self.options, &self.exports, &unit_name)?;

        self.units += 1;
        self.exports.extend(emission.exports.iter().cloned());
        self.program.link(emission.module.clone());
        debug!(
            unit = %unit_name,
            functions = emission.module.functions.len(),
            exports = self.exports.len(),
            "unit linked"
        );
        Ok(emission)
    }

    /// Compile a unit and run its top-level statements. Units holding only
    /// function definitions produce no execution.
    pub fn eval(&mut self, source: &str) -> Result<Option<Execution>, SessionError> {
        let emission = self.compile_unit(source).map_err(SessionError::Compile)?;
        match emission.unit {
            Some(unit) => Ok(Some(run(&self.program, &unit, &[], self.run_options)?)),
            None => Ok(None),
        }
    }

    /// Functions exported so far, in definition order.
    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn run_options(&self) -> &RunOptions {
        &self.run_options
    }

    /// Number of units compiled successfully.
    pub fn units(&self) -> usize {
        self.units
    }
}
