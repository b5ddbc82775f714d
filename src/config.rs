//! Compilation and execution options.

/// Identity of the one runtime fault this compiler models.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaultConfig {
    /// Code stored in the payload of a division-by-zero fault.
    pub code: i64,
    /// Type identifier landing pads compare the fault selector against.
    pub type_id: i64,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            code: 1,
            type_id: 1,
        }
    }
}

/// Options controlling compilation of one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    pub fault: FaultConfig,
    /// Run the structural verifier over every emitted function.
    pub verify: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            fault: FaultConfig::default(),
            verify: true,
        }
    }
}

impl CompileOptions {
    pub fn with_fault_code(mut self, code: i64) -> Self {
        self.fault.code = code;
        self
    }

    pub fn with_fault_type_id(mut self, type_id: i64) -> Self {
        self.fault.type_id = type_id;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}

/// Options for the IR interpreter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOptions {
    /// Maximum number of executed instructions before giving up.
    pub fuel: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { fuel: 10_000_000 }
    }
}

impl RunOptions {
    pub fn with_fuel(mut self, fuel: u64) -> Self {
        self.fuel = fuel;
        self
    }
}
