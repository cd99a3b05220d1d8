use crate::cpu::decode::DecodeError;
use crate::mem::MemError;
use thiserror::Error;

/// Why the machine stopped. Every variant is terminal.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    #[error("exit requested by ecall at pc=0x{pc:08x}")]
    Exit { pc: u32 },

    #[error("instruction fetch out of range at pc=0x{pc:08x}")]
    FetchOutOfRange { pc: u32 },

    #[error("memory access out of range at pc=0x{pc:08x}, addr={addr} width={width}")]
    AccessOutOfRange { pc: u32, addr: i64, width: usize },

    #[error("unknown instruction at pc=0x{pc:08x} inst=0x{inst:08x}")]
    UnknownInstruction { pc: u32, inst: u32 },
}

impl HaltReason {
    /// Returns the PC of the instruction that raised the halt
    pub fn pc(&self) -> u32 {
        match self {
            HaltReason::Exit { pc }
            | HaltReason::FetchOutOfRange { pc }
            | HaltReason::AccessOutOfRange { pc, .. }
            | HaltReason::UnknownInstruction { pc, .. } => *pc,
        }
    }

    /// Normal program termination, as opposed to a fault.
    pub fn is_exit(&self) -> bool {
        matches!(self, HaltReason::Exit { .. })
    }
}

/// Trait for adding PC context to errors that halt the machine
pub trait WithPc<T> {
    fn with_pc(self, pc: u32) -> Result<T, HaltReason>;
}

impl<T> WithPc<T> for Result<T, MemError> {
    fn with_pc(self, pc: u32) -> Result<T, HaltReason> {
        self.map_err(|err| match err {
            MemError::OutOfRange { addr, len } => HaltReason::AccessOutOfRange {
                pc,
                addr: addr as i64,
                width: len,
            },
        })
    }
}

impl<T> WithPc<T> for Result<T, DecodeError> {
    fn with_pc(self, pc: u32) -> Result<T, HaltReason> {
        self.map_err(|err| match err {
            DecodeError::InvalidOpcode { inst } => HaltReason::UnknownInstruction { pc, inst },
        })
    }
}
