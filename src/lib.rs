//! Functional instruction-set simulator for the RV32I base integer ISA.
//!
//! A flat program image is copied into a 1 MiB byte-addressable memory and
//! executed one instruction at a time until an `ecall` with `a7 == 10`, an
//! unknown opcode, or an out-of-range access halts the machine.

pub mod cpu;
pub mod debug;
pub mod image;
pub mod mem;
pub mod report;

pub use cpu::Machine;
pub use cpu::halt::HaltReason;
pub use mem::{MEMORY_SIZE, Memory};
