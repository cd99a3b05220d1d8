//! End-of-run register dump.

use std::io::{self, Write};

use crate::cpu::Machine;

/// Writes the textual dump, the raw little-endian register bytes and a
/// closing diagnostic line.
pub fn write_register_dump<W: Write>(out: &mut W, machine: &Machine) -> io::Result<()> {
    writeln!(out, "Register Dump:")?;
    for (i, value) in machine.cpu.regs.iter().enumerate() {
        writeln!(out, "x{:<2}: 0x{:08X} ({})", i, value as u32, value)?;
    }

    writeln!(out, "\nBinary Register Dump:")?;
    for value in machine.cpu.regs.iter() {
        out.write_all(&value.to_le_bytes())?;
    }
    writeln!(out)?;

    match machine.halt_reason() {
        Some(reason) => writeln!(
            out,
            "\nHalted after {} instructions at pc=0x{:08x}: {}",
            machine.executed,
            reason.pc(),
            reason
        ),
        None => writeln!(
            out,
            "\nStopped after {} instructions at pc=0x{:08x}",
            machine.executed, machine.cpu.pc
        ),
    }
}
