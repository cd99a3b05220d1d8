use crate::cpu::decode::Instr;

/// Per-instruction trace line, emitted at `trace` level.
pub fn trace(step: u64, pc: u32, inst: u32, instr: &Instr) {
    if log::log_enabled!(log::Level::Trace) {
        log::trace!("[{:08}] pc=0x{:08x} inst=0x{:08x} {}", step, pc, inst, instr);
    }
}
