pub mod decode;
pub mod exec;
pub mod fields;
pub mod halt;
pub mod regs;

use crate::mem::{MEMORY_SIZE, Memory};
use halt::{HaltReason, WithPc};
use regs::{RegisterFile, SP};

/// Address of the first instruction of a raw image.
pub const PC_START: u32 = 0;

#[derive(Debug, Default, Clone)]
pub struct Cpu {
    pub regs: RegisterFile,
    pub pc: u32,
}

pub struct Machine {
    pub cpu: Cpu,
    pub mem: Memory,
    running: bool,
    halt: Option<HaltReason>,
    /// Instructions retired so far.
    pub executed: u64,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Self::with_memory_size(MEMORY_SIZE)
    }

    /// A machine with `bytes` of memory and `sp` pointing one past its end.
    pub fn with_memory_size(bytes: usize) -> Self {
        let mut cpu = Cpu {
            pc: PC_START,
            ..Cpu::default()
        };
        cpu.regs.write(SP, bytes as i32);
        Self {
            cpu,
            mem: Memory::new(bytes),
            running: true,
            halt: None,
            executed: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn halt_reason(&self) -> Option<HaltReason> {
        self.halt
    }

    /// Reads the instruction word at the current PC.
    pub fn fetch(&self) -> Result<u32, HaltReason> {
        let pc = self.cpu.pc;
        self.mem
            .read_u32(pc)
            .map_err(|_| HaltReason::FetchOutOfRange { pc })
    }

    /// Fetch, decode and execute a single instruction.
    ///
    /// Once halted every further call returns the same reason without
    /// touching the machine state.
    pub fn step(&mut self) -> Result<(), HaltReason> {
        if let Some(reason) = self.halt {
            return Err(reason);
        }

        let pc = self.cpu.pc;
        let result = self.fetch().and_then(|inst| {
            let instr = decode::decode(inst).with_pc(pc)?;
            crate::debug::trace(self.executed, pc, inst, &instr);
            exec::execute(&mut self.cpu, &mut self.mem, instr)
        });

        match result {
            Ok(()) => {
                self.executed += 1;
                Ok(())
            }
            Err(reason) => {
                if reason.is_exit() {
                    self.executed += 1;
                }
                self.stop(reason);
                Err(reason)
            }
        }
    }

    /// Steps until the machine halts. There is no instruction budget.
    pub fn run(&mut self) -> HaltReason {
        loop {
            if let Err(reason) = self.step() {
                return reason;
            }
        }
    }

    fn stop(&mut self, reason: HaltReason) {
        log::debug!("halted after {} instructions: {}", self.executed, reason);
        self.running = false;
        self.halt = Some(reason);
    }
}
