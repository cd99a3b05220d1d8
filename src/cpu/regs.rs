pub const NUM_REGISTERS: usize = 32;

/// Stack pointer.
pub const SP: u8 = 2;
/// Syscall number register for `ecall`.
pub const A7: u8 = 17;

/// General-purpose integer registers. `x0` reads as zero and ignores writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterFile {
    regs: [i32; NUM_REGISTERS],
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn read(&self, idx: u8) -> i32 {
        match idx {
            0 => 0,
            _ => self.regs[idx as usize],
        }
    }

    #[inline]
    pub fn write(&mut self, idx: u8, val: i32) {
        if idx != 0 {
            self.regs[idx as usize] = val;
        } // x0 hardwired
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        (0..NUM_REGISTERS as u8).map(|i| self.read(i))
    }
}
