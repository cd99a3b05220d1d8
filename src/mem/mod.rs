use thiserror::Error;

/// Size of the simulated address space.
pub const MEMORY_SIZE: usize = 1024 * 1024;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemError {
    #[error("address out of range: 0x{addr:08x} (+{len})")]
    OutOfRange { addr: u32, len: usize },
}

/// Access width of a single load or store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte = 1,
    Half = 2,
    Word = 4,
}

impl Width {
    pub fn bytes(self) -> usize {
        self as usize
    }
}

pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    pub fn new(bytes: usize) -> Self {
        Self {
            data: vec![0; bytes],
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    fn check_oob(&self, addr: u32, len: usize) -> Result<usize, MemError> {
        let off = addr as usize;
        let end = off
            .checked_add(len)
            .ok_or(MemError::OutOfRange { addr, len })?;
        if end > self.data.len() {
            return Err(MemError::OutOfRange { addr, len });
        }
        Ok(off)
    }

    /// Reads `width` bytes at `addr` as a little-endian unsigned value.
    pub fn read(&self, addr: u32, width: Width) -> Result<u32, MemError> {
        // No alignment restriction; any in-bounds address is accepted.
        let len = width.bytes();
        let off = self.check_oob(addr, len)?;
        let mut buf = [0u8; 4];
        buf[..len].copy_from_slice(&self.data[off..off + len]);
        Ok(u32::from_le_bytes(buf))
    }

    /// Stores the low `width` bytes of `value` at `addr`, little-endian.
    pub fn write(&mut self, addr: u32, width: Width, value: u32) -> Result<(), MemError> {
        let len = width.bytes();
        let off = self.check_oob(addr, len)?;
        self.data[off..off + len].copy_from_slice(&value.to_le_bytes()[..len]);
        Ok(())
    }

    pub fn read_u8(&self, addr: u32) -> Result<u8, MemError> {
        self.read(addr, Width::Byte).map(|v| v as u8)
    }

    pub fn read_u16(&self, addr: u32) -> Result<u16, MemError> {
        self.read(addr, Width::Half).map(|v| v as u16)
    }

    pub fn read_u32(&self, addr: u32) -> Result<u32, MemError> {
        self.read(addr, Width::Word)
    }

    pub fn write_u8(&mut self, addr: u32, v: u8) -> Result<(), MemError> {
        self.write(addr, Width::Byte, v as u32)
    }

    pub fn write_u16(&mut self, addr: u32, v: u16) -> Result<(), MemError> {
        self.write(addr, Width::Half, v as u32)
    }

    pub fn write_u32(&mut self, addr: u32, v: u32) -> Result<(), MemError> {
        self.write(addr, Width::Word, v)
    }

    pub fn write_bytes(&mut self, addr: u32, bytes: &[u8]) -> Result<(), MemError> {
        let off = self.check_oob(addr, bytes.len())?;
        self.data[off..off + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Copies `image` to address 0, truncated at capacity. Returns the byte count copied.
    pub fn load_image(&mut self, image: &[u8]) -> usize {
        let n = image.len().min(self.data.len());
        self.data[..n].copy_from_slice(&image[..n]);
        n
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}
