//! Program image loading.
//!
//! A raw image is copied verbatim to address 0. An ELF image has each
//! `PT_LOAD` segment placed at its virtual address and execution starts at
//! the ELF entry point.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use goblin::elf::{
    Elf,
    header::{self, ELFCLASS32, ELFDATA2LSB, EM_RISCV, ET_DYN, ET_EXEC},
    program_header::PT_LOAD,
};
use thiserror::Error;

use crate::cpu::Machine;
use crate::mem::{MemError, Memory};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("could not open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed ELF: {0}")]
    Elf(#[from] goblin::error::Error),

    #[error("unsupported ELF: {0}")]
    UnsupportedElf(&'static str),

    #[error("segment [0x{start:x},0x{end:x}) outside {size}-byte memory")]
    SegmentOutOfRange { start: u64, end: u64, size: usize },

    #[error("memory write failed: {0}")]
    Mem(#[from] MemError),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ImageFormat {
    /// Flat binary copied to address 0
    #[default]
    Raw,
    /// 32-bit little-endian RISC-V ELF executable
    Elf,
}

fn io_error(path: &Path, source: io::Error) -> LoadError {
    LoadError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Loads `path` into `machine` and points the PC at its first instruction.
pub fn load(
    path: impl AsRef<Path>,
    format: ImageFormat,
    machine: &mut Machine,
) -> Result<(), LoadError> {
    let path = path.as_ref();
    match format {
        ImageFormat::Raw => {
            let n = load_raw(path, &mut machine.mem)?;
            log::debug!("loaded {n} bytes from {}", path.display());
        }
        ImageFormat::Elf => {
            let entry = load_elf(path, &mut machine.mem)?;
            log::debug!("loaded ELF {} with entry 0x{entry:08x}", path.display());
            machine.cpu.pc = entry;
        }
    }
    Ok(())
}

/// Copies the file to address 0, truncating at memory capacity.
/// Returns the number of bytes copied.
pub fn load_raw(path: impl AsRef<Path>, mem: &mut Memory) -> Result<usize, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let mut bytes = Vec::new();
    file.take(mem.size() as u64)
        .read_to_end(&mut bytes)
        .map_err(|e| io_error(path, e))?;
    Ok(mem.load_image(&bytes))
}

/// Loads every `PT_LOAD` segment and returns the entry point.
pub fn load_elf(path: impl AsRef<Path>, mem: &mut Memory) -> Result<u32, LoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| io_error(path, e))?;
    let elf = Elf::parse(&bytes)?;

    // Basic sanity checks so we fail fast on bad inputs
    if elf.header.e_ident[header::EI_CLASS] != ELFCLASS32 {
        return Err(LoadError::UnsupportedElf("expected 32-bit ELF"));
    }
    if elf.header.e_ident[header::EI_DATA] != ELFDATA2LSB {
        return Err(LoadError::UnsupportedElf("expected little-endian ELF"));
    }
    if elf.header.e_machine != EM_RISCV {
        return Err(LoadError::UnsupportedElf("expected RISC-V ELF"));
    }
    if elf.header.e_type != ET_EXEC && elf.header.e_type != ET_DYN {
        return Err(LoadError::UnsupportedElf(
            "unsupported ELF type (want ET_EXEC or ET_DYN)",
        ));
    }

    let size = mem.size();

    for ph in elf.program_headers.iter().filter(|ph| ph.p_type == PT_LOAD) {
        let start = ph.p_vaddr;
        let end = start.saturating_add(ph.p_memsz);
        if ph.p_memsz < ph.p_filesz {
            return Err(LoadError::UnsupportedElf("p_memsz smaller than p_filesz"));
        }
        if end > size as u64 {
            return Err(LoadError::SegmentOutOfRange { start, end, size });
        }

        let file_off = ph.p_offset as usize;
        let file_sz = ph.p_filesz as usize;
        let seg = file_off
            .checked_add(file_sz)
            .and_then(|file_end| bytes.get(file_off..file_end))
            .ok_or(LoadError::UnsupportedElf("segment outside file"))?;

        // end <= size, so the start fits in u32
        let vaddr = start as u32;
        mem.write_bytes(vaddr, seg)?;

        // Zero-fill bss (p_memsz may be larger than p_filesz)
        let bss = (ph.p_memsz - ph.p_filesz) as usize;
        if bss > 0 {
            mem.write_bytes(vaddr + file_sz as u32, &vec![0u8; bss])?;
        }
    }

    u32::try_from(elf.entry).map_err(|_| LoadError::UnsupportedElf("entry point overflow"))
}
