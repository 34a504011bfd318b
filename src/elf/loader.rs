/*!
 * ELF Image Loader
 *
 * Pure parser: given the bytes of an executable image, validates the ELF64
 * headers and computes the load plan (entry point, base address, contiguous
 * size, dynamic-linking need). It never maps memory; mapping is the
 * lifecycle manager's job through the VMM collaborator, which keeps this
 * component independently testable against crafted buffers.
 */

use crate::core::types::Address;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;
const EM_X86_64: u16 = 62;
const ET_EXEC: u16 = 2;
const ET_DYN: u16 = 3;
const PT_LOAD: u32 = 1;
const PT_INTERP: u32 = 3;

const EHDR_SIZE: usize = 64;
const PHDR_SIZE: usize = 56;

/// Loader errors. Every malformation is distinct so a corrupt image is
/// diagnosable from the error alone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    #[error("image truncated: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    #[error("bad ELF magic")]
    BadMagic,

    #[error("unsupported ELF class {0:#x} (need ELFCLASS64)")]
    BadClass(u8),

    #[error("unsupported byte order {0:#x} (need little-endian)")]
    BadEndian(u8),

    #[error("unsupported machine {0} (need x86-64)")]
    BadMachine(u16),

    #[error("unsupported object type {0} (need ET_EXEC or ET_DYN)")]
    BadType(u16),

    #[error("bad program header geometry: entsize {entsize}, count {count}")]
    BadPhdrGeometry { entsize: usize, count: usize },

    #[error("segment out of bounds: offset {offset:#x}, size {size:#x}")]
    SegmentOutOfBounds { offset: u64, size: u64 },

    #[error("segment address range overflows")]
    AddressOverflow,

    #[error("no loadable segments")]
    NoLoadSegments,

    #[error("bad interpreter path")]
    BadInterpreter,
}

pub type LoaderResult<T> = Result<T, LoaderError>;

/// Read-only description of how an image wants to be placed in memory.
/// Produced once per load request; consumed by the lifecycle manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ImageDescriptor {
    /// Entry point virtual address
    pub entry_point: Address,
    /// Lowest PT_LOAD virtual address
    pub base_address: Address,
    /// Minimal contiguous virtual range covering every PT_LOAD segment
    pub load_size: u64,
    /// True for ET_DYN images or those requesting an interpreter
    pub is_dynamic: bool,
    /// PT_INTERP path, if the image requests a dynamic interpreter
    pub interpreter: Option<String>,
}

impl ImageDescriptor {
    /// One-past-the-end of the load range; where the heap begins.
    #[inline]
    #[must_use]
    pub const fn load_end(&self) -> Address {
        self.base_address + self.load_size
    }
}

/// Parse an ELF64 executable image into a load plan.
pub fn parse(bytes: &[u8]) -> LoaderResult<ImageDescriptor> {
    if bytes.len() < EHDR_SIZE {
        return Err(LoaderError::Truncated {
            need: EHDR_SIZE,
            have: bytes.len(),
        });
    }
    if bytes[..4] != ELF_MAGIC {
        return Err(LoaderError::BadMagic);
    }
    if bytes[4] != ELFCLASS64 {
        return Err(LoaderError::BadClass(bytes[4]));
    }
    if bytes[5] != ELFDATA2LSB {
        return Err(LoaderError::BadEndian(bytes[5]));
    }

    let e_type = read_u16(bytes, 16)?;
    if e_type != ET_EXEC && e_type != ET_DYN {
        return Err(LoaderError::BadType(e_type));
    }
    let e_machine = read_u16(bytes, 18)?;
    if e_machine != EM_X86_64 {
        return Err(LoaderError::BadMachine(e_machine));
    }

    let entry_point = read_u64(bytes, 24)?;
    let phoff = read_u64(bytes, 32)? as usize;
    let phentsize = read_u16(bytes, 54)? as usize;
    let phnum = read_u16(bytes, 56)? as usize;

    if phentsize != PHDR_SIZE || phnum == 0 {
        return Err(LoaderError::BadPhdrGeometry {
            entsize: phentsize,
            count: phnum,
        });
    }
    let table_end = phoff
        .checked_add(phnum.checked_mul(PHDR_SIZE).ok_or(LoaderError::AddressOverflow)?)
        .ok_or(LoaderError::AddressOverflow)?;
    if table_end > bytes.len() {
        return Err(LoaderError::Truncated {
            need: table_end,
            have: bytes.len(),
        });
    }

    let mut lo: Option<Address> = None;
    let mut hi: Address = 0;
    let mut interpreter: Option<String> = None;

    for i in 0..phnum {
        let ph = phoff + i * PHDR_SIZE;
        let p_type = read_u32(bytes, ph)?;
        match p_type {
            PT_LOAD => {
                let vaddr = read_u64(bytes, ph + 16)?;
                let memsz = read_u64(bytes, ph + 40)?;
                let end = vaddr.checked_add(memsz).ok_or(LoaderError::AddressOverflow)?;
                lo = Some(lo.map_or(vaddr, |v| v.min(vaddr)));
                hi = hi.max(end);
            }
            PT_INTERP => {
                let offset = read_u64(bytes, ph + 8)?;
                let filesz = read_u64(bytes, ph + 32)?;
                let start = offset as usize;
                let end = start
                    .checked_add(filesz as usize)
                    .ok_or(LoaderError::AddressOverflow)?;
                if end > bytes.len() {
                    return Err(LoaderError::SegmentOutOfBounds {
                        offset,
                        size: filesz,
                    });
                }
                let raw = &bytes[start..end];
                let path = raw.strip_suffix(&[0u8]).unwrap_or(raw);
                let path =
                    std::str::from_utf8(path).map_err(|_| LoaderError::BadInterpreter)?;
                if path.is_empty() {
                    return Err(LoaderError::BadInterpreter);
                }
                interpreter = Some(path.to_string());
            }
            _ => {}
        }
    }

    let base_address = lo.ok_or(LoaderError::NoLoadSegments)?;
    let descriptor = ImageDescriptor {
        entry_point,
        base_address,
        load_size: hi - base_address,
        is_dynamic: e_type == ET_DYN || interpreter.is_some(),
        interpreter,
    };
    debug!(
        "parsed image: entry {:#x}, base {:#x}, size {:#x}, dynamic={}",
        descriptor.entry_point, descriptor.base_address, descriptor.load_size, descriptor.is_dynamic
    );
    Ok(descriptor)
}

fn read_u16(bytes: &[u8], off: usize) -> LoaderResult<u16> {
    field(bytes, off, 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(bytes: &[u8], off: usize) -> LoaderResult<u32> {
    field(bytes, off, 4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_u64(bytes: &[u8], off: usize) -> LoaderResult<u64> {
    field(bytes, off, 8).map(|b| {
        u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
    })
}

fn field(bytes: &[u8], off: usize, len: usize) -> LoaderResult<&[u8]> {
    let end = off.checked_add(len).ok_or(LoaderError::AddressOverflow)?;
    bytes.get(off..end).ok_or(LoaderError::Truncated {
        need: end,
        have: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal valid ELF64 image: one PT_LOAD at `vaddr`, optionally
    /// a PT_INTERP naming `interp`.
    pub(crate) fn build_elf(e_type: u16, vaddr: u64, memsz: u64, interp: Option<&str>) -> Vec<u8> {
        let phnum = if interp.is_some() { 2 } else { 1 };
        let interp_bytes = interp.map(|s| {
            let mut b = s.as_bytes().to_vec();
            b.push(0);
            b
        });
        let interp_off = (EHDR_SIZE + phnum * PHDR_SIZE) as u64;

        let mut img = vec![0u8; EHDR_SIZE + phnum * PHDR_SIZE];
        img[..4].copy_from_slice(&ELF_MAGIC);
        img[4] = ELFCLASS64;
        img[5] = ELFDATA2LSB;
        img[6] = 1; // EV_CURRENT
        img[16..18].copy_from_slice(&e_type.to_le_bytes());
        img[18..20].copy_from_slice(&EM_X86_64.to_le_bytes());
        img[24..32].copy_from_slice(&vaddr.wrapping_add(0x78).to_le_bytes()); // entry
        img[32..40].copy_from_slice(&(EHDR_SIZE as u64).to_le_bytes()); // phoff
        img[54..56].copy_from_slice(&(PHDR_SIZE as u16).to_le_bytes());
        img[56..58].copy_from_slice(&(phnum as u16).to_le_bytes());

        let ph0 = EHDR_SIZE;
        img[ph0..ph0 + 4].copy_from_slice(&PT_LOAD.to_le_bytes());
        img[ph0 + 16..ph0 + 24].copy_from_slice(&vaddr.to_le_bytes());
        img[ph0 + 40..ph0 + 48].copy_from_slice(&memsz.to_le_bytes());

        if let Some(bytes) = interp_bytes {
            let ph1 = EHDR_SIZE + PHDR_SIZE;
            img[ph1..ph1 + 4].copy_from_slice(&PT_INTERP.to_le_bytes());
            img[ph1 + 8..ph1 + 16].copy_from_slice(&interp_off.to_le_bytes());
            img[ph1 + 32..ph1 + 40].copy_from_slice(&(bytes.len() as u64).to_le_bytes());
            img.extend_from_slice(&bytes);
        }
        img
    }

    #[test]
    fn test_static_image() {
        let img = build_elf(ET_EXEC, 0x400000, 0x3000, None);
        let desc = parse(&img).unwrap();
        assert_eq!(desc.base_address, 0x400000);
        assert_eq!(desc.load_size, 0x3000);
        assert_eq!(desc.entry_point, 0x400078);
        assert!(!desc.is_dynamic);
        assert!(desc.interpreter.is_none());
    }

    #[test]
    fn test_dynamic_image_with_interpreter() {
        let img = build_elf(ET_EXEC, 0x400000, 0x1000, Some("/lib64/ld-linux-x86-64.so.2"));
        let desc = parse(&img).unwrap();
        assert!(desc.is_dynamic);
        assert_eq!(
            desc.interpreter.as_deref(),
            Some("/lib64/ld-linux-x86-64.so.2")
        );
    }

    #[test]
    fn test_et_dyn_is_dynamic() {
        let img = build_elf(ET_DYN, 0, 0x1000, None);
        assert!(parse(&img).unwrap().is_dynamic);
    }

    #[test]
    fn test_truncated_header() {
        let img = build_elf(ET_EXEC, 0x400000, 0x1000, None);
        for cut in [0, 3, 16, EHDR_SIZE - 1] {
            let err = parse(&img[..cut]).unwrap_err();
            assert!(matches!(err, LoaderError::Truncated { .. }), "cut={}", cut);
        }
    }

    #[test]
    fn test_truncated_phdr_table() {
        let img = build_elf(ET_EXEC, 0x400000, 0x1000, None);
        let err = parse(&img[..EHDR_SIZE + PHDR_SIZE - 4]).unwrap_err();
        assert!(matches!(err, LoaderError::Truncated { .. }));
    }

    #[test]
    fn test_bad_magic() {
        let mut img = build_elf(ET_EXEC, 0x400000, 0x1000, None);
        img[0] = 0x7e;
        assert_eq!(parse(&img).unwrap_err(), LoaderError::BadMagic);
    }

    #[test]
    fn test_bad_class_and_machine() {
        let mut img = build_elf(ET_EXEC, 0x400000, 0x1000, None);
        img[4] = 1;
        assert_eq!(parse(&img).unwrap_err(), LoaderError::BadClass(1));

        let mut img = build_elf(ET_EXEC, 0x400000, 0x1000, None);
        img[18..20].copy_from_slice(&40u16.to_le_bytes());
        assert_eq!(parse(&img).unwrap_err(), LoaderError::BadMachine(40));
    }

    #[test]
    fn test_relocatable_rejected() {
        let img = build_elf(1, 0x400000, 0x1000, None); // ET_REL
        assert_eq!(parse(&img).unwrap_err(), LoaderError::BadType(1));
    }

    #[test]
    fn test_no_load_segments() {
        let mut img = build_elf(ET_EXEC, 0x400000, 0x1000, None);
        let ph0 = EHDR_SIZE;
        img[ph0..ph0 + 4].copy_from_slice(&6u32.to_le_bytes()); // PT_PHDR
        assert_eq!(parse(&img).unwrap_err(), LoaderError::NoLoadSegments);
    }

    #[test]
    fn test_overflowing_segment() {
        let img = build_elf(ET_EXEC, u64::MAX - 0x10, 0x1000, None);
        assert_eq!(parse(&img).unwrap_err(), LoaderError::AddressOverflow);
    }

    #[test]
    fn test_interp_out_of_bounds() {
        let mut img = build_elf(ET_EXEC, 0x400000, 0x1000, Some("/lib/ld.so"));
        let ph1 = EHDR_SIZE + PHDR_SIZE;
        img[ph1 + 32..ph1 + 40].copy_from_slice(&0x10000u64.to_le_bytes());
        assert!(matches!(
            parse(&img).unwrap_err(),
            LoaderError::SegmentOutOfBounds { .. }
        ));
    }
}
