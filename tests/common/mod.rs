/*!
 * Shared Test Fixtures
 * Persona wired to in-memory fakes, plus a crafted-ELF builder
 */

#![allow(dead_code)]

use linux_persona::{Credentials, FakeScheduler, FakeVmm, MemVfs, Persona};
use std::sync::Arc;

pub struct Fixture {
    pub persona: Persona,
    pub vfs: Arc<MemVfs>,
    pub vmm: Arc<FakeVmm>,
    pub sched: Arc<FakeScheduler>,
    pub pid: u64,
}

/// Persona on fakes with one running process.
pub fn running_persona() -> Fixture {
    running_persona_with(MemVfs::new())
}

pub fn running_persona_with(vfs: MemVfs) -> Fixture {
    let vfs = Arc::new(vfs);
    let vmm = Arc::new(FakeVmm::new());
    let sched = Arc::new(FakeScheduler::new());
    let mut persona = Persona::builder()
        .with_vfs(vfs.clone())
        .with_vmm(vmm.clone())
        .with_scheduler(sched.clone())
        .build();
    let pid = persona.create_process(Credentials::new(1000, 100)).unwrap();
    persona.start_process(pid).unwrap();
    Fixture {
        persona,
        vfs,
        vmm,
        sched,
        pid,
    }
}

const EHDR_SIZE: usize = 64;
const PHDR_SIZE: usize = 56;

/// Build a minimal valid ELF64 executable: one PT_LOAD segment at `vaddr`
/// spanning `memsz` bytes, entry a little past the base.
pub fn minimal_elf(vaddr: u64, memsz: u64) -> Vec<u8> {
    let mut img = vec![0u8; EHDR_SIZE + PHDR_SIZE];
    img[..4].copy_from_slice(&[0x7f, b'E', b'L', b'F']);
    img[4] = 2; // ELFCLASS64
    img[5] = 1; // little-endian
    img[6] = 1; // EV_CURRENT
    img[16..18].copy_from_slice(&2u16.to_le_bytes()); // ET_EXEC
    img[18..20].copy_from_slice(&62u16.to_le_bytes()); // EM_X86_64
    img[24..32].copy_from_slice(&(vaddr + 0x78).to_le_bytes()); // e_entry
    img[32..40].copy_from_slice(&(EHDR_SIZE as u64).to_le_bytes()); // e_phoff
    img[54..56].copy_from_slice(&(PHDR_SIZE as u16).to_le_bytes()); // e_phentsize
    img[56..58].copy_from_slice(&1u16.to_le_bytes()); // e_phnum

    let ph = EHDR_SIZE;
    img[ph..ph + 4].copy_from_slice(&1u32.to_le_bytes()); // PT_LOAD
    img[ph + 16..ph + 24].copy_from_slice(&vaddr.to_le_bytes());
    img[ph + 40..ph + 48].copy_from_slice(&memsz.to_le_bytes());
    img
}
