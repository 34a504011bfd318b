/*!
 * Persona Demo - Main Entry Point
 *
 * Boots the persona on host-backed collaborators, creates one emulated
 * process, and runs a handful of foreign syscalls through the dispatcher.
 */

use linux_persona::{nr, Credentials, HostScheduler, HostVfs, HostVmm, Persona};
use log::info;
use std::error::Error;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    info!("linux persona starting");

    let mut persona = Persona::builder()
        .with_vfs(Arc::new(HostVfs::new()))
        .with_vmm(Arc::new(HostVmm::new()))
        .with_scheduler(Arc::new(HostScheduler::new()))
        .build();

    let pid = persona.create_process(Credentials::new(1000, 1000))?;
    persona.start_process(pid)?;
    info!("emulated process ready (pid {})", pid);

    let reported = persona.dispatch(pid, nr::SYS_GETPID, [0; 6]);
    info!("getpid -> {}", reported);

    let brk = persona.dispatch(pid, nr::SYS_BRK, [0; 6]);
    info!("brk(0) -> {:#x}", brk);

    let banner = b"hello from the persona\n";
    let written = persona.dispatch(
        pid,
        nr::SYS_WRITE,
        [1, banner.as_ptr() as u64, banner.len() as u64, 0, 0, 0],
    );
    info!("write(stdout) -> {}", written);

    let unknown = persona.dispatch(pid, 9999, [0; 6]);
    info!("unknown syscall -> {} (ENOSYS, not a crash)", unknown);

    persona.dispatch(pid, nr::SYS_EXIT, [0; 6]);
    info!(
        "done: {} processes live, stats {:?}",
        persona.process_count(),
        persona.stats()
    );
    Ok(())
}
