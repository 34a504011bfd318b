/*!
 * Host VFS Tests
 * The host-backed collaborator against real files in a temp directory
 */

use linux_persona::{nr, Credentials, HostVfs, Persona, Vfs};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[test]
fn test_host_vfs_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("note.txt");
    std::fs::write(&path, b"kept on disk").unwrap();
    let path = path.to_str().unwrap();

    let vfs = HostVfs::new();
    let handle = vfs.open_path(path, 0, 0).unwrap();
    assert_eq!(vfs.read(handle, 4).unwrap(), b"kept");
    assert_eq!(vfs.read(handle, 64).unwrap(), b" on disk");
    vfs.close(handle).unwrap();

    assert!(vfs.exists(path));
    assert_eq!(vfs.read_file(path).unwrap(), b"kept on disk");
}

#[test]
fn test_host_vfs_create_and_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("made.txt");
    let path = path.to_str().unwrap();

    let vfs = HostVfs::new();
    // O_WRONLY | O_CREAT
    let handle = vfs.open_path(path, 0x1 | 0x40, 0o644).unwrap();
    assert_eq!(vfs.write(handle, b"written through").unwrap(), 15);
    vfs.close(handle).unwrap();

    assert_eq!(std::fs::read(path).unwrap(), b"written through");
}

#[test]
fn test_host_vfs_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent");
    let vfs = HostVfs::new();
    assert!(vfs.open_path(path.to_str().unwrap(), 0, 0).is_err());
    assert!(!vfs.exists(path.to_str().unwrap()));
}

#[test]
fn test_dispatch_reads_a_real_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("input.dat");
    std::fs::write(&file, b"real bytes").unwrap();

    let mut persona = Persona::builder()
        .with_vfs(Arc::new(HostVfs::new()))
        .build();
    let pid = persona.create_process(Credentials::new(1000, 1000)).unwrap();
    persona.start_process(pid).unwrap();

    let mut path = file.to_str().unwrap().as_bytes().to_vec();
    path.push(0);
    let fd = persona.dispatch(pid, nr::SYS_OPEN, [path.as_ptr() as u64, 0, 0, 0, 0, 0]);
    assert!(fd >= 3);

    let mut buf = [0u8; 32];
    let n = persona.dispatch(
        pid,
        nr::SYS_READ,
        [fd as u64, buf.as_mut_ptr() as u64, buf.len() as u64, 0, 0, 0],
    );
    assert_eq!(n, 10);
    assert_eq!(&buf[..10], b"real bytes");

    assert_eq!(persona.dispatch(pid, nr::SYS_CLOSE, [fd as u64, 0, 0, 0, 0, 0]), 0);
}
