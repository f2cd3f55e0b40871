//! Tests for the memory-mapped file facade

use mmqueue::MappedFile;
use tempfile::TempDir;

fn temp_path(dir: &TempDir, name: &str) -> std::path::PathBuf {
    dir.path().join(name)
}

#[test]
fn test_create_is_zero_filled() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "zeros.mm");

    let mf = MappedFile::create_rw(&path, 4096).unwrap();
    assert_eq!(mf.len(), 4096);
    assert!(mf.is_writable());

    let bytes = unsafe { std::slice::from_raw_parts(mf.as_ptr(), mf.len()) };
    assert!(bytes.iter().all(|&b| b == 0));
}

#[test]
fn test_exists() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "maybe.mm");
    assert!(!MappedFile::exists(&path));
    let _mf = MappedFile::create_rw(&path, 1024).unwrap();
    assert!(MappedFile::exists(&path));
}

#[test]
fn test_create_ro_is_not_writable() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "ro-create.mm");
    let mf = MappedFile::create_ro(&path, 2048).unwrap();
    assert_eq!(mf.len(), 2048);
    assert!(!mf.is_writable());
}

#[test]
fn test_writes_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "persist.mm");

    {
        let mf = MappedFile::create_rw(&path, 4096).unwrap();
        unsafe {
            std::ptr::copy_nonoverlapping(b"payload".as_ptr(), mf.as_mut_ptr(), 7);
        }
        mf.sync().unwrap();
    }

    let mf = MappedFile::open_ro(&path).unwrap();
    assert!(!mf.is_writable());
    let bytes = unsafe { std::slice::from_raw_parts(mf.as_ptr(), 7) };
    assert_eq!(bytes, b"payload");
}

#[test]
fn test_extend_preserves_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "grow.mm");

    let mut mf = MappedFile::create_rw(&path, 4096).unwrap();
    unsafe {
        std::ptr::write_bytes(mf.as_mut_ptr(), 0x5a, 4096);
    }

    mf.extend(16384).unwrap();
    assert_eq!(mf.len(), 16384);
    assert_eq!(mf.file_len().unwrap(), 16384);

    let bytes = unsafe { std::slice::from_raw_parts(mf.as_ptr(), mf.len()) };
    assert!(bytes[..4096].iter().all(|&b| b == 0x5a));
    // the grown tail arrives zero-filled
    assert!(bytes[4096..].iter().all(|&b| b == 0));
}

#[test]
fn test_extend_rejected_on_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "ro.mm");
    let _writer = MappedFile::create_rw(&path, 1024).unwrap();

    let mut reader = MappedFile::open_ro(&path).unwrap();
    assert!(reader.extend(2048).is_err());
}

#[test]
fn test_reader_remap_follows_writer_growth() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "follow.mm");

    let mut writer = MappedFile::create_rw(&path, 4096).unwrap();
    let mut reader = MappedFile::open_ro(&path).unwrap();
    assert_eq!(reader.len(), 4096);

    writer.extend(8192).unwrap();
    unsafe {
        std::ptr::write_bytes(writer.as_mut_ptr().add(4096), 0x7e, 16);
    }

    // the reader's mapping still covers the old size until it remaps
    assert_eq!(reader.len(), 4096);
    assert_eq!(reader.file_len().unwrap(), 8192);
    reader.remap().unwrap();
    assert_eq!(reader.len(), 8192);

    let bytes = unsafe { std::slice::from_raw_parts(reader.as_ptr(), reader.len()) };
    assert!(bytes[4096..4112].iter().all(|&b| b == 0x7e));
}

#[test]
fn test_sync_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "range.mm");

    let mf = MappedFile::create_rw(&path, 8192).unwrap();
    unsafe {
        std::ptr::write_bytes(mf.as_mut_ptr().add(1024), 0x11, 128);
    }
    mf.sync_range(1024, 128).unwrap();

    let ro = MappedFile::open_ro(&path).unwrap();
    let bytes = unsafe { std::slice::from_raw_parts(ro.as_ptr().add(1024), 128) };
    assert!(bytes.iter().all(|&b| b == 0x11));
}
