//! Memory-mapped file primitive backing the queue files

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use memmap2::{Mmap, MmapMut, MmapOptions};

#[derive(Debug)]
enum Mapping {
    ReadWrite(MmapMut),
    ReadOnly(Mmap),
}

/// A file held open together with a shared mapping of its full length
///
/// Growing is truncate-then-remap: the base address may move on every
/// [`MappedFile::extend`] or [`MappedFile::remap`], so callers must re-derive
/// any pointers into the mapping afterwards.
#[derive(Debug)]
pub struct MappedFile {
    file: File,
    mapping: Mapping,
    len: usize,
}

impl MappedFile {
    /// Whether a file exists at `path`
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    /// Open an existing file and map it read-write at its current length
    pub fn open_rw(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len() as usize;
        let mapping = unsafe { MmapOptions::new().len(len).map_mut(&file)? };
        Ok(Self {
            file,
            mapping: Mapping::ReadWrite(mapping),
            len,
        })
    }

    /// Open an existing file and map it read-only at its current length
    pub fn open_ro(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len() as usize;
        let mapping = unsafe { MmapOptions::new().len(len).map(&file)? };
        Ok(Self {
            file,
            mapping: Mapping::ReadOnly(mapping),
            len,
        })
    }

    /// Create a file of `size` zero bytes and map it read-write
    pub fn create_rw(path: &Path, size: usize) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.set_len(size as u64)?;
        let mapping = unsafe { MmapOptions::new().len(size).map_mut(&file)? };
        Ok(Self {
            file,
            mapping: Mapping::ReadWrite(mapping),
            len: size,
        })
    }

    /// Create a file of `size` zero bytes and map it read-only
    ///
    /// Useful for pre-sizing a file another role will write.
    pub fn create_ro(path: &Path, size: usize) -> io::Result<Self> {
        {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)?;
            file.set_len(size as u64)?;
        }
        Self::open_ro(path)
    }

    /// Grow the underlying file to `new_len` and remap
    ///
    /// Existing contents are preserved; the tail is zero-filled by the
    /// filesystem. Only valid on writable mappings.
    pub fn extend(&mut self, new_len: usize) -> io::Result<()> {
        debug_assert!(new_len >= self.len);
        match self.mapping {
            Mapping::ReadWrite(_) => {
                self.file.set_len(new_len as u64)?;
                let mapping = unsafe { MmapOptions::new().len(new_len).map_mut(&self.file)? };
                self.mapping = Mapping::ReadWrite(mapping);
                self.len = new_len;
                Ok(())
            }
            Mapping::ReadOnly(_) => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot extend a read-only mapping",
            )),
        }
    }

    /// Remap at the file's current on-disk length
    ///
    /// Used by readers to catch up after a writer in another process grew the
    /// file.
    pub fn remap(&mut self) -> io::Result<()> {
        let len = self.file.metadata()?.len() as usize;
        match self.mapping {
            Mapping::ReadWrite(_) => {
                let mapping = unsafe { MmapOptions::new().len(len).map_mut(&self.file)? };
                self.mapping = Mapping::ReadWrite(mapping);
            }
            Mapping::ReadOnly(_) => {
                let mapping = unsafe { MmapOptions::new().len(len).map(&self.file)? };
                self.mapping = Mapping::ReadOnly(mapping);
            }
        }
        self.len = len;
        Ok(())
    }

    /// Mapped length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the mapping is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the mapping is writable
    pub fn is_writable(&self) -> bool {
        matches!(self.mapping, Mapping::ReadWrite(_))
    }

    /// Length of the file on disk, which may exceed the mapped length after
    /// another process grew it
    pub fn file_len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Base address of the mapping
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        match &self.mapping {
            Mapping::ReadWrite(m) => m.as_ptr(),
            Mapping::ReadOnly(m) => m.as_ptr(),
        }
    }

    /// Mutable base address of the mapping
    ///
    /// # Safety
    ///
    /// The mapping must be writable, and the caller must coordinate all
    /// concurrent access to the bytes behind the returned pointer. The queue
    /// protocol does this through single-writer ownership plus release/acquire
    /// publication.
    pub unsafe fn as_mut_ptr(&self) -> *mut u8 {
        match &self.mapping {
            Mapping::ReadWrite(m) => m.as_ptr() as *mut u8,
            Mapping::ReadOnly(_) => panic!("as_mut_ptr on a read-only mapping"),
        }
    }

    /// Flush the whole mapping to the backing file; no-op when read-only
    pub fn sync(&self) -> io::Result<()> {
        match &self.mapping {
            Mapping::ReadWrite(m) => m.flush(),
            Mapping::ReadOnly(_) => Ok(()),
        }
    }

    /// Flush a byte range of the mapping; no-op when read-only
    pub fn sync_range(&self, offset: usize, len: usize) -> io::Result<()> {
        match &self.mapping {
            Mapping::ReadWrite(m) => m.flush_range(offset, len),
            Mapping::ReadOnly(_) => Ok(()),
        }
    }
}

impl Drop for MappedFile {
    fn drop(&mut self) {
        if let Mapping::ReadWrite(m) = &self.mapping {
            let _ = m.flush();
        }
    }
}
