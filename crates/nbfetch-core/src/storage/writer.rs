//! Concurrent offset writer for `.part` files.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(unix)]
use std::os::unix::fs::FileExt;
#[cfg(windows)]
use std::os::windows::fs::FileExt;

/// Writer for a temp download file. Clone it into each segment thread;
/// every `write_at` is positional and independent of the others.
#[derive(Clone)]
pub struct StorageWriter {
    file: Arc<File>,
    temp_path: PathBuf,
}

impl StorageWriter {
    pub(crate) fn from_file_and_path(file: File, temp_path: PathBuf) -> Self {
        Self {
            file: Arc::new(file),
            temp_path,
        }
    }

    /// Open an existing temp file for resume (read+write, no truncation).
    pub fn open_existing(temp_path: &Path) -> io::Result<Self> {
        let file = File::options().read(true).write(true).open(temp_path)?;
        Ok(StorageWriter {
            file: Arc::new(file),
            temp_path: temp_path.to_path_buf(),
        })
    }

    /// Write all of `data` at `offset` without touching the shared cursor.
    pub fn write_at(&self, mut offset: u64, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            #[cfg(unix)]
            let n = self.file.write_at(data, offset)?;
            #[cfg(windows)]
            let n = self.file.seek_write(data, offset)?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "short write"));
            }
            data = &data[n..];
            offset += n as u64;
        }
        Ok(())
    }

    /// Sync file data to disk. Call before `finalize`.
    pub fn sync(&self) -> io::Result<()> {
        self.file.sync_all()
    }

    /// Truncate or extend the temp file to `len` bytes.
    pub fn set_len(&self, len: u64) -> io::Result<()> {
        self.file.set_len(len)
    }

    /// Current length of the temp file on disk.
    pub fn size_on_disk(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Rename the temp file to `final_path`. Fails if other clones of this
    /// writer are still alive on platforms that refuse to rename open files.
    pub fn finalize(self, final_path: &Path) -> io::Result<()> {
        let StorageWriter { file, temp_path } = self;
        drop(file);
        std::fs::rename(&temp_path, final_path)
    }
}
