//! Disk I/O and file lifecycle.
//!
//! Bytes land in `<dest>.part` (preallocated, written at segment offsets from
//! several threads) and only become `<dest>` through an atomic rename after the
//! transfer is verified, so a truncated file is never left under the final name.

mod builder;
mod writer;

pub use builder::StorageWriterBuilder;
pub use writer::StorageWriter;

use std::io;
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `a.whl` → `a.whl.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Remove a temp file if present. Missing files are not an error.
pub fn discard(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Current on-disk length of `path`, or `None` if it does not exist.
pub fn file_len(path: &Path) -> Option<u64> {
    std::fs::metadata(path).ok().map(|m| m.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("mindspore-2.5.0-cp39-cp39-linux_aarch64.whl"));
        assert_eq!(
            p.to_string_lossy(),
            "mindspore-2.5.0-cp39-cp39-linux_aarch64.whl.part"
        );
        let p2 = temp_path(Path::new("/tmp/20250101/master_x/a.whl"));
        assert_eq!(p2.to_string_lossy(), "/tmp/20250101/master_x/a.whl.part");
    }

    #[test]
    fn discard_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discard(&dir.path().join("nope.part")).is_ok());
    }

    #[test]
    fn create_preallocate_write_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("output.bin");
        let tp = temp_path(&final_path);

        let mut builder = StorageWriterBuilder::create(&tp).unwrap();
        builder.preallocate(100).unwrap();
        let writer = builder.build();
        assert_eq!(file_len(&tp), Some(100));

        writer.write_at(0, b"hello").unwrap();
        writer.write_at(50, b"world").unwrap();
        writer.write_at(95, b"xy").unwrap();
        writer.sync().unwrap();
        writer.finalize(&final_path).unwrap();

        assert!(!tp.exists());
        let mut f = std::fs::File::open(&final_path).unwrap();
        let mut buf = vec![0u8; 100];
        f.read_exact(&mut buf).unwrap();
        assert_eq!(&buf[0..5], b"hello");
        assert_eq!(&buf[50..55], b"world");
        assert_eq!(&buf[95..97], b"xy");
    }

    #[test]
    fn write_at_from_threads() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("out.part");
        let mut builder = StorageWriterBuilder::create(&tp).unwrap();
        builder.preallocate(40).unwrap();
        let writer = builder.build();
        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                let w = writer.clone();
                std::thread::spawn(move || w.write_at(u64::from(i) * 10, &[b'a' + i; 10]))
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }
        writer.sync().unwrap();
        let data = std::fs::read(&tp).unwrap();
        assert_eq!(&data[0..10], &[b'a'; 10]);
        assert_eq!(&data[30..40], &[b'd'; 10]);
    }

    #[test]
    fn open_existing_keeps_content() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("resume.part");
        let mut builder = StorageWriterBuilder::create(&tp).unwrap();
        builder.preallocate(8).unwrap();
        let w = builder.build();
        w.write_at(0, b"abcd").unwrap();
        drop(w);

        let w2 = StorageWriter::open_existing(&tp).unwrap();
        w2.write_at(4, b"efgh").unwrap();
        w2.sync().unwrap();
        assert_eq!(std::fs::read(&tp).unwrap(), b"abcdefgh");
    }
}
