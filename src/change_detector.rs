//! Change detection for both input sources.
//!
//! Clipboard mode compares the current snapshot against the previously
//! fetched one, pixel for pixel. Directory mode remembers every
//! (path, modified-time) pair it has seen; a key, once recorded, is kept
//! for the lifetime of the process.

use image::{DynamicImage, GenericImageView};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Identity of a directory entry: path plus last-modified time.
///
/// A file whose modification time changes produces a fresh key and is
/// treated as new again.
pub type FileKey = (PathBuf, SystemTime);

/// Build the [`FileKey`] for a directory entry
pub fn file_key(path: &Path) -> std::io::Result<FileKey> {
    let modified = path.metadata()?.modified()?;
    Ok((path.to_path_buf(), modified))
}

/// Check whether two clipboard snapshots are identical.
///
/// Both absent counts as identical; one absent and the other present does
/// not. Present images are identical iff their dimensions and pixel
/// buffers match exactly.
pub fn images_identical(a: Option<&DynamicImage>, b: Option<&DynamicImage>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.dimensions() == b.dimensions() && a.as_bytes() == b.as_bytes(),
        _ => false,
    }
}

/// Bookkeeping of directory entries that have already been handled.
///
/// Grows monotonically; nothing is ever evicted.
#[derive(Debug, Default)]
pub struct SeenFiles {
    keys: HashSet<FileKey>,
}

impl SeenFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key, returning `true` iff it had not been seen before.
    ///
    /// The key is recorded either way, so a file that fails to decode is
    /// not retried on the next tick.
    pub fn record(&mut self, key: FileKey) -> bool {
        self.keys.insert(key)
    }

    /// Mark every entry currently in `dir` as already seen.
    ///
    /// Called once before polling begins: files present at startup are
    /// never processed. Returns the number of entries recorded.
    pub fn record_existing(&mut self, dir: &Path) -> std::io::Result<usize> {
        let mut count = 0;
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if self.record(file_key(&entry.path())?) {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Number of recorded keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::time::Duration;

    fn solid_image(brightness: u8) -> DynamicImage {
        let mut img = RgbImage::new(16, 16);
        for pixel in img.pixels_mut() {
            *pixel = Rgb([brightness, brightness, brightness]);
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_both_absent_identical() {
        assert!(images_identical(None, None));
    }

    #[test]
    fn test_one_absent_not_identical() {
        let img = solid_image(128);
        assert!(!images_identical(Some(&img), None));
        assert!(!images_identical(None, Some(&img)));
    }

    #[test]
    fn test_same_pixels_identical() {
        let a = solid_image(128);
        let b = solid_image(128);
        assert!(images_identical(Some(&a), Some(&b)));
        assert!(images_identical(Some(&a), Some(&a)));
    }

    #[test]
    fn test_differing_pixel_not_identical() {
        let a = solid_image(128);
        let mut b = solid_image(128).to_rgb8();
        b.put_pixel(3, 7, Rgb([0, 0, 0]));
        assert!(!images_identical(Some(&a), Some(&DynamicImage::ImageRgb8(b))));
    }

    #[test]
    fn test_differing_dimensions_not_identical() {
        let a = solid_image(128);
        let b = DynamicImage::ImageRgb8(RgbImage::new(8, 8));
        assert!(!images_identical(Some(&a), Some(&b)));
    }

    #[test]
    fn test_record_once() {
        let mut seen = SeenFiles::new();
        let key = (PathBuf::from("/tmp/a.png"), SystemTime::UNIX_EPOCH);
        assert!(seen.record(key.clone()));
        assert!(!seen.record(key));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_mtime_change_is_new_key() {
        let mut seen = SeenFiles::new();
        let t0 = SystemTime::UNIX_EPOCH;
        let t1 = t0 + Duration::from_secs(60);
        assert!(seen.record((PathBuf::from("/tmp/a.png"), t0)));
        assert!(seen.record((PathBuf::from("/tmp/a.png"), t1)));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_record_existing_marks_startup_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("before.txt"), "x").unwrap();
        std::fs::write(dir.path().join("other.txt"), "y").unwrap();

        let mut seen = SeenFiles::new();
        let count = seen.record_existing(dir.path()).unwrap();
        assert_eq!(count, 2);

        let key = file_key(&dir.path().join("before.txt")).unwrap();
        assert!(!seen.record(key), "startup files must already be seen");
    }
}
