//! Memory-mapped files.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use vq_core::{Region, View};

use crate::error::{Error, Result};
use crate::load::{apply_diff_region, load_region};

fn map(path: &Path) -> Result<Region> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(Error::format(format!("{} is empty", path.display())));
    }
    // The mapping is read-only; the file must not be truncated while any
    // view over it is alive.
    #[allow(unsafe_code)]
    let mmap = unsafe { Mmap::map(&file)? };
    #[cfg(feature = "tracing")]
    tracing::debug!(path = %path.display(), bytes = mmap.len(), "mapped view file");
    Ok(Region::new(mmap))
}

/// View over a saved file. Column data stays in the mapping and is decoded
/// on access.
pub fn open(path: impl AsRef<Path>) -> Result<View> {
    load_region(map(path.as_ref())?)
}

/// Apply the diff save at `path` to `base`.
pub fn open_diff(base: &View, path: impl AsRef<Path>) -> Result<View> {
    apply_diff_region(base, map(path.as_ref())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::{save_diff, save_file};
    use std::io::Write;
    use vq_core::{Column, Item};

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v.vq");
        let v = View::with_desc(
            "id:I,name:S",
            vec![Column::from_ints(vec![1, 2, 3]), Column::from_strs(["a", "bb", "ccc"])],
        )
        .unwrap();
        let written = save_file(&v, &path).unwrap();
        assert_eq!(written, std::fs::metadata(&path).unwrap().len());

        let loaded = open(&path).unwrap();
        assert_eq!(loaded.describe(), "id:I,name:S");
        assert_eq!(loaded.row(2), vec![Item::Int(3), Item::from("ccc")]);
    }

    #[test]
    fn diff_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let base = View::with_desc("a:I", vec![Column::from_ints(vec![1, 2, 3])]).unwrap();
        let changed = base.clone().delete(0, 1).unwrap();
        let path = dir.path().join("d.vq");
        std::fs::write(&path, save_diff(&changed).unwrap()).unwrap();

        let applied = open_diff(&base, &path).unwrap();
        assert_eq!(applied, changed);
        assert!(open(&path).is_err());
    }

    #[test]
    fn empty_or_truncated_files() {
        let mut empty = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(open(empty.path()), Err(Error::Format(_))));
        empty.write_all(b"JL\x1a\x00 not a view").unwrap();
        empty.flush().unwrap();
        assert!(open(empty.path()).is_err());
        assert!(matches!(open("/nonexistent/v.vq"), Err(Error::Io(_))));
    }
}
