//! Shared byte regions.
//!
//! A region is a window into bytes owned elsewhere (an owned buffer or a
//! read-only file mapping). Fixed-width and string columns loaded from a
//! saved view index straight into a region, so the backing storage stays
//! alive exactly as long as some column still points into it.

use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
pub struct Region {
    src: Rc<dyn AsRef<[u8]>>,
    start: usize,
    len: usize,
}

impl Region {
    pub fn new<T: AsRef<[u8]> + 'static>(src: T) -> Self {
        let len = src.as_ref().len();
        Self {
            src: Rc::new(src),
            start: 0,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bytes(&self) -> &[u8] {
        let all: &[u8] = AsRef::<[u8]>::as_ref(&*self.src);
        &all[self.start..self.start + self.len]
    }

    /// Sub-window of `len` bytes at `offset`, `None` if it does not fit.
    pub fn slice(&self, offset: usize, len: usize) -> Option<Region> {
        let end = offset.checked_add(len)?;
        if end > self.len {
            return None;
        }
        Some(Region {
            src: Rc::clone(&self.src),
            start: self.start + offset,
            len,
        })
    }

    /// Everything from `offset` to the end of this region.
    pub fn tail(&self, offset: usize) -> Option<Region> {
        self.slice(offset, self.len.checked_sub(offset)?)
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("start", &self.start)
            .field("len", &self.len)
            .finish()
    }
}
