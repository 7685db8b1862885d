//! Growable write buffer.
//!
//! Small outputs stay in a 128-byte head; larger ones spill into 4 KiB
//! chunks so appending never moves data already written. `to_vec` makes one
//! contiguous copy once the final size is known.

const HEAD_SIZE: usize = 128;
const CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone)]
pub struct Buffer {
    head: Vec<u8>,
    chunks: Vec<Vec<u8>>,
    len: usize,
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Buffer {
    pub fn new() -> Self {
        Self {
            head: Vec::with_capacity(HEAD_SIZE),
            chunks: Vec::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push_bytes(&mut self, mut data: &[u8]) {
        self.len += data.len();

        if self.chunks.is_empty() {
            let room = HEAD_SIZE - self.head.len();
            let n = room.min(data.len());
            self.head.extend_from_slice(&data[..n]);
            data = &data[n..];
        }

        while !data.is_empty() {
            let full = self.chunks.last().map_or(true, |c| c.len() == CHUNK_SIZE);
            if full {
                self.chunks.push(Vec::with_capacity(CHUNK_SIZE));
            }
            if let Some(chunk) = self.chunks.last_mut() {
                let n = (CHUNK_SIZE - chunk.len()).min(data.len());
                chunk.extend_from_slice(&data[..n]);
                data = &data[n..];
            }
        }
    }

    pub fn push_byte(&mut self, b: u8) {
        self.push_bytes(&[b]);
    }

    pub fn push_i32(&mut self, v: i32) {
        self.push_bytes(&v.to_ne_bytes());
    }

    /// Filled areas in order (head first).
    pub fn chunks(&self) -> impl Iterator<Item = &[u8]> {
        std::iter::once(self.head.as_slice())
            .chain(self.chunks.iter().map(|c| c.as_slice()))
            .filter(|c| !c.is_empty())
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for c in self.chunks() {
            out.extend_from_slice(c);
        }
        out
    }

    /// Reinterpret the contents as native-endian `i32` values.
    pub fn to_ints(&self) -> Vec<i32> {
        self.to_vec()
            .chunks_exact(4)
            .map(|w| i32::from_ne_bytes([w[0], w[1], w[2], w[3]]))
            .collect()
    }

    pub fn clear(&mut self) {
        self.head.clear();
        self.chunks.clear();
        self.len = 0;
    }
}

impl std::fmt::Write for Buffer {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.push_bytes(s.as_bytes());
        Ok(())
    }
}
