//! Content digests of saved views.

use std::fmt;

use blake3::Hasher;
use serde::{Deserialize, Serialize};

use vq_core::View;

use crate::emit::save;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Lowercase hex, 64 characters.
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(blake3::Hash::from(self.0).to_hex().as_str())
    }
}

pub fn digest_bytes(bytes: &[u8]) -> Digest {
    let mut h = Hasher::new();
    h.update(bytes);
    Digest(h.finalize().into())
}

/// Digest of the full save of `view`. Equal contents give equal digests
/// no matter how the view was built or loaded.
pub fn digest_view(view: &View) -> Result<Digest> {
    Ok(digest_bytes(&save(view)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::load_bytes;
    use vq_core::Column;

    #[test]
    fn hex_form() {
        let d = digest_bytes(b"");
        assert_eq!(d.to_hex().len(), 64);
        assert!(d.to_hex().starts_with("af1349b9"));
        assert_eq!(d.to_string(), d.to_hex());
    }

    #[test]
    fn loaded_copy_has_same_digest() {
        let v = View::with_desc(
            "a:I,s:S",
            vec![Column::from_ints(vec![7, 8]), Column::from_strs(["p", "q"])],
        )
        .unwrap();
        let loaded = load_bytes(save(&v).unwrap()).unwrap();
        assert_eq!(digest_view(&v).unwrap(), digest_view(&loaded).unwrap());

        let other = v.set(0, 0, &7.into()).unwrap().set(1, 0, &9.into()).unwrap();
        assert_ne!(digest_view(&other).unwrap(), digest_view(&loaded).unwrap());
    }
}
