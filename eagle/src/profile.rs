//! Speaker profile exchange format.
//!
//! A profile is an opaque, fixed-size byte blob produced by a completed
//! enrollment: a small header followed by the L2-normalized voiceprint.
//! [`EagleProfile::from_bytes`] is total — any byte sequence is accepted and
//! carried as-is; validation happens only when the profile is used to
//! construct a recognition engine.

const MAGIC: [u8; 4] = *b"EPRF";
const FORMAT_VERSION: u16 = 1;
const HEADER_SIZE: usize = 4 + 2 + 2;

/// An exported voiceprint for one enrolled speaker.
///
/// Immutable once created; independent of the profiler that produced it and
/// may be persisted and reloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EagleProfile {
    bytes: Vec<u8>,
}

impl EagleProfile {
    /// Reconstructs a profile from raw bytes, e.g. loaded from storage.
    ///
    /// Never fails; malformed bytes are only rejected when the profile is
    /// passed to [`Eagle::new`](crate::Eagle::new).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self { bytes: bytes.to_vec() }
    }

    /// Returns the serialized profile.
    pub fn to_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of the serialized profile in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Serialized size of a profile for the given embedding dimension.
    pub(crate) fn size_for_dim(dim: usize) -> usize {
        HEADER_SIZE + 4 * dim
    }

    /// Builds a profile around a voiceprint embedding.
    pub(crate) fn from_embedding(embedding: &[f32]) -> Self {
        let mut bytes = Vec::with_capacity(Self::size_for_dim(embedding.len()));
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(embedding.len() as u16).to_le_bytes());
        for &v in embedding {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        Self { bytes }
    }

    /// Parses and validates the voiceprint for an engine expecting the given
    /// embedding dimension. Errors describe the defect; the caller attaches
    /// the profile index.
    pub(crate) fn decode(&self, expected_dim: usize) -> Result<Vec<f32>, String> {
        if self.bytes.len() < HEADER_SIZE {
            return Err(format!("profile is truncated ({} bytes)", self.bytes.len()));
        }
        if self.bytes[0..4] != MAGIC {
            return Err("profile has invalid magic".into());
        }
        let version = u16::from_le_bytes([self.bytes[4], self.bytes[5]]);
        if version != FORMAT_VERSION {
            return Err(format!(
                "profile version {version} is incompatible with this model (expected {FORMAT_VERSION})"
            ));
        }
        let dim = u16::from_le_bytes([self.bytes[6], self.bytes[7]]) as usize;
        if dim != expected_dim {
            return Err(format!(
                "profile embedding dimension {dim} does not match the model ({expected_dim})"
            ));
        }
        if self.bytes.len() != Self::size_for_dim(dim) {
            return Err(format!(
                "profile must be {} bytes for dimension {dim}, got {}",
                Self::size_for_dim(dim),
                self.bytes.len()
            ));
        }

        let mut embedding = Vec::with_capacity(dim);
        for i in 0..dim {
            let off = HEADER_SIZE + 4 * i;
            let v = f32::from_le_bytes([
                self.bytes[off],
                self.bytes[off + 1],
                self.bytes[off + 2],
                self.bytes[off + 3],
            ]);
            if !v.is_finite() {
                return Err(format!("profile contains non-finite value at index {i}"));
            }
            embedding.push(v);
        }
        Ok(embedding)
    }
}
