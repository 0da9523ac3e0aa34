//! Fixed-size byte-per-flag boolean array.

use breccia_core::{align16, contract_assert};

/// A flag array with one byte per entry and size fixed at construction.
///
/// The family graph keeps its removed-edge flags here, where single-flag
/// reads in the island search are unconditional byte loads. The raw-byte
/// accessors exist for bulk snapshots of such flag sets.
#[derive(Clone, PartialEq, Eq)]
pub struct FixedBoolArray {
    data: Vec<u8>,
}

impl FixedBoolArray {
    /// Create an array of `count` cleared flags.
    pub fn new(count: usize) -> Self {
        Self {
            data: vec![0; count],
        }
    }

    /// Byte size of a header plus `count` flag bytes, 16-byte aligned.
    #[must_use]
    pub fn required_memory_size(count: usize) -> usize {
        align16(std::mem::size_of::<u32>()) + align16(count)
    }

    /// Read flag `index`.
    #[must_use]
    pub fn test(&self, index: usize) -> bool {
        contract_assert!(index < self.data.len(), "FixedBoolArray index out of range");
        self.data[index] != 0
    }

    /// Set flag `index`.
    pub fn set(&mut self, index: usize) {
        contract_assert!(index < self.data.len(), "FixedBoolArray index out of range");
        self.data[index] = 1;
    }

    /// Clear flag `index`.
    pub fn reset(&mut self, index: usize) {
        contract_assert!(index < self.data.len(), "FixedBoolArray index out of range");
        self.data[index] = 0;
    }

    /// Set every flag.
    pub fn fill(&mut self) {
        self.data.fill(1);
    }

    /// Clear every flag.
    pub fn clear_all(&mut self) {
        self.data.fill(0);
    }

    /// Number of flags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the array has zero flags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The flags as raw bytes (0 or 1 per entry), as serialized.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Overwrite the flags from raw bytes; any nonzero byte reads as set.
    pub fn copy_from_bytes(&mut self, bytes: &[u8]) {
        contract_assert!(bytes.len() == self.data.len(), "FixedBoolArray length mismatch");
        for (dst, &src) in self.data.iter_mut().zip(bytes) {
            *dst = u8::from(src != 0);
        }
    }
}

impl std::fmt::Debug for FixedBoolArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FixedBoolArray[")?;
        for &b in &self.data {
            write!(f, "{}", if b != 0 { '1' } else { '0' })?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_array_is_all_clear() {
        let arr = FixedBoolArray::new(8);
        assert!((0..8).all(|i| !arr.test(i)));
    }

    #[test]
    fn set_reset_and_fill() {
        let mut arr = FixedBoolArray::new(4);
        arr.set(1);
        assert!(!arr.test(0) && arr.test(1));
        arr.fill();
        assert!((0..4).all(|i| arr.test(i)));
        arr.reset(2);
        assert!(!arr.test(2) && arr.test(3));
        arr.clear_all();
        assert!((0..4).all(|i| !arr.test(i)));
    }

    #[test]
    fn byte_round_trip() {
        let mut arr = FixedBoolArray::new(5);
        arr.set(0);
        arr.set(3);
        let bytes = arr.as_bytes().to_vec();
        let mut restored = FixedBoolArray::new(5);
        restored.copy_from_bytes(&bytes);
        assert_eq!(arr, restored);
    }

    #[test]
    fn nonzero_bytes_normalize_to_one() {
        let mut arr = FixedBoolArray::new(3);
        arr.copy_from_bytes(&[0, 7, 255]);
        assert!(!arr.test(0) && arr.test(1) && arr.test(2));
        assert_eq!(arr.as_bytes(), &[0, 1, 1]);
    }
}
