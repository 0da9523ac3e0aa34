//! Little-endian slice cursors for block encode/decode.
//!
//! Writers fail with [`BlockError::BufferTooSmall`] when the destination
//! cannot hold the next value; readers fail with [`BlockError::Malformed`]
//! on truncation. Alignment padding is written as zeroes so encodes are
//! reproducible byte for byte.

use breccia_core::{align16, BlockError};

/// Write cursor over a caller-provided byte buffer.
pub struct BlockWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> BlockWriter<'a> {
    /// Wrap a destination buffer.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes written so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    fn reserve(&mut self, len: usize) -> Result<&mut [u8], BlockError> {
        if self.pos + len > self.buf.len() {
            return Err(BlockError::BufferTooSmall {
                needed: self.pos + len,
                available: self.buf.len(),
            });
        }
        let slice = &mut self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Write a little-endian u32.
    pub fn write_u32(&mut self, value: u32) -> Result<(), BlockError> {
        self.reserve(4)?.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Write a little-endian f32.
    pub fn write_f32(&mut self, value: f32) -> Result<(), BlockError> {
        self.reserve(4)?.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), BlockError> {
        self.reserve(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Zero-pad to the next 16-byte boundary.
    pub fn pad_to_16(&mut self) -> Result<(), BlockError> {
        let target = align16(self.pos);
        let pad = target - self.pos;
        if pad > 0 {
            self.reserve(pad)?.fill(0);
        }
        Ok(())
    }

    /// Overwrite a previously written u32 (e.g. a size field patched after
    /// the fact).
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        self.buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }
}

/// Read cursor over a byte buffer.
pub struct BlockReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BlockReader<'a> {
    /// Wrap a source buffer.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8], BlockError> {
        if self.pos + len > self.buf.len() {
            return Err(BlockError::Malformed {
                detail: format!("truncated {what}: need {len} bytes at offset {}", self.pos),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Read a little-endian u32.
    pub fn read_u32(&mut self, what: &str) -> Result<u32, BlockError> {
        let bytes = self.take(4, what)?;
        Ok(u32::from_le_bytes(bytes.try_into().expect("4-byte slice")))
    }

    /// Read a little-endian f32.
    pub fn read_f32(&mut self, what: &str) -> Result<f32, BlockError> {
        let bytes = self.take(4, what)?;
        Ok(f32::from_le_bytes(bytes.try_into().expect("4-byte slice")))
    }

    /// Read raw bytes.
    pub fn read_bytes(&mut self, len: usize, what: &str) -> Result<&'a [u8], BlockError> {
        self.take(len, what)
    }

    /// Skip padding up to the next 16-byte boundary.
    pub fn skip_to_16(&mut self, what: &str) -> Result<(), BlockError> {
        let target = align16(self.pos);
        self.take(target - self.pos, what)?;
        Ok(())
    }
}

/// Write the common block header, returning the offset of the size field
/// for later patching.
pub fn write_header(
    writer: &mut BlockWriter<'_>,
    block_type: u32,
    format_version: u32,
) -> Result<usize, BlockError> {
    writer.write_bytes(&crate::MAGIC)?;
    writer.write_u32(block_type)?;
    writer.write_u32(format_version)?;
    let size_offset = writer.position();
    writer.write_u32(0)?; // patched once the total size is known
    Ok(size_offset)
}

/// Read and validate the common block header; returns the recorded total
/// size.
pub fn read_header(
    reader: &mut BlockReader<'_>,
    expected_type: u32,
    expected_version: u32,
) -> Result<u32, BlockError> {
    let magic = reader.read_bytes(4, "block magic")?;
    if magic != crate::MAGIC {
        return Err(BlockError::InvalidMagic);
    }
    let block_type = reader.read_u32("block type")?;
    if block_type != expected_type {
        return Err(BlockError::UnexpectedBlockType { found: block_type });
    }
    let version = reader.read_u32("format version")?;
    if version != expected_version {
        return Err(BlockError::UnsupportedVersion { found: version });
    }
    reader.read_u32("block size")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn any_u32_round_trips(v in any::<u32>()) {
            let mut buf = [0u8; 4];
            BlockWriter::new(&mut buf).write_u32(v).unwrap();
            prop_assert_eq!(BlockReader::new(&buf).read_u32("v").unwrap(), v);
        }

        #[test]
        fn any_f32_bits_round_trip(bits in any::<u32>()) {
            let mut buf = [0u8; 4];
            BlockWriter::new(&mut buf).write_f32(f32::from_bits(bits)).unwrap();
            prop_assert_eq!(BlockReader::new(&buf).read_f32("v").unwrap().to_bits(), bits);
        }
    }

    #[test]
    fn u32_round_trip() {
        let mut buf = [0u8; 8];
        let mut writer = BlockWriter::new(&mut buf);
        writer.write_u32(0xDEAD_BEEF).unwrap();
        writer.write_u32(7).unwrap();

        let mut reader = BlockReader::new(&buf);
        assert_eq!(reader.read_u32("a").unwrap(), 0xDEAD_BEEF);
        assert_eq!(reader.read_u32("b").unwrap(), 7);
    }

    #[test]
    fn f32_round_trip_preserves_bits() {
        let mut buf = [0u8; 4];
        let value = f32::from_bits(0x7FC0_1234); // a signalling-ish NaN payload
        BlockWriter::new(&mut buf).write_f32(value).unwrap();
        let got = BlockReader::new(&buf).read_f32("v").unwrap();
        assert_eq!(got.to_bits(), value.to_bits());
    }

    #[test]
    fn writer_rejects_overflow() {
        let mut buf = [0u8; 3];
        let mut writer = BlockWriter::new(&mut buf);
        assert!(matches!(
            writer.write_u32(1),
            Err(BlockError::BufferTooSmall {
                needed: 4,
                available: 3
            })
        ));
    }

    #[test]
    fn reader_rejects_truncation() {
        let buf = [0u8; 2];
        let mut reader = BlockReader::new(&buf);
        let err = reader.read_u32("tick").unwrap_err();
        match err {
            BlockError::Malformed { detail } => assert!(detail.contains("tick")),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn padding_is_zeroed() {
        let mut buf = [0xAAu8; 16];
        let mut writer = BlockWriter::new(&mut buf);
        writer.write_u32(1).unwrap();
        writer.pad_to_16().unwrap();
        assert_eq!(writer.position(), 16);
        assert!(buf[4..16].iter().all(|&b| b == 0));
    }

    #[test]
    fn header_round_trip() {
        let mut buf = [0u8; 32];
        let mut writer = BlockWriter::new(&mut buf);
        let size_offset = write_header(&mut writer, 1, 3).unwrap();
        writer.patch_u32(size_offset, 32);

        let mut reader = BlockReader::new(&buf);
        assert_eq!(read_header(&mut reader, 1, 3).unwrap(), 32);
    }

    #[test]
    fn header_mismatches_are_rejected() {
        let mut buf = [0u8; 32];
        let mut writer = BlockWriter::new(&mut buf);
        write_header(&mut writer, 1, 3).unwrap();

        assert!(matches!(
            read_header(&mut BlockReader::new(&buf), 0, 3),
            Err(BlockError::UnexpectedBlockType { found: 1 })
        ));
        assert!(matches!(
            read_header(&mut BlockReader::new(&buf), 1, 2),
            Err(BlockError::UnsupportedVersion { found: 3 })
        ));

        let mut bad_magic = buf;
        bad_magic[0] = b'X';
        assert!(matches!(
            read_header(&mut BlockReader::new(&bad_magic), 1, 3),
            Err(BlockError::InvalidMagic)
        ));
    }
}
