//! Automata file header (80 bytes).
//!
//! The header precedes the node table and records everything the
//! execution engine needs to select a subengine and locate sections:
//! id width, alignment, counts, and the offsets of the output and
//! metadata sections. All integers are little-endian.

use crate::format::{IdWidth, MAGIC, VERSION};

/// Byte length of the fixed header.
pub const HEADER_LEN: usize = 80;

/// Fixed-layout automata header.
///
/// Layout:
/// - 0-3: magic `b"EUDX"`
/// - 4: format version
/// - 5: id width in bytes (1/2/4/8)
/// - 6: flags (bit 0 big-endian, bit 1 no-advance-no-output)
/// - 7: reserved
/// - 8-11: `align_to` (u32)
/// - 12-15: `num_metadata` (u32)
/// - 16-39: `num_nodes`, `num_outputs`, `num_output_lists` (3 × u64)
/// - 40-71: `start_offset`, `first_output`, `first_output_list`,
///   `metadata_offset` (4 × u64)
/// - 72-79: `total_size` (u64)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub id_width: IdWidth,
    /// Always false: ids and integer fields are serialized little-endian.
    pub is_big_endian: bool,
    /// Suppress output for targets of non-advancing edges.
    pub no_advance_no_output: bool,
    /// Node start offsets are multiples of this (1 = unaligned).
    pub align_to: u32,
    pub num_metadata: u32,
    pub num_nodes: u64,
    pub num_outputs: u64,
    pub num_output_lists: u64,
    /// Offset of the start node.
    pub start_offset: u64,
    /// Offset of the first output content record.
    pub first_output: u64,
    /// Offset of the first output list record.
    pub first_output_list: u64,
    /// Offset of the metadata records.
    pub metadata_offset: u64,
    /// Total buffer length, header included.
    pub total_size: u64,
}

const FLAG_BIG_ENDIAN: u8 = 1 << 0;
const FLAG_NO_ADVANCE_NO_OUTPUT: u8 = 1 << 1;

/// Header decode failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("buffer too short for header: {0} bytes")]
    TooShort(usize),

    #[error("bad magic bytes")]
    BadMagic,

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),

    #[error("invalid id width {0}")]
    BadIdWidth(u8),
}

impl Default for Header {
    fn default() -> Self {
        Self {
            version: VERSION,
            id_width: IdWidth::W1,
            is_big_endian: false,
            no_advance_no_output: false,
            align_to: 1,
            num_metadata: 0,
            num_nodes: 0,
            num_outputs: 0,
            num_output_lists: 0,
            start_offset: 0,
            first_output: 0,
            first_output_list: 0,
            metadata_offset: 0,
            total_size: 0,
        }
    }
}

impl Header {
    /// Encode to the fixed 80-byte layout.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&MAGIC);
        bytes[4] = self.version;
        bytes[5] = self.id_width.bytes() as u8;
        let mut flags = 0;
        if self.is_big_endian {
            flags |= FLAG_BIG_ENDIAN;
        }
        if self.no_advance_no_output {
            flags |= FLAG_NO_ADVANCE_NO_OUTPUT;
        }
        bytes[6] = flags;
        bytes[8..12].copy_from_slice(&self.align_to.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.num_metadata.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.num_nodes.to_le_bytes());
        bytes[24..32].copy_from_slice(&self.num_outputs.to_le_bytes());
        bytes[32..40].copy_from_slice(&self.num_output_lists.to_le_bytes());
        bytes[40..48].copy_from_slice(&self.start_offset.to_le_bytes());
        bytes[48..56].copy_from_slice(&self.first_output.to_le_bytes());
        bytes[56..64].copy_from_slice(&self.first_output_list.to_le_bytes());
        bytes[64..72].copy_from_slice(&self.metadata_offset.to_le_bytes());
        bytes[72..80].copy_from_slice(&self.total_size.to_le_bytes());
        bytes
    }

    /// Decode from the start of a compiled buffer.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < HEADER_LEN {
            return Err(HeaderError::TooShort(bytes.len()));
        }
        if bytes[0..4] != MAGIC {
            return Err(HeaderError::BadMagic);
        }
        let version = bytes[4];
        if version != VERSION {
            return Err(HeaderError::UnsupportedVersion(version));
        }
        let id_width = IdWidth::from_bytes(bytes[5]).ok_or(HeaderError::BadIdWidth(bytes[5]))?;
        let flags = bytes[6];

        let u32_at = |at: usize| u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap());
        let u64_at = |at: usize| u64::from_le_bytes(bytes[at..at + 8].try_into().unwrap());

        Ok(Self {
            version,
            id_width,
            is_big_endian: flags & FLAG_BIG_ENDIAN != 0,
            no_advance_no_output: flags & FLAG_NO_ADVANCE_NO_OUTPUT != 0,
            align_to: u32_at(8),
            num_metadata: u32_at(12),
            num_nodes: u64_at(16),
            num_outputs: u64_at(24),
            num_output_lists: u64_at(32),
            start_offset: u64_at(40),
            first_output: u64_at(48),
            first_output_list: u64_at(56),
            metadata_offset: u64_at(64),
            total_size: u64_at(72),
        })
    }
}
