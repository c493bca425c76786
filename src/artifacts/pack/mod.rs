//! Packfile formats
//!
//! A pack is a pair of files under `objects/pack/`:
//!
//! - `pack-<sha>.pack`: a `PACK` header followed by object entries, some of
//!   them stored as deltas against other entries
//! - `pack-<sha>.idx`: a version 2 index mapping object IDs to entry offsets
//!
//! ## Index Format (Version 2)
//!
//! ```text
//! Header (8 bytes):    "\377tOc", version 2
//! Fan-out (1024 bytes): 256 cumulative big-endian counts by first hash byte
//! Hashes:              count * 20 bytes, sorted
//! CRC32s:              count * 4 bytes
//! Offsets:             count * 4 bytes (MSB set => index into 64-bit table)
//! Large offsets:       n * 8 bytes
//! Trailer:             pack checksum (20 bytes), index checksum (20 bytes)
//! ```

pub mod delta;
pub mod entry;
pub mod index;

/// Magic signature of a version 2 pack index
pub const INDEX_SIGNATURE: &[u8; 4] = b"\xfftOc";

/// The only pack index version understood
pub const INDEX_VERSION: u32 = 2;

/// Magic signature of a pack data file
pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";

/// Size of a pack data file header: signature, version, object count
pub const PACK_HEADER_SIZE: usize = 12;

/// Size of SHA-1 checksum in bytes
pub const CHECKSUM_SIZE: usize = 20;

/// Pack entry type code of a delta against an earlier offset in the same pack
pub const OFS_DELTA_CODE: u8 = 6;

/// Pack entry type code of a delta against an object named by id
pub const REF_DELTA_CODE: u8 = 7;
