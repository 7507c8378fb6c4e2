//! Bitstream and checksum helpers shared by the codec and container code.

/// Exp-Golomb capable bit reader
pub mod bits;

/// MPEG-2 CRC32
pub mod crc;

pub use bits::BitReader;
pub use crc::Crc32Mpeg2;
