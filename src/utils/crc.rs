//! CRC-32/MPEG-2 as used by PSI sections (ISO/IEC 13818-1 Annex A).

const POLYNOMIAL: u32 = 0x04C1_1DB7;

const TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// MPEG-2 CRC32 over PSI table sections. No final XOR, not reflected.
#[derive(Debug, Default, Clone, Copy)]
pub struct Crc32Mpeg2;

impl Crc32Mpeg2 {
    pub fn calculate(data: &[u8]) -> u32 {
        data.iter().fold(0xFFFF_FFFF, |crc, &byte| {
            (crc << 8) ^ TABLE[(((crc >> 24) ^ byte as u32) & 0xFF) as usize]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(Crc32Mpeg2::calculate(&[0x01, 0x01]), 0xD66F_B816);
        assert_eq!(Crc32Mpeg2::calculate(b"123456789"), 0x0376_E6E7);
    }

    #[test]
    fn test_section_with_crc_checks_to_zero() {
        let section = [0x00, 0xB0, 0x0D, 0x00, 0x01, 0xC1, 0x00, 0x00, 0x00, 0x01, 0xF0, 0x00];
        let crc = Crc32Mpeg2::calculate(&section);
        let mut whole = section.to_vec();
        whole.extend_from_slice(&crc.to_be_bytes());
        assert_eq!(Crc32Mpeg2::calculate(&whole), 0);
    }
}
