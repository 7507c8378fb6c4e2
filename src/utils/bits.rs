use crate::error::{MuxError, Result};

/// MSB-first bit reader for RBSP payloads (SPS and friends).
///
/// ```
/// use hlsmux::utils::BitReader;
///
/// let data = [0b1011_0011];
/// let mut reader = BitReader::new(&data);
/// assert!(reader.read_flag().unwrap());
/// assert_eq!(reader.read_bits(3).unwrap(), 0b011);
/// ```
pub struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn read_flag(&mut self) -> Result<bool> {
        let byte = self
            .data
            .get(self.position / 8)
            .ok_or_else(|| MuxError::Codec("bitstream exhausted".into()))?;
        let bit = (byte >> (7 - (self.position % 8))) & 1;
        self.position += 1;
        Ok(bit == 1)
    }

    /// Reads up to 32 bits as a big-endian number.
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        if n > 32 {
            return Err(MuxError::Codec(format!("cannot read {} bits at once", n)));
        }
        if n as usize > self.remaining() {
            return Err(MuxError::Codec("bitstream exhausted".into()));
        }
        let mut value = 0u64;
        for _ in 0..n {
            value = (value << 1) | self.read_flag()? as u64;
        }
        Ok(value as u32)
    }

    pub fn skip_bits(&mut self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(MuxError::Codec("bitstream exhausted".into()));
        }
        self.position += n;
        Ok(())
    }

    /// ue(v)
    pub fn read_golomb(&mut self) -> Result<u32> {
        let mut leading_zeros = 0u32;
        while !self.read_flag()? {
            leading_zeros += 1;
            if leading_zeros > 31 {
                return Err(MuxError::Codec("invalid exp-Golomb code".into()));
            }
        }
        let suffix = self.read_bits(leading_zeros)? as u64;
        Ok(((1u64 << leading_zeros) - 1 + suffix) as u32)
    }

    /// se(v)
    pub fn read_signed_golomb(&mut self) -> Result<i32> {
        let k = self.read_golomb()? as i64;
        let magnitude = (k + 1) >> 1;
        let value = if k & 1 == 1 { magnitude } else { -magnitude };
        Ok(value as i32)
    }

    pub fn remaining(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;

    /// Packs a sequence of ue(v) codes MSB first.
    fn encode_golomb(values: &[u32]) -> Vec<u8> {
        let mut bits = Vec::new();
        for &v in values {
            let code = v as u64 + 1;
            let len = 64 - code.leading_zeros();
            bits.extend(std::iter::repeat(false).take(len as usize - 1));
            for i in (0..len).rev() {
                bits.push((code >> i) & 1 == 1);
            }
        }
        bits.chunks(8)
            .map(|c| c.iter().enumerate().fold(0u8, |b, (i, &bit)| b | (bit as u8) << (7 - i)))
            .collect()
    }

    #[test]
    fn test_read_bits_across_bytes() {
        let data = [0b1011_0011, 0b0101_1010];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_bits(8).unwrap(), 0b1001_1010);
        assert_eq!(reader.remaining(), 5);
        assert_eq!(reader.read_bits(0).unwrap(), 0);
        assert!(reader.read_bits(6).is_err());
        assert!(reader.read_bits(33).is_err());
    }

    #[test]
    fn test_golomb_codes() {
        let cases: [(u8, u32, i32); 5] = [
            (0b1000_0000, 0, 0),
            (0b0100_0000, 1, 1),
            (0b0110_0000, 2, -1),
            (0b0010_0000, 3, 2),
            (0b0011_1000, 6, -3),
        ];
        for (byte, unsigned, signed) in cases {
            assert_eq!(BitReader::new(&[byte]).read_golomb().unwrap(), unsigned);
            assert_eq!(BitReader::new(&[byte]).read_signed_golomb().unwrap(), signed);
        }
        assert!(BitReader::new(&[0u8; 5]).read_golomb().is_err());
    }

    #[quickcheck]
    fn prop_golomb_sequence(values: Vec<u16>) -> bool {
        let values: Vec<u32> = values.into_iter().map(u32::from).collect();
        let encoded = encode_golomb(&values);
        let mut reader = BitReader::new(&encoded);
        values.iter().all(|&v| reader.read_golomb().ok() == Some(v))
    }
}
