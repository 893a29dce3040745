//! Address preamble encoding

/// Width of the address preamble transmitted before payload
///
/// Small chips take a single address byte and extend their range through
/// block-select bits folded into the bus select address; everything from
/// 4 KiB up takes a two-byte big-endian address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddrWidth {
    /// 1-byte address, high bits folded into the bus select address
    OneByte,
    /// 2-byte (16-bit) address, most significant byte first
    #[default]
    TwoByte,
}

impl AddrWidth {
    /// Returns the number of address preamble bytes
    pub const fn bytes(&self) -> usize {
        match self {
            Self::OneByte => 1,
            Self::TwoByte => 2,
        }
    }

    /// Returns the maximum addressable size in bytes
    ///
    /// One-byte devices carry up to three block-select bits in the select
    /// address, for 11 usable address bits in total.
    pub const fn max_size(&self) -> u32 {
        match self {
            Self::OneByte => 2 * 1024,
            Self::TwoByte => 64 * 1024,
        }
    }

    /// Encode `offset` into `buf`, most significant byte first
    ///
    /// Returns the select-address suffix: the high offset bits that must be
    /// OR-ed into the device's bus select address. Always zero for two-byte
    /// widths.
    pub fn encode(&self, offset: u32, buf: &mut [u8]) -> u8 {
        match self {
            Self::OneByte => {
                buf[0] = offset as u8;
                ((offset >> 8) & 0x07) as u8
            }
            Self::TwoByte => {
                buf[0] = (offset >> 8) as u8;
                buf[1] = offset as u8;
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_byte_is_big_endian() {
        let mut buf = [0u8; 2];
        let suffix = AddrWidth::TwoByte.encode(0x1234, &mut buf);
        assert_eq!(buf, [0x12, 0x34]);
        assert_eq!(suffix, 0);
    }

    #[test]
    fn one_byte_folds_high_bits_into_suffix() {
        let mut buf = [0u8; 1];

        let suffix = AddrWidth::OneByte.encode(0x00, &mut buf);
        assert_eq!((buf[0], suffix), (0x00, 0));

        // 0x1AB = block 1, byte 0xAB
        let suffix = AddrWidth::OneByte.encode(0x1AB, &mut buf);
        assert_eq!((buf[0], suffix), (0xAB, 0x01));

        // top of a 2 KiB device
        let suffix = AddrWidth::OneByte.encode(0x7FF, &mut buf);
        assert_eq!((buf[0], suffix), (0xFF, 0x07));
    }

    #[test]
    fn widths_cover_their_claimed_range() {
        assert!(AddrWidth::OneByte.max_size() <= 1 << (8 + 3));
        assert!(AddrWidth::TwoByte.max_size() <= 1 << 16);
    }
}
