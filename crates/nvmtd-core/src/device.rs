//! Device geometry and the known-part table

use crate::address::AddrWidth;

/// How the driver waits out the device's internal write cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WriteCycle {
    /// No internal write cycle (FRAM writes at bus speed)
    None,
    /// Fixed datasheet delay in milliseconds (EEPROM t_WR)
    Delay(u32),
    /// Acknowledge polling: the device NAKs its select address until the
    /// cycle finishes
    AckPoll {
        /// Delay between polls in milliseconds
        poll_ms: u32,
        /// Give up after this many milliseconds
        timeout_ms: u32,
    },
}

/// Immutable device geometry, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MtdConfig {
    /// Width of the address preamble
    pub addr_width: AddrWidth,
    /// Device capacity in bytes
    pub capacity: u32,
    /// Page buffer size in bytes; writes must not cross a page boundary.
    /// Equal to `capacity` for FRAM, which has no page structure.
    pub page_size: u32,
    /// Write-cycle completion strategy
    pub write_cycle: WriteCycle,
}

impl MtdConfig {
    /// Number of address preamble bytes for this device
    pub const fn addr_bytes(&self) -> usize {
        self.addr_width.bytes()
    }

    /// True if the configured capacity fits the configured address width
    pub const fn is_addressable(&self) -> bool {
        self.capacity <= self.addr_width.max_size()
    }
}

/// A known part: name plus geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MtdPart {
    /// Part name as printed on the package, lowercase
    pub name: &'static str,
    /// Geometry for this part
    pub config: MtdConfig,
}

const fn eeprom(name: &'static str, addr_width: AddrWidth, capacity: u32, page_size: u32) -> MtdPart {
    MtdPart {
        name,
        config: MtdConfig {
            addr_width,
            capacity,
            page_size,
            // 5 ms t_WR across the 24AA/24LC family datasheets
            write_cycle: WriteCycle::Delay(5),
        },
    }
}

const fn fram(name: &'static str, addr_width: AddrWidth, capacity: u32) -> MtdPart {
    MtdPart {
        name,
        config: MtdConfig {
            addr_width,
            capacity,
            page_size: capacity,
            write_cycle: WriteCycle::None,
        },
    }
}

/// Known EEPROM and FRAM parts
///
/// Bounded static table, searched linearly. Capacity in the part number is
/// kilobits, so a 24aa256 is 32 KiB.
pub const PARTS: &[MtdPart] = &[
    eeprom("24aa01", AddrWidth::OneByte, 128, 8),
    eeprom("24aa02", AddrWidth::OneByte, 256, 8),
    eeprom("24aa04", AddrWidth::OneByte, 512, 16),
    eeprom("24aa08", AddrWidth::OneByte, 1024, 16),
    eeprom("24aa16", AddrWidth::OneByte, 2048, 16),
    eeprom("24aa32", AddrWidth::TwoByte, 4096, 32),
    eeprom("24aa64", AddrWidth::TwoByte, 8192, 32),
    eeprom("24aa128", AddrWidth::TwoByte, 16384, 64),
    eeprom("24aa256", AddrWidth::TwoByte, 32768, 64),
    eeprom("24aa512", AddrWidth::TwoByte, 65536, 128),
    fram("fm24c04", AddrWidth::OneByte, 512),
    fram("fm24c16", AddrWidth::OneByte, 2048),
    fram("mb85rc64", AddrWidth::TwoByte, 8192),
    fram("mb85rc256", AddrWidth::TwoByte, 32768),
];

/// Look up a part by name (case-insensitive linear scan)
pub fn find_part(name: &str) -> Option<&'static MtdPart> {
    PARTS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let part = find_part("24AA256").unwrap();
        assert_eq!(part.config.capacity, 32 * 1024);
        assert_eq!(part.config.addr_width, AddrWidth::TwoByte);
        assert!(find_part("25q128").is_none());
    }

    #[test]
    fn every_part_fits_its_address_width() {
        for part in PARTS {
            assert!(part.config.is_addressable(), "{} over-capacity", part.name);
            assert!(part.config.page_size > 0, "{} zero page", part.name);
            assert_eq!(
                part.config.capacity % part.config.page_size,
                0,
                "{} capacity not a whole number of pages",
                part.name
            );
        }
    }

    #[test]
    fn fram_parts_have_no_write_cycle() {
        assert_eq!(find_part("fm24c16").unwrap().config.write_cycle, WriteCycle::None);
        assert_eq!(
            find_part("24aa16").unwrap().config.write_cycle,
            WriteCycle::Delay(5)
        );
    }
}
