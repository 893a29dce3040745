//! nvmtd-dummy - In-memory EEPROM/FRAM emulator for testing
//!
//! This crate provides a dummy bus master that emulates a serial EEPROM or
//! FRAM chip in memory: it decodes the address preamble (including
//! block-select bits folded into the select address), applies page
//! wrap-around on writes, and can emulate the post-write busy window in
//! which the device NAKs its select address. Every bus event is recorded so
//! tests can assert on transaction framing and ordering.

use std::collections::VecDeque;
use std::time::Duration;

use nvmtd_core::address::AddrWidth;
use nvmtd_core::bus::{FaultFlags, I2cMaster};
use nvmtd_core::error::{Error, Result};

/// Configuration for the emulated device
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// 7-bit select address, block-select bits clear
    pub select_addr: u8,
    /// Address preamble width the device expects
    pub addr_width: AddrWidth,
    /// Capacity in bytes
    pub size: usize,
    /// Page buffer size in bytes; writes wrap within a page like real silicon
    pub page_size: usize,
    /// Emulated bus clock in Hz
    pub clock_hz: u32,
    /// Number of transfers NAKed after each write, emulating the internal
    /// write cycle for acknowledge-polling tests (0 = always ready)
    pub busy_polls_per_write: u32,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            select_addr: 0x50,
            addr_width: AddrWidth::TwoByte,
            size: 32 * 1024, // 24AA256
            page_size: 64,
            clock_hz: 100_000,
            busy_polls_per_write: 0,
        }
    }
}

/// One recorded bus event, in issue order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// Bus ownership taken
    Acquire,
    /// Bus ownership released
    Release,
    /// One combined transaction
    Transfer {
        /// Select address as seen on the wire (base | suffix)
        select_addr: u8,
        /// Transmitted bytes (preamble, plus payload for writes)
        tx: Vec<u8>,
        /// Requested receive length
        rx_len: usize,
        /// Whether the device acknowledged
        ok: bool,
    },
    /// Blocking sleep, in milliseconds
    Sleep(u32),
}

/// Dummy bus master emulating one EEPROM/FRAM chip
pub struct DummyEeprom {
    config: DummyConfig,
    data: Vec<u8>,
    events: Vec<BusEvent>,
    fault: FaultFlags,
    injected: VecDeque<FaultFlags>,
    busy_polls: u32,
}

impl DummyEeprom {
    /// Create a new emulated device, contents all 0xFF
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![0xFF; config.size];
        Self {
            config,
            data,
            events: Vec::new(),
            fault: FaultFlags::empty(),
            injected: VecDeque::new(),
            busy_polls: 0,
        }
    }

    /// Create an emulated device with pre-filled contents
    pub fn with_data(config: DummyConfig, initial: &[u8]) -> Self {
        let mut dev = Self::new(config);
        let len = initial.len().min(dev.data.len());
        dev.data[..len].copy_from_slice(&initial[..len]);
        dev
    }

    /// Memory contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable memory contents
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Recorded bus events, in issue order
    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    /// Forget recorded events
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Number of transactions issued so far
    pub fn transfer_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, BusEvent::Transfer { .. }))
            .count()
    }

    /// Fail the next transfer with the given fault flags
    pub fn fail_next(&mut self, flags: FaultFlags) {
        self.injected.push_back(flags);
    }

    fn nak(&mut self, flags: FaultFlags) -> Result<()> {
        self.fault = flags;
        Err(Error::BusTransferFailed)
    }

    /// Decode the byte offset from the wire: block-select bits out of the
    /// select address, then the preamble bytes MSB first
    fn decode_offset(&self, select_addr: u8, preamble: &[u8]) -> usize {
        match self.config.addr_width {
            AddrWidth::OneByte => ((select_addr & 0x07) as usize) << 8 | preamble[0] as usize,
            AddrWidth::TwoByte => (preamble[0] as usize) << 8 | preamble[1] as usize,
        }
    }

    fn handle(&mut self, select_addr: u8, tx: &[u8], rx: &mut [u8]) -> Result<()> {
        if let Some(flags) = self.injected.pop_front() {
            return self.nak(flags);
        }

        // Wrong device on the bus: nobody acknowledges
        if select_addr & !0x07 != self.config.select_addr & !0x07 {
            return self.nak(FaultFlags::ACK_FAILURE);
        }

        // Internal write cycle in progress: NAK everything, including the
        // zero-length acknowledge-polling probes
        if self.busy_polls > 0 {
            self.busy_polls -= 1;
            return self.nak(FaultFlags::ACK_FAILURE);
        }

        let alen = self.config.addr_width.bytes();
        if tx.len() < alen {
            // Address-less probe (acknowledge polling)
            return Ok(());
        }
        let offset = self.decode_offset(select_addr, &tx[..alen]);

        let payload = &tx[alen..];
        if !payload.is_empty() {
            // Page writes wrap within the page buffer like real silicon
            let page = self.config.page_size.max(1);
            let page_base = offset - offset % page;
            for (i, &byte) in payload.iter().enumerate() {
                let idx = page_base + (offset % page + i) % page;
                if idx >= self.data.len() {
                    return self.nak(FaultFlags::ACK_FAILURE);
                }
                self.data[idx] = byte;
            }
            self.busy_polls = self.config.busy_polls_per_write;
        }

        if !rx.is_empty() {
            // Sequential reads wrap from the end of the array to the start
            for (i, slot) in rx.iter_mut().enumerate() {
                *slot = self.data[(offset + i) % self.data.len()];
            }
        }

        Ok(())
    }
}

impl I2cMaster for DummyEeprom {
    fn clock_hz(&self) -> u32 {
        self.config.clock_hz
    }

    fn acquire(&mut self) {
        self.events.push(BusEvent::Acquire);
    }

    fn release(&mut self) {
        self.events.push(BusEvent::Release);
    }

    fn transfer(
        &mut self,
        select_addr: u8,
        tx: &[u8],
        rx: &mut [u8],
        _timeout: Duration,
    ) -> Result<()> {
        let status = self.handle(select_addr, tx, rx);
        self.events.push(BusEvent::Transfer {
            select_addr,
            tx: tx.to_vec(),
            rx_len: rx.len(),
            ok: status.is_ok(),
        });
        if let Err(e) = status {
            log::debug!("dummy transfer failed: {} ({:?})", e, self.fault);
        }
        status
    }

    fn fault_flags(&self) -> FaultFlags {
        self.fault
    }

    fn sleep_ms(&mut self, ms: u32) {
        // Recorded, not slept: keeps write-heavy tests fast. The busy
        // window is counted in transfers, not time, so sleeping does not
        // shorten it.
        self.events.push(BusEvent::Sleep(ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_block_select_bits() {
        let config = DummyConfig {
            addr_width: AddrWidth::OneByte,
            size: 2048,
            page_size: 16,
            ..DummyConfig::default()
        };
        let mut dev = DummyEeprom::new(config);
        let tmo = Duration::from_millis(20);

        // write 0xA5 at offset 0x1AB = block 1, byte 0xAB
        dev.transfer(0x50 | 0x01, &[0xAB, 0xA5], &mut [], tmo).unwrap();
        assert_eq!(dev.data()[0x1AB], 0xA5);

        let mut byte = [0u8; 1];
        dev.transfer(0x50 | 0x01, &[0xAB], &mut byte, tmo).unwrap();
        assert_eq!(byte[0], 0xA5);
    }

    #[test]
    fn wrong_select_address_naks() {
        let mut dev = DummyEeprom::new(DummyConfig::default());
        let err = dev
            .transfer(0x68, &[0, 0], &mut [], Duration::from_millis(20))
            .unwrap_err();
        assert_eq!(err, Error::BusTransferFailed);
        assert_eq!(dev.fault_flags(), FaultFlags::ACK_FAILURE);
    }

    #[test]
    fn page_writes_wrap_within_the_page() {
        let config = DummyConfig {
            size: 256,
            page_size: 8,
            ..DummyConfig::default()
        };
        let mut dev = DummyEeprom::new(config);

        // 4 bytes starting 2 before a page end: the last two wrap to the
        // start of the same page, not into the next one
        dev.transfer(0x50, &[0x00, 0x06, 1, 2, 3, 4], &mut [], Duration::from_millis(20))
            .unwrap();
        assert_eq!(&dev.data()[0..8], &[3, 4, 0xFF, 0xFF, 0xFF, 0xFF, 1, 2]);
        assert_eq!(dev.data()[8], 0xFF);
    }
}
