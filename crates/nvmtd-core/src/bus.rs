//! Bus master trait definitions
//!
//! The driver consumes the bus through a single trait covering the combined
//! transmit-then-receive transaction primitive, bus-level mutual exclusion,
//! the bus clock query and a bounded blocking sleep.

use crate::error::Result;
use bitflags::bitflags;
use core::time::Duration;

bitflags! {
    /// Fault detail for the most recent failed transfer
    ///
    /// Mirrors a bus controller's error register: last-write-wins, read only
    /// for diagnostics, never used for control flow.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FaultFlags: u32 {
        /// Lost bus arbitration to another master
        const ARBITRATION_LOST = 1 << 0;
        /// Device did not acknowledge an address or data byte
        const ACK_FAILURE      = 1 << 1;
        /// Misplaced start/stop condition on the bus
        const BUS_ERROR        = 1 << 2;
        /// Controller over/underrun during the transfer
        const OVERRUN          = 1 << 3;
        /// Transaction exceeded its deadline
        const TIMEOUT          = 1 << 4;
    }
}

impl Default for FaultFlags {
    fn default() -> Self {
        FaultFlags::empty()
    }
}

/// Addressable serial bus master (blocking)
///
/// Implementations wrap a hardware controller or an emulator. One
/// transaction is atomic on the wire: the address preamble and the optional
/// receive phase are never interleaved with other traffic on the bus.
pub trait I2cMaster {
    /// Bus clock frequency in Hz, used to derive transfer deadlines
    fn clock_hz(&self) -> u32;

    /// Take exclusive ownership of the shared bus
    ///
    /// Paired with [`release`](Self::release); brackets every transaction
    /// so that no other device's traffic can split an address phase from
    /// its data phase.
    fn acquire(&mut self);

    /// Give up exclusive ownership of the shared bus
    fn release(&mut self);

    /// Execute one combined transaction within `timeout`
    ///
    /// Transmits `tx` to the device at `select_addr`, then, if `rx` is
    /// non-empty, receives `rx.len()` bytes in the same transaction.
    /// On failure the cause must be retrievable through
    /// [`fault_flags`](Self::fault_flags) until the next transfer.
    fn transfer(
        &mut self,
        select_addr: u8,
        tx: &[u8],
        rx: &mut [u8],
        timeout: Duration,
    ) -> Result<()>;

    /// Fault detail of the most recent failed transfer
    fn fault_flags(&self) -> FaultFlags;

    /// Block the calling thread for at least `ms` milliseconds
    fn sleep_ms(&mut self, ms: u32);
}

impl<T: I2cMaster + ?Sized> I2cMaster for &mut T {
    fn clock_hz(&self) -> u32 {
        (**self).clock_hz()
    }

    fn acquire(&mut self) {
        (**self).acquire()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn transfer(
        &mut self,
        select_addr: u8,
        tx: &[u8],
        rx: &mut [u8],
        timeout: Duration,
    ) -> Result<()> {
        (**self).transfer(select_addr, tx, rx, timeout)
    }

    fn fault_flags(&self) -> FaultFlags {
        (**self).fault_flags()
    }

    fn sleep_ms(&mut self, ms: u32) {
        (**self).sleep_ms(ms)
    }
}
