//! Conservative transfer deadlines derived from the bus clock

use core::time::Duration;

/// Bit slots on the wire per transferred byte: 8 data bits plus the
/// acknowledge slot and framing slack.
const BIT_SLOTS_PER_BYTE: u64 = 10;

/// Fixed safety margin added to every deadline, in milliseconds.
const MARGIN_MS: u64 = 10;

/// Worst-case deadline for moving `bytes` (preamble + payload) at `clock_hz`
///
/// The per-byte constant and the margin are empirical, chosen to dominate
/// observed worst-case bus latency rather than derived from a protocol
/// proof. Over-estimating only delays failure reporting; under-estimating
/// risks aborting a transaction the device is still executing.
///
/// Monotone non-decreasing in `bytes` and non-increasing in `clock_hz`,
/// never below the fixed margin.
pub fn transfer_timeout(bytes: usize, clock_hz: u32) -> Duration {
    let ms = (bytes as u64 + 1) * BIT_SLOTS_PER_BYTE * 1000 / clock_hz.max(1) as u64 + MARGIN_MS;
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotone_in_size() {
        let clock = 100_000;
        let mut prev = Duration::ZERO;
        for bytes in 0..512 {
            let tmo = transfer_timeout(bytes, clock);
            assert!(tmo >= prev, "timeout shrank at {} bytes", bytes);
            prev = tmo;
        }
    }

    #[test]
    fn monotone_in_clock() {
        let mut prev = Duration::MAX;
        for clock in [10_000, 50_000, 100_000, 400_000, 1_000_000] {
            let tmo = transfer_timeout(128, clock);
            assert!(tmo <= prev, "timeout grew at {} Hz", clock);
            prev = tmo;
        }
    }

    #[test]
    fn never_below_margin() {
        assert!(transfer_timeout(0, u32::MAX) >= Duration::from_millis(MARGIN_MS as u64));
        assert!(transfer_timeout(1, 1) >= Duration::from_millis(MARGIN_MS as u64));
    }

    #[test]
    fn standard_mode_page_write() {
        // 2 address bytes + 64 payload bytes at 100 kHz:
        // (67 * 10 * 1000) / 100000 + 10 = 16 ms
        assert_eq!(transfer_timeout(66, 100_000), Duration::from_millis(16));
    }
}
