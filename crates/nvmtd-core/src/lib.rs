//! nvmtd-core - Driver core for byte-addressable serial nonvolatile memory
//!
//! This crate provides a uniform, bounds-checked read/write contract over
//! EEPROM and FRAM chips reachable through a shared addressable serial bus
//! (the 24AA/24LC EEPROM and FM24/MB85RC FRAM families). Devices differ in
//! address width, page size, internal write-cycle latency and in how high
//! address bits are folded into the bus select address; the driver hides all
//! of that behind `read`/`write`/`capacity`.
//!
//! The bus itself is an external collaborator: callers supply any type
//! implementing [`bus::I2cMaster`], which covers the combined
//! transmit-then-receive transaction primitive, bus-level mutual exclusion
//! and a bounded blocking sleep.
//!
//! # Example
//!
//! ```ignore
//! use nvmtd_core::bus::I2cMaster;
//! use nvmtd_core::device::find_part;
//! use nvmtd_core::mtd::{Mtd24, TransportConfig};
//!
//! fn dump_first_page<B: I2cMaster + Send>(bus: B) {
//!     let part = find_part("24aa256").unwrap();
//!     let mut scratch = [0u8; 66];
//!     let mtd = Mtd24::new(part.config, TransportConfig::new(0x50), &mut scratch, bus);
//!
//!     let mut page = [0u8; 64];
//!     if mtd.read(&mut page, 0) == page.len() {
//!         println!("{:02x?}", page);
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod address;
pub mod bus;
pub mod device;
pub mod error;
pub mod mtd;
pub mod timing;

pub use error::{Error, Result};
