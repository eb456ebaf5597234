//! # Peripheral access crate for the Allwinner R329 SoC
//!
//! This crate covers the register blocks required to bring up the DRAM subsystem right after
//! reset: the power/reset management unit (PRCM), the clock control unit (CCU), the two DRAM
//! controller blocks and the secure ID fuse block.
//!
//! All register blocks are modelled with [derive_mmio], so every access is a volatile and ordered
//! access through an `Mmio*` handle. Register layouts are checked statically against the
//! hardware offsets.
#![no_std]

pub mod ccu;
pub mod dramc;
pub mod prcm;
pub mod sid;

/// Start of the DRAM address window.
pub const SDRAM_BASE_ADDR: usize = 0x4000_0000;
