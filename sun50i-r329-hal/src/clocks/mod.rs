//! # Clock module
//!
//! The R329 distributes its clocks over two blocks: the PRCM hosts the PLLs and the CCU holds
//! the module clock muxes and the bus clock gates. This module only covers what the early boot
//! stage needs:
//!
//! - [dram]: the DRAM clock path, brought up as part of [crate::dram::init].
//! - [gates]: the bus clock gates and reset lines of the main peripherals.
pub mod dram;
pub mod gates;

pub use dram::DramClockDivider;
pub use gates::{Gate, Reset};
