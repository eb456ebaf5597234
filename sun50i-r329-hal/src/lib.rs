//! # HAL for the Allwinner R329 SoC
//!
//! This crate contains the early boot parts of the **H**ardware **A**bstraction **L**ayer (HAL)
//! on top of the [sun50i_r329] peripheral access crate: the DRAM clock path, the DRAM
//! controller and PHY bring-up including automatic size detection, and the bus clock gate and
//! reset tables of the main CCU.
//!
//! All of this runs from on-chip SRAM before DRAM is available, so nothing in here allocates.
//! Time is provided through the [embedded_hal::delay::DelayNs] trait, which allows plugging in
//! whichever timer the boot code has already set up.
#![no_std]

pub mod clocks;
pub mod dram;
pub mod poll;
pub mod time;
