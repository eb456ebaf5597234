//! # DRAM controller
//!
//! The controller is split into two register blocks:
//!
//! - [com]: the common block which holds the global mode register, the master enable registers
//!   of the memory bus arbiter and some undocumented silicon-specific registers.
//! - [ctl]: the channel block which combines the protocol controller and the PHY utility block
//!   (PHY initialization, training and delay lines).
pub mod com;
pub mod ctl;

pub use com::{MctlCom, MmioMctlCom};
pub use ctl::{MctlCtl, MmioMctlCtl};

pub const DRAM_COM_BASE_ADDR: usize = 0x0481_0000;
pub const DRAM_CTL0_BASE_ADDR: usize = 0x0482_0000;

/// Number of byte lanes of the 32-bit data bus.
pub const NR_OF_BYTE_LANES: usize = 4;
/// Eight DQ lines plus DM, DQS and DQSN.
pub const LINES_PER_BYTE_LANE: usize = 11;
/// Number of address/command lines with a bit delay line.
pub const NR_OF_AC_LINES: usize = 31;
