//! # Completion wait primitive
//!
//! The clock and DRAM blocks report the progress of their internal state machines only through
//! status bits. [await_completion] spins on such a status register until the masked value
//! matches, with a time budget measured on the provided [DelayNs] implementation.
use embedded_hal::delay::DelayNs;

/// Hardware condition a poll waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTarget {
    /// PLL2 lock bit in the PRCM.
    Pll2Lock,
    /// PHY init done bit in PGSR0.
    PhyInitDone,
    /// Controller left its init state.
    ControllerNormal,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error(
    "timeout waiting for {target:?}: value {last:#010x} & mask {mask:#010x} != {expected:#010x}"
)]
pub struct PollTimeout {
    pub target: PollTarget,
    pub mask: u32,
    pub expected: u32,
    /// Last value read from the register.
    pub last: u32,
}

/// Poll a register until `(value & mask) == expected`.
///
/// The register is read through `read`, which allows the caller to use the typed `derive-mmio`
/// accessor of the respective register. Between two reads, this function waits for one
/// microsecond. After `timeout_us` microseconds without a match, a [PollTimeout] is returned.
pub fn await_completion(
    target: PollTarget,
    mut read: impl FnMut() -> u32,
    mask: u32,
    expected: u32,
    timeout_us: u32,
    delay: &mut impl DelayNs,
) -> Result<(), PollTimeout> {
    let mut elapsed_us: u32 = 0;
    loop {
        let value = read();
        if value & mask == expected {
            return Ok(());
        }
        if elapsed_us >= timeout_us {
            return Err(PollTimeout {
                target,
                mask,
                expected,
                last: value,
            });
        }
        delay.delay_us(1);
        elapsed_us = elapsed_us.saturating_add(1);
    }
}
