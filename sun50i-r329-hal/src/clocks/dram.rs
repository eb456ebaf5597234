//! # DRAM clock path
//!
//! Covers PLL2 in the PRCM, the DRAM module clock in the CCU with its divider search, and the
//! reset and gate sequencing of the DRAM clock domain and the MBUS.
use arbitrary_int::{u2, u5};
use embedded_hal::delay::DelayNs;
use sun50i_r329::{
    ccu::{BusGateReset, DramClockConfig, DramClockSource, MmioCcu},
    dramc::{MmioMctlCom, MmioMctlCtl},
    prcm::{MmioPrcm, PllControl},
};

use crate::{
    poll::{PollTarget, PollTimeout, await_completion},
    time::{KiloHertz, MegaHertz, Microseconds},
};

// PLL2 setup of the vendor BSP. The resulting rate is 1548.288 MHz.
const PLL2_CONFIG: u32 = 0x0902_3f00;
const PLL2_PATTERN0: u32 = 0xc007_0624;
const PLL2_PATTERN1: u32 = 0x0;

// Undocumented PRCM values of the vendor boot code.
const PRCM_MAGIC_0X250: u32 = 0x10;
const PRCM_MAGIC_0X310_STAGE0: u32 = 0x0033_0000;
const PRCM_MAGIC_0X310_STAGE1: u32 = 0x0033_0003;

/// Unlocks the access to the channel registers.
const CTL_CLOCK_ENABLE: u32 = 0x8000;

const SETTLE_TIME: Microseconds = Microseconds::from_ticks(5);

/// Base clocks of the DRAM clock mux in mux index order.
pub const DRAM_BASE_CLOCKS: [(DramClockSource, KiloHertz); 4] = [
    (DramClockSource::PllDdr, KiloHertz::from_raw(1_200_000)),
    (DramClockSource::PllPeri2x, KiloHertz::from_raw(800_000)),
    (DramClockSource::PllAudio0, KiloHertz::from_raw(516_096)),
    (DramClockSource::PllAudio1, KiloHertz::from_raw(1_548_288)),
];

/// Source and divider settings of the DRAM module clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DramClockDivider {
    mux: usize,
    n: u2,
    m: u2,
}

impl DramClockDivider {
    /// Search the divider settings for the given DRAM clock.
    ///
    /// The module clock runs at twice the DRAM clock. The result is the combination whose output
    /// frequency is closest to that target without exceeding it. The search runs over the mux
    /// index first, then over the power-of-two divider `n` and then over the linear divider `m`,
    /// and the first combination found wins for equal errors.
    ///
    /// Returns [None] if every combination exceeds the target.
    pub fn search(dram_clk: MegaHertz) -> Option<Self> {
        let target = dram_clk.to_kHz() * 2;
        let mut best_error = target;
        let mut best = None;
        for (mux, (_, base)) in DRAM_BASE_CLOCKS.iter().enumerate() {
            for n in 0..4 {
                for m in 0..4 {
                    let clk = base.raw() / (1 << n) / (m + 1);
                    if clk > target {
                        continue;
                    }
                    let error = target - clk;
                    if error < best_error {
                        best_error = error;
                        best = Some(Self {
                            mux,
                            n: u2::new(n as u8),
                            m: u2::new(m as u8),
                        });
                    }
                }
            }
        }
        best
    }

    #[inline]
    pub fn source(&self) -> DramClockSource {
        DRAM_BASE_CLOCKS[self.mux].0
    }

    #[inline]
    pub fn n(&self) -> u2 {
        self.n
    }

    #[inline]
    pub fn m(&self) -> u2 {
        self.m
    }

    /// Resulting module clock frequency.
    pub fn module_clock(&self) -> KiloHertz {
        KiloHertz::from_raw(
            DRAM_BASE_CLOCKS[self.mux].1.raw()
                / (1 << self.n.value())
                / (self.m.value() as u32 + 1),
        )
    }

    /// Register value with the clock gate closed and the module in reset.
    pub fn clock_config(&self) -> DramClockConfig {
        DramClockConfig::builder()
            .with_clk_enable(false)
            .with_mod_reset_deasserted(false)
            .with_update(false)
            .with_src_sel(self.source())
            .with_factor_n(self.n)
            .with_factor_m(u5::new(self.m.value()))
            .build()
    }
}

/// Undocumented PRCM writes of the vendor boot code which have to happen before the DRAM
/// clock path is touched.
pub fn prcm_vendor_init(prcm: &mut MmioPrcm<'_>) {
    prcm.write_magic_0x250(PRCM_MAGIC_0X250);
    prcm.write_magic_0x310(PRCM_MAGIC_0X310_STAGE0);
    prcm.write_magic_0x310(PRCM_MAGIC_0X310_STAGE1);
}

/// Enable PLL2 with the vendor settings and wait for it to lock.
pub fn enable_pll2(
    prcm: &mut MmioPrcm<'_>,
    timeout_us: u32,
    delay: &mut impl DelayNs,
) -> Result<(), PollTimeout> {
    prcm.write_pll2_cfg(PllControl::new_with_raw_value(PLL2_CONFIG));
    prcm.write_pll2_pat0(PLL2_PATTERN0);
    prcm.write_pll2_pat1(PLL2_PATTERN1);
    delay.delay_us(SETTLE_TIME.ticks());
    prcm.modify_pll2_cfg(|mut val| {
        val.set_enable(true);
        val.set_lock_enable(true);
        val
    });
    const LOCK: u32 = 1 << 28;
    await_completion(
        PollTarget::Pll2Lock,
        || prcm.read_pll2_cfg().raw_value(),
        LOCK,
        LOCK,
        timeout_us,
        delay,
    )?;
    log::debug!("PLL2 locked");
    Ok(())
}

/// Register blocks touched by [sys_init].
pub struct ClockPathRegs<'regs, 'a> {
    pub prcm: &'regs mut MmioPrcm<'a>,
    pub ccu: &'regs mut MmioCcu<'a>,
    pub com: &'regs mut MmioMctlCom<'a>,
    pub ctl: &'regs mut MmioMctlCtl<'a>,
}

/// Bring up the DRAM clock domain.
///
/// It performs the following steps:
///
///  1. Enables PLL2 and waits for the lock.
///  2. Puts the MBUS, the DRAM bus gate and the DRAM module clock into reset.
///  3. Applies the divider settings to the module clock.
///  4. Disables all bus masters of the DRAM arbiter except the CPU port. They are enabled again
///     after the size detection.
///  5. Releases the resets, opens the clock gates and latches the clock settings.
///  6. Unlocks the access to the channel registers.
pub fn sys_init(
    regs: ClockPathRegs<'_, '_>,
    divider: &DramClockDivider,
    timeout_us: u32,
    delay: &mut impl DelayNs,
) -> Result<(), PollTimeout> {
    let ClockPathRegs {
        prcm,
        ccu,
        com,
        ctl,
    } = regs;
    enable_pll2(prcm, timeout_us, delay)?;

    ccu.modify_mbus_cfg(|mut val| {
        val.set_enable(false);
        val.set_reset_deasserted(false);
        val
    });
    ccu.modify_dram_gate_reset(|mut val| {
        val.set_gate(false);
        val
    });
    delay.delay_us(SETTLE_TIME.ticks());
    ccu.write_dram_gate_reset(BusGateReset::DEFAULT);
    ccu.modify_dram_clk_cfg(|mut val| {
        val.set_mod_reset_deasserted(false);
        val
    });
    delay.delay_us(SETTLE_TIME.ticks());
    ccu.modify_dram_clk_cfg(|mut val| {
        val.set_clk_enable(false);
        val
    });
    delay.delay_us(SETTLE_TIME.ticks());
    ccu.modify_dram_clk_cfg(|mut val| {
        val.set_update(true);
        val
    });

    ccu.write_dram_clk_cfg(divider.clock_config());
    log::debug!(
        "DRAM module clock: {} from {:?}",
        divider.module_clock(),
        divider.source()
    );

    com.write_maer0(1);
    com.write_maer1(0);
    com.write_maer2(0);

    ccu.modify_dram_gate_reset(|mut val| {
        val.set_reset_deasserted(true);
        val
    });
    ccu.modify_mbus_cfg(|mut val| {
        val.set_reset_deasserted(true);
        val
    });
    ccu.modify_dram_clk_cfg(|mut val| {
        val.set_mod_reset_deasserted(true);
        val
    });
    ccu.modify_dram_gate_reset(|mut val| {
        val.set_gate(true);
        val
    });
    ccu.modify_dram_clk_cfg(|mut val| {
        val.set_clk_enable(true);
        val
    });
    ccu.modify_dram_clk_cfg(|mut val| {
        val.set_update(true);
        val
    });

    ctl.write_clken(CTL_CLOCK_ENABLE);
    Ok(())
}
