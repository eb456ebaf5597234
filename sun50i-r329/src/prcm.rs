//! # Power, reset and clock management (PRCM) block
//!
//! On the R329 the PRCM also hosts the PLLs, including PLL2 which feeds the DRAM clock.
use arbitrary_int::u6;

pub const PRCM_BASE_ADDR: usize = 0x0701_0000;

/// PLL control register as used by the PLL1, PLL2, PLL6 and audio PLLs.
#[bitbybit::bitfield(u32, debug)]
pub struct PllControl {
    #[bit(31, rw)]
    enable: bool,
    #[bit(29, rw)]
    lock_enable: bool,
    /// Set by hardware once the PLL output is stable.
    #[bit(28, r)]
    lock: bool,
    #[bit(27, rw)]
    output_gate: bool,
    #[bits(16..=21, rw)]
    p0: u6,
    #[bits(8..=15, rw)]
    n: u8,
    #[bit(1, rw)]
    m1: bool,
    #[bit(0, rw)]
    m0: bool,
}

/// Bus gate and reset register of the PRCM peripherals.
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct GateReset {
    #[bit(16, rw)]
    reset_deasserted: bool,
    #[bit(0, rw)]
    gate: bool,
}

#[derive(derive_mmio::Mmio)]
#[repr(C)]
pub struct Prcm {
    cpus_cfg: u32,
    _reserved0: [u32; 0x2],
    apbs1_cfg: u32,
    apbs2_cfg: u32,
    _reserved1: [u32; 0x42],
    tmr_gate_reset: GateReset,
    _reserved2: [u32; 0x3],
    twd_gate_reset: GateReset,
    _reserved3: [u32; 0x3],
    pwm_gate_reset: GateReset,
    _reserved4: [u32; 0x13],
    uart_gate_reset: GateReset,
    _reserved5: [u32; 0x3],
    twi_gate_reset: GateReset,
    _reserved6: [u32; 0x7],
    rsb_gate_reset: GateReset,
    cir_cfg: u32,
    _reserved7: [u32; 0x2],
    cir_gate_reset: GateReset,
    _reserved8: [u32; 0x4],
    w1_cfg: u32,
    _reserved9: [u32; 0x2],
    w1_gate_reset: GateReset,
    _reserved10: [u32; 0x7],
    rtc_gate_reset: GateReset,
    _reserved11: [u32; 0x10],
    /// Undocumented. The vendor boot code writes 0x10 here before DRAM init.
    magic_0x250: u32,
    _reserved12: [u32; 0x2F],
    /// Undocumented. The vendor boot code writes 0x330000 and then 0x330003 here.
    magic_0x310: u32,
    _reserved13: [u32; 0x33B],

    pll1_cfg: PllControl,
    _reserved14: [u32; 0x3],
    pll6_cfg: PllControl,
    _reserved15: [u32; 0x3],
    pll2_cfg: PllControl,
    _reserved16: [u32; 0x3],
    pll_audio1_cfg: PllControl,
    _reserved17: [u32; 0x37],
    pll6_pat0: u32,
    pll6_pat1: u32,
    _reserved18: [u32; 0x2],
    pll2_pat0: u32,
    pll2_pat1: u32,
    _reserved19: [u32; 0x2],
    pll_audio1_pat0: u32,
    pll_audio1_pat1: u32,
    _reserved20: [u32; 0x72],
    pll1_bias: u32,
    _reserved21: [u32; 0x3],
    pll6_bias: u32,
    _reserved22: [u32; 0x3],
    pll2_bias: u32,
    _reserved23: [u32; 0x3],
    pll_audio1_bias: u32,
    _reserved24: [u32; 0x33],
    pll1_tun: u32,
}

static_assertions::const_assert_eq!(core::mem::size_of::<Prcm>(), 0x1404);
static_assertions::const_assert_eq!(core::mem::offset_of!(Prcm, rtc_gate_reset), 0x20C);
static_assertions::const_assert_eq!(core::mem::offset_of!(Prcm, magic_0x250), 0x250);
static_assertions::const_assert_eq!(core::mem::offset_of!(Prcm, magic_0x310), 0x310);
static_assertions::const_assert_eq!(core::mem::offset_of!(Prcm, pll1_cfg), 0x1000);
static_assertions::const_assert_eq!(core::mem::offset_of!(Prcm, pll2_cfg), 0x1020);
static_assertions::const_assert_eq!(core::mem::offset_of!(Prcm, pll2_pat0), 0x1120);
static_assertions::const_assert_eq!(core::mem::offset_of!(Prcm, pll2_pat1), 0x1124);
static_assertions::const_assert_eq!(core::mem::offset_of!(Prcm, pll1_tun), 0x1400);

impl Prcm {
    /// Create a new PRCM MMIO instance at the fixed base address [PRCM_BASE_ADDR].
    ///
    /// # Safety
    ///
    /// This API can be used to potentially create a driver to the same peripheral structure
    /// from multiple places. The user must ensure that concurrent accesses are safe and do not
    /// interfere with each other.
    pub const unsafe fn new_mmio_fixed() -> MmioPrcm<'static> {
        unsafe { Self::new_mmio_at(PRCM_BASE_ADDR) }
    }
}
