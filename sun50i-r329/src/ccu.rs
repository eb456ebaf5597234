//! # Clock control unit (CCU)
//!
//! Only the registers of the DRAM clock path and the bus clock gates of the main peripherals
//! are modelled.
use arbitrary_int::{u2, u3, u5};

pub const CCU_BASE_ADDR: usize = 0x0200_1000;

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct MbusConfig {
    #[bit(31, rw)]
    enable: bool,
    /// Active low reset: the MBUS is in reset while this is cleared.
    #[bit(30, rw)]
    reset_deasserted: bool,
}

/// Source selection of the DRAM module clock. The index order matches the base frequencies
/// used by the divider search.
#[bitbybit::bitenum(u3, exhaustive = true)]
#[derive(Debug, PartialEq, Eq)]
pub enum DramClockSource {
    /// 1200 MHz.
    PllDdr = 0b000,
    /// 800 MHz.
    PllPeri2x = 0b001,
    /// 516.096 MHz.
    PllAudio0 = 0b010,
    /// 1548.288 MHz, PLL2 in the PRCM.
    PllAudio1 = 0b011,
    __Reserved4 = 0b100,
    __Reserved5 = 0b101,
    __Reserved6 = 0b110,
    __Reserved7 = 0b111,
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct DramClockConfig {
    #[bit(31, rw)]
    clk_enable: bool,
    /// Active low module reset.
    #[bit(30, rw)]
    mod_reset_deasserted: bool,
    /// Self-clearing. Latches the new source and divider settings.
    #[bit(27, rw)]
    update: bool,
    #[bits(24..=26, rw)]
    src_sel: DramClockSource,
    /// Power-of-two pre-divider, the output is divided by `2^n`.
    #[bits(8..=9, rw)]
    factor_n: u2,
    /// Output is divided by `m + 1`.
    #[bits(0..=4, rw)]
    factor_m: u5,
}

/// Combined bus gate / reset register of the DRAM controller.
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct BusGateReset {
    #[bit(16, rw)]
    reset_deasserted: bool,
    #[bit(0, rw)]
    gate: bool,
}

#[derive(derive_mmio::Mmio)]
#[repr(C)]
pub struct Ccu {
    _reserved0: [u32; 0x150],
    mbus_cfg: MbusConfig,
    _reserved1: [u32; 0xAF],
    dram_clk_cfg: DramClockConfig,
    _reserved2: [u32; 0x2],
    dram_gate_reset: BusGateReset,
    _reserved3: [u32; 0xF],
    mmc_bgr: u32,
    _reserved4: [u32; 0x2F],
    uart_bgr: u32,
    _reserved5: [u32; 0xC],
    spi0_clk: u32,
    spi1_clk: u32,
    _reserved6: [u32; 0x9],
    spi_bgr: u32,
    _reserved7: [u32; 0x3],
    emac_bgr: u32,
    _reserved8: [u32; 0x3C],
    usb0_clk: u32,
    usb1_clk: u32,
    _reserved9: [u32; 0x5],
    usb_bgr: u32,
}

static_assertions::const_assert_eq!(core::mem::size_of::<Ccu>(), 0xA90);
static_assertions::const_assert_eq!(core::mem::offset_of!(Ccu, mbus_cfg), 0x540);
static_assertions::const_assert_eq!(core::mem::offset_of!(Ccu, dram_clk_cfg), 0x800);
static_assertions::const_assert_eq!(core::mem::offset_of!(Ccu, dram_gate_reset), 0x80C);
static_assertions::const_assert_eq!(core::mem::offset_of!(Ccu, mmc_bgr), 0x84C);
static_assertions::const_assert_eq!(core::mem::offset_of!(Ccu, uart_bgr), 0x90C);
static_assertions::const_assert_eq!(core::mem::offset_of!(Ccu, spi0_clk), 0x940);
static_assertions::const_assert_eq!(core::mem::offset_of!(Ccu, spi1_clk), 0x944);
static_assertions::const_assert_eq!(core::mem::offset_of!(Ccu, spi_bgr), 0x96C);
static_assertions::const_assert_eq!(core::mem::offset_of!(Ccu, emac_bgr), 0x97C);
static_assertions::const_assert_eq!(core::mem::offset_of!(Ccu, usb0_clk), 0xA70);
static_assertions::const_assert_eq!(core::mem::offset_of!(Ccu, usb1_clk), 0xA74);
static_assertions::const_assert_eq!(core::mem::offset_of!(Ccu, usb_bgr), 0xA8C);

impl Ccu {
    /// Create a new CCU MMIO instance at the fixed base address [CCU_BASE_ADDR].
    ///
    /// # Safety
    ///
    /// This API can be used to potentially create a driver to the same peripheral structure
    /// from multiple places. The user must ensure that concurrent accesses are safe and do not
    /// interfere with each other.
    pub const unsafe fn new_mmio_fixed() -> MmioCcu<'static> {
        unsafe { Self::new_mmio_at(CCU_BASE_ADDR) }
    }
}
