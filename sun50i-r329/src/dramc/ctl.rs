//! DRAM controller channel block: protocol controller and PHY utility block.
use arbitrary_int::{u3, u4, u5, u6, u7, u9, u10, u12, u20};

use super::{DRAM_CTL0_BASE_ADDR, LINES_PER_BYTE_LANE, NR_OF_AC_LINES};

/// PHY initialization register. Writing a set of step flags together with [Pir::init] starts
/// the PHY internal sequencer, which runs all requested steps on its own.
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct Pir {
    /// Read DQS gate training.
    #[bit(10, rw)]
    qs_gate: bool,
    #[bit(8, rw)]
    dram_init: bool,
    #[bit(7, rw)]
    dram_reset: bool,
    #[bit(6, rw)]
    phy_reset: bool,
    /// Delay line calibration.
    #[bit(5, rw)]
    delay_cal: bool,
    #[bit(4, rw)]
    pll_init: bool,
    /// Impedance calibration.
    #[bit(1, rw)]
    zq_cal: bool,
    /// Trigger bit, cleared by hardware.
    #[bit(0, rw)]
    init: bool,
}

/// PHY general status register 0.
#[bitbybit::bitfield(u32, debug)]
pub struct Pgsr0 {
    /// Error flags of the impedance, delay line, gate training and write levelling steps.
    #[bits(21..=27, r)]
    errors: u7,
    #[bit(0, r)]
    init_done: bool,
}

impl Pgsr0 {
    /// Mask of all calibration error bits.
    pub const ERROR_MASK: u32 = 0xfe << 20;

    #[inline]
    pub fn has_errors(&self) -> bool {
        self.errors().value() != 0
    }
}

/// Controller operating mode status.
#[bitbybit::bitfield(u32, debug)]
pub struct Statr {
    /// Set once the controller left the init state.
    #[bit(0, r)]
    normal: bool,
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct DramTiming0 {
    /// Write to precharge delay.
    #[bits(24..=29, rw)]
    t_wtp: u6,
    #[bits(16..=21, rw)]
    t_faw: u6,
    #[bits(8..=14, rw)]
    t_ras_max: u7,
    #[bits(0..=5, rw)]
    t_ras: u6,
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct DramTiming1 {
    #[bits(16..=20, rw)]
    t_xp: u5,
    #[bits(8..=11, rw)]
    t_rtp: u4,
    #[bits(0..=6, rw)]
    t_rc: u7,
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct DramTiming2 {
    #[bits(24..=29, rw)]
    t_cwl: u6,
    #[bits(16..=21, rw)]
    t_cl: u6,
    #[bits(8..=13, rw)]
    t_rd2wr: u6,
    #[bits(0..=5, rw)]
    t_wr2rd: u6,
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct DramTiming3 {
    #[bits(16..=25, rw)]
    t_mrw: u10,
    #[bits(12..=15, rw)]
    t_mrd: u4,
    #[bits(0..=9, rw)]
    t_mod: u10,
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct DramTiming4 {
    #[bits(24..=28, rw)]
    t_rcd: u5,
    #[bits(16..=18, rw)]
    t_ccd: u3,
    #[bits(8..=11, rw)]
    t_rrd: u4,
    #[bits(0..=4, rw)]
    t_rp: u5,
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct DramTiming5 {
    #[bits(24..=27, rw)]
    t_cksrx: u4,
    #[bits(16..=19, rw)]
    t_cksre: u4,
    #[bits(8..=13, rw)]
    t_ckesr: u6,
    #[bits(0..=3, rw)]
    t_cke: u4,
}

/// PHY timing register 3: DRAM initialization delays 0 and 1, in DRAM clock cycles.
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct Ptr3 {
    #[bits(20..=28, rw)]
    t_dinit1: u9,
    #[bits(0..=19, rw)]
    t_dinit0: u20,
}

/// PHY timing register 4: DRAM initialization delays 2 and 3, in DRAM clock cycles.
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct Ptr4 {
    #[bits(20..=29, rw)]
    t_dinit3: u10,
    #[bits(0..=19, rw)]
    t_dinit2: u20,
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct RefreshTiming {
    /// Average periodic refresh interval, in units of 32 controller clock cycles.
    #[bits(16..=27, rw)]
    t_refi: u12,
    #[bits(0..=9, rw)]
    t_rfc: u10,
}

/// Read and write delay of a single DQ, DM or DQS line.
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct BitDelay {
    #[bits(8..=15, rw)]
    write: u8,
    #[bits(0..=7, rw)]
    read: u8,
}

/// Output delay of a single address/command line.
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct AcBitDelay {
    #[bits(8..=15, rw)]
    delay: u8,
}

/// Per byte lane PHY registers.
#[derive(derive_mmio::Mmio)]
#[repr(C)]
pub struct DataLane {
    mdlr: u32,
    lcdlr: [u32; 3],
    /// DQ0 to DQ7, DM, DQS and DQSN.
    bdlr: [BitDelay; LINES_PER_BYTE_LANE],
    /// Output enable delays.
    sdlr: u32,
    gtr: u32,
    /// General configuration. Bits 1..=4, 9..=10 and 12..=15 hold the ODT and IO mode
    /// settings; writing 0 disables the lane.
    gcr: u32,
    gsr: [u32; 3],
    _reserved: [u32; 11],
}

static_assertions::const_assert_eq!(core::mem::size_of::<DataLane>(), 0x80);
static_assertions::const_assert_eq!(core::mem::offset_of!(DataLane, bdlr), 0x10);
static_assertions::const_assert_eq!(core::mem::offset_of!(DataLane, sdlr), 0x3C);
static_assertions::const_assert_eq!(core::mem::offset_of!(DataLane, gcr), 0x44);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteLane {
    Dx0 = 0,
    Dx1 = 1,
    Dx2 = 2,
    Dx3 = 3,
}

impl ByteLane {
    pub const ALL: [ByteLane; 4] = [ByteLane::Dx0, ByteLane::Dx1, ByteLane::Dx2, ByteLane::Dx3];
}

#[derive(derive_mmio::Mmio)]
#[repr(C)]
pub struct MctlCtl {
    pir: Pir,
    pwrctl: u32,
    mrctrl: u32,
    /// Controller clock enable.
    clken: u32,
    #[mmio(PureRead)]
    pgsr0: Pgsr0,
    #[mmio(PureRead)]
    pgsr1: u32,
    #[mmio(PureRead)]
    statr: Statr,
    _reserved0: [u32; 0x4],
    lp3mr11: u32,
    /// DRAM mode registers MR0 to MR3.
    mr: [u32; 4],
    pllgcr: u32,
    ptr0: u32,
    ptr1: u32,
    ptr2: u32,
    ptr3: Ptr3,
    ptr4: Ptr4,
    dramtmg0: DramTiming0,
    dramtmg1: DramTiming1,
    dramtmg2: DramTiming2,
    dramtmg3: DramTiming3,
    dramtmg4: DramTiming4,
    dramtmg5: DramTiming5,
    dramtmg6: u32,
    dramtmg7: u32,
    /// Rank to rank switching timing.
    dramtmg8: u32,
    odtcfg: u32,
    pitmg0: u32,
    pitmg1: u32,
    _reserved1: u32,
    /// Bit 31 is an undocumented refresh update strobe.
    rfshctl0: u32,
    rfshtmg: RefreshTiming,
    rfshctl1: u32,
    pwrtmg: u32,
    _reserved2: u32,
    /// Undocumented. The low 16 bits are cleared after training.
    magic_0x0a0: u32,
    _reserved3: [u32; 0x5],
    vtfcr: u32,
    dqsgmr: u32,
    /// Data training configuration.
    dtcr: u32,
    dtar: [u32; 4],
    dtdr: [u32; 2],
    dtmr: [u32; 2],
    dtbmr: u32,
    catr: [u32; 2],
    dtedr: [u32; 2],
    _reserved4: [u32; 0x2],
    /// PHY general configuration registers 0 to 3.
    pgcr: [u32; 4],
    /// IO voltage control registers.
    iovcr: [u32; 2],
    dqsdr: u32,
    dxccr: u32,
    odtmap: u32,
    zqctl: [u32; 2],
    _reserved5: [u32; 0x5],
    /// Impedance calibration control. Bit 31 powers down the calibration module.
    zqcr: u32,
    #[mmio(PureRead)]
    zqsr: u32,
    zqdr: [u32; 3],
    _reserved6: [u32; 0x1B],
    sched: u32,
    perfhpr: [u32; 2],
    perflpr: [u32; 2],
    perfwr: [u32; 2],
    _reserved7: [u32; 0x9],
    acmdlr: u32,
    aclcdlr: u32,
    /// Address/command IO configuration. Bit 1 keeps the receivers powered.
    aciocr: u32,
    _reserved8: u32,
    acbdlr: [AcBitDelay; NR_OF_AC_LINES],
    _reserved9: [u32; 0x1D],
    #[mmio(Inner)]
    dx0: DataLane,
    #[mmio(Inner)]
    dx1: DataLane,
    #[mmio(Inner)]
    dx2: DataLane,
    #[mmio(Inner)]
    dx3: DataLane,
    _reserved10: [u32; 0xE2],
    upd2: u32,
}

static_assertions::const_assert_eq!(core::mem::size_of::<MctlCtl>(), 0x88C);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, clken), 0x00C);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, pgsr0), 0x010);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, statr), 0x018);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, mr), 0x030);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, ptr3), 0x050);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, dramtmg0), 0x058);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, dramtmg8), 0x078);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, pitmg0), 0x080);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, rfshctl0), 0x08C);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, rfshtmg), 0x090);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, magic_0x0a0), 0x0A0);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, dtcr), 0x0C0);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, pgcr), 0x100);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, iovcr), 0x110);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, odtmap), 0x120);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, zqcr), 0x140);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, sched), 0x1C0);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, aciocr), 0x208);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, acbdlr), 0x210);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, dx0), 0x300);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, dx1), 0x380);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, dx3), 0x480);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCtl, upd2), 0x888);

impl MctlCtl {
    /// Create a new DRAM channel 0 MMIO instance at address [DRAM_CTL0_BASE_ADDR].
    ///
    /// # Safety
    ///
    /// This API can be used to potentially create a driver to the same peripheral structure
    /// from multiple places. The user must ensure that concurrent accesses are safe and do not
    /// interfere with each other.
    pub const unsafe fn new_mmio_fixed() -> MmioMctlCtl<'static> {
        unsafe { Self::new_mmio_at(DRAM_CTL0_BASE_ADDR) }
    }
}

impl MmioMctlCtl<'_> {
    /// Register block of the given byte lane.
    pub fn dx(&mut self, lane: ByteLane) -> MmioDataLane<'_> {
        match lane {
            ByteLane::Dx0 => self.dx0(),
            ByteLane::Dx1 => self.dx1(),
            ByteLane::Dx2 => self.dx2(),
            ByteLane::Dx3 => self.dx3(),
        }
    }
}
