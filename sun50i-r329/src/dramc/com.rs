//! DRAM controller common block.
use arbitrary_int::{u3, u4, u12};

use super::DRAM_COM_BASE_ADDR;

#[bitbybit::bitenum(u3, exhaustive = true)]
#[derive(Debug, PartialEq, Eq)]
pub enum MemoryType {
    __Reserved0 = 0b000,
    __Reserved1 = 0b001,
    Ddr2 = 0b010,
    Ddr3 = 0b011,
    __Reserved4 = 0b100,
    __Reserved5 = 0b101,
    Lpddr2 = 0b110,
    Lpddr3 = 0b111,
}

/// Global mode register which describes the attached memory to the controller.
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct ModeConfig {
    /// A value of 4 selects a burst length of 8.
    #[bits(20..=22, rw)]
    burst_length: u3,
    /// 1T command timing when set, 2T timing otherwise.
    #[bit(19, rw)]
    one_t_timing: bool,
    #[bits(16..=18, rw)]
    memory_type: MemoryType,
    /// Sequential burst ordering when set, interleaved otherwise.
    #[bit(15, rw)]
    sequential: bool,
    /// 32-bit bus when set, 16-bit bus otherwise.
    #[bit(12, rw)]
    full_width: bool,
    /// Page size encoded as `log2(page_size) - 3`.
    #[bits(8..=11, rw)]
    page_size: u4,
    /// Number of row address bits minus one.
    #[bits(4..=7, rw)]
    row_bits: u4,
    /// Eight banks when set, four banks otherwise.
    #[bit(2, rw)]
    eight_banks: bool,
    #[bit(0, rw)]
    dual_rank: bool,
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct Timer {
    /// Number of controller clock cycles per microsecond.
    #[bits(0..=11, rw)]
    cycles_per_us: u12,
}

/// Undocumented register. The vendor code sets bit 31 once the channel is initialized.
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct InitFlag {
    #[bit(31, rw)]
    channel_init_done: bool,
}

#[derive(derive_mmio::Mmio)]
#[repr(C)]
pub struct MctlCom {
    cr: ModeConfig,
    _reserved0: u32,
    /// Undocumented. Bits 8..=13 are set to 0x20 on every geometry update.
    magic_0x008: u32,
    tmr: Timer,
    _reserved1: u32,
    init_flag: InitFlag,
    _reserved2: [u32; 0x2],
    /// Master enable registers of the memory bus arbiter.
    maer0: u32,
    maer1: u32,
    maer2: u32,
    _reserved3: [u32; 0x135],
    /// Undocumented silicon revision specific compensation registers, DDR3 only.
    ddr3_magic: [u32; 4],
}

static_assertions::const_assert_eq!(core::mem::size_of::<MctlCom>(), 0x510);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCom, cr), 0x000);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCom, magic_0x008), 0x008);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCom, tmr), 0x00C);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCom, init_flag), 0x014);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCom, maer0), 0x020);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCom, maer1), 0x024);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCom, maer2), 0x028);
static_assertions::const_assert_eq!(core::mem::offset_of!(MctlCom, ddr3_magic), 0x500);

impl MctlCom {
    /// Create a new DRAM common block MMIO instance at address [DRAM_COM_BASE_ADDR].
    ///
    /// # Safety
    ///
    /// This API can be used to potentially create a driver to the same peripheral structure
    /// from multiple places. The user must ensure that concurrent accesses are safe and do not
    /// interfere with each other.
    pub const unsafe fn new_mmio_fixed() -> MmioMctlCom<'static> {
        unsafe { Self::new_mmio_at(DRAM_COM_BASE_ADDR) }
    }
}
