//! # Secure ID (SID) fuse block
//!
//! Read-only view of the eFuse shadow registers.
use arbitrary_int::u4;

/// Start of the eFuse shadow area inside the SID block.
pub const SID_BASE_ADDR: usize = 0x0300_6200;

#[bitbybit::bitfield(u32, debug)]
pub struct ChipConfig {
    /// Silicon revision dependent code selecting the DRAM controller compensation values.
    #[bits(24..=27, r)]
    dram_magic: u4,
}

#[derive(derive_mmio::Mmio)]
#[repr(C)]
pub struct Sid {
    chip_id: [u32; 4],
    _reserved0: [u32; 0x4],
    #[mmio(PureRead)]
    chip_config: ChipConfig,
    _reserved1: [u32; 0x37],
}

static_assertions::const_assert_eq!(core::mem::size_of::<Sid>(), 0x100);
static_assertions::const_assert_eq!(core::mem::offset_of!(Sid, chip_config), 0x20);

impl Sid {
    /// Create a new SID MMIO instance at the fixed base address [SID_BASE_ADDR].
    ///
    /// # Safety
    ///
    /// This API can be used to potentially create a driver to the same peripheral structure
    /// from multiple places. The user must ensure that concurrent accesses are safe and do not
    /// interfere with each other.
    pub const unsafe fn new_mmio_fixed() -> MmioSid<'static> {
        unsafe { Self::new_mmio_at(SID_BASE_ADDR) }
    }
}
