//! # DRAM module
//!
//! Brings up the DDR3 (or DDR2) DRAM attached to the R329 and detects its size.
//!
//! The main entry point is [init], which performs the following steps:
//!
//!  1. Undocumented PRCM writes of the vendor boot code.
//!  2. Brings up the DRAM clock path, see [crate::clocks::dram::sys_init].
//!  3. Configures the controller and the PHY and runs the PHY training, see
//!     [ll::channel_init].
//!  4. Applies some post-training settings and detects the DRAM geometry by probing for address
//!     aliasing, see [detect::auto_detect_size].
//!  5. Enables all bus masters and returns the DRAM size.
//!
//! Everything in here runs from SRAM before DRAM exists, so there is no allocation and no retry.
//! The first failure aborts the whole sequence.
use core::sync::atomic::{Ordering, fence};

use embedded_hal::delay::DelayNs;
use sun50i_r329::{
    SDRAM_BASE_ADDR,
    ccu::{Ccu, MmioCcu},
    dramc::{
        LINES_PER_BYTE_LANE, MctlCom, MctlCtl, MmioMctlCom, MmioMctlCtl, NR_OF_AC_LINES,
        NR_OF_BYTE_LANES, com::MemoryType,
    },
    prcm::{MmioPrcm, Prcm},
    sid::{MmioSid, Sid},
};

use crate::{
    clocks::dram::{ClockPathRegs, DramClockDivider, prcm_vendor_init, sys_init},
    poll::PollTimeout,
    time::MegaHertz,
};

pub mod detect;
pub mod ll;
#[cfg(test)]
pub(crate) mod sim;

/// Lowest supported DRAM clock.
pub const MIN_DRAM_CLOCK: MegaHertz = MegaHertz::from_raw(100);
/// Highest supported DRAM clock.
pub const MAX_DRAM_CLOCK: MegaHertz = MegaHertz::from_raw(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DramType {
    Ddr2,
    Ddr3,
}

impl DramType {
    #[inline]
    pub const fn memory_type(self) -> MemoryType {
        match self {
            DramType::Ddr2 => MemoryType::Ddr2,
            DramType::Ddr3 => MemoryType::Ddr3,
        }
    }
}

#[cfg(feature = "ddr2")]
pub const DEFAULT_DRAM_TYPE: DramType = DramType::Ddr2;
#[cfg(not(feature = "ddr2"))]
pub const DEFAULT_DRAM_TYPE: DramType = DramType::Ddr3;

/// Board level DRAM configuration.
///
/// This is meant to be a constant of the boot image:
///
/// ```
/// use sun50i_r329_hal::{dram::DramConfig, time::MegaHertz};
///
/// const DRAM_CONFIG: DramConfig = DramConfig::new()
///     .with_clock(MegaHertz::from_raw(648))
///     .with_odt_enable(false);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DramConfig {
    pub dram_type: DramType,
    /// DRAM clock. The DRAM transfer rate is twice this clock.
    pub clock: MegaHertz,
    /// Dynamic on-die termination of the data lanes.
    pub odt_enable: bool,
    /// Impedance calibration code written to ZQCR. Only bits 0 to 25 are valid.
    pub zq: u32,
    /// Time budget of every status poll, in microseconds.
    pub poll_timeout_us: u32,
}

impl DramConfig {
    pub const fn new() -> Self {
        Self {
            dram_type: DEFAULT_DRAM_TYPE,
            clock: MegaHertz::from_raw(792),
            odt_enable: true,
            zq: 0x003b_3bfb,
            poll_timeout_us: 1_000_000,
        }
    }

    pub const fn with_dram_type(mut self, dram_type: DramType) -> Self {
        self.dram_type = dram_type;
        self
    }

    pub const fn with_clock(mut self, clock: MegaHertz) -> Self {
        self.clock = clock;
        self
    }

    pub const fn with_odt_enable(mut self, odt_enable: bool) -> Self {
        self.odt_enable = odt_enable;
        self
    }

    pub const fn with_zq(mut self, zq: u32) -> Self {
        self.zq = zq;
        self
    }

    pub const fn with_poll_timeout_us(mut self, poll_timeout_us: u32) -> Self {
        self.poll_timeout_us = poll_timeout_us;
        self
    }
}

impl Default for DramConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// DRAM geometry and delay line calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DramPara {
    pub dual_rank: bool,
    pub bus_full_width: bool,
    /// Number of row address bits, 11 to 16.
    pub row_bits: u8,
    /// Number of bank address bits, 2 or 3.
    pub bank_bits: u8,
    /// Bytes per row, power of two from 512 to 8192.
    pub page_size: u32,
    pub dx_read_delays: [[u8; LINES_PER_BYTE_LANE]; NR_OF_BYTE_LANES],
    pub dx_write_delays: [[u8; LINES_PER_BYTE_LANE]; NR_OF_BYTE_LANES],
    pub ac_delays: [u8; NR_OF_AC_LINES],
}

impl DramPara {
    pub const MIN_ROW_BITS: u8 = 11;
    pub const MAX_ROW_BITS: u8 = 16;
    pub const MIN_BANK_BITS: u8 = 2;
    pub const MAX_BANK_BITS: u8 = 3;
    pub const MIN_PAGE_SIZE: u32 = 512;
    pub const MAX_PAGE_SIZE: u32 = 8192;

    /// Calibration values of the R329 reference boards with the maximal geometry.
    pub const fn new() -> Self {
        Self {
            dual_rank: false,
            bus_full_width: true,
            row_bits: Self::MAX_ROW_BITS,
            bank_bits: Self::MAX_BANK_BITS,
            page_size: Self::MAX_PAGE_SIZE,
            dx_read_delays: [
                [10, 10, 10, 10, 10, 10, 10, 10, 10, 0, 0],
                [10, 10, 10, 10, 10, 10, 10, 10, 10, 0, 0],
                [0; LINES_PER_BYTE_LANE],
                [0; LINES_PER_BYTE_LANE],
            ],
            dx_write_delays: [
                [0, 0, 0, 0, 0, 0, 0, 0, 0, 4, 0],
                [0, 0, 0, 0, 0, 0, 0, 0, 0, 4, 0],
                [0; LINES_PER_BYTE_LANE],
                [0; LINES_PER_BYTE_LANE],
            ],
            ac_delays: [0; NR_OF_AC_LINES],
        }
    }

    /// Checks that the geometry can be encoded into the controller mode register.
    pub const fn geometry_is_valid(&self) -> bool {
        self.row_bits >= Self::MIN_ROW_BITS
            && self.row_bits <= Self::MAX_ROW_BITS
            && self.bank_bits >= Self::MIN_BANK_BITS
            && self.bank_bits <= Self::MAX_BANK_BITS
            && self.page_size.is_power_of_two()
            && self.page_size >= Self::MIN_PAGE_SIZE
            && self.page_size <= Self::MAX_PAGE_SIZE
    }

    /// Addressable size in bytes of the configured geometry.
    pub const fn size(&self) -> u64 {
        let ranks = if self.dual_rank { 2 } else { 1 };
        (1_u64 << (self.row_bits + self.bank_bits)) * self.page_size as u64 * ranks
    }
}

impl Default for DramPara {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DramInitError {
    #[error("DRAM clock {0} is not supported")]
    UnsupportedClock(MegaHertz),
    #[error("invalid DRAM geometry: {row_bits} row bits, {bank_bits} bank bits, page size {page_size}")]
    InvalidGeometry {
        row_bits: u8,
        bank_bits: u8,
        page_size: u32,
    },
    #[error("ZQ calibration code {0:#010x} has bits outside of the ZQCR code field")]
    InvalidZq(u32),
    #[error("PHY training failed, PGSR0 {pgsr0:#010x}")]
    TrainingFailed { pgsr0: u32 },
    #[error("poll timeout: {0}")]
    Timeout(#[from] PollTimeout),
}

/// Register blocks used by the DRAM bring-up.
pub struct DramPeripherals<'a> {
    pub prcm: MmioPrcm<'a>,
    pub ccu: MmioCcu<'a>,
    pub com: MmioMctlCom<'a>,
    pub ctl: MmioMctlCtl<'a>,
    pub sid: MmioSid<'a>,
}

impl DramPeripherals<'static> {
    /// Create all register blocks at their fixed addresses.
    ///
    /// # Safety
    ///
    /// The DRAM bring-up must have exclusive access to these register blocks while it runs.
    pub const unsafe fn steal_fixed() -> Self {
        unsafe {
            Self {
                prcm: Prcm::new_mmio_fixed(),
                ccu: Ccu::new_mmio_fixed(),
                com: MctlCom::new_mmio_fixed(),
                ctl: MctlCtl::new_mmio_fixed(),
                sid: Sid::new_mmio_fixed(),
            }
        }
    }
}

/// Word access into the DRAM address window.
///
/// The size detection uses this to probe for address aliasing.
pub trait DramWindow {
    fn write_word(&mut self, offset: u64, value: u32);
    fn read_word(&mut self, offset: u64) -> u32;
}

/// The DRAM address window at [SDRAM_BASE_ADDR].
pub struct Sdram {
    base: usize,
}

impl Sdram {
    /// # Safety
    ///
    /// Writes through this window go straight to DRAM. Only use it while nothing else lives in
    /// DRAM, which is the case during early boot.
    pub const unsafe fn new_fixed() -> Self {
        Self {
            base: SDRAM_BASE_ADDR,
        }
    }
}

impl DramWindow for Sdram {
    fn write_word(&mut self, offset: u64, value: u32) {
        // Safety: Probe offsets stay inside the DRAM address window. Accesses past the size of
        // the device alias to lower addresses.
        unsafe { core::ptr::write_volatile((self.base + offset as usize) as *mut u32, value) };
        fence(Ordering::SeqCst);
    }

    fn read_word(&mut self, offset: u64) -> u32 {
        // Safety: See write_word.
        let value =
            unsafe { core::ptr::read_volatile((self.base + offset as usize) as *const u32) };
        fence(Ordering::SeqCst);
        value
    }
}

/// Initialize the DRAM and return its size in bytes.
///
/// `para` provides the delay line calibration. Its geometry is overwritten with the detected
/// one.
pub fn init(
    periphs: &mut DramPeripherals<'_>,
    window: &mut impl DramWindow,
    config: &DramConfig,
    para: &mut DramPara,
    delay: &mut impl DelayNs,
) -> Result<u64, DramInitError> {
    if config.clock < MIN_DRAM_CLOCK || config.clock > MAX_DRAM_CLOCK {
        return Err(DramInitError::UnsupportedClock(config.clock));
    }
    let divider =
        DramClockDivider::search(config.clock).ok_or(DramInitError::UnsupportedClock(config.clock))?;
    if !para.geometry_is_valid() {
        return Err(DramInitError::InvalidGeometry {
            row_bits: para.row_bits,
            bank_bits: para.bank_bits,
            page_size: para.page_size,
        });
    }
    if config.zq & !ll::ZQCR_MASK != 0 {
        return Err(DramInitError::InvalidZq(config.zq));
    }

    prcm_vendor_init(&mut periphs.prcm);
    sys_init(
        ClockPathRegs {
            prcm: &mut periphs.prcm,
            ccu: &mut periphs.ccu,
            com: &mut periphs.com,
            ctl: &mut periphs.ctl,
        },
        &divider,
        config.poll_timeout_us,
        delay,
    )?;
    ll::channel_init(periphs, config, para, delay)?;

    delay.delay_us(1);
    ll::post_training_setup(&mut periphs.ctl);

    detect::auto_detect_size(&mut periphs.com, &mut periphs.ctl, window, config, para);
    ll::apply_para(&mut periphs.com, &mut periphs.ctl, config.dram_type, para);
    ll::enable_all_masters(&mut periphs.com);

    let size = para.size();
    log::info!("DRAM: {} MiB", size >> 20);
    Ok(size)
}

/// Like [init], but reports failures as a size of 0.
pub fn init_or_zero(
    periphs: &mut DramPeripherals<'_>,
    window: &mut impl DramWindow,
    config: &DramConfig,
    para: &mut DramPara,
    delay: &mut impl DelayNs,
) -> u64 {
    match init(periphs, window, config, para, delay) {
        Ok(size) => size,
        Err(e) => {
            log::error!("DRAM init failed: {e}");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim::{SimDram, SimSoc};

    fn sim_init(
        soc: &SimSoc,
        dram: &mut SimDram,
        config: &DramConfig,
    ) -> (Result<u64, DramInitError>, DramPara, sim::SimPhy) {
        let mut periphs = soc.peripherals();
        let mut phy = soc.phy();
        let mut para = DramPara::new();
        let result = init(&mut periphs, dram, config, &mut para, &mut phy);
        (result, para, phy)
    }

    #[test]
    fn test_default_para_size() {
        let para = DramPara::new();
        assert!(para.geometry_is_valid());
        assert_eq!(para.size(), 1 << 32);
        let dual = DramPara {
            dual_rank: true,
            ..para
        };
        assert_eq!(dual.size(), 2 << 32);
    }

    #[test]
    fn test_sdram_window_word_access() {
        extern crate std;
        let mut words = std::vec![0u32; 16];
        let mut window = Sdram {
            base: words.as_mut_ptr() as usize,
        };
        window.write_word(0, 0);
        window.write_word(32, detect::ALIAS_PATTERN);
        assert_eq!(window.read_word(0), 0);
        assert_eq!(window.read_word(32), detect::ALIAS_PATTERN);
        assert_eq!(words[8], detect::ALIAS_PATTERN);
    }

    #[test]
    fn test_default_config() {
        const CONFIG: DramConfig = DramConfig::new().with_clock(MegaHertz::from_raw(648));
        assert_eq!(CONFIG.clock, MegaHertz::from_raw(648));
        assert!(CONFIG.odt_enable);
        assert_eq!(CONFIG.zq, 0x3b3bfb);
        assert_eq!(DramConfig::default().clock, MegaHertz::from_raw(792));
        #[cfg(not(feature = "ddr2"))]
        assert_eq!(CONFIG.dram_type, DramType::Ddr3);
    }

    #[test]
    fn test_init_end_to_end_128_mib() {
        let soc = SimSoc::new();
        let mut dram = SimDram::new(&soc, 14, 3, 1024);
        let config = DramConfig::new().with_dram_type(DramType::Ddr3);
        let (result, para, phy) = sim_init(&soc, &mut dram, &config);
        assert_eq!(result, Ok(134_217_728));
        assert_eq!((para.row_bits, para.bank_bits, para.page_size), (14, 3, 1024));

        let mut periphs = soc.peripherals();
        let divider = periphs.ccu.read_dram_clk_cfg();
        assert_eq!(
            divider.src_sel(),
            sun50i_r329::ccu::DramClockSource::PllAudio1
        );
        assert_eq!(phy.clk_enabled_at_training(), Some(true));
        assert_eq!(periphs.com.read_maer0(), 0xffff_ffff);
        assert_eq!(periphs.com.read_maer1(), 0x7f);
        assert_eq!(periphs.com.read_maer2(), 0xffff);
        assert!(dram.probe_count() > 0);
        assert!(!dram.probed_with_masters_enabled());
        // Final geometry is applied again after the detection.
        let cr = periphs.com.read_cr();
        assert_eq!(cr.row_bits().value(), 13);
        assert!(cr.eight_banks());
        assert_eq!(cr.page_size().value(), 7);
        assert!(periphs.com.read_init_flag().channel_init_done());
        assert_eq!(periphs.prcm.read_magic_0x310(), 0x0033_0003);
    }

    #[test]
    fn test_init_dual_rank_size() {
        let soc = SimSoc::new();
        let mut dram = SimDram::new(&soc, 16, 3, 2048);
        let mut periphs = soc.peripherals();
        let mut phy = soc.phy();
        let mut para = DramPara {
            dual_rank: true,
            ..DramPara::new()
        };
        let size = init(&mut periphs, &mut dram, &DramConfig::new(), &mut para, &mut phy);
        assert_eq!(size, Ok(2 * (1 << 19) * 2048));
        assert_eq!(periphs.ctl.read_odtmap(), 0x303);
    }

    #[test]
    fn test_training_failure_returns_zero() {
        let soc = SimSoc::new();
        let mut dram = SimDram::new(&soc, 14, 3, 1024);
        let mut periphs = soc.peripherals();
        let mut phy = soc.phy();
        phy.training_error_bits = 1 << 22;
        let mut para = DramPara::new();
        let result = init(&mut periphs, &mut dram, &DramConfig::new(), &mut para, &mut phy);
        assert!(matches!(result, Err(DramInitError::TrainingFailed { pgsr0 }) if pgsr0 & (1 << 22) != 0));
        assert_eq!(periphs.com.read_maer0(), 1);
        assert_eq!(dram.probe_count(), 0);

        let soc = SimSoc::new();
        let mut dram = SimDram::new(&soc, 14, 3, 1024);
        let mut periphs = soc.peripherals();
        let mut phy = soc.phy();
        phy.training_error_bits = 1 << 25;
        let mut para = DramPara::new();
        let size = init_or_zero(&mut periphs, &mut dram, &DramConfig::new(), &mut para, &mut phy);
        assert_eq!(size, 0);
    }

    #[test]
    fn test_pll_stall_is_a_timeout() {
        let soc = SimSoc::new();
        let mut dram = SimDram::new(&soc, 14, 3, 1024);
        let mut periphs = soc.peripherals();
        let mut phy = soc.phy();
        phy.stall_pll = true;
        let mut para = DramPara::new();
        let config = DramConfig::new().with_poll_timeout_us(100);
        let result = init(&mut periphs, &mut dram, &config, &mut para, &mut phy);
        match result {
            Err(DramInitError::Timeout(timeout)) => {
                assert_eq!(timeout.target, crate::poll::PollTarget::Pll2Lock)
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(
            init_or_zero(&mut periphs, &mut dram, &config, &mut para, &mut phy),
            0
        );
    }

    #[test]
    fn test_controller_never_ready_is_a_timeout() {
        let soc = SimSoc::new();
        let mut dram = SimDram::new(&soc, 14, 3, 1024);
        let mut periphs = soc.peripherals();
        let mut phy = soc.phy();
        phy.stall_controller = true;
        let mut para = DramPara::new();
        let config = DramConfig::new().with_poll_timeout_us(100);
        let result = init(&mut periphs, &mut dram, &config, &mut para, &mut phy);
        assert!(matches!(
            result,
            Err(DramInitError::Timeout(PollTimeout {
                target: crate::poll::PollTarget::ControllerNormal,
                ..
            }))
        ));
    }

    #[test]
    fn test_phy_init_never_done_is_a_timeout() {
        let soc = SimSoc::new();
        let mut dram = SimDram::new(&soc, 14, 3, 1024);
        let mut periphs = soc.peripherals();
        let mut phy = soc.phy();
        phy.stall_phy = true;
        let mut para = DramPara::new();
        let config = DramConfig::new().with_poll_timeout_us(100);
        let result = init(&mut periphs, &mut dram, &config, &mut para, &mut phy);
        assert!(matches!(
            result,
            Err(DramInitError::Timeout(PollTimeout {
                target: crate::poll::PollTarget::PhyInitDone,
                mask: 0x1,
                expected: 0x1,
                last: 0,
            }))
        ));
        assert_eq!(phy.pir_steps(), Some(0x5f3));
        assert_eq!(dram.probe_count(), 0);
        assert_eq!(
            init_or_zero(&mut periphs, &mut dram, &config, &mut para, &mut phy),
            0
        );
    }

    #[test]
    fn test_invalid_config_rejected_before_touching_hardware() {
        let soc = SimSoc::new();
        let mut dram = SimDram::new(&soc, 14, 3, 1024);
        let config = DramConfig::new().with_clock(MegaHertz::from_raw(1200));
        let (result, _, _) = sim_init(&soc, &mut dram, &config);
        assert_eq!(
            result,
            Err(DramInitError::UnsupportedClock(MegaHertz::from_raw(1200)))
        );

        let mut periphs = soc.peripherals();
        let mut phy = soc.phy();
        let mut para = DramPara {
            page_size: 3000,
            ..DramPara::new()
        };
        let result = init(&mut periphs, &mut dram, &DramConfig::new(), &mut para, &mut phy);
        assert!(matches!(result, Err(DramInitError::InvalidGeometry { .. })));
        assert_eq!(periphs.prcm.read_magic_0x250(), 0);

        let mut para = DramPara::new();
        let config = DramConfig::new().with_zq(0x0400_0000 | 0x3b3bfb);
        let result = init(&mut periphs, &mut dram, &config, &mut para, &mut phy);
        assert_eq!(result, Err(DramInitError::InvalidZq(0x043b_3bfb)));
        assert_eq!(periphs.prcm.read_magic_0x250(), 0);
        // Highest valid code.
        let config = DramConfig::new().with_zq(ll::ZQCR_MASK);
        let result = init(&mut periphs, &mut dram, &config, &mut para, &mut phy);
        assert_eq!(result, Ok(134_217_728));
    }
}
