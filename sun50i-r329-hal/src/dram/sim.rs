//! Host model of the DRAM subsystem registers, the PHY and a DRAM device.
//!
//! Every register block is backed by leaked host memory. The PHY and PLL status bits are
//! advanced whenever the code under test waits on the [SimPhy] delay provider.
extern crate std;

use std::{boxed::Box, collections::HashMap, vec, vec::Vec};

use embedded_hal::delay::DelayNs;
use sun50i_r329::{
    ccu::Ccu,
    dramc::{MctlCom, MctlCtl, com::ModeConfig},
    prcm::Prcm,
    sid::Sid,
};

use super::{DramPeripherals, DramWindow};

const PRCM_PLL2_CFG: usize = 0x1020;
const CCU_DRAM_CLK_CFG: usize = 0x800;
const COM_CR: usize = 0x000;
const COM_MAER0: usize = 0x020;
const CTL_PIR: usize = 0x000;
const CTL_PGSR0: usize = 0x010;
const CTL_STATR: usize = 0x018;
const SID_CHIP_CONFIG: usize = 0x020;

const PLL_ENABLE: u32 = 1 << 31;
const PLL_LOCK_ENABLE: u32 = 1 << 29;
const PLL_LOCK: u32 = 1 << 28;
const DRAM_CLK_ENABLE: u32 = 1 << 31;

fn leak_block<T>() -> usize {
    let words = vec![0u32; core::mem::size_of::<T>() / 4].into_boxed_slice();
    Box::leak(words).as_mut_ptr() as usize
}

fn peek(base: usize, offset: usize) -> u32 {
    // Safety: Only called with offsets inside the leaked blocks.
    unsafe { core::ptr::read_volatile((base + offset) as *const u32) }
}

fn poke(base: usize, offset: usize, value: u32) {
    // Safety: Only called with offsets inside the leaked blocks.
    unsafe { core::ptr::write_volatile((base + offset) as *mut u32, value) }
}

/// Register blocks of one simulated SoC, all registers reset to 0.
#[derive(Debug, Clone, Copy)]
pub struct SimSoc {
    prcm: usize,
    ccu: usize,
    com: usize,
    ctl: usize,
    sid: usize,
}

impl SimSoc {
    pub fn new() -> Self {
        Self {
            prcm: leak_block::<Prcm>(),
            ccu: leak_block::<Ccu>(),
            com: leak_block::<MctlCom>(),
            ctl: leak_block::<MctlCtl>(),
            sid: leak_block::<Sid>(),
        }
    }

    pub fn peripherals(&self) -> DramPeripherals<'static> {
        // Safety: The blocks are leaked, so they live forever. Aliasing handles only perform
        // volatile accesses.
        unsafe {
            DramPeripherals {
                prcm: Prcm::new_mmio_at(self.prcm),
                ccu: Ccu::new_mmio_at(self.ccu),
                com: MctlCom::new_mmio_at(self.com),
                ctl: MctlCtl::new_mmio_at(self.ctl),
                sid: Sid::new_mmio_at(self.sid),
            }
        }
    }

    pub fn phy(&self) -> SimPhy {
        SimPhy {
            soc: *self,
            stall_pll: false,
            stall_phy: false,
            stall_controller: false,
            training_error_bits: 0,
            clk_enabled_at_training: None,
            pir_steps: None,
        }
    }

    /// Program the DRAM calibration nibble of the eFuse chip configuration word.
    pub fn set_sid_dram_magic(&self, magic: u8) {
        poke(self.sid, SID_CHIP_CONFIG, ((magic & 0xf) as u32) << 24);
    }

    /// All words of the two DRAM controller blocks.
    pub fn snapshot(&self) -> Vec<u32> {
        let com = (0..core::mem::size_of::<MctlCom>()).step_by(4).map(|offset| peek(self.com, offset));
        let ctl = (0..core::mem::size_of::<MctlCtl>()).step_by(4).map(|offset| peek(self.ctl, offset));
        com.chain(ctl).collect()
    }
}

/// Delay provider which also advances the PLL and PHY model.
pub struct SimPhy {
    soc: SimSoc,
    /// PLL2 never reports lock.
    pub stall_pll: bool,
    /// The PHY never reports the end of its init sequence.
    pub stall_phy: bool,
    /// The controller never enters normal operation after the training.
    pub stall_controller: bool,
    /// Error bits reported in PGSR0 after every training run.
    pub training_error_bits: u32,
    clk_enabled_at_training: Option<bool>,
    pir_steps: Option<u32>,
}

impl SimPhy {
    /// State of the DRAM module clock enable when the last PHY sequence was triggered.
    pub fn clk_enabled_at_training(&self) -> Option<bool> {
        self.clk_enabled_at_training
    }

    /// PIR value of the last triggered PHY sequence.
    pub fn pir_steps(&self) -> Option<u32> {
        self.pir_steps
    }

    fn tick(&mut self) {
        let soc = self.soc;
        let pll2 = peek(soc.prcm, PRCM_PLL2_CFG);
        if pll2 & (PLL_ENABLE | PLL_LOCK_ENABLE) == PLL_ENABLE | PLL_LOCK_ENABLE && !self.stall_pll {
            poke(soc.prcm, PRCM_PLL2_CFG, pll2 | PLL_LOCK);
        }
        let pir = peek(soc.ctl, CTL_PIR);
        if pir & 1 != 0 {
            self.clk_enabled_at_training =
                Some(peek(soc.ccu, CCU_DRAM_CLK_CFG) & DRAM_CLK_ENABLE != 0);
            self.pir_steps = Some(pir);
            if self.stall_phy {
                return;
            }
            poke(soc.ctl, CTL_PIR, pir & !1);
            poke(soc.ctl, CTL_PGSR0, 1 | self.training_error_bits);
            if !self.stall_controller {
                poke(soc.ctl, CTL_STATR, 1);
            }
        }
    }
}

impl DelayNs for SimPhy {
    fn delay_ns(&mut self, _ns: u32) {
        self.tick();
    }
}

/// DRAM device with a fixed physical geometry.
///
/// Offsets are decoded into column, bank and row with the geometry currently programmed into
/// the controller mode register. Address bits which the device does not have are dropped, which
/// produces the same aliasing as a real device.
pub struct SimDram {
    soc: SimSoc,
    row_bits: u8,
    bank_bits: u8,
    page_size: u32,
    cells: HashMap<u64, u32>,
    probes: Vec<(ModeConfig, u64)>,
    masters_enabled_during_probe: bool,
}

impl SimDram {
    pub fn new(soc: &SimSoc, row_bits: u8, bank_bits: u8, page_size: u32) -> Self {
        Self {
            soc: *soc,
            row_bits,
            bank_bits,
            page_size,
            cells: HashMap::new(),
            probes: Vec::new(),
            masters_enabled_during_probe: false,
        }
    }

    /// Number of writes to a non-zero offset.
    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }

    /// Controller mode and offset of every write to a non-zero offset.
    pub fn probes(&self) -> &[(ModeConfig, u64)] {
        &self.probes
    }

    pub fn probed_with_masters_enabled(&self) -> bool {
        self.masters_enabled_during_probe
    }

    fn physical_addr(&self, offset: u64) -> u64 {
        let cr = ModeConfig::new_with_raw_value(peek(self.soc.com, COM_CR));
        let page_size = 1u64 << (cr.page_size().value() + 3);
        let banks = if cr.eight_banks() { 8 } else { 4 };
        let rows = 1u64 << (cr.row_bits().value() + 1);

        let column = (offset % page_size) % self.page_size as u64;
        let bank = ((offset / page_size) % banks) % (1 << self.bank_bits);
        let row = ((offset / page_size / banks) % rows) % (1 << self.row_bits);
        ((row << self.bank_bits) | bank) * self.page_size as u64 + column
    }
}

impl DramWindow for SimDram {
    fn write_word(&mut self, offset: u64, value: u32) {
        if peek(self.soc.com, COM_MAER0) == 0xffff_ffff {
            self.masters_enabled_during_probe = true;
        }
        if offset != 0 {
            let cr = ModeConfig::new_with_raw_value(peek(self.soc.com, COM_CR));
            self.probes.push((cr, offset));
        }
        let addr = self.physical_addr(offset);
        self.cells.insert(addr, value);
    }

    fn read_word(&mut self, offset: u64) -> u32 {
        let addr = self.physical_addr(offset);
        self.cells.get(&addr).copied().unwrap_or(0)
    }
}
