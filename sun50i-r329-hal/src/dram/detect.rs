//! # DRAM size detection
//!
//! The controller is configured with a maximal value for one address dimension at a time. A
//! write beyond the physical size of that dimension then wraps around inside the DRAM device and
//! shows up at the start of DRAM. The smallest size at which this aliasing shows up is the
//! physical size. Dimensions are detected in the order rows, banks, columns (page size), every
//! step uses the results of the previous ones.
use core::sync::atomic::{Ordering, fence};

use sun50i_r329::dramc::{MmioMctlCom, MmioMctlCtl};

use super::{DramConfig, DramPara, DramWindow, ll::apply_para};

pub const ALIAS_PATTERN: u32 = 0xaa55_aa55;

/// Checks whether `offset` is an alias of the start of DRAM.
pub fn mem_matches(window: &mut impl DramWindow, offset: u64) -> bool {
    window.write_word(0, 0);
    window.write_word(offset, ALIAS_PATTERN);
    fence(Ordering::SeqCst);
    window.read_word(0) == window.read_word(offset)
}

/// Detect the DRAM geometry and store it in `para`.
///
/// The geometry which is applied last is the maximal page size configuration, so
/// [apply_para] has to be called again with the detected geometry.
pub fn auto_detect_size(
    com: &mut MmioMctlCom<'_>,
    ctl: &mut MmioMctlCtl<'_>,
    window: &mut impl DramWindow,
    config: &DramConfig,
    para: &mut DramPara,
) {
    para.page_size = DramPara::MIN_PAGE_SIZE;
    para.row_bits = DramPara::MAX_ROW_BITS;
    para.bank_bits = DramPara::MIN_BANK_BITS;
    apply_para(com, ctl, config.dram_type, para);
    let (bank_bits, page_size) = (para.bank_bits, para.page_size as u64);
    para.row_bits = (DramPara::MIN_ROW_BITS..DramPara::MAX_ROW_BITS)
        .find(|row_bits| mem_matches(window, (1 << (row_bits + bank_bits)) * page_size))
        .unwrap_or(DramPara::MAX_ROW_BITS);

    para.bank_bits = DramPara::MAX_BANK_BITS;
    apply_para(com, ctl, config.dram_type, para);
    para.bank_bits = (DramPara::MIN_BANK_BITS..DramPara::MAX_BANK_BITS)
        .find(|bank_bits| mem_matches(window, (1 << bank_bits) * page_size))
        .unwrap_or(DramPara::MAX_BANK_BITS);

    para.page_size = DramPara::MAX_PAGE_SIZE;
    apply_para(com, ctl, config.dram_type, para);
    para.page_size = core::iter::successors(Some(DramPara::MIN_PAGE_SIZE), |size| Some(size * 2))
        .take_while(|size| *size < DramPara::MAX_PAGE_SIZE)
        .find(|size| mem_matches(window, *size as u64))
        .unwrap_or(DramPara::MAX_PAGE_SIZE);

    log::debug!(
        "DRAM geometry: {} row bits, {} bank bits, page size {}",
        para.row_bits,
        para.bank_bits,
        para.page_size
    );
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::dram::sim::{SimDram, SimSoc};

    #[test]
    fn test_mem_matches() {
        let soc = SimSoc::new();
        let mut periphs = soc.peripherals();
        let para = DramPara {
            row_bits: 16,
            bank_bits: 3,
            page_size: 8192,
            ..DramPara::new()
        };
        apply_para(&mut periphs.com, &mut periphs.ctl, DramConfig::new().dram_type, &para);
        let mut dram = SimDram::new(&soc, 12, 3, 2048);
        assert!(!mem_matches(&mut dram, 1024));
        assert!(mem_matches(&mut dram, 2048));
        assert!(!mem_matches(&mut dram, 8192));
        // Row 4096 wraps to row 0.
        assert!(mem_matches(&mut dram, 4096 * 8 * 8192));
        assert_eq!(dram.probe_count(), 4);
    }

    #[test]
    fn test_detects_every_supported_geometry() {
        let soc = SimSoc::new();
        let config = DramConfig::new();
        for row_bits in 11..=16 {
            for bank_bits in 2..=3 {
                for page_shift in 9..=13 {
                    let page_size = 1 << page_shift;
                    let mut periphs = soc.peripherals();
                    let mut dram = SimDram::new(&soc, row_bits, bank_bits, page_size);
                    let mut para = DramPara::new();
                    auto_detect_size(
                        &mut periphs.com,
                        &mut periphs.ctl,
                        &mut dram,
                        &config,
                        &mut para,
                    );
                    assert_eq!(
                        (para.row_bits, para.bank_bits, para.page_size),
                        (row_bits, bank_bits, page_size),
                    );
                    assert_eq!(para.size(), (1 << (row_bits + bank_bits)) * page_size as u64);
                }
            }
        }
    }

    #[test]
    fn test_probe_order() {
        let soc = SimSoc::new();
        let mut periphs = soc.peripherals();
        let mut dram = SimDram::new(&soc, 13, 2, 1024);
        let mut para = DramPara::new();
        auto_detect_size(
            &mut periphs.com,
            &mut periphs.ctl,
            &mut dram,
            &DramConfig::new(),
            &mut para,
        );
        let probes: std::vec::Vec<(u8, bool, u8, u64)> = dram
            .probes()
            .iter()
            .map(|(cr, offset)| {
                (
                    cr.row_bits().value() + 1,
                    cr.eight_banks(),
                    cr.page_size().value() + 3,
                    *offset,
                )
            })
            .collect();
        assert_eq!(
            probes,
            [
                // Rows with 512 byte pages and four banks.
                (16, false, 9, 1 << 22),
                (16, false, 9, 1 << 23),
                (16, false, 9, 1 << 24),
                // Banks with the detected rows.
                (13, true, 9, 2048),
                // Columns.
                (13, false, 13, 512),
                (13, false, 13, 1024),
            ]
        );
    }
}
