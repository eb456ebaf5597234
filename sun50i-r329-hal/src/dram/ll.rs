//! Low-level DRAM controller and PHY configuration module.
use arbitrary_int::{u3, u4, u5, u6, u7, u9, u10, u12, u20};
use embedded_hal::delay::DelayNs;
use sun50i_r329::{
    dramc::{
        MmioMctlCom, MmioMctlCtl,
        com::ModeConfig,
        ctl::{
            AcBitDelay, BitDelay, ByteLane, DramTiming0, DramTiming1, DramTiming2, DramTiming3,
            DramTiming4, DramTiming5, Pir, Ptr3, Ptr4, RefreshTiming,
        },
    },
    sid::MmioSid,
};

use super::{DramConfig, DramInitError, DramPara, DramPeripherals, DramType};
use crate::{
    poll::{PollTarget, await_completion},
    time::{MegaHertz, Microseconds},
};

// These values were taken from the Allwinner BSP and are not documented.

/// Compensation values for silicon with a DRAM magic code below 0xc.
pub const DDR3_MAGIC_DEFAULT: [u32; 4] = [0x08d0_8c40, 0x2400_30c5, 0x0000_0107, 0x2b4b_4d60];
/// Compensation values for silicon with a DRAM magic code of exactly 0xc.
pub const DDR3_MAGIC_0XC: [u32; 4] = [0x02d2_0ca0, 0x2485_1cc2, 0x0000_31c9, 0x2b4b_4573];

pub const ODT_MAP_SINGLE_RANK: u32 = 0x0000_0201;
pub const ODT_MAP_DUAL_RANK: u32 = 0x0000_0303;

/// DDR3 mode registers MR0 to MR3.
pub const DDR3_MODE_REGISTERS: [u32; 4] = [0x1c70, 0x40, 0x18, 0x0];

const COM_MAGIC_0X008_MASK: u32 = 0x3f00;
const COM_MAGIC_0X008_VALUE: u32 = 0x2000;

const DX_GCR_CLEAR_MASK: u32 = 0xf61e;
const DX_GCR_ODT_DYNAMIC: u32 = 0x0 << 4;
const DX_GCR_ODT_OFF: u32 = 0x2 << 4;
const DX_GCR_HIGH_FREQ: u32 = 0x400;
const DX_GCR_HIGH_FREQ_THRESHOLD: MegaHertz = MegaHertz::from_raw(672);

const IOVCR0_MASK: u32 = 0x7f7f_7f7f;
const IOVCR0_VALUE: u32 = 0x4848_4848;
const IOVCR1_MASK: u32 = 0x7f;
const IOVCR1_VALUE: u32 = 0x48;

/// Active low PHY FIFO reset.
const PGCR0_PHY_FIFO_RESET_N: u32 = 1 << 26;
const PGCR0_HDR_DDR_MODE_MASK: u32 = 0xf000;
const PGCR2_PHASE_SELECT_MASK: u32 = (0x3 << 10) | (0x3 << 8);
const PGCR2_PHASE_SELECT: u32 = 0x3 << 8;
const PGCR2_DQS_GATING_PD_MODE: u32 = 0x3 << 6;
const PGCR2_DQ_HOLD: u32 = 1 << 13;
const PGCR3_CLEAR_MASK: u32 = 0x0600_0000;

const ACIOCR_PDR_ON: u32 = 1 << 1;

const DTCR_MASK: u32 = 0x0fff_ffff;

pub(crate) const ZQCR_MASK: u32 = 0x03ff_ffff;
const ZQCR_OVERRIDE: u32 = 0x0200_0000;
const ZQCR_POWER_DOWN: u32 = 1 << 31;

const RFSHCTL0_UPDATE: u32 = 1 << 31;

/// Output enable delays of the DQ, DM and DQS lines for byte lanes 0 and 1.
const DX0_SDLR: u32 = 0x4 << 24;
const DX1_SDLR: u32 = 0x2 << 24;

const TRAINING_SETTLE_TIME: Microseconds = Microseconds::from_ticks(50);
const REFRESH_PULSE_TIME: Microseconds = Microseconds::from_ticks(10);

/// Controller mode register value for the given geometry.
pub fn mode_config(dram_type: DramType, para: &DramPara) -> ModeConfig {
    ModeConfig::builder()
        .with_burst_length(u3::new(4))
        .with_one_t_timing(false)
        .with_memory_type(dram_type.memory_type())
        .with_sequential(false)
        .with_full_width(para.bus_full_width)
        .with_page_size(u4::new((para.page_size.trailing_zeros() - 3) as u8))
        .with_row_bits(u4::new(para.row_bits - 1))
        .with_eight_banks(para.bank_bits == 3)
        .with_dual_rank(para.dual_rank)
        .build()
}

/// Apply the geometry and rank configuration of `para`.
///
/// This can be called any number of times. The size detection calls it once for every address
/// dimension it probes.
pub fn apply_para(
    com: &mut MmioMctlCom<'_>,
    ctl: &mut MmioMctlCtl<'_>,
    dram_type: DramType,
    para: &DramPara,
) {
    com.modify_magic_0x008(|val| (val & !COM_MAGIC_0X008_MASK) | COM_MAGIC_0X008_VALUE);
    com.write_cr(mode_config(dram_type, para));

    ctl.write_odtmap(if para.dual_rank {
        ODT_MAP_DUAL_RANK
    } else {
        ODT_MAP_SINGLE_RANK
    });
    if !para.bus_full_width {
        ctl.dx(ByteLane::Dx1).write_gcr(0);
    }
}

/// Compensation values for the given DRAM magic code from the SID.
pub fn ddr3_magic(code: u4) -> Option<&'static [u32; 4]> {
    match code.value() {
        0x0..=0xb => Some(&DDR3_MAGIC_DEFAULT),
        0xc => Some(&DDR3_MAGIC_0XC),
        _ => None,
    }
}

/// Write the silicon specific compensation values. Only required for DDR3.
pub fn set_ddr3_magic(com: &mut MmioMctlCom<'_>, sid: &mut MmioSid<'_>) {
    let code = sid.read_chip_config().dram_magic();
    let Some(magic) = ddr3_magic(code) else {
        log::debug!("no DDR3 magic for code {:#x}", code.value());
        return;
    };
    for (idx, val) in magic.iter().enumerate() {
        // Safety: Indexes are valid.
        unsafe { com.write_ddr3_magic_unchecked(idx, *val) };
    }
    // Bit 0 of the first register latches the values.
    // Safety: Index is valid.
    unsafe { com.write_ddr3_magic_unchecked(0, magic[0] | 1) };
}

/// Converts nanoseconds to controller clock cycles, rounding up. The controller runs at half
/// the DRAM clock.
#[inline]
pub const fn ns_to_t(clock: MegaHertz, ns: u32) -> u32 {
    ((clock.raw() / 2) * ns).div_ceil(1000)
}

/// Timing register values for a DRAM clock.
#[derive(Debug, Clone, Copy)]
pub struct TimingParams {
    pub dramtmg0: DramTiming0,
    pub dramtmg1: DramTiming1,
    pub dramtmg2: DramTiming2,
    pub dramtmg3: DramTiming3,
    pub dramtmg4: DramTiming4,
    pub dramtmg5: DramTiming5,
    pub pitmg0: u32,
    pub ptr3: Ptr3,
    pub ptr4: Ptr4,
    pub rfshtmg: RefreshTiming,
}

impl TimingParams {
    const T_CCD: u32 = 2;
    const T_MRW: u32 = 0;
    const T_MRD: u32 = 4;
    const T_MOD: u32 = 12;
    const T_CKE: u32 = 3;
    const T_CKSRX: u32 = 5;
    const T_CKSRE: u32 = 5;
    const T_CKESR: u32 = 4;
    const T_RAS_MAX: u32 = 24;
    const T_CL: u32 = 6;
    const T_CWL: u32 = 4;
    const T_RDATA_EN: u32 = 4;
    const WR_LATENCY: u32 = 2;

    /// All values fit their register fields for DRAM clocks up to
    /// [super::MAX_DRAM_CLOCK].
    pub fn new(clock: MegaHertz) -> Self {
        let ns = |ns| ns_to_t(clock, ns);
        let clk = clock.raw();

        let t_faw = ns(50);
        let t_rrd = ns(10).max(4);
        let t_rcd = ns(15);
        let t_rc = ns(53);
        let t_xp = ns(8).max(3);
        let t_wtr = ns(8).max(4);
        let t_rtp = ns(8).max(4);
        let t_wr = ns(15).max(3);
        let t_rp = ns(15);
        let t_ras = ns(38);
        let t_refi = ns(7800) / 32;
        let t_rfc = ns(350);

        let t_wtp = Self::T_CWL + 2 + t_wr;
        let t_wr2rd = Self::T_CWL + 2 + t_wtr;
        let t_rd2wr = Self::T_CL + 2 + 1 - Self::T_CWL;

        // DRAM init delays: 500 us, 360 ns, 200 us and 1 us.
        let t_dinit0 = 500 * clk + 1;
        let t_dinit1 = 360 * clk / 1000 + 1;
        let t_dinit2 = 200 * clk + 1;
        let t_dinit3 = clk + 1;

        Self {
            dramtmg0: DramTiming0::builder()
                .with_t_wtp(u6::new(t_wtp as u8))
                .with_t_faw(u6::new(t_faw as u8))
                .with_t_ras_max(u7::new(Self::T_RAS_MAX as u8))
                .with_t_ras(u6::new(t_ras as u8))
                .build(),
            dramtmg1: DramTiming1::builder()
                .with_t_xp(u5::new(t_xp as u8))
                .with_t_rtp(u4::new(t_rtp as u8))
                .with_t_rc(u7::new(t_rc as u8))
                .build(),
            dramtmg2: DramTiming2::builder()
                .with_t_cwl(u6::new(Self::T_CWL as u8))
                .with_t_cl(u6::new(Self::T_CL as u8))
                .with_t_rd2wr(u6::new(t_rd2wr as u8))
                .with_t_wr2rd(u6::new(t_wr2rd as u8))
                .build(),
            dramtmg3: DramTiming3::builder()
                .with_t_mrw(u10::new(Self::T_MRW as u16))
                .with_t_mrd(u4::new(Self::T_MRD as u8))
                .with_t_mod(u10::new(Self::T_MOD as u16))
                .build(),
            dramtmg4: DramTiming4::builder()
                .with_t_rcd(u5::new(t_rcd as u8))
                .with_t_ccd(u3::new(Self::T_CCD as u8))
                .with_t_rrd(u4::new(t_rrd as u8))
                .with_t_rp(u5::new(t_rp as u8))
                .build(),
            dramtmg5: DramTiming5::builder()
                .with_t_cksrx(u4::new(Self::T_CKSRX as u8))
                .with_t_cksre(u4::new(Self::T_CKSRE as u8))
                .with_t_ckesr(u6::new(Self::T_CKESR as u8))
                .with_t_cke(u4::new(Self::T_CKE as u8))
                .build(),
            pitmg0: (0x2 << 24) | (Self::T_RDATA_EN << 16) | (0x1 << 8) | Self::WR_LATENCY,
            ptr3: Ptr3::builder()
                .with_t_dinit1(u9::new(t_dinit1 as u16))
                .with_t_dinit0(u20::new(t_dinit0))
                .build(),
            ptr4: Ptr4::builder()
                .with_t_dinit3(u10::new(t_dinit3 as u16))
                .with_t_dinit2(u20::new(t_dinit2))
                .build(),
            rfshtmg: RefreshTiming::builder()
                .with_t_refi(u12::new(t_refi as u16))
                .with_t_rfc(u10::new(t_rfc as u16))
                .build(),
        }
    }
}

/// Program the DRAM mode registers and the controller and PHY timings.
pub fn set_timing_params(ctl: &mut MmioMctlCtl<'_>, timings: &TimingParams) {
    for (idx, val) in DDR3_MODE_REGISTERS.iter().enumerate() {
        // Safety: Indexes are valid.
        unsafe { ctl.write_mr_unchecked(idx, *val) };
    }
    ctl.write_dramtmg0(timings.dramtmg0);
    ctl.write_dramtmg1(timings.dramtmg1);
    ctl.write_dramtmg2(timings.dramtmg2);
    ctl.write_dramtmg3(timings.dramtmg3);
    ctl.write_dramtmg4(timings.dramtmg4);
    ctl.write_dramtmg5(timings.dramtmg5);
    // Rank to rank timing.
    ctl.modify_dramtmg8(|val| (val & !0xffff) | (0x66 << 8) | 0x10);
    ctl.write_pitmg0(timings.pitmg0);
    ctl.write_ptr3(timings.ptr3);
    ctl.write_ptr4(timings.ptr4);
    ctl.write_rfshtmg(timings.rfshtmg);
}

/// Program the per line delays of the data lanes and the address/command lines.
///
/// The PHY FIFO is held in reset while the delay lines are updated.
pub fn set_bit_delays(ctl: &mut MmioMctlCtl<'_>, para: &DramPara) {
    // Safety: Index is valid.
    unsafe { ctl.modify_pgcr_unchecked(0, |val| val & !PGCR0_PHY_FIFO_RESET_N) };

    for (lane, (reads, writes)) in ByteLane::ALL
        .iter()
        .zip(para.dx_read_delays.iter().zip(para.dx_write_delays.iter()))
    {
        let mut dx = ctl.dx(*lane);
        for (line, (read, write)) in reads.iter().zip(writes.iter()).enumerate() {
            let delay = BitDelay::builder()
                .with_write(*write)
                .with_read(*read)
                .build();
            // Safety: Indexes are valid.
            unsafe { dx.write_bdlr_unchecked(line, delay) };
        }
    }
    for (line, delay) in para.ac_delays.iter().enumerate() {
        // Safety: Indexes are valid.
        unsafe {
            ctl.write_acbdlr_unchecked(line, AcBitDelay::builder().with_delay(*delay).build())
        };
    }

    ctl.dx(ByteLane::Dx0).write_sdlr(DX0_SDLR);
    ctl.dx(ByteLane::Dx1).write_sdlr(DX1_SDLR);

    // Safety: Index is valid.
    unsafe { ctl.modify_pgcr_unchecked(0, |val| val | PGCR0_PHY_FIFO_RESET_N) };
}

/// ODT and IO mode bits of the DXnGCR registers.
pub fn dx_gcr_bits(config: &DramConfig) -> u32 {
    let mut bits = if config.odt_enable {
        DX_GCR_ODT_DYNAMIC
    } else {
        DX_GCR_ODT_OFF
    };
    if config.clock > DX_GCR_HIGH_FREQ_THRESHOLD {
        bits |= DX_GCR_HIGH_FREQ;
    }
    bits
}

/// Start the PHY initialization sequencer with the given steps and wait until it is done.
pub fn phy_init(
    ctl: &mut MmioMctlCtl<'_>,
    steps: Pir,
    timeout_us: u32,
    delay: &mut impl DelayNs,
) -> Result<(), DramInitError> {
    ctl.write_pir(steps.with_init(true));
    await_completion(
        PollTarget::PhyInitDone,
        || ctl.read_pgsr0().raw_value(),
        0x1,
        0x1,
        timeout_us,
        delay,
    )?;
    let pgsr0 = ctl.read_pgsr0();
    if pgsr0.has_errors() {
        return Err(DramInitError::TrainingFailed {
            pgsr0: pgsr0.raw_value(),
        });
    }
    Ok(())
}

/// Configure the channel and run the PHY training.
///
/// The DRAM clock path must be up, see [crate::clocks::dram::sys_init].
pub fn channel_init(
    periphs: &mut DramPeripherals<'_>,
    config: &DramConfig,
    para: &DramPara,
    delay: &mut impl DelayNs,
) -> Result<(), DramInitError> {
    let DramPeripherals { com, ctl, sid, .. } = periphs;

    // Safety: Indexes are valid.
    unsafe {
        ctl.modify_iovcr_unchecked(0, |val| (val & !IOVCR0_MASK) | IOVCR0_VALUE);
        ctl.modify_iovcr_unchecked(1, |val| (val & !IOVCR1_MASK) | IOVCR1_VALUE);
    }

    apply_para(com, ctl, config.dram_type, para);
    if config.dram_type == DramType::Ddr3 {
        set_ddr3_magic(com, sid);
    }
    set_timing_params(ctl, &TimingParams::new(config.clock));

    com.modify_tmr(|mut val| {
        val.set_cycles_per_us(u12::new((config.clock.raw() / 2) as u16));
        val
    });

    // Safety: Index is valid.
    unsafe {
        ctl.modify_pgcr_unchecked(2, |val| {
            (val & !PGCR2_PHASE_SELECT_MASK) | PGCR2_PHASE_SELECT
        })
    };

    let gcr_bits = dx_gcr_bits(config);
    for lane in ByteLane::ALL {
        ctl.dx(lane)
            .modify_gcr(|val| (val & !DX_GCR_CLEAR_MASK) | gcr_bits);
    }

    ctl.modify_aciocr(|val| val | ACIOCR_PDR_ON);

    set_bit_delays(ctl, para);

    // Safety: Index is valid.
    unsafe { ctl.modify_pgcr_unchecked(2, |val| val | PGCR2_DQS_GATING_PD_MODE) };

    let rank_mask = if para.dual_rank { 0x3 } else { 0x1 };
    ctl.modify_dtcr(|val| (val & !DTCR_MASK) | (rank_mask << 24) | 1);

    delay.delay_us(TRAINING_SETTLE_TIME.ticks());

    ctl.modify_zqcr(|val| (val & !ZQCR_MASK) | ZQCR_OVERRIDE | (config.zq & ZQCR_MASK));

    let steps = Pir::builder()
        .with_qs_gate(true)
        .with_dram_init(true)
        .with_dram_reset(true)
        .with_phy_reset(true)
        .with_delay_cal(true)
        .with_pll_init(true)
        .with_zq_cal(true)
        .with_init(false)
        .build();
    phy_init(ctl, steps, config.poll_timeout_us, delay)?;
    log::debug!("PHY training done");

    await_completion(
        PollTarget::ControllerNormal,
        || ctl.read_statr().raw_value(),
        0x1,
        0x1,
        config.poll_timeout_us,
        delay,
    )?;

    // Refresh update pulse.
    ctl.modify_rfshctl0(|val| val | RFSHCTL0_UPDATE);
    delay.delay_us(REFRESH_PULSE_TIME.ticks());
    ctl.modify_rfshctl0(|val| val & !RFSHCTL0_UPDATE);
    delay.delay_us(REFRESH_PULSE_TIME.ticks());

    com.modify_init_flag(|mut val| {
        val.set_channel_init_done(true);
        val
    });

    // Safety: Index is valid.
    unsafe { ctl.modify_pgcr_unchecked(3, |val| val & !PGCR3_CLEAR_MASK) };
    Ok(())
}

/// Settings applied between the PHY training and the size detection.
pub fn post_training_setup(ctl: &mut MmioMctlCtl<'_>) {
    ctl.modify_magic_0x0a0(|val| val & !0xffff);
    ctl.modify_pwrctl(|val| val & !0x1);
    // HDR/DDR dynamic mode.
    // Safety: Index is valid.
    unsafe { ctl.modify_pgcr_unchecked(0, |val| val & !PGCR0_HDR_DDR_MODE_MASK) };
    // The impedance calibration is done, power it down.
    ctl.modify_zqcr(|val| val | ZQCR_POWER_DOWN);
    // DQ hold disable.
    // Safety: Index is valid.
    unsafe { ctl.modify_pgcr_unchecked(2, |val| val & !PGCR2_DQ_HOLD) };
}

/// Enable all bus masters of the DRAM arbiter.
pub fn enable_all_masters(com: &mut MmioMctlCom<'_>) {
    com.write_maer0(0xffff_ffff);
    com.write_maer1(0x7f);
    com.write_maer2(0xffff);
}
