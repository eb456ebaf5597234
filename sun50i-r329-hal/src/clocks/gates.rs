//! # Bus clock gates and reset lines of the main CCU
//!
//! Every gate and reset line is a single bit inside one of the combined bus gate / reset
//! registers or module clock registers. Reset lines are active low, so deasserting a reset sets
//! its bit.
use sun50i_r329::ccu::MmioCcu;

/// CCU registers which hold gate or reset bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRegister {
    MmcBgr,
    UartBgr,
    Spi0Clk,
    Spi1Clk,
    SpiBgr,
    EmacBgr,
    Usb0Clk,
    Usb1Clk,
    UsbBgr,
}

impl GateRegister {
    pub fn read(self, ccu: &mut MmioCcu<'_>) -> u32 {
        match self {
            GateRegister::MmcBgr => ccu.read_mmc_bgr(),
            GateRegister::UartBgr => ccu.read_uart_bgr(),
            GateRegister::Spi0Clk => ccu.read_spi0_clk(),
            GateRegister::Spi1Clk => ccu.read_spi1_clk(),
            GateRegister::SpiBgr => ccu.read_spi_bgr(),
            GateRegister::EmacBgr => ccu.read_emac_bgr(),
            GateRegister::Usb0Clk => ccu.read_usb0_clk(),
            GateRegister::Usb1Clk => ccu.read_usb1_clk(),
            GateRegister::UsbBgr => ccu.read_usb_bgr(),
        }
    }

    pub fn modify(self, ccu: &mut MmioCcu<'_>, f: impl FnOnce(u32) -> u32) {
        match self {
            GateRegister::MmcBgr => ccu.modify_mmc_bgr(f),
            GateRegister::UartBgr => ccu.modify_uart_bgr(f),
            GateRegister::Spi0Clk => ccu.modify_spi0_clk(f),
            GateRegister::Spi1Clk => ccu.modify_spi1_clk(f),
            GateRegister::SpiBgr => ccu.modify_spi_bgr(f),
            GateRegister::EmacBgr => ccu.modify_emac_bgr(f),
            GateRegister::Usb0Clk => ccu.modify_usb0_clk(f),
            GateRegister::Usb1Clk => ccu.modify_usb1_clk(f),
            GateRegister::UsbBgr => ccu.modify_usb_bgr(f),
        }
    }
}

/// Clock gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    BusMmc0,
    BusMmc1,
    BusUart0,
    BusUart1,
    BusUart2,
    BusUart3,
    /// SPI0 module clock.
    Spi0,
    /// SPI1 module clock.
    Spi1,
    BusSpi0,
    BusSpi1,
    BusEmac,
    UsbPhy0,
    UsbOhci0,
    UsbPhy1,
    UsbOhci1,
    BusOhci0,
    BusOhci1,
    BusEhci0,
    BusOtg,
}

impl Gate {
    pub const ALL: [Gate; 19] = [
        Gate::BusMmc0,
        Gate::BusMmc1,
        Gate::BusUart0,
        Gate::BusUart1,
        Gate::BusUart2,
        Gate::BusUart3,
        Gate::Spi0,
        Gate::Spi1,
        Gate::BusSpi0,
        Gate::BusSpi1,
        Gate::BusEmac,
        Gate::UsbPhy0,
        Gate::UsbOhci0,
        Gate::UsbPhy1,
        Gate::UsbOhci1,
        Gate::BusOhci0,
        Gate::BusOhci1,
        Gate::BusEhci0,
        Gate::BusOtg,
    ];

    /// Register and bit mask of the gate.
    pub const fn location(self) -> (GateRegister, u32) {
        match self {
            Gate::BusMmc0 => (GateRegister::MmcBgr, 1 << 0),
            Gate::BusMmc1 => (GateRegister::MmcBgr, 1 << 1),
            Gate::BusUart0 => (GateRegister::UartBgr, 1 << 0),
            Gate::BusUart1 => (GateRegister::UartBgr, 1 << 1),
            Gate::BusUart2 => (GateRegister::UartBgr, 1 << 2),
            Gate::BusUart3 => (GateRegister::UartBgr, 1 << 3),
            Gate::Spi0 => (GateRegister::Spi0Clk, 1 << 31),
            Gate::Spi1 => (GateRegister::Spi1Clk, 1 << 31),
            Gate::BusSpi0 => (GateRegister::SpiBgr, 1 << 0),
            Gate::BusSpi1 => (GateRegister::SpiBgr, 1 << 1),
            Gate::BusEmac => (GateRegister::EmacBgr, 1 << 0),
            Gate::UsbPhy0 => (GateRegister::Usb0Clk, 1 << 29),
            Gate::UsbOhci0 => (GateRegister::Usb0Clk, 1 << 31),
            Gate::UsbPhy1 => (GateRegister::Usb1Clk, 1 << 29),
            Gate::UsbOhci1 => (GateRegister::Usb1Clk, 1 << 31),
            Gate::BusOhci0 => (GateRegister::UsbBgr, 1 << 0),
            Gate::BusOhci1 => (GateRegister::UsbBgr, 1 << 1),
            Gate::BusEhci0 => (GateRegister::UsbBgr, 1 << 4),
            Gate::BusOtg => (GateRegister::UsbBgr, 1 << 8),
        }
    }
}

/// Reset lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reset {
    BusMmc0,
    BusMmc1,
    BusUart0,
    BusUart1,
    BusUart2,
    BusUart3,
    BusSpi0,
    BusSpi1,
    BusEmac,
    UsbPhy0,
    UsbPhy1,
    BusOhci0,
    BusOhci1,
    BusEhci0,
    BusOtg,
}

impl Reset {
    pub const ALL: [Reset; 15] = [
        Reset::BusMmc0,
        Reset::BusMmc1,
        Reset::BusUart0,
        Reset::BusUart1,
        Reset::BusUart2,
        Reset::BusUart3,
        Reset::BusSpi0,
        Reset::BusSpi1,
        Reset::BusEmac,
        Reset::UsbPhy0,
        Reset::UsbPhy1,
        Reset::BusOhci0,
        Reset::BusOhci1,
        Reset::BusEhci0,
        Reset::BusOtg,
    ];

    /// Register and bit mask of the reset line.
    pub const fn location(self) -> (GateRegister, u32) {
        match self {
            Reset::BusMmc0 => (GateRegister::MmcBgr, 1 << 16),
            Reset::BusMmc1 => (GateRegister::MmcBgr, 1 << 17),
            Reset::BusUart0 => (GateRegister::UartBgr, 1 << 16),
            Reset::BusUart1 => (GateRegister::UartBgr, 1 << 17),
            Reset::BusUart2 => (GateRegister::UartBgr, 1 << 18),
            Reset::BusUart3 => (GateRegister::UartBgr, 1 << 19),
            Reset::BusSpi0 => (GateRegister::SpiBgr, 1 << 16),
            Reset::BusSpi1 => (GateRegister::SpiBgr, 1 << 17),
            Reset::BusEmac => (GateRegister::EmacBgr, 1 << 16),
            Reset::UsbPhy0 => (GateRegister::Usb0Clk, 1 << 30),
            Reset::UsbPhy1 => (GateRegister::Usb1Clk, 1 << 30),
            Reset::BusOhci0 => (GateRegister::UsbBgr, 1 << 16),
            Reset::BusOhci1 => (GateRegister::UsbBgr, 1 << 17),
            Reset::BusEhci0 => (GateRegister::UsbBgr, 1 << 20),
            Reset::BusOtg => (GateRegister::UsbBgr, 1 << 24),
        }
    }
}

pub fn enable_clock(ccu: &mut MmioCcu<'_>, gate: Gate) {
    let (reg, mask) = gate.location();
    reg.modify(ccu, |val| val | mask);
}

pub fn disable_clock(ccu: &mut MmioCcu<'_>, gate: Gate) {
    let (reg, mask) = gate.location();
    reg.modify(ccu, |val| val & !mask);
}

pub fn is_clock_enabled(ccu: &mut MmioCcu<'_>, gate: Gate) -> bool {
    let (reg, mask) = gate.location();
    reg.read(ccu) & mask != 0
}

/// Put the peripheral into reset.
pub fn assert_reset(ccu: &mut MmioCcu<'_>, reset: Reset) {
    let (reg, mask) = reset.location();
    reg.modify(ccu, |val| val & !mask);
}

/// Take the peripheral out of reset.
pub fn deassert_reset(ccu: &mut MmioCcu<'_>, reset: Reset) {
    let (reg, mask) = reset.location();
    reg.modify(ccu, |val| val | mask);
}

pub fn is_reset_asserted(ccu: &mut MmioCcu<'_>, reset: Reset) -> bool {
    let (reg, mask) = reset.location();
    reg.read(ccu) & mask == 0
}
