//! Board clocks
//!
//! All peripheral clocks on the classic boards run at fixed rates. The only
//! programmable part is the CPU/AHB divider pair applied to the base PLL:
//! `cpu = base / base_cpu`, `ahb = cpu / cpu_ahb`.

use log::debug;

/// Something with a clock rate.
pub trait ClockSource {
    fn rate_hz(&self) -> u64;
}

/// Clock with a fixed rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    name: &'static str,
    rate_hz: u64,
}

impl FixedClock {
    pub const fn new(name: &'static str, rate_hz: u64) -> Self {
        Self { name, rate_hz }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl ClockSource for FixedClock {
    fn rate_hz(&self) -> u64 {
        self.rate_hz
    }
}

impl ClockSource for u64 {
    fn rate_hz(&self) -> u64 {
        *self
    }
}

/// Base PLL frequency
pub const BASE_HZ: u64 = 264_000_000;
/// AHB bus clock (framebuffer, `"ahb"`)
pub const AHB_HZ: u64 = 66_000_000;
/// APB peripheral clock, feeds the keypad scanner
pub const APB_PCLK_HZ: u64 = 33_000_000;
/// 32 kHz system timer (`"timer2"`)
pub const TIMER_HZ: u64 = 32_768;
/// UART reference clock
pub const UART_HZ: u64 = 12_000_000;

/// Named fixed clocks of a board
#[derive(Debug, Clone)]
pub struct ClockTree {
    clocks: Vec<FixedClock>,
}

impl ClockTree {
    /// Clocks of the TI-Nspire boards
    pub fn nspire() -> Self {
        Self {
            clocks: vec![
                FixedClock::new("base", BASE_HZ),
                FixedClock::new("ahb", AHB_HZ),
                FixedClock::new("apb_pclk", APB_PCLK_HZ),
                FixedClock::new("timer2", TIMER_HZ),
                FixedClock::new("uart0", UART_HZ),
            ],
        }
    }

    /// Look up a clock by connection name
    pub fn get(&self, name: &str) -> Option<&FixedClock> {
        let clk = self.clocks.iter().find(|c| c.name == name);
        if clk.is_none() {
            debug!("clock: no clock named {:?}", name);
        }
        clk
    }

    pub fn iter(&self) -> impl Iterator<Item = &FixedClock> {
        self.clocks.iter()
    }
}

/// CPU and AHB divider pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockDivider {
    pub base_cpu: u8,
    pub cpu_ahb: u8,
}

/// Divider settings known to be stable
pub const SAFE_DIVISORS: [ClockDivider; 2] = [
    ClockDivider { base_cpu: 2, cpu_ahb: 2 },
    ClockDivider { base_cpu: 4, cpu_ahb: 1 },
];

/// Base frequency together with its divider pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSpeeds {
    pub base: u64,
    pub div: ClockDivider,
}

impl ClockSpeeds {
    pub fn cpu_hz(&self) -> u64 {
        self.base / u64::from(self.div.base_cpu.max(1))
    }

    pub fn ahb_hz(&self) -> u64 {
        self.cpu_hz() / u64::from(self.div.cpu_ahb.max(1))
    }

    pub fn with_divider(self, div: ClockDivider) -> Self {
        Self { div, ..self }
    }
}

/// CPU frequencies in kHz reachable with [`SAFE_DIVISORS`] from `base`
pub fn frequency_table_khz(base: u64) -> Vec<u64> {
    SAFE_DIVISORS
        .iter()
        .map(|div| (base / 1000) / u64::from(div.base_cpu))
        .collect()
}
