//! Baud rate table
//!
//! The XMEGA baud generator is programmed with a 12-bit BSEL divisor and a
//! 4-bit signed BSCALE exponent. Settings below assume the 32 MHz peripheral
//! clock the board runs at; rates outside the table are rejected rather
//! than approximated.

/// Peripheral clock the table was computed for.
pub const PERIPHERAL_CLOCK_HZ: u32 = 32_000_000;

/// Supported transmit rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaudRate {
    B9600,
    B38400,
    B115200,
    B230400,
}

impl BaudRate {
    /// Every supported rate, slowest first.
    pub const ALL: [BaudRate; 4] = [Self::B9600, Self::B38400, Self::B115200, Self::B230400];

    /// Look up a rate requested in bits per second.
    pub fn from_bps(bps: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|rate| rate.bps() == bps)
    }

    /// Nominal rate in bits per second.
    pub const fn bps(self) -> u32 {
        match self {
            Self::B9600 => 9_600,
            Self::B38400 => 38_400,
            Self::B115200 => 115_200,
            Self::B230400 => 230_400,
        }
    }

    /// Divisor pair for this rate at [`PERIPHERAL_CLOCK_HZ`].
    pub const fn setting(self) -> BaudSetting {
        match self {
            Self::B9600 => BaudSetting::new(12, 4),
            Self::B38400 => BaudSetting::new(12, 2),
            Self::B115200 => BaudSetting::new(131, -3),
            Self::B230400 => BaudSetting::new(123, -4),
        }
    }
}

/// A (BSEL, BSCALE) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaudSetting {
    bsel: u16,
    bscale: i8,
}

impl BaudSetting {
    /// Largest BSEL the 12-bit field holds.
    pub const MAX_BSEL: u16 = 0x0fff;

    /// Build a setting from a 12-bit divisor and a scale in -7..=7.
    pub const fn new(bsel: u16, bscale: i8) -> Self {
        debug_assert!(bsel <= Self::MAX_BSEL, "BSEL exceeds 12 bits");
        debug_assert!(bscale >= -7 && bscale <= 7, "BSCALE outside -7..=7");
        Self { bsel, bscale }
    }

    /// 12-bit divisor.
    pub const fn bsel(self) -> u16 {
        self.bsel
    }

    /// Scale exponent.
    pub const fn bscale(self) -> i8 {
        self.bscale
    }

    /// BAUDCTRLA value: BSEL[7:0].
    pub const fn ctrla(self) -> u8 {
        (self.bsel & 0xff) as u8
    }

    /// BAUDCTRLB value: BSCALE in the high nibble, BSEL[11:8] in the low nibble.
    pub const fn ctrlb(self) -> u8 {
        ((self.bscale as u8) << 4) | (((self.bsel >> 8) & 0x0f) as u8)
    }

    /// Rate the hardware actually produces from a peripheral clock of `f_per` Hz
    /// in normal-speed asynchronous mode.
    pub fn actual_rate(self, f_per: u32) -> u32 {
        let f_per = u64::from(f_per);
        let bsel = u64::from(self.bsel);
        if self.bscale >= 0 {
            let scale = 1u64 << self.bscale;
            (f_per / (scale * 16 * (bsel + 1))) as u32
        } else {
            // f_baud = f_per / (16 * (2^bscale * bsel + 1))
            let scale = 1u64 << self.bscale.unsigned_abs();
            (f_per * scale / (16 * (bsel + scale))) as u32
        }
    }
}
