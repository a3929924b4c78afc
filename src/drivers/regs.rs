//! ATxmega USART and PORT register surface
//!
//! Bit layouts follow the XMEGA AU manual. The driver programs the hardware
//! exclusively through [`UsartRegisters`], so tests can substitute a
//! simulated surface.
//!
//! # Memory Map (ATxmega A1/A1U)
//! - PORTC..PORTF: 0x0640, 0x0660, 0x0680, 0x06A0
//! - USARTC0..USARTF0: 0x08A0, 0x09A0, 0x0AA0, 0x0BA0
//! - USARTx1 at USARTx0 + 0x10

use bitflags::bitflags;
use core::ptr::{read_volatile, write_volatile};

/// PORT register offsets
mod port {
    /// Data Direction Set
    pub const DIRSET: usize = 0x01;
    /// Data Direction Clear
    pub const DIRCLR: usize = 0x02;
    /// Data Output Value Set
    pub const OUTSET: usize = 0x05;
}

/// USART register offsets
mod usart {
    /// Data Register - write starts a transmission
    pub const DATA: usize = 0x00;
    /// Status Register
    pub const STATUS: usize = 0x01;
    /// Control Register B - enables
    pub const CTRLB: usize = 0x04;
    /// Control Register C - frame format
    pub const CTRLC: usize = 0x05;
    /// Baud Rate Control A - BSEL[7:0]
    pub const BAUDCTRLA: usize = 0x06;
    /// Baud Rate Control B - BSCALE[3:0] | BSEL[11:8]
    pub const BAUDCTRLB: usize = 0x07;
}

bitflags! {
    /// Pin masks for a PORT's DIR/OUT registers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PortPins: u8 {
        const PIN0 = 1 << 0;
        const PIN1 = 1 << 1;
        const PIN2 = 1 << 2;
        const PIN3 = 1 << 3;
        const PIN4 = 1 << 4;
        const PIN5 = 1 << 5;
        const PIN6 = 1 << 6;
        const PIN7 = 1 << 7;
    }
}

bitflags! {
    /// USART STATUS register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        /// Receive Complete
        const RXCIF = 1 << 7;
        /// Transmit Complete
        const TXCIF = 1 << 6;
        /// Data Register Empty - ready for the next byte
        const DREIF = 1 << 5;
        /// Frame Error
        const FERR = 1 << 4;
        /// Buffer Overflow
        const BUFOVF = 1 << 3;
        /// Parity Error
        const PERR = 1 << 2;
        /// Receive Bit 8
        const RXB8 = 1 << 0;
    }
}

bitflags! {
    /// USART CTRLB register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CtrlB: u8 {
        /// Receiver Enable
        const RXEN = 1 << 4;
        /// Transmitter Enable
        const TXEN = 1 << 3;
        /// Double Transmission Speed
        const CLK2X = 1 << 2;
        /// Multiprocessor Communication Mode
        const MPCM = 1 << 1;
        /// Transmit Bit 8
        const TXB8 = 1 << 0;
    }
}

/// CTRLC.CHSIZE field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CharSize {
    Bits5 = 0,
    Bits6 = 1,
    Bits7 = 2,
    Bits8 = 3,
    Bits9 = 7,
}

/// CTRLC.PMODE field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Parity {
    Disabled = 0,
    Even = 2,
    Odd = 3,
}

/// Asynchronous frame format encoded into CTRLC.
///
/// CMODE [7:6] is left at asynchronous (0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    pub char_size: CharSize,
    pub parity: Parity,
    pub two_stop_bits: bool,
}

impl FrameFormat {
    /// 8 data bits, no parity, 1 stop bit. The only format the driver programs.
    pub const EIGHT_N_ONE: Self = Self {
        char_size: CharSize::Bits8,
        parity: Parity::Disabled,
        two_stop_bits: false,
    };

    /// Raw CTRLC value.
    pub const fn bits(self) -> u8 {
        let sbmode = if self.two_stop_bits { 1 << 3 } else { 0 };
        ((self.parity as u8) << 4) | sbmode | (self.char_size as u8)
    }
}

/// Register surface the driver programs.
///
/// Accessors take `&self`: hardware registers are shared, interior-mutable
/// state. Callers serialize access themselves (see `Uart`).
pub trait UsartRegisters {
    /// Pin carrying transmit data.
    fn tx_pin(&self) -> PortPins;
    /// Pin carrying receive data.
    fn rx_pin(&self) -> PortPins;

    /// PORT.OUTSET: drive `pins` high.
    fn port_outset(&self, pins: PortPins);
    /// PORT.DIRSET: make `pins` outputs.
    fn port_dirset(&self, pins: PortPins);
    /// PORT.DIRCLR: make `pins` inputs.
    fn port_dirclr(&self, pins: PortPins);

    /// BAUDCTRLA: BSEL[7:0].
    fn write_baudctrla(&self, value: u8);
    /// BAUDCTRLB: BSCALE[3:0] in the high nibble, BSEL[11:8] in the low nibble.
    fn write_baudctrlb(&self, value: u8);
    /// CTRLC: frame format.
    fn write_ctrlc(&self, value: u8);
    /// CTRLB: receiver/transmitter enables.
    fn write_ctrlb(&self, value: CtrlB);

    /// STATUS flags.
    fn status(&self) -> Status;
    /// DATA: starts transmission of `byte`.
    fn write_data(&self, byte: u8);
}

impl<T: UsartRegisters + ?Sized> UsartRegisters for &T {
    fn tx_pin(&self) -> PortPins {
        (**self).tx_pin()
    }

    fn rx_pin(&self) -> PortPins {
        (**self).rx_pin()
    }

    fn port_outset(&self, pins: PortPins) {
        (**self).port_outset(pins)
    }

    fn port_dirset(&self, pins: PortPins) {
        (**self).port_dirset(pins)
    }

    fn port_dirclr(&self, pins: PortPins) {
        (**self).port_dirclr(pins)
    }

    fn write_baudctrla(&self, value: u8) {
        (**self).write_baudctrla(value)
    }

    fn write_baudctrlb(&self, value: u8) {
        (**self).write_baudctrlb(value)
    }

    fn write_ctrlc(&self, value: u8) {
        (**self).write_ctrlc(value)
    }

    fn write_ctrlb(&self, value: CtrlB) {
        (**self).write_ctrlb(value)
    }

    fn status(&self) -> Status {
        (**self).status()
    }

    fn write_data(&self, byte: u8) {
        (**self).write_data(byte)
    }
}

/// USART peripheral instances and their pin assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsartInstance {
    C0,
    C1,
    D0,
    D1,
    E0,
    E1,
    F0,
    F1,
}

impl UsartInstance {
    /// Base address of the PORT carrying this USART's pins.
    pub const fn port_base(self) -> usize {
        match self {
            Self::C0 | Self::C1 => 0x0640,
            Self::D0 | Self::D1 => 0x0660,
            Self::E0 | Self::E1 => 0x0680,
            Self::F0 | Self::F1 => 0x06A0,
        }
    }

    /// Base address of the USART register block.
    pub const fn usart_base(self) -> usize {
        match self {
            Self::C0 => 0x08A0,
            Self::C1 => 0x08B0,
            Self::D0 => 0x09A0,
            Self::D1 => 0x09B0,
            Self::E0 => 0x0AA0,
            Self::E1 => 0x0AB0,
            Self::F0 => 0x0BA0,
            Self::F1 => 0x0BB0,
        }
    }

    const fn is_second(self) -> bool {
        matches!(self, Self::C1 | Self::D1 | Self::E1 | Self::F1)
    }

    /// TXD pin: PIN3 for USARTx0, PIN7 for USARTx1.
    pub const fn tx_pin(self) -> PortPins {
        if self.is_second() {
            PortPins::PIN7
        } else {
            PortPins::PIN3
        }
    }

    /// RXD pin: PIN2 for USARTx0, PIN6 for USARTx1.
    pub const fn rx_pin(self) -> PortPins {
        if self.is_second() {
            PortPins::PIN6
        } else {
            PortPins::PIN2
        }
    }
}

/// Memory-mapped USART on real hardware.
pub struct XmegaUsart {
    instance: UsartInstance,
}

impl XmegaUsart {
    /// Bind to a USART instance.
    ///
    /// # Safety
    /// The PORT and USART register blocks of `instance` must be mapped at
    /// their datasheet addresses, and no other code may drive them.
    pub const unsafe fn new(instance: UsartInstance) -> Self {
        Self { instance }
    }

    fn write_port(&self, offset: usize, value: u8) {
        // SAFETY: Address validity is guaranteed by the constructor contract
        unsafe { write_volatile((self.instance.port_base() + offset) as *mut u8, value) }
    }

    fn write_usart(&self, offset: usize, value: u8) {
        // SAFETY: Address validity is guaranteed by the constructor contract
        unsafe { write_volatile((self.instance.usart_base() + offset) as *mut u8, value) }
    }

    fn read_usart(&self, offset: usize) -> u8 {
        // SAFETY: Address validity is guaranteed by the constructor contract
        unsafe { read_volatile((self.instance.usart_base() + offset) as *const u8) }
    }
}

impl UsartRegisters for XmegaUsart {
    fn tx_pin(&self) -> PortPins {
        self.instance.tx_pin()
    }

    fn rx_pin(&self) -> PortPins {
        self.instance.rx_pin()
    }

    fn port_outset(&self, pins: PortPins) {
        self.write_port(port::OUTSET, pins.bits());
    }

    fn port_dirset(&self, pins: PortPins) {
        self.write_port(port::DIRSET, pins.bits());
    }

    fn port_dirclr(&self, pins: PortPins) {
        self.write_port(port::DIRCLR, pins.bits());
    }

    fn write_baudctrla(&self, value: u8) {
        self.write_usart(usart::BAUDCTRLA, value);
    }

    fn write_baudctrlb(&self, value: u8) {
        self.write_usart(usart::BAUDCTRLB, value);
    }

    fn write_ctrlc(&self, value: u8) {
        self.write_usart(usart::CTRLC, value);
    }

    fn write_ctrlb(&self, value: CtrlB) {
        self.write_usart(usart::CTRLB, value.bits());
    }

    fn status(&self) -> Status {
        Status::from_bits_retain(self.read_usart(usart::STATUS))
    }

    fn write_data(&self, byte: u8) {
        self.write_usart(usart::DATA, byte);
    }
}
