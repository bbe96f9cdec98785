//! # XL9535 KxV5 Relay Board Driver
//!
//! This is a driver for the XL9535-KxV5 family of relay boards (K1V5, K2V5,
//! K4V5, K8V5 and K16V5). Each board carries an XL9535 16-bit I²C GPIO
//! expander, with one expander pin wired to each relay.
//!
//! The boards give you two independent controls per relay:
//!
//! * The *relay* bit, held in the expander's Output Port register. A set bit
//!   asks for the relay to be on (NC-x-COM<->NO, blue LED lit).
//! * The *circuit* bit, held in the expander's Configuration register. When a
//!   circuit is disabled the relay stays off whatever its relay bit says.
//!
//! Because the two are separate you can keep the wanted relay pattern in the
//! Output Port and use the circuits as a gate, without losing that pattern.
//!
//! The chip is the only place state lives. Every call on [`RelayBoard`] is a
//! self-contained read, write, or read-modify-write against the chip, and the
//! read-modify-write sequences are not atomic. If more than one thread drives
//! the same board, wrap the board and bus in your own lock.
//!
//! # Example
//!
//! You might drive a board like this:
//!
//! ```rust
//! # use embedded_hal::blocking::i2c::{SevenBitAddress, Write, WriteRead};
//! # struct I2c;
//! # impl Write for I2c {
//! #     type Error = ();
//! #     fn write(&mut self, _address: SevenBitAddress, _bytes: &[u8]) -> Result<(), Self::Error> {
//! #         Ok(())
//! #     }
//! # }
//! # impl WriteRead for I2c {
//! #     type Error = ();
//! #     fn write_read(&mut self, _address: SevenBitAddress, _bytes: &[u8], buffer: &mut [u8]) -> Result<(), Self::Error> {
//! #         buffer.fill(0);
//! #         Ok(())
//! #     }
//! # }
//! # let mut i2c = I2c;
//! use xl9535_relay::{BusAddress, Channel, RelayBoard, Variant};
//!
//! let mut board = RelayBoard::new(BusAddress::from_pins(false, false, false));
//! if let Err(e) = board.probe(&mut i2c) {
//!     // Board didn't respond
//! }
//! board.init(&mut i2c).unwrap();
//! board.set_relay(&mut i2c, Channel::A0, true).unwrap();
//! board.set_circuit(&mut i2c, 1u8, false).unwrap();
//! board.set_relays(&mut i2c, Variant::K4V5.mask()).unwrap();
//! let relays = board.get_relays(&mut i2c).unwrap();
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(missing_docs)]

use embedded_hal::blocking::i2c::{Write, WriteRead};

//
// Public Types
//

/// The 7-bit I²C address of an XL9535.
///
/// The chip decodes three address pins, so up to eight boards can share a
/// bus at `0x20` to `0x27`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusAddress(u8);

/// One of the sixteen relay channels on a board.
///
/// Channels `A0` to `A7` live in the first register byte (port 0) and `B0`
/// to `B7` in the second (port 1). A `Channel` can only hold 0 to 15.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Channel(u8);

/// The boards in the KxV5 family, which differ only in how many relays are
/// fitted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Variant {
    /// One relay, on channel A0
    K1V5,
    /// Two relays, on A0 and A1
    K2V5,
    /// Four relays, on A0 to A3
    K4V5,
    /// Eight relays, on A0 to A7
    K8V5,
    /// Sixteen relays, on A0 to B7
    K16V5,
}

/// The ways a [`RelayBoard`] operation can fail.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Nothing acknowledged the board's bus address.
    DeviceNotFound,
    /// The I²C transfer failed. The chip is left in whatever state the
    /// partial transfer produced.
    Bus(E),
    /// The given channel index was not in `0..=15`. No transfer was attempted.
    InvalidIndex(u8),
}

/// Represents one XL9535 relay board on the bus.
///
/// The bus itself is lent to each call, so several boards can share it.
pub struct RelayBoard {
    bus_address: u8,
    buffer: [u8; 2],
}

//
// Private Types
//

/// The XL9535 registers this driver touches.
///
/// Each is the first of a pair; the chip auto-increments into the second
/// register (port 1) on a two-byte transfer.
#[derive(Copy, Clone, Debug)]
enum Register {
    /// Relay state, one bit per relay
    OutputPort0 = 0x02,
    /// Input polarity inversion
    InversionPort0 = 0x04,
    /// Pin direction, used by the board as the inverted circuit enable
    ConfigPort0 = 0x06,
}

//
// Public Data
//

/// The number of channels an XL9535 provides.
pub const NUM_CHANNELS: u8 = 16;

//
// Private Data
//

/// Flips between the Configuration register encoding (0 = enabled) and the
/// circuit encoding (1 = enabled).
const CIRCUIT_INVERT: u8 = 0xFF;

//
// impls on Public Types
//

impl BusAddress {
    /// The address with all three address pins tied low.
    pub const DEFAULT: BusAddress = BusAddress(0x20);

    /// Work out the address from the state of the A2, A1 and A0 pins.
    pub const fn from_pins(a2: bool, a1: bool, a0: bool) -> BusAddress {
        BusAddress(0x20 | (a2 as u8) << 2 | (a1 as u8) << 1 | a0 as u8)
    }
}

impl Default for BusAddress {
    fn default() -> BusAddress {
        BusAddress::DEFAULT
    }
}

impl From<BusAddress> for u8 {
    fn from(addr: BusAddress) -> u8 {
        addr.0
    }
}

impl Channel {
    /// Port A, bit 0
    pub const A0: Channel = Channel(0);
    /// Port A, bit 1
    pub const A1: Channel = Channel(1);
    /// Port A, bit 2
    pub const A2: Channel = Channel(2);
    /// Port A, bit 3
    pub const A3: Channel = Channel(3);
    /// Port A, bit 4
    pub const A4: Channel = Channel(4);
    /// Port A, bit 5
    pub const A5: Channel = Channel(5);
    /// Port A, bit 6
    pub const A6: Channel = Channel(6);
    /// Port A, bit 7
    pub const A7: Channel = Channel(7);
    /// Port B, bit 0
    pub const B0: Channel = Channel(8);
    /// Port B, bit 1
    pub const B1: Channel = Channel(9);
    /// Port B, bit 2
    pub const B2: Channel = Channel(10);
    /// Port B, bit 3
    pub const B3: Channel = Channel(11);
    /// Port B, bit 4
    pub const B4: Channel = Channel(12);
    /// Port B, bit 5
    pub const B5: Channel = Channel(13);
    /// Port B, bit 6
    pub const B6: Channel = Channel(14);
    /// Port B, bit 7
    pub const B7: Channel = Channel(15);

    /// Make a channel from an index, or `None` if the index is over 15.
    pub const fn new(index: u8) -> Option<Channel> {
        if index < NUM_CHANNELS {
            Some(Channel(index))
        } else {
            None
        }
    }

    /// Iterate over every channel, `A0` first.
    pub fn all() -> impl Iterator<Item = Channel> {
        (0..NUM_CHANNELS).map(Channel)
    }

    /// The channel's bit index, 0 to 15.
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Which register byte holds this channel: 0 for port A, 1 for port B.
    pub const fn port(self) -> usize {
        (self.0 / 8) as usize
    }

    /// The bit for this channel within its register byte.
    pub const fn mask(self) -> u8 {
        1 << (self.0 % 8)
    }

    /// The bit for this channel within the 16-bit register value.
    pub const fn bit(self) -> u16 {
        1 << self.0
    }
}

impl TryFrom<u8> for Channel {
    type Error = u8;

    fn try_from(index: u8) -> Result<Channel, u8> {
        Channel::new(index).ok_or(index)
    }
}

impl From<Channel> for u8 {
    fn from(channel: Channel) -> u8 {
        channel.0
    }
}

impl Variant {
    /// How many relays are fitted.
    pub const fn relay_count(self) -> u8 {
        match self {
            Variant::K1V5 => 1,
            Variant::K2V5 => 2,
            Variant::K4V5 => 4,
            Variant::K8V5 => 8,
            Variant::K16V5 => 16,
        }
    }

    /// The bits of the 16-bit relay or circuit value that have a relay
    /// behind them.
    pub const fn mask(self) -> u16 {
        u16::MAX >> (NUM_CHANNELS - self.relay_count())
    }
}

impl<E> core::fmt::Display for Error<E>
where
    E: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::DeviceNotFound => write!(f, "XL9535 not found on the bus"),
            Error::Bus(e) => write!(f, "I2C bus error: {:?}", e),
            Error::InvalidIndex(index) => {
                write!(f, "channel index {} should be in range 0-15", index)
            }
        }
    }
}

impl Default for RelayBoard {
    fn default() -> RelayBoard {
        RelayBoard::new(BusAddress::DEFAULT)
    }
}

impl RelayBoard {
    /// Create a new relay board proxy object.
    ///
    /// Takes either a [`BusAddress`] or a raw 7-bit address. Nothing is sent
    /// on the bus until you call a method; you will usually want
    /// [`RelayBoard::init`] first.
    pub fn new(bus_address: impl Into<u8>) -> RelayBoard {
        RelayBoard {
            bus_address: bus_address.into(),
            buffer: [0; 2],
        }
    }

    /// The 7-bit address this board is talking to.
    pub fn bus_address(&self) -> u8 {
        self.bus_address
    }

    /// Check that something acknowledges the board's address.
    ///
    /// Sends an address-only write, as a bus scan does. Any failure is
    /// reported as [`Error::DeviceNotFound`].
    pub fn probe<B, E>(&mut self, bus: &mut B) -> Result<(), Error<E>>
    where
        B: Write<Error = E>,
    {
        if bus.write(self.bus_address, &[]).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("XL9535 not found at I2C address 0x{:02x}", self.bus_address);
            return Err(Error::DeviceNotFound);
        }
        Ok(())
    }

    /// Put the board into a known state: all relays off, all circuits
    /// enabled.
    ///
    /// Input inversion is also switched off so the Input Port reads back the
    /// same as the Output Port. Safe to call any number of times. If a write
    /// fails the board is left part-way through, so call this again.
    pub fn init<B, E>(&mut self, bus: &mut B) -> Result<(), Error<E>>
    where
        B: Write<Error = E>,
    {
        self.buffer = [0x00, 0x00];
        self.store(bus, Register::InversionPort0)?;
        self.store(bus, Register::OutputPort0)?;
        // Configuration bits are inverted: zero means the circuit is enabled
        self.store(bus, Register::ConfigPort0)?;
        Ok(())
    }

    /// Get whether a relay is commanded on.
    ///
    /// `index` may be a raw index (0 to 15) or a [`Channel`].
    pub fn get_relay<B, E>(&mut self, bus: &mut B, index: impl Into<u8>) -> Result<bool, Error<E>>
    where
        B: WriteRead<Error = E>,
    {
        let channel = Self::channel(index)?;
        self.load(bus, Register::OutputPort0)?;
        Ok(self.buffer[channel.port()] & channel.mask() != 0)
    }

    /// Turn a single relay on or off, leaving the others alone.
    ///
    /// A relay whose circuit is disabled will not actually switch until the
    /// circuit is enabled again.
    pub fn set_relay<B, E>(
        &mut self,
        bus: &mut B,
        index: impl Into<u8>,
        on: bool,
    ) -> Result<(), Error<E>>
    where
        B: Write<Error = E> + WriteRead<Error = E>,
    {
        let channel = Self::channel(index)?;
        self.load(bus, Register::OutputPort0)?;
        self.update_bit(channel, on);
        self.store(bus, Register::OutputPort0)
    }

    /// Get whether a circuit is enabled.
    pub fn get_circuit<B, E>(
        &mut self,
        bus: &mut B,
        index: impl Into<u8>,
    ) -> Result<bool, Error<E>>
    where
        B: WriteRead<Error = E>,
    {
        let channel = Self::channel(index)?;
        self.load(bus, Register::ConfigPort0)?;
        self.invert_buffer();
        Ok(self.buffer[channel.port()] & channel.mask() != 0)
    }

    /// Enable or disable a single circuit, leaving the others alone.
    ///
    /// Disabling a circuit forces its relay off without changing the relay
    /// bit, so the relay returns to its commanded state when re-enabled.
    pub fn set_circuit<B, E>(
        &mut self,
        bus: &mut B,
        index: impl Into<u8>,
        enabled: bool,
    ) -> Result<(), Error<E>>
    where
        B: Write<Error = E> + WriteRead<Error = E>,
    {
        let channel = Self::channel(index)?;
        self.load(bus, Register::ConfigPort0)?;
        self.invert_buffer();
        self.update_bit(channel, enabled);
        self.invert_buffer();
        self.store(bus, Register::ConfigPort0)
    }

    /// Get all sixteen relay bits, with `A0` in bit 0 and `B7` in bit 15.
    pub fn get_relays<B, E>(&mut self, bus: &mut B) -> Result<u16, Error<E>>
    where
        B: WriteRead<Error = E>,
    {
        self.load(bus, Register::OutputPort0)?;
        Ok(u16::from_le_bytes(self.buffer))
    }

    /// Set all sixteen relays in one transfer.
    pub fn set_relays<B, E>(&mut self, bus: &mut B, value: u16) -> Result<(), Error<E>>
    where
        B: Write<Error = E>,
    {
        self.buffer = value.to_le_bytes();
        self.store(bus, Register::OutputPort0)
    }

    /// Get all sixteen circuit enables. A set bit is an enabled circuit.
    pub fn get_circuits<B, E>(&mut self, bus: &mut B) -> Result<u16, Error<E>>
    where
        B: WriteRead<Error = E>,
    {
        self.load(bus, Register::ConfigPort0)?;
        self.invert_buffer();
        Ok(u16::from_le_bytes(self.buffer))
    }

    /// Enable or disable all sixteen circuits in one transfer.
    pub fn set_circuits<B, E>(&mut self, bus: &mut B, value: u16) -> Result<(), Error<E>>
    where
        B: Write<Error = E>,
    {
        self.buffer = value.to_le_bytes();
        self.invert_buffer();
        self.store(bus, Register::ConfigPort0)
    }

    /// Check an index before anything goes near the bus.
    fn channel<E>(index: impl Into<u8>) -> Result<Channel, Error<E>> {
        let index = index.into();
        Channel::new(index).ok_or(Error::InvalidIndex(index))
    }

    /// Read a register pair into the scratch buffer.
    fn load<B, E>(&mut self, bus: &mut B, register: Register) -> Result<(), Error<E>>
    where
        B: WriteRead<Error = E>,
    {
        bus.write_read(self.bus_address, &[register as u8], &mut self.buffer)
            .map_err(Error::Bus)
    }

    /// Write the scratch buffer to a register pair.
    fn store<B, E>(&mut self, bus: &mut B, register: Register) -> Result<(), Error<E>>
    where
        B: Write<Error = E>,
    {
        let bytes = [register as u8, self.buffer[0], self.buffer[1]];
        #[cfg(feature = "defmt")]
        defmt::debug!(
            "Setting XL9535 0x{:02x} register 0x{:02x} to 0x{:02x}{:02x}",
            self.bus_address,
            bytes[0],
            bytes[2],
            bytes[1]
        );
        bus.write(self.bus_address, &bytes).map_err(Error::Bus)
    }

    /// Clear a channel's bit in the scratch buffer, then set it if asked.
    fn update_bit(&mut self, channel: Channel, value: bool) {
        self.buffer[channel.port()] &= !channel.mask();
        if value {
            self.buffer[channel.port()] |= channel.mask();
        }
    }

    /// Swap the scratch buffer between raw Configuration bits and circuit
    /// enables.
    fn invert_buffer(&mut self) {
        self.buffer[0] ^= CIRCUIT_INVERT;
        self.buffer[1] ^= CIRCUIT_INVERT;
    }
}

//
// impls on Private Types
//

// None

//
// Tests
//


//
// End of file
//
