//! Firmata messages in both directions.

use crate::constants::{
    ANALOG_MESSAGE, DIGITAL_MESSAGE, END_SYSEX, REPORT_FIRMWARE, REPORT_VERSION,
    SET_DIGITAL_PIN_VALUE, SET_PIN_MODE, START_SYSEX, STRING_DATA, SYSTEM_RESET,
};
use crate::encoding::{data_byte, decode_string, encode_string, join_u14, split_u14};
use crate::error::{FirmataError, Result};
use crate::stream_parser::RawFrame;
use std::fmt;

/// Two-part version number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Firmware identity reported by the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareReport {
    pub version: Version,

    /// Sketch name, usually the file name (e.g. `StandardFirmata.ino`).
    pub name: String,
}

impl FirmwareReport {
    pub fn new(version: Version, name: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
        }
    }
}

/// Pin modes understood by SET_PIN_MODE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[non_exhaustive]
pub enum PinMode {
    Input = 0x00,
    Output = 0x01,
    Analog = 0x02,
    Pwm = 0x03,
    Servo = 0x04,
    InputPullUp = 0x0B,
}

impl PinMode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for PinMode {
    type Error = FirmataError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(Self::Input),
            0x01 => Ok(Self::Output),
            0x02 => Ok(Self::Analog),
            0x03 => Ok(Self::Pwm),
            0x04 => Ok(Self::Servo),
            0x0B => Ok(Self::InputPullUp),
            other => Err(FirmataError::malformed(format!(
                "unknown pin mode 0x{other:02X}"
            ))),
        }
    }
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Analog => "analog",
            Self::Pwm => "pwm",
            Self::Servo => "servo",
            Self::InputPullUp => "input-pullup",
        };
        f.write_str(name)
    }
}

/// Host to board messages.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Command {
    /// Ask for the protocol version.
    QueryVersion,

    /// Ask for the firmware name and version.
    QueryFirmware,

    SetPinMode { pin: u8, mode: PinMode },

    SetDigitalPinValue { pin: u8, high: bool },

    SystemReset,
}

impl Command {
    /// Serialize to wire bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if a pin number does not fit in a data byte.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let bytes = match self {
            Self::QueryVersion => vec![REPORT_VERSION],
            Self::QueryFirmware => vec![START_SYSEX, REPORT_FIRMWARE, END_SYSEX],
            Self::SetPinMode { pin, mode } => {
                vec![SET_PIN_MODE, data_byte("pin", *pin)?, mode.as_u8()]
            }
            Self::SetDigitalPinValue { pin, high } => {
                vec![SET_DIGITAL_PIN_VALUE, data_byte("pin", *pin)?, u8::from(*high)]
            }
            Self::SystemReset => vec![SYSTEM_RESET],
        };
        Ok(bytes)
    }

    /// Interpret a frame received by the board.
    ///
    /// Returns `Ok(None)` for well-formed commands the bridge never sends.
    pub fn from_frame(frame: RawFrame) -> Result<Option<Self>> {
        let command = match frame {
            RawFrame::Channel { command, data } => match command {
                REPORT_VERSION => Some(Self::QueryVersion),
                SYSTEM_RESET => Some(Self::SystemReset),
                SET_PIN_MODE => {
                    let (pin, mode) = two_bytes(&data)?;
                    Some(Self::SetPinMode {
                        pin,
                        mode: PinMode::try_from(mode)?,
                    })
                }
                SET_DIGITAL_PIN_VALUE => {
                    let (pin, value) = two_bytes(&data)?;
                    Some(Self::SetDigitalPinValue {
                        pin,
                        high: value != 0,
                    })
                }
                _ => None,
            },
            RawFrame::Sysex { command, .. } if command == REPORT_FIRMWARE => {
                Some(Self::QueryFirmware)
            }
            RawFrame::Sysex { .. } => None,
        };
        Ok(command)
    }
}

/// Board to host messages.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Report {
    /// Protocol version.
    Version(Version),

    Firmware(FirmwareReport),

    /// Free text from the sketch.
    StringData(String),

    /// Values of the 8 pins of a digital port, one bit per pin.
    DigitalPort { port: u8, mask: u16 },

    Analog { pin: u8, value: u16 },

    /// Any other sysex, kept raw.
    Sysex { command: u8, data: Vec<u8> },
}

impl Report {
    /// Serialize to wire bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if a field does not fit the 7-bit encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let bytes = match self {
            Self::Version(version) => vec![
                REPORT_VERSION,
                data_byte("major", version.major)?,
                data_byte("minor", version.minor)?,
            ],
            Self::Firmware(firmware) => {
                let mut bytes = vec![
                    START_SYSEX,
                    REPORT_FIRMWARE,
                    data_byte("major", firmware.version.major)?,
                    data_byte("minor", firmware.version.minor)?,
                ];
                bytes.extend(encode_string(&firmware.name));
                bytes.push(END_SYSEX);
                bytes
            }
            Self::StringData(text) => {
                let mut bytes = vec![START_SYSEX, STRING_DATA];
                bytes.extend(encode_string(text));
                bytes.push(END_SYSEX);
                bytes
            }
            Self::DigitalPort { port, mask } => {
                if *port > 0x0F {
                    return Err(FirmataError::out_of_range("port", u32::from(*port)));
                }
                let (lsb, msb) = split_u14(*mask);
                vec![DIGITAL_MESSAGE | port, lsb, msb]
            }
            Self::Analog { pin, value } => {
                if *pin > 0x0F {
                    return Err(FirmataError::out_of_range("analog pin", u32::from(*pin)));
                }
                let (lsb, msb) = split_u14(*value);
                vec![ANALOG_MESSAGE | pin, lsb, msb]
            }
            Self::Sysex { command, data } => {
                let mut bytes = vec![START_SYSEX, data_byte("sysex command", *command)?];
                for byte in data {
                    bytes.push(data_byte("sysex data", *byte)?);
                }
                bytes.push(END_SYSEX);
                bytes
            }
        };
        Ok(bytes)
    }

    /// Interpret a frame received by the host.
    ///
    /// Returns `Ok(None)` for channel messages the host has no use for.
    pub fn from_frame(frame: RawFrame) -> Result<Option<Self>> {
        let report = match frame {
            RawFrame::Channel { command, data } => match command & 0xF0 {
                DIGITAL_MESSAGE => {
                    let (lsb, msb) = two_bytes(&data)?;
                    Some(Self::DigitalPort {
                        port: command & 0x0F,
                        mask: join_u14(lsb, msb),
                    })
                }
                ANALOG_MESSAGE => {
                    let (lsb, msb) = two_bytes(&data)?;
                    Some(Self::Analog {
                        pin: command & 0x0F,
                        value: join_u14(lsb, msb),
                    })
                }
                0xF0 if command == REPORT_VERSION => {
                    let (major, minor) = two_bytes(&data)?;
                    Some(Self::Version(Version::new(major, minor)))
                }
                _ => None,
            },
            RawFrame::Sysex { command, data } => match command {
                REPORT_FIRMWARE => {
                    if data.len() < 2 {
                        return Err(FirmataError::malformed(
                            "firmware report without version bytes",
                        ));
                    }
                    Some(Self::Firmware(FirmwareReport {
                        version: Version::new(data[0], data[1]),
                        name: decode_string(&data[2..]),
                    }))
                }
                STRING_DATA => Some(Self::StringData(decode_string(&data))),
                _ => Some(Self::Sysex { command, data }),
            },
        };
        Ok(report)
    }
}

fn two_bytes(data: &[u8]) -> Result<(u8, u8)> {
    match data {
        [first, second, ..] => Ok((*first, *second)),
        _ => Err(FirmataError::malformed(format!(
            "expected 2 data bytes, got {}",
            data.len()
        ))),
    }
}
