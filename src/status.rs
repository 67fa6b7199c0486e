//! Status words returned by the THORChain app (and the Ledger dashboard).
//!
//! Every reply ends with a big-endian status word. Ledger apps reuse a handful of
//! ISO 7816 codes, add a few of their own, and the U2F transport layer reports its
//! failures as tiny integers in the same space.

use num_enum::{FromPrimitive, IntoPrimitive};
use std::fmt;

/// A device status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum Status {
    U2fUnknown = 0x0001,
    U2fBadRequest = 0x0002,
    U2fConfigurationUnsupported = 0x0003,
    U2fDeviceIneligible = 0x0004,
    U2fTimeout = 0x0005,
    Timeout = 0x000E,

    /// 0x9000: The only success value.
    NoErrors = 0x9000,
    /// 0x9001: Also used locally when the app info reply has an unknown format.
    DeviceBusy = 0x9001,

    DerivingKeys = 0x6802,
    ExecutionError = 0x6400,
    WrongLength = 0x6700,
    EmptyBuffer = 0x6982,
    OutputBufferTooSmall = 0x6983,
    DataInvalid = 0x6984,
    ConditionsNotSatisfied = 0x6985,
    TransactionRejected = 0x6986,
    BadKeyHandle = 0x6A80,
    InvalidP1P2 = 0x6B00,
    InstructionNotSupported = 0x6D00,
    /// 0x6E00: Wrong CLA. From the dashboard this means no app is open.
    AppNotOpen = 0x6E00,
    UnknownError = 0x6F00,
    SignVerifyError = 0x6F01,

    /// Anything not in the table above.
    #[num_enum(catch_all)]
    Unknown(u16) = 0xFFFF,
}

impl Status {
    /// Builds a status from the two trailing bytes of a reply.
    pub fn from_sw(sw1: u8, sw2: u8) -> Self {
        u16::from_be_bytes([sw1, sw2]).into()
    }

    pub fn code(self) -> u16 {
        self.into()
    }

    pub fn is_ok(self) -> bool {
        self == Self::NoErrors
    }

    /// Human-readable text for the status. Never fails; unknown codes carry the raw value.
    pub fn message(self) -> String {
        match self {
            Self::U2fUnknown => "U2F: Unknown",
            Self::U2fBadRequest => "U2F: Bad request",
            Self::U2fConfigurationUnsupported => "U2F: Configuration unsupported",
            Self::U2fDeviceIneligible => "U2F: Device Ineligible",
            Self::U2fTimeout => "U2F: Timeout",
            Self::Timeout => "Timeout",
            Self::NoErrors => "No errors",
            Self::DeviceBusy => "Device is busy",
            Self::DerivingKeys => "Error deriving keys",
            Self::ExecutionError => "Execution Error",
            Self::WrongLength => "Wrong Length",
            Self::EmptyBuffer => "Empty Buffer",
            Self::OutputBufferTooSmall => "Output buffer too small",
            Self::DataInvalid => "Data is invalid",
            Self::ConditionsNotSatisfied => "Conditions not satisfied",
            Self::TransactionRejected => "Transaction rejected",
            Self::BadKeyHandle => "Bad key handle",
            Self::InvalidP1P2 => "Invalid P1/P2",
            Self::InstructionNotSupported => "Instruction not supported",
            Self::AppNotOpen => "App does not seem to be open",
            Self::UnknownError => "Unknown error",
            Self::SignVerifyError => "Sign/verify error",
            Self::Unknown(code) => return format!("Unknown Status Code: {:#06x}", code),
        }
        .into()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Translates a raw status code into its message.
pub fn status_message(code: u16) -> String {
    Status::from(code).message()
}
