//! Wire-level command registry, and the raw command/response value types.

use crate::errors::{Error, Result};
use crate::status::Status;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Class byte of the THORChain app.
pub const CLA: u8 = 0x55;

/// Class and instruction of the dashboard's "app info" query.
pub const CLA_APP_INFO: u8 = 0xB0;
pub const INS_APP_INFO: u8 = 0x01;

/// Class and instruction of the dashboard's "device info" query.
pub const CLA_DEVICE_INFO: u8 = 0xE0;
pub const INS_DEVICE_INFO: u8 = 0x01;

/// Instructions understood by the THORChain app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Ins {
    GetVersion = 0x00,
    SignSecp256k1 = 0x02,
    GetAddrSecp256k1 = 0x04,
}

/// P1 for address queries: return silently, or make the user confirm it on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum AddressMode {
    OnlyRetrieve = 0x00,
    ShowAddressInDevice = 0x01,
}

/// A command APDU. Built per call, never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

impl Command {
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8, data: Vec<u8>) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data,
        }
    }

    /// A command addressed to the THORChain app.
    pub fn app(ins: Ins, p1: u8, data: Vec<u8>) -> Self {
        Self::new(CLA, ins.into(), p1, 0x00, data)
    }
}

/// A raw reply: payload followed by a big-endian status word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    raw: Vec<u8>,
}

impl Response {
    /// The full reply, status word included.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Everything before the status word.
    pub fn data(&self) -> &[u8] {
        &self.raw[..self.raw.len() - 2]
    }

    pub fn status(&self) -> Status {
        let l = self.raw.len();
        Status::from_sw(self.raw[l - 2], self.raw[l - 1])
    }
}

impl TryFrom<Vec<u8>> for Response {
    type Error = Error;

    fn try_from(raw: Vec<u8>) -> Result<Self> {
        if raw.len() < 2 {
            return Err(Error::MalformedResponse(format!(
                "no status word in {:02X?}",
                raw
            )));
        }
        Ok(Self { raw })
    }
}

impl TryFrom<&[u8]> for Response {
    type Error = Error;

    fn try_from(raw: &[u8]) -> Result<Self> {
        raw.to_vec().try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_command() {
        assert_eq!(
            Command::app(Ins::GetAddrSecp256k1, AddressMode::ShowAddressInDevice.into(), vec![0x01]),
            Command::new(0x55, 0x04, 0x01, 0x00, vec![0x01]),
        );
    }

    #[test]
    fn test_response_split() -> Result<()> {
        let rsp = Response::try_from(&[0x12, 0x34, 0x56, 0x78, 0x90, 0x00][..])?;
        assert_eq!(rsp.data(), &[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(rsp.status(), Status::NoErrors);
        assert_eq!(rsp.raw().len(), 6);
        Ok(())
    }

    #[test]
    fn test_response_status_only() -> Result<()> {
        let rsp = Response::try_from(vec![0x6E, 0x00])?;
        assert_eq!(rsp.data(), &[] as &[u8]);
        assert_eq!(rsp.status(), Status::AppNotOpen);
        Ok(())
    }

    #[test]
    fn test_response_truncated() {
        match Response::try_from(vec![0x90]).unwrap_err() {
            Error::MalformedResponse(_) => {}
            v => panic!("wrong error: {}", v),
        }
    }
}
