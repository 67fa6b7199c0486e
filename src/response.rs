//! Decoders for the app's (and the dashboard's) reply bodies.
//!
//! Bodies are fixed-offset fields followed by single-byte length-prefixed strings. The
//! status word is never part of a body; decoders read [`Response::data`], except where
//! a firmware quirk requires looking at the raw reply.

use crate::apdu::Response;
use crate::errors::{Error, Result};
use crate::status::Status;
use nom::bytes::complete::take;
use nom::multi::length_data;
use nom::number::complete::{be_u32, be_u8};
use nom::sequence::tuple;
use tracing::{debug, warn};

pub type IResult<'a, T> = nom::IResult<&'a [u8], T>;

/// Length of a SEC1 compressed secp256k1 public key.
pub const PK_LEN: usize = 33;

fn lp_string(data: &[u8]) -> IResult<String> {
    let (data, raw) = length_data(be_u8)(data)?;
    Ok((data, String::from_utf8_lossy(raw).into()))
}

/// Version of the running app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub status: Status,
    pub test_mode: bool,
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    pub device_locked: bool,
    /// Zero if the app didn't report one.
    pub target_id: u32,
}

impl VersionInfo {
    pub fn target_id_hex(&self) -> String {
        format!("{:x}", self.target_id)
    }
}

/// Decodes a GET_VERSION reply. Anything but success is fatal here.
pub fn parse_version(rsp: &Response) -> Result<VersionInfo> {
    let status = rsp.status();
    if !status.is_ok() {
        return Err(Error::device(status));
    }

    let (_, (test_mode, major, minor, patch, device_locked)) =
        tuple((be_u8, be_u8, be_u8, be_u8, be_u8))(rsp.data())?;

    // The target ID is read from the raw reply whenever it's at least 9 bytes long,
    // status word included. Old apps that send a short body get bytes of the status
    // word mixed in; that's what they've always been decoded as, so keep it.
    let raw = rsp.raw();
    let target_id = if raw.len() >= 9 {
        be_u32(&raw[5..])?.1
    } else {
        0
    };

    let info = VersionInfo {
        status,
        test_mode: test_mode != 0,
        major,
        minor,
        patch,
        device_locked: device_locked == 1,
        target_id,
    };
    debug!(?info, "Decoded version");
    Ok(info)
}

/// Information about the currently running app, as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub status: Status,
    pub app_name: String,
    pub app_version: String,
    pub flag_len: u8,
    pub flags_value: u8,
}

impl AppInfo {
    pub const FLAG_RECOVERY: u8 = 1 << 0;
    pub const FLAG_SIGNED_MCU_CODE: u8 = 1 << 1;
    pub const FLAG_ONBOARDED: u8 = 1 << 2;
    pub const FLAG_PIN_VALIDATED: u8 = 1 << 7;

    pub fn flag_recovery(&self) -> bool {
        self.flags_value & Self::FLAG_RECOVERY != 0
    }

    pub fn flag_signed_mcu_code(&self) -> bool {
        self.flags_value & Self::FLAG_SIGNED_MCU_CODE != 0
    }

    pub fn flag_onboarded(&self) -> bool {
        self.flags_value & Self::FLAG_ONBOARDED != 0
    }

    pub fn flag_pin_validated(&self) -> bool {
        self.flags_value & Self::FLAG_PIN_VALIDATED != 0
    }
}

/// Reply format byte of the OS's app info command. Nothing else has ever been specified.
pub const APP_INFO_FORMAT: u8 = 1;

pub fn parse_app_info(rsp: &Response) -> Result<AppInfo> {
    let (data, format) = be_u8(rsp.data())?;
    if format != APP_INFO_FORMAT {
        warn!(format, "Unrecognized app info format");
        return Err(Error::Device {
            status: Status::DeviceBusy,
            message: "response format ID not recognized".into(),
        });
    }

    let (data, app_name) = lp_string(data)?;
    let (data, app_version) = lp_string(data)?;
    let (_, (flag_len, flags_value)) = tuple((be_u8, be_u8))(data)?;

    let info = AppInfo {
        status: rsp.status(),
        app_name,
        app_version,
        flag_len,
        flags_value,
    };
    debug!(?info, "Decoded app info");
    Ok(info)
}

/// Device information, only available from the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceInfo {
    /// An app is open; the query only works from the dashboard. Not an error.
    DashboardOnly,
    Available(DeviceDetails),
}

impl DeviceInfo {
    pub const DASHBOARD_ONLY_MESSAGE: &'static str =
        "This command is only available in the Dashboard";

    pub fn status(&self) -> Status {
        match self {
            Self::DashboardOnly => Status::AppNotOpen,
            Self::Available(_) => Status::NoErrors,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::DashboardOnly => Self::DASHBOARD_ONLY_MESSAGE.into(),
            Self::Available(_) => Status::NoErrors.message(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDetails {
    /// Hex-encoded.
    pub target_id: String,
    pub se_version: String,
    /// Hex-encoded.
    pub flag: String,
    pub mcu_version: String,
}

pub fn parse_device_info(rsp: &Response) -> Result<DeviceInfo> {
    if rsp.status() == Status::AppNotOpen {
        debug!("Device info requested outside the dashboard");
        return Ok(DeviceInfo::DashboardOnly);
    }

    let (data, target_id) = take(4usize)(rsp.data())?;
    let (data, se_version) = lp_string(data)?;
    let (data, flag) = length_data(be_u8)(data)?;
    let (_, mcu_version) = length_data(be_u8)(data)?;

    // MCU firmware reports its version with a trailing NUL.
    let mcu_version = match mcu_version.split_last() {
        Some((0, rest)) => rest,
        _ => mcu_version,
    };

    let details = DeviceDetails {
        target_id: hex::encode(target_id),
        se_version,
        flag: hex::encode(flag),
        mcu_version: String::from_utf8_lossy(mcu_version).into(),
    };
    debug!(?details, "Decoded device info");
    Ok(DeviceInfo::Available(details))
}

/// A compressed public key, without an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyInfo {
    pub status: Status,
    pub compressed_pk: [u8; PK_LEN],
}

/// A compressed public key and the bech32 address the app derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressInfo {
    pub status: Status,
    pub compressed_pk: [u8; PK_LEN],
    pub bech32_address: String,
}

fn parse_pk(data: &[u8]) -> IResult<[u8; PK_LEN]> {
    let (data, raw) = take(PK_LEN)(data)?;
    let mut pk = [0; PK_LEN];
    pk.copy_from_slice(raw);
    Ok((data, pk))
}

pub fn parse_public_key(rsp: &Response) -> Result<PublicKeyInfo> {
    let (_, compressed_pk) = parse_pk(rsp.data())?;
    Ok(PublicKeyInfo {
        status: rsp.status(),
        compressed_pk,
    })
}

pub fn parse_address(rsp: &Response) -> Result<AddressInfo> {
    let (address, compressed_pk) = parse_pk(rsp.data())?;
    let info = AddressInfo {
        status: rsp.status(),
        compressed_pk,
        bech32_address: String::from_utf8_lossy(address).into(),
    };
    debug!(address = %info.bech32_address, "Decoded address");
    Ok(info)
}

/// The outcome of one signing chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignResult {
    pub status: Status,
    pub error_message: String,
    /// Only set by a successful reply that carried data, ie. the last chunk.
    pub signature: Option<Vec<u8>>,
}

impl SignResult {
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// The signature, or the device error that prevented it.
    pub fn into_signature(self) -> Result<Vec<u8>> {
        match (self.status, self.signature) {
            (Status::NoErrors, Some(signature)) => Ok(signature),
            (Status::NoErrors, None) => Err(Error::MalformedResponse(
                "signing finished without a signature".into(),
            )),
            (status, _) => Err(Error::Device {
                status,
                message: self.error_message,
            }),
        }
    }
}

/// Statuses the app uses to reject a signing chunk, with an ASCII explanation as payload.
pub const SIGN_REJECTIONS: [Status; 3] = [
    Status::DataInvalid,
    Status::BadKeyHandle,
    Status::SignVerifyError,
];

pub fn parse_sign(rsp: &Response) -> SignResult {
    let status = rsp.status();
    let data = rsp.data();

    let mut error_message = status.message();
    if SIGN_REJECTIONS.contains(&status) && !data.is_empty() {
        error_message = format!("{} : {}", error_message, String::from_utf8_lossy(data));
    }

    let signature = if status.is_ok() && !data.is_empty() {
        Some(data.to_vec())
    } else {
        None
    };

    SignResult {
        status,
        error_message,
        signature,
    }
}
