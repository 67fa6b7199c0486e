use crate::status::Status;
use crate::transport::TransportError;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected before anything was sent to the device.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid HRP: length must be between 3 and 83, got {0}")]
    HRPInvalid(usize),

    /// The byte pipe itself failed.
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    #[error("app version {0} is not supported")]
    UnsupportedVersion(u8),

    /// The device answered with a status we treat as a failure.
    #[error("{message} ({:#06x})", .status.code())]
    Device { status: Status, message: String },

    /// The reply was too short for what its status promised.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("bech32: {0}")]
    Bech32(#[from] bech32::Error),
}

/// Closed taxonomy of failures, independent of the context each error carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    HRPInvalid,
    TransportFailure,
    UnsupportedVersion,
    DeviceBusyOrUnrecognizedFormat,
    BadKeyHandle,
    DataInvalid,
    SignVerifyError,
    /// A named device status without a dedicated kind, eg. a rejected transaction.
    DeviceStatus,
    UnknownDeviceStatus,
    MalformedResponse,
}

impl Error {
    /// A device error carrying the translated status message.
    pub fn device(status: Status) -> Self {
        Self::Device {
            status,
            message: status.message(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::Bech32(_) => ErrorKind::InvalidArgument,
            Self::HRPInvalid(_) => ErrorKind::HRPInvalid,
            Self::Transport(_) => ErrorKind::TransportFailure,
            Self::UnsupportedVersion(_) => ErrorKind::UnsupportedVersion,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::Device { status, .. } => match status {
                Status::DeviceBusy => ErrorKind::DeviceBusyOrUnrecognizedFormat,
                Status::BadKeyHandle => ErrorKind::BadKeyHandle,
                Status::DataInvalid => ErrorKind::DataInvalid,
                Status::SignVerifyError => ErrorKind::SignVerifyError,
                Status::Unknown(_) => ErrorKind::UnknownDeviceStatus,
                _ => ErrorKind::DeviceStatus,
            },
        }
    }

    /// The device status behind this error, if the device produced one.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Device { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            // The adapter refused a status we didn't declare as acceptable.
            TransportError::Status(code) => Self::device(code.into()),
            err => Self::Transport(err),
        }
    }
}

impl<'a> From<nom::Err<nom::error::Error<&'a [u8]>>> for Error {
    fn from(err: nom::Err<nom::error::Error<&'a [u8]>>) -> Self {
        match err {
            nom::Err::Incomplete(needed) => Self::MalformedResponse(format!("{:?}", needed)),
            nom::Err::Error(e) | nom::Err::Failure(e) => Self::MalformedResponse(format!(
                "{:?} with {} byte(s) left",
                e.code,
                e.input.len()
            )),
        }
    }
}
