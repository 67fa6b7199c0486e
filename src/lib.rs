//! Client for the THORChain app on Ledger hardware wallets.
//!
//! Talks to the app over anything implementing [`Transport`]: fetches versions and
//! device information, derives addresses and public keys, and drives the chunked
//! signing protocol.

pub mod address;
pub mod apdu;
pub mod app;
pub mod chunk;
pub mod errors;
pub mod path;
pub mod response;
pub mod status;
pub mod transport;
pub mod version;

pub use crate::address::bech32_from_public_key;
pub use crate::apdu::{Command, Response};
pub use crate::app::{ThorchainApp, DEFAULT_HRP};
pub use crate::errors::{Error, ErrorKind, Result};
pub use crate::response::{
    AddressInfo, AppInfo, DeviceDetails, DeviceInfo, PublicKeyInfo, SignResult, VersionInfo,
};
pub use crate::status::{status_message, Status};
pub use crate::transport::{ApduTransport, Exchange, Transport, TransportError};
