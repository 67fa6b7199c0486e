//! High-level interface to the THORChain app.

use crate::apdu::{
    AddressMode, Command, Ins, CLA_APP_INFO, CLA_DEVICE_INFO, INS_APP_INFO, INS_DEVICE_INFO,
};
use crate::chunk::send_chunks;
use crate::errors::Result;
use crate::response::{
    parse_address, parse_app_info, parse_device_info, parse_public_key, parse_version, AddressInfo,
    AppInfo, DeviceInfo, PublicKeyInfo, SignResult, VersionInfo,
};
use crate::status::Status;
use crate::transport::Transport;
use crate::version::{Protocol, ProtocolVersion};
use tracing::{debug, trace_span};

/// Address prefix used when none is given.
pub const DEFAULT_HRP: &str = "thor";

/// Accepted statuses for commands that only succeed one way.
const OK: [u16; 1] = [0x9000];

/// A handle to the THORChain app, over some transport.
///
/// The device handles one command at a time. Every call takes `&mut self` and runs to
/// completion before returning, so a handle can't be used concurrently without the
/// caller arranging it (eg. behind a `Mutex`). Timeouts and cancellation are the
/// transport's business; nothing here retries.
#[derive(Debug)]
pub struct ThorchainApp<T: Transport> {
    transport: T,
    hrp: String,
}

impl<T: Transport> ThorchainApp<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            hrp: DEFAULT_HRP.into(),
        }
    }

    /// Sets the prefix used by [`Self::public_key`]. Validated when used.
    pub fn with_hrp<S: Into<String>>(mut self, hrp: S) -> Self {
        self.hrp = hrp.into();
        self
    }

    pub fn hrp(&self) -> &str {
        &self.hrp
    }

    pub fn transport(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Queries the app's version. Fails unless the app answers with success.
    pub fn get_version(&mut self) -> Result<VersionInfo> {
        let span = trace_span!("get_version");
        let _enter = span.enter();

        let rsp = self
            .transport
            .send(&Command::app(Ins::GetVersion, 0x00, vec![]), &OK)?;
        parse_version(&rsp)
    }

    /// Looks up the wire variant for the running app.
    fn protocol(&mut self) -> Result<&'static Protocol> {
        let version = self.get_version()?;
        let protocol = ProtocolVersion::from_major(version.major)?.protocol();
        debug!(major = version.major, variant = ?protocol.version, "Resolved protocol");
        Ok(protocol)
    }

    /// Asks the OS which app is running. Works both inside apps and from the dashboard.
    pub fn app_info(&mut self) -> Result<AppInfo> {
        let span = trace_span!("app_info");
        let _enter = span.enter();

        let cmd = Command::new(CLA_APP_INFO, INS_APP_INFO, 0x00, 0x00, vec![]);
        let rsp = self.transport.send(&cmd, &OK)?;
        parse_app_info(&rsp)
    }

    /// Asks the OS about the device. Only the dashboard answers; inside an app this
    /// returns [`DeviceInfo::DashboardOnly`].
    pub fn device_info(&mut self) -> Result<DeviceInfo> {
        let span = trace_span!("device_info");
        let _enter = span.enter();

        let cmd = Command::new(CLA_DEVICE_INFO, INS_DEVICE_INFO, 0x00, 0x00, vec![]);
        let rsp = self.transport.send(
            &cmd,
            &[Status::NoErrors.code(), Status::AppNotOpen.code()],
        )?;
        parse_device_info(&rsp)
    }

    /// Retrieves the compressed public key for a path, without confirmation.
    pub fn public_key(&mut self, path: &[u32]) -> Result<PublicKeyInfo> {
        let span = trace_span!("public_key", ?path);
        let _enter = span.enter();

        let protocol = self.protocol()?;
        let data = protocol.address_payload(path, &self.hrp)?;
        let cmd = Command::app(Ins::GetAddrSecp256k1, AddressMode::OnlyRetrieve.into(), data);
        let rsp = self.transport.send(&cmd, &OK)?;
        parse_public_key(&rsp)
    }

    fn address(&mut self, path: &[u32], hrp: &str, mode: AddressMode) -> Result<AddressInfo> {
        let protocol = self.protocol()?;
        let data = protocol.address_payload(path, hrp)?;
        let cmd = Command::app(Ins::GetAddrSecp256k1, mode.into(), data);
        let rsp = self.transport.send(&cmd, &OK)?;
        parse_address(&rsp)
    }

    /// Retrieves the public key and address for a path, without confirmation.
    pub fn get_address_and_pubkey(&mut self, path: &[u32], hrp: &str) -> Result<AddressInfo> {
        let span = trace_span!("get_address_and_pubkey", ?path, hrp);
        let _enter = span.enter();
        self.address(path, hrp, AddressMode::OnlyRetrieve)
    }

    /// Shows the address on the device and waits for the user to confirm it.
    pub fn show_address_and_pubkey(&mut self, path: &[u32], hrp: &str) -> Result<AddressInfo> {
        let span = trace_span!("show_address_and_pubkey", ?path, hrp);
        let _enter = span.enter();
        self.address(path, hrp, AddressMode::ShowAddressInDevice)
    }

    /// Signs a message with the key at `path`.
    ///
    /// A rejection by the app (bad data, bad key, verify failure) is returned as a
    /// [`SignResult`] without a signature; use [`SignResult::into_signature`] to turn it
    /// into an error.
    pub fn sign(&mut self, path: &[u32], message: &[u8]) -> Result<SignResult> {
        let span = trace_span!("sign", ?path, len = message.len());
        let _enter = span.enter();

        let protocol = self.protocol()?;
        let chunks = protocol.chunks(path, message)?;
        send_chunks(&mut self.transport, &chunks)
    }
}
