//! The contract between the protocol engine and whatever moves bytes to the device.
//!
//! The engine never talks to USB/HID/BLE itself. It needs one primitive: send a
//! command, get the reply back, and fail if the reply's status isn't one the caller
//! declared it is prepared to interpret. [`Transport`] is that primitive.
//!
//! For byte pipes that only know how to exchange raw frames, [`ApduTransport`] does
//! the framing and status filtering on top of an [`Exchange`].
//!
//! Ledger devices are half-duplex and have no session multiplexing. Everything here
//! takes `&mut self`; sharing one handle between threads is up to the caller.

use crate::apdu::{Command, Response};
use tap::TapFallible;
use thiserror::Error;
use tracing::{trace, trace_span, warn};

#[derive(Debug, Error)]
pub enum TransportError {
    /// The reply carried a status the caller didn't list as acceptable.
    #[error("unexpected status {0:#06x}")]
    Status(u16),

    #[error("command data too long: {0} bytes (max {1})")]
    PayloadTooLong(usize, usize),

    #[error("reply too short: {0} byte(s)")]
    ShortReply(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub trait Transport {
    /// Sends a command, returns the full reply (status word included).
    ///
    /// Must fail with [`TransportError::Status`] if the reply's status word is not in
    /// `accepted`.
    fn send(&mut self, cmd: &Command, accepted: &[u16]) -> Result<Response, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, cmd: &Command, accepted: &[u16]) -> Result<Response, TransportError> {
        (**self).send(cmd, accepted)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, cmd: &Command, accepted: &[u16]) -> Result<Response, TransportError> {
        (**self).send(cmd, accepted)
    }
}

/// A raw frame exchange, eg. a HID channel that already handles Ledger's packet framing.
pub trait Exchange {
    fn exchange(&mut self, req: &[u8]) -> std::io::Result<Vec<u8>>;
}

/// Short-form command frames carry a single length byte.
pub const MAX_DATA_LEN: usize = u8::MAX as usize;

/// Frames a command as `CLA INS P1 P2 Lc DATA`. Ledger apps always expect Lc, even
/// when it's zero, and never take Le.
pub fn write_command(cmd: &Command) -> Result<Vec<u8>, TransportError> {
    let lc: u8 = cmd
        .data
        .len()
        .try_into()
        .map_err(|_| TransportError::PayloadTooLong(cmd.data.len(), MAX_DATA_LEN))?;
    let mut buf = Vec::with_capacity(5 + cmd.data.len());
    buf.extend_from_slice(&[cmd.cla, cmd.ins, cmd.p1, cmd.p2, lc]);
    buf.extend_from_slice(&cmd.data);
    Ok(buf)
}

/// [`Transport`] over a raw [`Exchange`].
#[derive(Debug)]
pub struct ApduTransport<E: Exchange> {
    pub inner: E,
}

impl<E: Exchange> ApduTransport<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<E: Exchange> Transport for ApduTransport<E> {
    fn send(&mut self, cmd: &Command, accepted: &[u16]) -> Result<Response, TransportError> {
        let span = trace_span!("send", cla = cmd.cla, ins = cmd.ins, p1 = cmd.p1);
        let _enter = span.enter();

        let req = write_command(cmd)?;
        trace!(req = %hex::encode(&req), ">> TX");

        let rsp = self
            .inner
            .exchange(&req)
            .tap_err(|err| warn!("exchange failed: {}", err))?;
        trace!(rsp = %hex::encode(&rsp), "<< RX");
        let len = rsp.len();
        let rsp: Response = rsp
            .try_into()
            .map_err(|_| TransportError::ShortReply(len))?;

        let status = rsp.status();
        if !accepted.contains(&status.code()) {
            warn!(%status, "device refused command");
            return Err(TransportError::Status(status.code()));
        }
        Ok(rsp)
    }
}
