//! Chunked transfer of messages too large for a single command.
//!
//! A signing request is a serialized path followed by the message, split into pieces
//! of at most [`CHUNK_SIZE`] bytes. Each piece goes out as its own SIGN command, with
//! P1 telling the app where in the sequence it is. The app reassembles them in order.

use crate::apdu::{Command, Ins};
use crate::errors::{Error, Result};
use crate::path::{serialize_path, SERIALIZED_PATH_LEN};
use crate::response::{parse_sign, SignResult, SIGN_REJECTIONS};
use crate::status::Status;
use crate::transport::Transport;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use tracing::{debug, trace_span, warn};

/// Maximum message bytes per command; keeps every command under the APDU size limit.
pub const CHUNK_SIZE: usize = 150;

/// Position of a chunk in a transfer, sent as P1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum PayloadType {
    Init = 0x00,
    Add = 0x01,
    Last = 0x02,
}

impl PayloadType {
    /// Marker for the 1-based chunk `index` out of `total`.
    ///
    /// INIT is checked before LAST, so a transfer of a single chunk is sent as INIT.
    /// Deployed firmware has always seen it this way; don't reorder.
    pub fn for_chunk(index: usize, total: usize) -> Self {
        if index == 1 {
            Self::Init
        } else if index == total {
            Self::Last
        } else {
            Self::Add
        }
    }
}

/// Statuses a message chunk may come back with without the transport failing.
pub fn sign_accepted() -> Vec<u16> {
    std::iter::once(Status::NoErrors)
        .chain(SIGN_REJECTIONS)
        .map(Status::code)
        .collect()
}

/// The chunks of a single signing request: the serialized path, then the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSet {
    chunks: Vec<Vec<u8>>,
}

impl ChunkSet {
    pub fn new(path: &[u8], message: &[u8], chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidArgument("chunk size must be non-zero".into()));
        }

        let mut chunks = Vec::with_capacity(1 + message.len().div_ceil(chunk_size));
        chunks.push(path.to_vec());
        chunks.extend(message.chunks(chunk_size).map(<[u8]>::to_vec));
        Ok(Self { chunks })
    }

    /// Total number of chunks, the path included.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn path(&self) -> &[u8] {
        &self.chunks[0]
    }

    /// Message chunks, in order.
    pub fn payload(&self) -> &[Vec<u8>] {
        &self.chunks[1..]
    }
}

/// Splits a message for a path using the default chunk size.
pub fn build_chunks(path: &[u32], message: &[u8]) -> Result<ChunkSet> {
    let path: [u8; SERIALIZED_PATH_LEN] = serialize_path(path)?;
    ChunkSet::new(&path, message, CHUNK_SIZE)
}

/// Sends a single chunk; `index` is 1-based.
pub fn send_chunk<T: Transport>(
    transport: &mut T,
    index: usize,
    total: usize,
    chunk: &[u8],
    accepted: &[u16],
) -> Result<SignResult> {
    let payload_type = PayloadType::for_chunk(index, total);
    debug!(index, total, ?payload_type, len = chunk.len(), "Sending chunk");

    let cmd = Command::app(Ins::SignSecp256k1, payload_type.into(), chunk.to_vec());
    let rsp = transport.send(&cmd, accepted)?;
    Ok(parse_sign(&rsp))
}

/// Sends a whole chunk set, stopping at the first chunk that doesn't come back OK.
///
/// The returned result is the last one received; it only carries a signature if every
/// chunk was accepted.
pub fn send_chunks<T: Transport>(transport: &mut T, chunks: &ChunkSet) -> Result<SignResult> {
    let span = trace_span!("send_chunks", total = chunks.len());
    let _enter = span.enter();

    let total = chunks.len();
    let accepted = sign_accepted();
    let mut result = send_chunk(
        transport,
        1,
        total,
        chunks.path(),
        &[Status::NoErrors.code()],
    )?;

    for (i, chunk) in chunks.payload().iter().enumerate() {
        result = send_chunk(transport, i + 2, total, chunk, &accepted)?;
        if !result.is_ok() {
            warn!(index = i + 2, status = %result.status, message = %result.error_message, "Chunk rejected");
            break;
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::transport::testing::Script;

    #[test]
    fn test_payload_type() {
        assert_eq!(PayloadType::for_chunk(1, 1), PayloadType::Init);

        let markers: Vec<_> = (1..=5).map(|i| PayloadType::for_chunk(i, 5)).collect();
        assert_eq!(
            markers,
            vec![
                PayloadType::Init,
                PayloadType::Add,
                PayloadType::Add,
                PayloadType::Add,
                PayloadType::Last,
            ]
        );

        assert_eq!(PayloadType::for_chunk(2, 2), PayloadType::Last);
        assert_eq!(u8::from(PayloadType::Last), 0x02);
    }

    #[test]
    fn test_build_chunks() -> Result<()> {
        let message: Vec<u8> = (0..400).map(|i| i as u8).collect();
        let chunks = build_chunks(&[44, 931, 0, 0, 0], &message)?;

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks.path().len(), SERIALIZED_PATH_LEN);
        assert_eq!(
            chunks.payload().iter().map(Vec::len).collect::<Vec<_>>(),
            vec![150, 150, 100]
        );
        assert_eq!(chunks.payload().concat(), message);
        Ok(())
    }

    #[test]
    fn test_build_chunks_counts() -> Result<()> {
        for len in [0, 1, 149, 150, 151, 300, 301, 1000] {
            let message = vec![0xAB; len];
            let chunks = build_chunks(&[44, 931, 0, 0, 0], &message)?;
            assert_eq!(chunks.len(), 1 + len.div_ceil(CHUNK_SIZE), "len={}", len);
            assert!(chunks.payload().iter().all(|c| !c.is_empty() && c.len() <= CHUNK_SIZE));
            assert_eq!(chunks.payload().concat(), message);
        }
        Ok(())
    }

    #[test]
    fn test_sign_accepted() {
        assert_eq!(sign_accepted(), vec![0x9000, 0x6984, 0x6A80, 0x6F01]);
    }

    #[test]
    fn test_chunk_set_zero_size() {
        let err = ChunkSet::new(&[0; SERIALIZED_PATH_LEN], b"abc", 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_build_chunks_bad_path() {
        assert!(build_chunks(&[44, 931, 0], b"hello").is_err());
    }

    #[test]
    fn test_send_chunks() -> Result<()> {
        let message = vec![0x11; 400];
        let chunks = build_chunks(&[44, 931, 0, 0, 0], &message)?;
        let mut device = Script::new(vec![
            vec![0x90, 0x00],
            vec![0x90, 0x00],
            vec![0x90, 0x00],
            vec![0x30, 0x45, 0x02, 0x21, 0x90, 0x00],
        ]);

        let result = send_chunks(&mut device, &chunks)?;
        assert_eq!(result.status, Status::NoErrors);
        assert_eq!(result.signature, Some(vec![0x30, 0x45, 0x02, 0x21]));

        let p1s: Vec<u8> = device.sent.iter().map(|c| c.p1).collect();
        assert_eq!(p1s, vec![0x00, 0x01, 0x01, 0x02]);
        assert!(device.sent.iter().all(|c| c.cla == 0x55 && c.ins == 0x02));
        assert_eq!(device.sent[0].data, chunks.path());
        assert_eq!(device.sent[3].data.len(), 100);
        Ok(())
    }

    #[test]
    fn test_send_chunks_stops_on_rejection() -> Result<()> {
        let chunks = build_chunks(&[44, 931, 0, 0, 0], &[0x11; 400])?;
        let mut rejection = b"bad fee".to_vec();
        rejection.extend_from_slice(&[0x69, 0x84]);
        let mut device = Script::new(vec![vec![0x90, 0x00], vec![0x90, 0x00], rejection]);

        let result = send_chunks(&mut device, &chunks)?;
        assert_eq!(result.status, Status::DataInvalid);
        assert_eq!(result.error_message, "Data is invalid : bad fee");
        assert_eq!(result.signature, None);
        assert_eq!(device.sent.len(), 3);
        Ok(())
    }

    #[test]
    fn test_send_chunks_stops_on_verify_error() -> Result<()> {
        let chunks = build_chunks(&[44, 931, 0, 0, 0], &[0x11; 400])?;
        let mut rejection = b"verify".to_vec();
        rejection.extend_from_slice(&[0x6F, 0x01]);
        let mut device = Script::new(vec![vec![0x90, 0x00], rejection]);

        let result = send_chunks(&mut device, &chunks)?;
        assert_eq!(result.status, Status::SignVerifyError);
        assert_eq!(result.error_message, "Sign/verify error : verify");
        assert_eq!(result.signature, None);
        assert_eq!(device.sent.len(), 2);
        assert_eq!(device.sent[1].p1, u8::from(PayloadType::Add));
        Ok(())
    }

    #[test]
    fn test_send_chunks_path_rejected() -> Result<()> {
        let chunks = build_chunks(&[44, 931, 0, 0, 0], &[0x11; 10])?;
        let mut device = Script::new(vec![vec![0x6A, 0x80]]);

        // Only success is acceptable for the path chunk.
        let err = send_chunks(&mut device, &chunks).unwrap_err();
        assert_eq!(err.status(), Some(Status::BadKeyHandle));
        assert_eq!(device.sent.len(), 1);
        Ok(())
    }

    #[test]
    fn test_send_chunks_unexpected_status() -> Result<()> {
        let chunks = build_chunks(&[44, 931, 0, 0, 0], &[0x11; 10])?;
        let mut device = Script::new(vec![vec![0x90, 0x00], vec![0x69, 0x86]]);

        let err = send_chunks(&mut device, &chunks).unwrap_err();
        assert_eq!(err.status(), Some(Status::TransactionRejected));
        Ok(())
    }
}
