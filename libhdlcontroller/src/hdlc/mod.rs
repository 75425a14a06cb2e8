//! High-level Data Link Control (HDLC) framing.
//!
//! Frames are delimited by flag bytes, byte-stuffed, and protected by a
//! 16-bit frame check sequence. Only the subset needed for a stop-and-wait
//! link is supported: information frames carrying data, and receive-ready /
//! selective-reject supervisory frames acting as ACK / NACK.

pub mod codec;
pub mod consts;
pub mod control;
pub mod crc;
pub mod decoder;
pub mod encoder;

pub use codec::Codec;

use bytes::{Bytes, BytesMut};


/// Sequence number of the 3-bit HDLC sequence field.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeqNo(u8);

impl SeqNo {
    pub const MODULUS: u8 = 8;
    pub const ZERO: SeqNo = SeqNo(0);

    pub const fn new(value: u8) -> Self {
        Self(value % Self::MODULUS)
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    pub const fn next(self) -> Self {
        Self::new(self.0 + 1)
    }
}

impl From<u8> for SeqNo {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<SeqNo> for u8 {
    fn from(value: SeqNo) -> Self {
        value.0
    }
}

impl std::fmt::Display for SeqNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Data,
    Ack,
    Nack,
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameKind::Data => write!(f, "DATA"),
            FrameKind::Ack => write!(f, "ACK"),
            FrameKind::Nack => write!(f, "NACK"),
        }
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub seq: SeqNo,
    pub data: Bytes,
}

impl Frame {
    pub fn data(seq: SeqNo, data: impl Into<Bytes>) -> Self {
        Self { kind: FrameKind::Data, seq, data: data.into() }
    }

    pub fn ack(seq: SeqNo) -> Self {
        Self { kind: FrameKind::Ack, seq, data: Bytes::new() }
    }

    pub fn nack(seq: SeqNo) -> Self {
        Self { kind: FrameKind::Nack, seq, data: Bytes::new() }
    }
}


/// Extract all complete frames currently available in `buf`.
///
/// Malformed input is reported in-line and skipped. Bytes of a frame that is
/// still arriving are kept by the decoder until the next call.
pub fn decode_frames(dec: &mut decoder::Decoder, buf: &mut BytesMut) -> Vec<Result<Frame, decoder::Error>> {
    let mut frames = Vec::new();

    while !buf.is_empty() {
        match dec.process(buf) {
            Ok(Some(frame)) => frames.push(Ok(frame)),
            Ok(None) => break,
            Err(e) => frames.push(Err(e)),
        }
    }

    frames
}
