//! Mapping between frame kinds and the HDLC control field (modulo-8 format).
//!
//! ```text
//!   bit:  7 6 5   4   3 2   1   0
//! I-frame N(R)   P/F  N(S)      0
//! S-frame N(R)   P/F  S S   0   1
//! U-frame M M M  P/F  M M   1   1
//! ```
//!
//! DATA frames are sent as I-frames, ACKs as receive-ready (RR) and NACKs as
//! selective-reject (SREJ) supervisory frames. Unnumbered frames are not
//! supported.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use super::{FrameKind, SeqNo};


const POLL_FINAL: u8 = 0x10;

const FORMAT_MASK_I: u8 = 0x01;
const FORMAT_MASK_SU: u8 = 0x03;
const FORMAT_S: u8 = 0x01;

const SEND_SEQ_SHIFT: u8 = 1;
const RECV_SEQ_SHIFT: u8 = 5;
const SUPERVISORY_SHIFT: u8 = 2;


#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
pub enum Supervisory {
    ReceiveReady = 0,
    ReceiveNotReady = 1,
    Reject = 2,
    SelectiveReject = 3,
}


pub fn encode(kind: FrameKind, seq: SeqNo) -> u8 {
    match kind {
        FrameKind::Data => (seq.value() << SEND_SEQ_SHIFT) | POLL_FINAL,
        FrameKind::Ack => supervisory(Supervisory::ReceiveReady, seq),
        FrameKind::Nack => supervisory(Supervisory::SelectiveReject, seq),
    }
}

fn supervisory(function: Supervisory, seq: SeqNo) -> u8 {
    let function: u8 = function.into();
    FORMAT_S | (function << SUPERVISORY_SHIFT) | (seq.value() << RECV_SEQ_SHIFT)
}

/// Decode a control byte into frame kind and sequence number.
///
/// Returns `None` for frame types not used by the link (receive-not-ready
/// and all unnumbered frames).
pub fn decode(control: u8) -> Option<(FrameKind, SeqNo)> {
    if control & FORMAT_MASK_I == 0 {
        return Some((FrameKind::Data, SeqNo::new(control >> SEND_SEQ_SHIFT)));
    }

    if control & FORMAT_MASK_SU != FORMAT_S {
        return None;
    }

    let seq = SeqNo::new(control >> RECV_SEQ_SHIFT);

    match Supervisory::try_from((control >> SUPERVISORY_SHIFT) & 0x03).ok()? {
        Supervisory::ReceiveReady => Some((FrameKind::Ack, seq)),
        Supervisory::Reject | Supervisory::SelectiveReject => Some((FrameKind::Nack, seq)),
        Supervisory::ReceiveNotReady => None,
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(encode(FrameKind::Data, SeqNo::new(0)), 0x10);
        assert_eq!(encode(FrameKind::Data, SeqNo::new(3)), 0x16);
        assert_eq!(encode(FrameKind::Data, SeqNo::new(7)), 0x1E);

        assert_eq!(encode(FrameKind::Ack, SeqNo::new(0)), 0x01);
        assert_eq!(encode(FrameKind::Ack, SeqNo::new(5)), 0xA1);

        assert_eq!(encode(FrameKind::Nack, SeqNo::new(0)), 0x0D);
        assert_eq!(encode(FrameKind::Nack, SeqNo::new(2)), 0x4D);
    }

    #[test]
    fn test_decode() {
        for seq in 0..SeqNo::MODULUS {
            let seq = SeqNo::new(seq);

            for kind in [FrameKind::Data, FrameKind::Ack, FrameKind::Nack] {
                assert_eq!(decode(encode(kind, seq)), Some((kind, seq)));
            }
        }

        // I-frame without poll bit, N(R) ignored
        assert_eq!(decode(0xE4), Some((FrameKind::Data, SeqNo::new(2))));

        // reject is treated like selective reject
        assert_eq!(decode(0x29), Some((FrameKind::Nack, SeqNo::new(1))));

        // receive-not-ready and unnumbered frames are not supported
        assert_eq!(decode(0x05), None);
        assert_eq!(decode(0x03), None);
        assert_eq!(decode(0x93), None);
    }
}
