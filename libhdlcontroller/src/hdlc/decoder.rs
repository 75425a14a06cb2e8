use bytes::{Buf, Bytes, BytesMut};

use super::consts;
use super::control;
use super::crc;
use super::Frame;


#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unexpected data outside of frame")]
    UnexpectedData,
    #[error("frame ended inside escape sequence")]
    UnexpectedEndOfFrame,
    #[error("invalid escape sequence")]
    InvalidEncoding,
    #[error("frame too short")]
    InvalidFrame,
    #[error("frame check sequence mismatch")]
    InvalidChecksum {
        /// Raw control byte of the rejected frame.
        control: u8,
    },
    #[error("unsupported control field 0x{0:02x}")]
    InvalidControl(u8),
    #[error("frame exceeds buffer size")]
    BufferOverflow,
}


#[derive(Debug)]
pub struct Decoder {
    buf: Vec<u8>,
    max_frame_size: usize,
    state: (State, EscState),
    current_frame_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Discard,
    Frame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EscState {
    Normal,
    Escape,
}

impl Decoder {
    pub fn new() -> Self {
        Self::with_capacity(4096)
    }

    /// Create a decoder accepting frames of up to `cap` bytes between flags
    /// (after unescaping, including address, control, and FCS). The buffer
    /// grows on demand.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_frame_size: cap,
            state: (State::Discard, EscState::Normal),
            current_frame_size: 0,
        }
    }

    pub fn process(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, Error> {
        if buf.is_empty() {
            return Ok(None);
        }

        loop {
            match self.state.0 {
                State::Discard => {
                    // try to find the start of this frame
                    match find_frame_start(buf) {
                        // expected: immediate start of frame
                        Some(0) => {
                            self.state.0 = State::Frame;
                            buf.advance(1);
                        },
                        // unexpected: n bytes before start of frame
                        Some(n) => {
                            self.state.0 = State::Frame;
                            buf.advance(n + 1);
                            return Err(Error::UnexpectedData);
                        },
                        // unexpected: unknown amount of bytes before start of frame
                        None => {
                            // check whether the last byte might indicate a start
                            let n = if buf.last() == Some(&consts::flags::FRAME) {
                                buf.len() - 1
                            } else {
                                buf.len()
                            };

                            // a lone flag: wait for the next byte
                            if n == 0 {
                                return Ok(None);
                            }

                            buf.advance(n);
                            return Err(Error::UnexpectedData);
                        },
                    }
                },
                State::Frame => {
                    // copy and decode to internal buffer
                    for (i, b) in buf.iter().copied().enumerate() {
                        match (b, self.state.1) {
                            (consts::flags::ESCAPE, EscState::Normal) => {
                                self.state.1 = EscState::Escape;
                            },
                            (consts::flags::ESCAPE, EscState::Escape) => {
                                buf.advance(i + 1);
                                self.reset();

                                return Err(Error::InvalidEncoding);
                            },
                            (consts::flags::FRAME, EscState::Normal) => {
                                // repeated flags are idle fill
                                if self.current_frame_size == 0 {
                                    continue;
                                }

                                buf.advance(i + 1);

                                return self.decode_buffered();
                            },
                            (consts::flags::FRAME, EscState::Escape) => {
                                buf.advance(i);
                                self.reset();

                                return Err(Error::UnexpectedEndOfFrame);
                            },
                            (b, EscState::Normal) => {
                                self.push_byte(b);
                            },
                            (b, EscState::Escape) => {
                                self.push_byte(b ^ consts::escape::MASK);
                                self.state.1 = EscState::Normal;
                            },
                        }
                    }

                    buf.advance(buf.remaining());
                    return Ok(None);
                },
            }
        }
    }

    fn decode_buffered(&mut self) -> Result<Option<Frame>, Error> {
        // the closing flag may already open the next frame
        let result = self.validate();

        self.buf.clear();
        self.state = (State::Frame, EscState::Normal);
        self.current_frame_size = 0;

        result.map(Some)
    }

    fn validate(&self) -> Result<Frame, Error> {
        // check for overflow
        if self.current_frame_size > self.buf.len() {
            return Err(Error::BufferOverflow);
        }

        // validate minimum frame size
        if self.buf.len() < consts::size::MIN_FRAME {
            return Err(Error::InvalidFrame);
        }

        // validate checksum
        let (content, fcs) = self.buf.split_at(self.buf.len() - consts::size::FCS);
        let fcs_expect = u16::from_le_bytes([fcs[0], fcs[1]]);

        if crc::fcs16(content) != fcs_expect {
            return Err(Error::InvalidChecksum { control: content[1] });
        }

        // address is not used, decode control byte
        let control = content[1];
        let (kind, seq) = control::decode(control)
            .ok_or(Error::InvalidControl(control))?;

        let data = Bytes::copy_from_slice(&content[consts::size::HEADER..]);

        Ok(Frame { kind, seq, data })
    }

    fn push_byte(&mut self, byte: u8) {
        self.current_frame_size += 1;

        if self.buf.len() < self.max_frame_size {
            self.buf.push(byte);
        }
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.state = (State::Discard, EscState::Normal);
        self.current_frame_size = 0;
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}


fn find_frame_start(buf: &[u8]) -> Option<usize> {
    buf.windows(2)
        .enumerate()
        .find(|(_, b)| b[0] == consts::flags::FRAME && b[1] != consts::flags::FRAME)
        .map(|(i, _)| i)
}


#[cfg(test)]
mod test {
    use bytes::BufMut;
    use proptest::prelude::*;

    use super::*;
    use crate::hdlc::{encoder, FrameKind, SeqNo};

    fn sample() -> Frame {
        Frame::data(SeqNo::new(3), vec![0x05, 0x06, 0x07, 0x7D, 0x7E, 0x7F, 0xFF])
    }

    #[test]
    fn test_find_frame_start() {
        let buf = [0x7E, 0x01, 0x02, 0x03];
        assert_eq!(find_frame_start(&buf), Some(0));

        let buf = [0x03, 0x02, 0x01, 0x00, 0x7E, 0x00, 0x01, 0x02, 0x03];
        assert_eq!(find_frame_start(&buf), Some(4));

        let buf = [0x03, 0x02, 0x01, 0x00, 0x7E, 0x7E, 0x00, 0x01, 0x02, 0x03];
        assert_eq!(find_frame_start(&buf), Some(5));

        let buf = [0x03, 0x02, 0x01, 0x00, 0x7E];
        assert_eq!(find_frame_start(&buf), None);

        let buf = [0x7E];
        assert_eq!(find_frame_start(&buf), None);

        let buf = [];
        assert_eq!(find_frame_start(&buf), None);
    }

    #[test]
    fn test_frame_decode() {
        let data = encoder::encode_bytes(&sample());
        let expect = sample();

        let mut dec = Decoder::new();

        // test standard decoding
        let mut buf = data.clone();
        assert_eq!(dec.process(&mut buf), Ok(Some(expect.clone())));
        assert_eq!(buf.remaining(), 0);

        // test partial decoding / re-entrancy, split inside escape sequence
        let split = data.iter().position(|b| *b == consts::flags::ESCAPE).unwrap() + 1;

        let mut dec = Decoder::new();
        let mut buf = BytesMut::from(&data[..split]);
        assert_eq!(dec.process(&mut buf), Ok(None));
        assert_eq!(buf.remaining(), 0);
        assert_eq!(dec.state, (State::Frame, EscState::Escape));

        let mut buf = BytesMut::from(&data[split..]);
        assert_eq!(dec.process(&mut buf), Ok(Some(expect.clone())));
        assert_eq!(buf.remaining(), 0);

        // test decoding of subsequent frames
        let mut dec = Decoder::new();
        let mut buf = BytesMut::new();
        buf.put_slice(&data);
        buf.put_slice(&data);

        assert_eq!(dec.process(&mut buf), Ok(Some(expect.clone())));
        assert_eq!(buf.remaining(), data.len());

        assert_eq!(dec.process(&mut buf), Ok(Some(expect.clone())));
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_shared_flag() {
        let data = encoder::encode_bytes(&sample());

        // closing flag of the first frame opens the second one
        let mut buf = BytesMut::new();
        buf.put_slice(&data);
        buf.put_slice(&data[1..]);

        let mut dec = Decoder::new();
        assert_eq!(dec.process(&mut buf), Ok(Some(sample())));
        assert_eq!(dec.process(&mut buf), Ok(Some(sample())));
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_leading_garbage() {
        let data = encoder::encode_bytes(&sample());

        let mut buf = BytesMut::from(&[0x02, 0x01][..]);
        buf.put_slice(&data);

        let mut dec = Decoder::new();
        assert_eq!(dec.process(&mut buf), Err(Error::UnexpectedData));
        assert_eq!(dec.process(&mut buf), Ok(Some(sample())));

        // a lone trailing flag is kept until more data arrives
        let mut buf = BytesMut::from(&[0x02, 0x7E][..]);
        let mut dec = Decoder::new();
        assert_eq!(dec.process(&mut buf), Err(Error::UnexpectedData));
        assert_eq!(dec.process(&mut buf), Ok(None));
        assert_eq!(buf.remaining(), 1);
    }

    #[test]
    fn test_cut_off_frame() {
        let data = encoder::encode_bytes(&sample());

        // data loss with frame being too small
        let mut buf = BytesMut::new();
        buf.put_slice(&data[..3]);
        buf.put_slice(&data);

        let mut dec = Decoder::new();
        assert_eq!(dec.process(&mut buf), Err(Error::InvalidFrame));
        assert_eq!(dec.process(&mut buf), Ok(Some(sample())));
        assert_eq!(buf.remaining(), 0);

        // data loss with checksum failing
        let mut buf = BytesMut::new();
        buf.put_slice(&data[..6]);
        buf.put_slice(&data);

        let mut dec = Decoder::new();
        let control = control::encode(FrameKind::Data, SeqNo::new(3));
        assert_eq!(dec.process(&mut buf), Err(Error::InvalidChecksum { control }));
        assert_eq!(dec.process(&mut buf), Ok(Some(sample())));
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_invalid_sequences() {
        let data = encoder::encode_bytes(&sample());

        // flag directly after escape byte
        let mut buf = BytesMut::from(&[0x7E, 0xFF, 0x7D][..]);
        buf.put_slice(&data);

        let mut dec = Decoder::new();
        assert_eq!(dec.process(&mut buf), Err(Error::UnexpectedEndOfFrame));
        assert_eq!(dec.process(&mut buf), Ok(Some(sample())));

        // double escape
        let mut buf = BytesMut::from(&[0x7E, 0xFF, 0x7D, 0x7D, 0x00][..]);
        buf.put_slice(&data);

        let mut dec = Decoder::new();
        assert_eq!(dec.process(&mut buf), Err(Error::InvalidEncoding));
        assert_eq!(dec.process(&mut buf), Err(Error::UnexpectedData));
        assert_eq!(dec.process(&mut buf), Ok(Some(sample())));
    }

    #[test]
    fn test_invalid_control() {
        // unnumbered frame with valid checksum
        let content = [consts::address::BROADCAST, 0x03];
        let fcs = crc::fcs16(&content).to_le_bytes();

        let mut buf = BytesMut::new();
        buf.put_u8(consts::flags::FRAME);
        buf.put_slice(&content);
        buf.put_slice(&fcs);
        buf.put_u8(consts::flags::FRAME);

        let mut dec = Decoder::new();
        assert_eq!(dec.process(&mut buf), Err(Error::InvalidControl(0x03)));
    }

    #[test]
    fn test_overflow() {
        let frame = Frame::data(SeqNo::ZERO, vec![0x42; 64]);
        let data = encoder::encode_bytes(&frame);

        let mut dec = Decoder::with_capacity(32);
        let mut buf = data.clone();
        assert_eq!(dec.process(&mut buf), Err(Error::BufferOverflow));

        // the decoder recovers for frames that fit
        let small = Frame::data(SeqNo::ZERO, vec![0x42; 8]);
        let mut buf = encoder::encode_bytes(&small);
        assert_eq!(dec.process(&mut buf), Ok(Some(small)));
    }

    proptest! {
        #[test]
        fn garbage_between_frames(
            payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..32), 1..6),
            garbage in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..24), 6),
            chunk in 1usize..16,
        ) {
            let frames: Vec<Frame> = payloads.into_iter()
                .enumerate()
                .map(|(i, p)| Frame::data(SeqNo::new(i as u8), p))
                .collect();

            let mut stream = Vec::new();
            for (frame, junk) in frames.iter().zip(garbage.iter()) {
                stream.extend_from_slice(junk);
                stream.extend_from_slice(&encoder::encode_bytes(frame));
            }

            // feed in small chunks to exercise re-entrancy
            let mut dec = Decoder::new();
            let mut buf = BytesMut::new();
            let mut decoded = Vec::new();
            for part in stream.chunks(chunk) {
                buf.put_slice(part);
                decoded.extend(crate::hdlc::decode_frames(&mut dec, &mut buf).into_iter().flatten());
            }

            // every valid frame comes out in order; garbage never hides one
            let mut it = decoded.iter();
            for frame in &frames {
                prop_assert!(it.any(|f| f == frame), "missing frame {:?}", frame);
            }
        }
    }
}
