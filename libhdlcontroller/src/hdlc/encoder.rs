use bytes::{BufMut, BytesMut};

use super::{consts, control, crc::Fcs16, Frame};


struct ByteEscape<B: BufMut> {
    buf: B,
}

impl<B: BufMut> ByteEscape<B> {
    fn new(buf: B) -> Self {
        Self { buf }
    }

    fn put_u8(&mut self, byte: u8) {
        match byte {
            consts::flags::ESCAPE | consts::flags::FRAME => self.buf.put_slice(&[
                consts::flags::ESCAPE,
                consts::escape::MASK ^ byte
            ]),
            _ => self.buf.put_u8(byte),
        }
    }

    fn put_frame_flag(&mut self) {
        self.buf.put_u8(consts::flags::FRAME)
    }
}

impl ByteEscape<&mut BytesMut> {
    fn reserve(&mut self, additional: usize) -> &mut Self {
        self.buf.reserve(additional);
        self
    }
}


struct Encoder<B: BufMut> {
    buf: ByteEscape<B>,
    fcs: Fcs16,
}

impl<B: BufMut> Encoder<B> {
    fn new(buf: B) -> Self {
        Self {
            buf: ByteEscape::new(buf),
            fcs: Fcs16::new(),
        }
    }

    fn flag(&mut self) -> &mut Self {
        self.buf.put_frame_flag();
        self
    }

    fn put_u8(&mut self, byte: u8) -> &mut Self {
        self.fcs.put_u8(byte);
        self.buf.put_u8(byte);
        self
    }

    fn put_bytes<T: IntoIterator<Item = u8>>(&mut self, bytes: T) -> &mut Self {
        for b in bytes.into_iter() {
            self.put_u8(b);
        }
        self
    }

    fn finalize(&mut self) {
        // the FCS itself is escaped but not checksummed
        for b in self.fcs.value().to_le_bytes() {
            self.buf.put_u8(b);
        }
        self.flag();
    }
}

impl Encoder<&mut BytesMut> {
    fn reserve(&mut self, additional: usize) -> &mut Self {
        self.buf.reserve(additional);
        self
    }
}


pub fn encode(buf: &mut BytesMut, frame: &Frame) {
    Encoder::new(buf)
        .reserve(frame.data.len() + 6)                          // reserve at least data-size + min-frame-size
        .flag()                                                 // flag
        .put_u8(consts::address::BROADCAST)                     // address
        .put_u8(control::encode(frame.kind, frame.seq))         // control
        .put_bytes(frame.data.iter().copied())                  // data
        .reserve(3)                                             // reserve FCS + flag
        .finalize()                                             // checksum and flag
}

pub fn encode_bytes(frame: &Frame) -> BytesMut {
    let mut buf = BytesMut::new();
    encode(&mut buf, frame);
    buf
}
