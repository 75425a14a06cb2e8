//! Frame check sequence (CRC-16/X.25) as used by HDLC.

const POLYNOMIAL: u16 = 0x8408;         // 0x1021, bit-reversed
const INIT: u16 = 0xFFFF;

static TABLE: [u16; 256] = table();


const fn table() -> [u16; 256] {
    let mut table = [0; 256];
    let mut i = 0;

    while i < 256 {
        let mut value = i as u16;
        let mut bit = 0;

        while bit < 8 {
            value = if value & 1 != 0 {
                (value >> 1) ^ POLYNOMIAL
            } else {
                value >> 1
            };
            bit += 1;
        }

        table[i] = value;
        i += 1;
    }

    table
}


#[derive(Debug, Clone, Copy)]
pub struct Fcs16 {
    state: u16,
}

impl Fcs16 {
    pub fn new() -> Self {
        Self { state: INIT }
    }

    pub fn put_u8(&mut self, byte: u8) {
        let index = (self.state ^ byte as u16) & 0xFF;
        self.state = (self.state >> 8) ^ TABLE[index as usize];
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        for b in bytes {
            self.put_u8(*b);
        }
    }

    pub fn value(&self) -> u16 {
        !self.state
    }
}

impl Default for Fcs16 {
    fn default() -> Self {
        Self::new()
    }
}


pub fn fcs16(data: &[u8]) -> u16 {
    let mut fcs = Fcs16::new();
    fcs.put_bytes(data);
    fcs.value()
}
