//! Flag bytes, bit masks, and field sizes used in the HDLC encoding.

pub mod flags {
    pub const FRAME: u8 = 0x7E;
    pub const ESCAPE: u8 = 0x7D;
}

pub mod escape {
    pub const MASK: u8 = 0x20;
}

pub mod address {
    /// All-stations address. Emitted on every frame, ignored on reception.
    pub const BROADCAST: u8 = 0xFF;
}

pub mod size {
    /// Address and control byte.
    pub const HEADER: usize = 2;

    /// Frame check sequence (FCS-16).
    pub const FCS: usize = 2;

    /// Smallest valid frame between flags: header plus FCS, no data.
    pub const MIN_FRAME: usize = HEADER + FCS;
}
