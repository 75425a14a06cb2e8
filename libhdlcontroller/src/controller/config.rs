use std::time::Duration;

use crate::hdlc::consts;


/// Operational parameters of a [`Controller`](super::Controller).
///
/// Values are only set through the `with_*` builders, which keep them within
/// usable bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    ack_timeout: Duration,
    max_attempts: u32,
    max_payload: usize,
    nack_corrupted: bool,
}

impl Config {
    /// Time to wait for an ACK or NACK after each transmission.
    pub fn ack_timeout(&self) -> Duration {
        self.ack_timeout
    }

    /// Number of transmissions of a frame (including the first one) before
    /// the delivery is reported as failed. At least one.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Largest payload accepted by `send` and by the receiver.
    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Reply with a NACK when a data frame fails its checksum, so that the
    /// peer retransmits without waiting for its timeout.
    pub fn nack_corrupted(&self) -> bool {
        self.nack_corrupted
    }

    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout.max(Duration::from_millis(1));
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_max_payload(mut self, size: usize) -> Self {
        self.max_payload = size;
        self
    }

    pub fn with_nack_corrupted(mut self, enable: bool) -> Self {
        self.nack_corrupted = enable;
        self
    }

    /// Largest unescaped frame, i.e. payload plus header and FCS.
    pub(crate) fn max_frame_size(&self) -> usize {
        self.max_payload.saturating_add(consts::size::MIN_FRAME)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(1),
            max_attempts: 3,
            max_payload: 4096,
            nack_corrupted: true,
        }
    }
}
