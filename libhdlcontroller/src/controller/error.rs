use crate::hdlc::SeqNo;


#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame {seq} not acknowledged after {attempts} attempts")]
    DeliveryFailed { seq: SeqNo, attempts: u32 },
    #[error("payload of {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error("controller is not running")]
    NotRunning,
    #[error("transport is no longer available")]
    TransportLost,
}
