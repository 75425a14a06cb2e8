//! Background task turning the incoming byte stream into frames.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use bytes::BytesMut;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadHalf, WriteHalf};
use tokio_util::sync::CancellationToken;

use crate::hdlc::{self, control, decoder, Frame, FrameKind, SeqNo};

use super::tracker::Outcome;
use super::{Config, Link};


const READ_CHUNK: usize = 1024;


enum Exit {
    Cancelled,
    Closed,
    Failed(std::io::Error),
}


pub(super) struct Receiver<T> {
    reader: ReadHalf<T>,
    link: Arc<Link<WriteHalf<T>>>,
    decoder: decoder::Decoder,
    buf: BytesMut,
    last_delivered: Option<SeqNo>,
    nack_corrupted: bool,
}

impl<T> Receiver<T>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(reader: ReadHalf<T>, link: Arc<Link<WriteHalf<T>>>, config: &Config) -> Self {
        Self {
            reader,
            link,
            decoder: decoder::Decoder::with_capacity(config.max_frame_size()),
            buf: BytesMut::with_capacity(READ_CHUNK),
            last_delivered: None,
            nack_corrupted: config.nack_corrupted(),
        }
    }

    /// Receive until cancelled or the transport fails. Hands the read half
    /// back so that the link can be restarted.
    pub async fn run(mut self, cancel: CancellationToken) -> ReadHalf<T> {
        tracing::debug!("receive loop started");

        let exit = tokio::select! {
            _ = cancel.cancelled() => Exit::Cancelled,
            exit = self.process() => exit,
        };

        match exit {
            Exit::Cancelled => tracing::debug!("receive loop stopped"),
            Exit::Closed => tracing::warn!("transport closed, receive loop terminated"),
            Exit::Failed(e) => tracing::error!("transport error, receive loop terminated: {e}"),
        }

        self.link.running.store(false, Ordering::Release);
        self.reader
    }

    async fn process(&mut self) -> Exit {
        loop {
            self.buf.reserve(READ_CHUNK);

            match self.reader.read_buf(&mut self.buf).await {
                Ok(0) => return Exit::Closed,
                Ok(n) => tracing::trace!("received {n} bytes"),
                Err(e) => return Exit::Failed(e),
            }

            for item in hdlc::decode_frames(&mut self.decoder, &mut self.buf) {
                let result = match item {
                    Ok(frame) => self.handle_frame(frame).await,
                    Err(e) => self.handle_error(e).await,
                };

                if let Err(e) = result {
                    return Exit::Failed(e);
                }
            }
        }
    }

    async fn handle_frame(&mut self, frame: Frame) -> Result<(), std::io::Error> {
        match frame.kind {
            FrameKind::Data => {
                if self.last_delivered == Some(frame.seq) {
                    tracing::debug!("dropping duplicate data frame {}", frame.seq);
                } else {
                    tracing::trace!(seq = frame.seq.value(), len = frame.data.len(), "received data frame");

                    self.link.queue.push(frame.data);
                    self.last_delivered = Some(frame.seq);
                }

                // acknowledge duplicates too, the peer has missed our first ACK
                self.link.write(Frame::ack(frame.seq)).await
            },
            FrameKind::Ack => {
                self.resolve(frame.seq, Outcome::Acked);
                Ok(())
            },
            FrameKind::Nack => {
                self.resolve(frame.seq, Outcome::Nacked);
                Ok(())
            },
        }
    }

    fn resolve(&self, seq: SeqNo, outcome: Outcome) {
        if self.link.tracker.resolve(seq, outcome) {
            tracing::trace!("frame {seq} resolved: {outcome:?}");
        } else {
            tracing::debug!("dropping stale {outcome:?} for frame {seq}");
        }
    }

    async fn handle_error(&mut self, error: decoder::Error) -> Result<(), std::io::Error> {
        tracing::warn!("dropping malformed input: {error}");

        let decoder::Error::InvalidChecksum { control } = error else {
            return Ok(());
        };

        match control::decode(control) {
            Some((FrameKind::Data, seq)) if self.nack_corrupted => {
                tracing::debug!("requesting retransmission of frame {seq}");
                self.link.write(Frame::nack(seq)).await
            },
            _ => Ok(()),
        }
    }
}
