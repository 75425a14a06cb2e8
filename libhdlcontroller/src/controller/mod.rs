//! Stop-and-wait link controller.
//!
//! A [`Controller`] owns one transport. Once started, a background task reads
//! from it, delivers data frames to the application (see
//! [`Controller::get_data`]) and acknowledges them, and forwards ACK / NACK
//! frames to the pending [`Controller::send`] call. Only one data frame is in
//! flight at a time; it is retransmitted on NACK or timeout until it is
//! acknowledged or the configured number of attempts is used up.

mod config;
mod error;
mod queue;
mod receiver;
mod tracker;

pub use self::config::Config;
pub use self::error::Error;
pub use self::queue::DataQueue;
pub use self::tracker::{AckTracker, Outcome, Pending};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;

use futures::SinkExt;
use futures::lock::Mutex;

use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedWrite;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::hdlc::{Codec, Frame, SeqNo};

use self::receiver::Receiver;


/// State shared between the caller-facing controller and the receive loop.
struct Link<W> {
    writer: Mutex<FramedWrite<W, Codec>>,
    tracker: AckTracker,
    queue: DataQueue,
    running: AtomicBool,
}

impl<W> Link<W>
where
    W: AsyncWrite + Unpin,
{
    async fn write(&self, frame: Frame) -> Result<(), std::io::Error> {
        let mut writer = self.writer.lock().await;
        writer.send(frame).await
    }
}


enum Lifecycle<T> {
    Idle(ReadHalf<T>),
    Running {
        // cancels the receive loop when the controller is dropped
        cancel: DropGuard,
        task: JoinHandle<ReadHalf<T>>,
    },
    Lost,
}


pub struct Controller<T> {
    config: Config,
    link: Arc<Link<WriteHalf<T>>>,
    seq: Mutex<SeqNo>,
    lifecycle: Mutex<Lifecycle<T>>,
}

impl<T> Controller<T>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Set up a controller on the given transport. Nothing is read or
    /// written before [`start`](Self::start) is called.
    pub fn new(transport: T, config: Config) -> Self {
        let (reader, writer) = tokio::io::split(transport);
        let writer = FramedWrite::new(writer, Codec::new());

        let link = Link {
            writer: Mutex::new(writer),
            tracker: AckTracker::new(),
            queue: DataQueue::new(),
            running: AtomicBool::new(false),
        };

        Self {
            config,
            link: Arc::new(link),
            seq: Mutex::new(SeqNo::ZERO),
            lifecycle: Mutex::new(Lifecycle::Idle(reader)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.link.running.load(Ordering::Acquire)
    }

    /// Start the receive loop. Does nothing if it is already running.
    ///
    /// Resets the sequence counter and discards payloads not yet retrieved
    /// via [`get_data`](Self::get_data).
    pub async fn start(&self) -> Result<(), Error> {
        let mut lifecycle = self.lifecycle.lock().await;

        if let Lifecycle::Running { task, .. } = &*lifecycle {
            if !task.is_finished() {
                tracing::debug!("controller already running");
                return Ok(());
            }
        }

        let reader = reclaim(&mut *lifecycle).await?;

        *self.seq.lock().await = SeqNo::ZERO;
        self.link.queue.clear();
        self.link.tracker.clear();

        let cancel = CancellationToken::new();
        let receiver = Receiver::new(reader, self.link.clone(), &self.config);

        self.link.running.store(true, Ordering::Release);
        let task = tokio::spawn(receiver.run(cancel.clone()));

        *lifecycle = Lifecycle::Running { cancel: cancel.drop_guard(), task };

        tracing::debug!("controller started");
        Ok(())
    }

    /// Stop the receive loop and wait for it to terminate. Does nothing if
    /// it is not running.
    pub async fn stop(&self) -> Result<(), Error> {
        let mut lifecycle = self.lifecycle.lock().await;

        if !matches!(*lifecycle, Lifecycle::Running { .. }) {
            tracing::trace!("controller not running, nothing to stop");
            return Ok(());
        }

        // cleared up front, a panicked receive loop never gets to do it
        self.link.running.store(false, Ordering::Release);

        let reader = reclaim(&mut *lifecycle).await?;
        *lifecycle = Lifecycle::Idle(reader);

        tracing::debug!("controller stopped");
        Ok(())
    }

    /// Reliably transmit one payload.
    ///
    /// Returns once the peer has acknowledged the frame. Concurrent calls are
    /// serialized. If no acknowledgment arrives within the configured number
    /// of attempts, [`Error::DeliveryFailed`] is returned and the sequence
    /// number is reused for the next payload.
    pub async fn send(&self, data: impl Into<Bytes>) -> Result<(), Error> {
        let data = data.into();

        if data.len() > self.config.max_payload() {
            return Err(Error::PayloadTooLarge { size: data.len(), limit: self.config.max_payload() });
        }

        // without receive loop there is nobody to pick up the acknowledgment
        if !self.is_running() {
            return Err(Error::NotRunning);
        }

        let mut seq = self.seq.lock().await;
        let frame = Frame::data(*seq, data);

        for attempt in 1..=self.config.max_attempts() {
            // the receive loop may have terminated while we waited
            if !self.is_running() {
                return Err(Error::NotRunning);
            }

            let pending = self.link.tracker.expect(frame.seq);
            self.link.write(frame.clone()).await?;

            tracing::trace!(seq = frame.seq.value(), attempt, "sent data frame");

            match pending.wait(self.config.ack_timeout()).await {
                Outcome::Acked => {
                    tracing::trace!("frame {} acknowledged", frame.seq);

                    *seq = seq.next();
                    return Ok(());
                },
                Outcome::Nacked => {
                    tracing::debug!(
                        "frame {} rejected by peer (attempt {}/{})",
                        frame.seq, attempt, self.config.max_attempts()
                    );
                },
                Outcome::TimedOut => {
                    tracing::debug!(
                        "frame {} not acknowledged within {:?} (attempt {}/{})",
                        frame.seq, self.config.ack_timeout(), attempt, self.config.max_attempts()
                    );
                },
            }
        }

        tracing::warn!("giving up on frame {} after {} attempts", frame.seq, self.config.max_attempts());

        Err(Error::DeliveryFailed { seq: frame.seq, attempts: self.config.max_attempts() })
    }

    /// Wait for the next received payload.
    pub async fn get_data(&self) -> Bytes {
        self.link.queue.pop().await
    }

    /// Take the next received payload if one is available.
    pub fn try_get_data(&self) -> Option<Bytes> {
        self.link.queue.try_pop()
    }

    /// Stop the controller and give back the transport.
    pub async fn into_inner(self) -> Result<T, Error>
    where
        T: Unpin,
    {
        self.stop().await?;

        let Controller { link, lifecycle, .. } = self;

        let reader = match lifecycle.into_inner() {
            Lifecycle::Idle(reader) => reader,
            _ => return Err(Error::TransportLost),
        };

        let link = Arc::try_unwrap(link).map_err(|_| Error::TransportLost)?;
        let writer = link.writer.into_inner().into_inner();

        Ok(reader.unsplit(writer))
    }
}


/// Take the read half back, stopping the receive loop if necessary.
async fn reclaim<T>(lifecycle: &mut Lifecycle<T>) -> Result<ReadHalf<T>, Error> {
    match std::mem::replace(lifecycle, Lifecycle::Lost) {
        Lifecycle::Idle(reader) => Ok(reader),
        Lifecycle::Running { cancel, task } => {
            drop(cancel);

            task.await.map_err(|e| {
                tracing::error!("receive loop failed: {e}");
                Error::TransportLost
            })
        },
        Lifecycle::Lost => Err(Error::TransportLost),
    }
}
