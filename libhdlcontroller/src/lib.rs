//! Reliable, ordered delivery of data frames over an arbitrary byte stream
//! using a subset of HDLC (High-level Data Link Control).
//!
//! The [`hdlc`] module contains the frame codec. The [`controller`] module
//! runs the link on top of it: a background task receives and acknowledges
//! frames, while [`Controller::send`] transmits one frame at a time and
//! retransmits it until the peer acknowledges it.

pub mod controller;
pub mod hdlc;

pub use controller::{Config, Controller, Error};
