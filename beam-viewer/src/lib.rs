//! # beam-viewer — Remote Screen Viewer Service
//!
//! Connects to the relay with the `viewer` role, reassembles and
//! verifies incoming transfers, and hands each verified payload to a
//! [`sink::FrameSink`] for decoding/display. Control commands queued
//! on the service's sender are forwarded to the host through the
//! relay.
//!
//! Rendering is a pluggable seam: the built-in sink logs each frame
//! and can mirror the latest payload to a file.

pub mod config;
pub mod service;
pub mod sink;
