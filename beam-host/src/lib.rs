//! # beam-host — Screen Capture Host Service
//!
//! Connects to the relay with the `host` role, submits encoded screen
//! frames from a [`source::ScreenSource`], and executes the input
//! commands viewers send back through an [`input::InputSink`].
//!
//! Capture and injection are pluggable seams: the built-in
//! implementations generate a test pattern and log events, standing
//! in for platform capture/injection backends.

pub mod config;
pub mod input;
pub mod service;
pub mod source;
