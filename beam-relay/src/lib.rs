//! # beam-relay — Screen-Share Relay Service
//!
//! Accepts persistent duplex connections from one host and any number
//! of viewers. Each binary payload the host submits is re-framed as a
//! checksummed chunked transfer and fanned out to every viewer; text
//! lines from viewers (input commands) are passed back to the host
//! verbatim.
//!
//! The relay keeps no transfer history: a viewer that joins mid-frame
//! simply waits for the next transfer header.

pub mod config;
pub mod service;
