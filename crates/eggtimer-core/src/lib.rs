//! Platform-independent core of the egg timer appliance.
//!
//! Everything in this crate is free of hardware and socket types so the
//! countdown logic, the HTTP processing and the supervisory decisions can
//! run under `cargo test` on the host. The firmware binary supplies the
//! real clock, pins and sockets.

#![no_std]

pub mod app;
pub mod clock;
pub mod http;
pub mod outputs;
pub mod server;
pub mod supervise;
pub mod timer;
