//! ESP32-S3 bindings for the egg timer core.

#![no_std]

pub mod clock;
pub mod outputs;
