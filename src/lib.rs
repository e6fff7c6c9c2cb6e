//! Mail relay: turns inbound messages into JSON records for a downstream
//! HTTP API and reports whether that API is reachable.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod intake;
pub mod message;
pub mod normalize;
pub mod relay;
pub mod server;
pub mod telemetry;

#[cfg(test)]
mod test_utils;
