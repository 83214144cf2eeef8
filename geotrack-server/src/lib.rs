//! Geotrack Server
//!
//! Native host for `geotrack-core`: gpsd and simulated positioning platforms,
//! a command line front end and an HTTP/WebSocket API.

pub mod cli;
pub mod commands;
pub mod config;
pub mod gpsd;
pub mod native;
pub mod output;
pub mod simulated;
pub mod web;

pub use config::Settings;
pub use gpsd::GpsdPlatform;
pub use simulated::{SimulatedFix, SimulatedPlatform};
