//! Command line
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};

use crate::output::OutputFormat;
use crate::simulated::SimulatedFix;

#[derive(Parser, Debug)]
#[command(name = "geotrack-server", version, about = "Location acquisition and accuracy assessment", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// Settings file (JSON). Defaults to the per-user config directory
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// gpsd address
    #[arg(long, global = true, value_name = "HOST:PORT")]
    pub gpsd: Option<String>,

    /// Report a constant position instead of using gpsd
    #[arg(long, global = true, value_name = "LAT,LON[,ACC]")]
    pub simulate: Option<SimulatedFix>,

    /// Treat the gpsd connection as a secure context even if it is not local
    #[arg(long, global = true)]
    pub secure: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check whether positioning is available
    Check(FormatArgs),

    /// Get one fix and its accuracy assessment
    Locate(LocateArgs),

    /// Average several fixes taken a fixed interval apart
    Average(AverageArgs),

    /// Track the position until Ctrl-C
    Watch(WatchArgs),

    /// Serve the HTTP and WebSocket API
    Serve(ServeArgs),
}

#[derive(Args, Debug, Default)]
pub struct FormatArgs {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl FormatArgs {
    pub fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

#[derive(Args, Debug)]
pub struct LocateArgs {
    /// Give up after this many milliseconds
    #[arg(long, default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// Accept a cached fix up to this old
    #[arg(long, default_value_t = 0)]
    pub max_age_ms: u64,

    /// Do not ask for high accuracy
    #[arg(long)]
    pub low_accuracy: bool,

    #[command(flatten)]
    pub output: FormatArgs,
}

#[derive(Args, Debug)]
pub struct AverageArgs {
    /// Number of fixes (default from settings)
    #[arg(long)]
    pub count: Option<usize>,

    /// Milliseconds between fixes (default from settings)
    #[arg(long)]
    pub interval_ms: Option<u64>,

    #[command(flatten)]
    pub output: FormatArgs,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Stop after this many samples
    #[arg(long)]
    pub limit: Option<u64>,

    #[command(flatten)]
    pub output: FormatArgs,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (default from settings)
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,
}
