//! CLI surface for the store node binary: argument parsing and the
//! auto-port/auto-peer probing helpers used when `--port`/`--host` are
//! omitted (spec.md §6, §10).

pub mod discovery;

use clap::Parser;

/// Starts (or joins) a single store node.
///
/// With no arguments, probes localhost for a free port starting at 9900 and
/// for an existing node to join; both can be pinned explicitly.
#[derive(Debug, Parser)]
#[command(name = "ringstore", about = "A peer-to-peer distributed key-value store node")]
pub struct Cli {
    /// Initial peer to join, as `address:port`. Auto-discovered on localhost
    /// when omitted.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on. Auto-probed starting at 9900 when omitted.
    #[arg(long)]
    pub port: Option<u16>,
}
