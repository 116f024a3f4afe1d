use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// TCP port to listen on
    #[arg(short, long)]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Path to the SQLite database file (created when missing)
    #[arg(long, default_value = "crosstalk.db")]
    pub db: PathBuf,
}
