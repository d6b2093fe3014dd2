use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "murmur-server", about = "Murmur federated microblogging server")]
pub struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config/murmur.toml")]
    pub config: PathBuf,

    /// Override the configured bind address
    #[arg(long)]
    pub bind: Option<String>,
}
