use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "rkv",
    about = "rkv -- client object model for an eventually consistent key/value store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write concurrent versions of one key and resolve the conflict
    Simulate(SimulateArgs),
    /// Show quorums resolved from a client configuration file
    Config(ConfigArgs),
    /// Parse a Link header
    Links(LinksArgs),
}

#[derive(Args)]
pub struct SimulateArgs {
    /// Number of writers racing on the key
    #[arg(short, long, default_value = "3")]
    pub writers: usize,
    #[arg(long, default_value = "demo")]
    pub bucket: String,
    #[arg(long, default_value = "counter")]
    pub key: String,
    /// Have the server answer conflicted reads with version tags only
    #[arg(long)]
    pub tags_only: bool,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// TOML file; built-in defaults when omitted
    #[arg(short, long)]
    pub path: Option<String>,
    /// Buckets to resolve in addition to those named in the file
    #[arg(short, long)]
    pub bucket: Vec<String>,
}

#[derive(Args)]
pub struct LinksArgs {
    pub header: String,
    /// Path prefix used when re-rendering the links
    #[arg(long)]
    pub prefix: Option<String>,
}
