use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use static_site::config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE};
use static_site::lookups::DEFAULT_CONTEXT_FILE;

#[derive(Parser, Debug)]
#[command(name = "static-site", version, about = "Deploy a static website to S3 and CloudFront")]
pub struct Cli {
    /// site config file
    #[arg(short, long, global = true, env = CONFIG_PATH_ENV, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// where resolved lookups are cached
    #[arg(long, global = true, default_value = DEFAULT_CONTEXT_FILE)]
    pub context: PathBuf,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Print the CloudFormation template
    Synth {
        /// write the template here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// fail instead of looking up missing values in AWS
        #[arg(long)]
        offline: bool,
    },
    /// Apply the stack, then upload the site and invalidate the cache
    Deploy {
        /// only apply the stack
        #[arg(long)]
        skip_upload: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}
