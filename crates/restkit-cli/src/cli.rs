//! CLI argument definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use restkit_config::SerializationKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "restkit",
    about = "Restkit - call HTTP APIs through a cached client",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (YAML or JSON)
    #[arg(long, env = "RESTKIT_CONFIG", help = "Path to a settings file")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Issue a GET request
    Get {
        #[command(flatten)]
        args: CallArgs,
    },
    /// Issue a DELETE request
    Delete {
        #[command(flatten)]
        args: CallArgs,
    },
    /// Issue a POST request with a JSON body
    Post {
        #[command(flatten)]
        args: CallArgs,
        /// Request body as JSON
        #[arg(long, help = "Request body (JSON)")]
        data: String,
    },
    /// Issue a PUT request with a JSON body
    Put {
        #[command(flatten)]
        args: CallArgs,
        /// Request body as JSON
        #[arg(long, help = "Request body (JSON)")]
        data: String,
    },
    /// Print the effective settings
    ShowConfig {
        /// Output as JSON instead of YAML
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct CallArgs {
    /// Path resolved against the endpoint
    pub path: String,

    /// Endpoint (base URL); overrides the settings file
    #[arg(long)]
    pub endpoint: Option<String>,

    #[arg(long, value_enum)]
    pub serialization: Option<SerializationArg>,

    /// Deliver the call through the stream adapter
    #[arg(long)]
    pub stream: bool,

    /// Log full request and response bodies
    #[arg(long)]
    pub log_body: bool,

    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u64>,

    #[arg(long, value_name = "SECS")]
    pub read_timeout: Option<u64>,

    #[arg(long, value_name = "SECS")]
    pub write_timeout: Option<u64>,

    /// Repeat the call, reusing the cached client
    #[arg(long, default_value = "1")]
    pub repeat: u32,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerializationArg {
    JsonTree,
    Typed,
    Yaml,
}

impl From<SerializationArg> for SerializationKind {
    fn from(arg: SerializationArg) -> Self {
        match arg {
            SerializationArg::JsonTree => SerializationKind::JsonTree,
            SerializationArg::Typed => SerializationKind::Typed,
            SerializationArg::Yaml => SerializationKind::Yaml,
        }
    }
}
