use anyhow::bail;
use clap::Parser;

/// Runtime configuration for the `ndmux-server` binary.
///
/// All values are parsed from CLI arguments or environment variables, with
/// defaults suitable for local use. Each field is independently tunable at
/// runtime.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ndmux-server",
    version,
    about = "An HTTP service streaming batched results as newline-delimited JSON"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:3000"))]
    pub server_addr: String,

    /// Path the batch route is registered under.
    ///
    /// Environment variable: `BATCH_PATH`
    #[arg(long, env = "BATCH_PATH", default_value_t = String::from("/batch"))]
    pub batch_path: String,

    /// Maximum number of items allowed per batch request.
    ///
    /// Enforced server-side before dispatch, to bound the number of handler
    /// tasks a single request may fan out to.
    ///
    /// Environment variable: `MAX_BATCH_ITEMS`
    #[arg(long, env = "MAX_BATCH_ITEMS", default_value_t = 1_000)]
    pub max_batch_items: usize,

    /// Capacity of the settled-record buffer between handlers and the
    /// response stream.
    ///
    /// Lower values increase backpressure responsiveness; higher values let
    /// more completed records pipeline ahead of a slow client.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 8)]
    pub stream_buffer_size: usize,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub batch_path: String,
    pub max_batch_items: usize,
    pub stream_buffer_size: usize,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.max_batch_items == 0 {
            bail!("MAX_BATCH_ITEMS must be greater than 0");
        }

        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        if !args.batch_path.starts_with('/') {
            bail!("BATCH_PATH must start with '/', got {:?}", args.batch_path);
        }

        Ok(Self {
            server_addr: args.server_addr,
            batch_path: args.batch_path,
            max_batch_items: args.max_batch_items,
            stream_buffer_size: args.stream_buffer_size,
        })
    }
}
