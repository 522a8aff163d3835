use anyhow::bail;
use clap::Parser;
use rime::SnowflakeId;

/// Runtime configuration for the `rime-axum-server` binary.
///
/// All values are parsed from CLI arguments or environment variables, with
/// defaults suitable for a single-node deployment. The machine ID is the one
/// value that must be coordinated externally: two instances sharing it can
/// mint colliding IDs.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "rime-axum-server",
    version,
    about = "An HTTP service minting Snowflake-style IDs"
)]
pub struct CliArgs {
    /// Machine ID encoded into every ID this instance generates.
    ///
    /// Must be unique across the deployment and fit the 10-bit machine
    /// field (0..=1023). Assignment is external; this service only
    /// range-checks the value at startup.
    ///
    /// Environment variable: `MACHINE_ID`
    #[arg(long, env = "MACHINE_ID", default_value_t = 0)]
    pub machine_id: u64,

    /// Address to listen on.
    ///
    /// Example: "0.0.0.0:8001"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8001"))]
    pub server_addr: String,

    /// Maximum number of IDs allowed per batch request.
    ///
    /// Enforced server-side to prevent a single request from monopolizing
    /// the generator. Clients may request fewer.
    ///
    /// Environment variable: `MAX_BATCH_IDS`
    #[arg(long, env = "MAX_BATCH_IDS", default_value_t = 4096)]
    pub max_batch_ids: usize,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub machine_id: u64,
    pub server_addr: String,
    pub max_batch_ids: usize,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.machine_id > SnowflakeId::MAX_MACHINE_ID {
            bail!(
                "MACHINE_ID ({}) exceeds the available machine ID space (max = {})",
                args.machine_id,
                SnowflakeId::MAX_MACHINE_ID
            );
        }

        if args.max_batch_ids == 0 {
            bail!("MAX_BATCH_IDS must be greater than 0");
        }

        Ok(Self {
            machine_id: args.machine_id,
            server_addr: args.server_addr,
            max_batch_ids: args.max_batch_ids,
        })
    }
}
