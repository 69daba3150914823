//! Passive transfer endpoint binary.
//!
//! Serves the peer-facing HTTP routes on the given port and exits once the
//! active party posts a shutdown. Spawned by the orchestrator on the
//! passive side of a transfer.

use std::process::ExitCode;

use clap::Parser;
use log::error;

#[derive(Debug, Parser)]
#[command(name = "dmserver", about = "Passive dataset transfer endpoint")]
struct Args {
    /// Listen port.
    #[arg(short, long, default_value_t = 10001)]
    port: u16,

    /// Catalog service endpoint.
    #[arg(short, long, default_value = "datamesh:8070")]
    data_mesh_endpoint: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    match tee_dm::server::serve(args.port, &args.data_mesh_endpoint).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Endpoint failed: {e}");
            ExitCode::FAILURE
        }
    }
}
