//! Orchestrator binary: runs one task operation end to end.
//!
//! Loads the task configuration handed over by the scheduler, obtains the
//! task identity from the config manager, then hands off to the driver.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use tee_dm::client::ConfManagerClient;
use tee_dm::config::TaskConfig;
use tee_dm::driver::Driver;
use tee_dm::identity::PartyIdentity;
use tee_dm::Result;

#[derive(Debug, Parser)]
#[command(name = "teedm", about = "Confidential dataset transfer orchestrator")]
struct Args {
    /// Task configuration file.
    #[arg(long)]
    task_config_path: PathBuf,

    /// Catalog service endpoint.
    #[arg(long, default_value = "datamesh:8070")]
    data_mesh_endpoint: String,

    /// Config manager endpoint issuing the task identity.
    #[arg(long, default_value = "confmanager:8060")]
    config_manager_endpoint: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Task failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = TaskConfig::load(&args.task_config_path)?;
    info!(
        "Loaded task '{}' running component '{}'",
        config.task_id, config.tee_app_params.name
    );

    let confmanager = ConfManagerClient::from_env(&args.config_manager_endpoint)?;
    let (cert_chain, private_key) = confmanager
        .generate_certificate(&config.tee_app_params.name)
        .await?;
    let identity = PartyIdentity::from_parts(cert_chain, &private_key)?;

    Driver::new(config, identity, args.data_mesh_endpoint)
        .run()
        .await
}
