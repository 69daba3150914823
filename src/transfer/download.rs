//! Download flow: fetch a sealed dataset from the sender and unseal it.

use std::path::{Path, PathBuf};

use log::{info, warn};
use uuid::Uuid;

use super::TransferContext;
use crate::config::TEE_DM_SERVICE;
use crate::crypto;
use crate::error::Result;
use crate::peer::PeerClient;
use crate::uri;

/// Input dataset reference of the download component.
const INPUT_IO: &str = "sender_input";
/// Output dataset reference of the download component.
const OUTPUT_IO: &str = "receiver_output";
/// Attribute carrying the receiver's export authorization proof.
const VOTE_RESULT_ATTR: &str = "receiver/vote_result";

/// Runs the active side of a download: obtain the data key from the
/// authority by presenting the export proof, pull the ciphertext from the
/// peer endpoint, decrypt it into the local datasource and register the
/// dataset with the local catalog.
pub async fn download(ctx: &TransferContext<'_>) -> Result<()> {
    let params = &ctx.config.tee_app_params;
    let peer_endpoint = ctx.config.peer_service_endpoint(TEE_DM_SERVICE)?;
    let peer = PeerClient::new(peer_endpoint, ctx.retry_policy)?;

    let input_uri = params.input_uri(INPUT_IO)?;
    let input_id = uri::domain_data_id(input_uri)?;
    let output = uri::parse_output_uri(params.output_uri(OUTPUT_IO)?)?;
    let vote_result = params.str_attr(VOTE_RESULT_ATTR)?;

    info!("Downloading dataset '{input_id}' from peer at {peer_endpoint}");
    let data_key = ctx
        .capsule
        .get_export_data_key(ctx.identity, &input_id, vote_result)
        .await?;

    let staging = staging_path(&output.relative_uri);
    peer.download_file(input_uri, &staging).await?;

    let datasource = ctx
        .catalog
        .get_domain_datasource(&output.datasource_id)
        .await?;
    let dest = datasource.localfs_root()?.join(&output.relative_uri);
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    crypto::decrypt_file(&staging, &dest, &data_key)?;
    if let Err(e) = tokio::fs::remove_file(&staging).await {
        warn!("Failed to remove staging file {}: {e}", staging.display());
    }

    // Only the identifier and relative uri are rebound to local values. The
    // rest of the record, datasource included, is the sender's metadata.
    let domain_data = peer.get_domain_data(input_uri).await?;
    ctx.catalog
        .create_domain_data(
            &output.domain_data_id,
            &output.relative_uri,
            &domain_data.datasource_id,
            &domain_data,
        )
        .await?;

    peer.shutdown().await?;
    info!(
        "Download of '{input_id}' complete, registered as '{}'",
        output.domain_data_id
    );
    Ok(())
}

/// Temp staging location for the sealed download.
fn staging_path(relative_uri: &str) -> PathBuf {
    let name = Path::new(relative_uri)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("dataset");
    std::env::temp_dir().join(format!("{name}.{}.encrypted", Uuid::new_v4()))
}
