//! Upload flow: seal a local dataset and push it to the receiver.

use std::path::PathBuf;

use log::{error, info, warn};

use super::TransferContext;
use crate::config::TEE_DM_SERVICE;
use crate::crypto::{self, DataKey};
use crate::error::Result;
use crate::peer::PeerClient;
use crate::uri;

/// Input dataset reference of the upload component.
const INPUT_IO: &str = "uploader_input";
/// Output dataset reference of the upload component.
const OUTPUT_IO: &str = "receive_output";

/// Runs the active side of an upload: encrypt the input dataset under a
/// fresh data key, push the ciphertext to the peer endpoint, release the
/// peer, then register the key with the authority.
pub async fn upload(ctx: &TransferContext<'_>) -> Result<()> {
    let params = &ctx.config.tee_app_params;
    let peer_endpoint = ctx.config.peer_service_endpoint(TEE_DM_SERVICE)?;
    let peer = PeerClient::new(peer_endpoint, ctx.retry_policy)?;

    let input_id = uri::domain_data_id(params.input_uri(INPUT_IO)?)?;
    let output_uri = params.output_uri(OUTPUT_IO)?;
    let output_id = uri::domain_data_id(output_uri)?;

    info!("Uploading dataset '{input_id}' to peer at {peer_endpoint}");
    let domain_data = ctx.catalog.get_domain_data(&input_id).await?;
    let datasource = ctx
        .catalog
        .get_domain_datasource(&domain_data.datasource_id)
        .await?;
    let source = datasource.localfs_root()?.join(&domain_data.relative_uri);

    let data_key = DataKey::generate();
    let mut sealed = source.clone().into_os_string();
    sealed.push(".encrypted");
    let sealed = PathBuf::from(sealed);
    crypto::encrypt_file(&source, &sealed, &data_key)?;

    peer.upload_file(&sealed, output_uri, &domain_data).await?;
    if let Err(e) = tokio::fs::remove_file(&sealed).await {
        warn!("Failed to remove staging file {}: {e}", sealed.display());
    }

    peer.shutdown().await?;

    if let Err(e) = ctx
        .capsule
        .create_data_keys(ctx.identity, &[output_id.clone()], &[&data_key])
        .await
    {
        error!(
            "Data key registration for '{output_id}' failed after upload to \
             {peer_endpoint}; the stored ciphertext has no key record"
        );
        return Err(e);
    }
    info!("Upload of '{input_id}' complete, registered as '{output_id}'");
    Ok(())
}
