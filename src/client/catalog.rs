//! Catalog client for dataset metadata and datasource descriptors.
//!
//! Each party runs its own catalog. Datasets are described by [`DomainData`]
//! records pointing into a [`DataSource`], which names the storage backend
//! holding the actual bytes. Only local filesystem datasources are
//! supported.

use std::collections::HashMap;
use std::path::PathBuf;

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{build_client, require_success, Status, CODE_OK};
use crate::error::{Error, Result};

/// Column description of a tabular dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub col_type: String,
    #[serde(default)]
    pub comment: String,
}

/// Dataset metadata record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainData {
    pub domaindata_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: String,
    /// Path relative to the owning datasource root.
    pub relative_uri: String,
    pub datasource_id: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub columns: Vec<DataColumn>,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub file_format: String,
}

/// Storage backend descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSource {
    pub datasource_id: String,
    #[serde(rename = "type", default)]
    pub source_type: String,
    #[serde(default)]
    pub info: DataSourceInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSourceInfo {
    #[serde(default)]
    pub localfs: Option<LocalFsInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalFsInfo {
    pub path: String,
}

impl DataSource {
    /// Filesystem root of a local datasource.
    pub fn localfs_root(&self) -> Result<PathBuf> {
        match &self.info.localfs {
            Some(localfs) => Ok(PathBuf::from(&localfs.path)),
            None => Err(Error::Config(format!(
                "datasource '{}' is not backed by a local filesystem",
                self.datasource_id
            ))),
        }
    }
}

/// Response envelope of every catalog route.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: Status,
    pub data: Option<T>,
}

#[derive(Debug, Serialize, Deserialize)]
struct QueryDomainData {
    domaindata_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct QueryDataSource {
    datasource_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CreatedDomainData {
    domaindata_id: String,
}

/// Client for one party's catalog service.
pub struct CatalogClient {
    base: String,
    client: reqwest::Client,
}

impl CatalogClient {
    /// Connects to the catalog at `endpoint`, enabling mutual TLS when the
    /// certificate environment variables are set.
    pub fn from_env(endpoint: &str) -> Result<Self> {
        let (client, scheme) = build_client()?;
        Ok(CatalogClient {
            base: format!("{scheme}://{endpoint}/api/v1/datamesh"),
            client,
        })
    }

    /// Fetches the metadata record of a dataset.
    pub async fn get_domain_data(&self, domaindata_id: &str) -> Result<DomainData> {
        self.post(
            "domaindata/query",
            &QueryDomainData {
                domaindata_id: domaindata_id.to_string(),
            },
        )
        .await
    }

    /// Fetches a datasource descriptor.
    pub async fn get_domain_datasource(&self, datasource_id: &str) -> Result<DataSource> {
        self.post(
            "domaindatasource/query",
            &QueryDataSource {
                datasource_id: datasource_id.to_string(),
            },
        )
        .await
    }

    /// Registers a dataset derived from `base`, rewriting its identifier,
    /// relative path and datasource to the given target values. Returns the
    /// identifier the catalog assigned.
    pub async fn create_domain_data(
        &self,
        domaindata_id: &str,
        relative_uri: &str,
        datasource_id: &str,
        base: &DomainData,
    ) -> Result<String> {
        let mut record = base.clone();
        record.domaindata_id = domaindata_id.to_string();
        record.relative_uri = relative_uri.to_string();
        record.datasource_id = datasource_id.to_string();
        let created: CreatedDomainData = self.post("domaindata/create", &record).await?;
        Ok(created.domaindata_id)
    }

    // --- Internal helpers ---

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}/{}", self.base, path);
        debug!("POST {url}");
        let response = self.client.post(&url).json(body).send().await?;
        let response = require_success(path, response).await?;
        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("malformed catalog response from {path}: {e}")))?;
        if envelope.status.code != CODE_OK {
            return Err(Error::Transport(format!(
                "catalog {path} failed with code {}: {}",
                envelope.status.code, envelope.status.message
            )));
        }
        envelope
            .data
            .ok_or_else(|| Error::Transport(format!("catalog {path} returned no data")))
    }
}
