//! Parsing of `dm://` dataset URIs.
//!
//! Datasets are addressed by opaque URIs. An input URI carries the catalog
//! identifier in its `id` query parameter; an output URI additionally names
//! the storage-relative path (`uri`) and the owning datasource
//! (`datasource_id`).

use url::Url;

use crate::error::{Error, Result};

/// Scheme every dataset URI must carry.
pub const DM_SCHEME: &str = "dm";

/// Fully resolved output target parsed from an output URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputUri {
    /// Catalog identifier the dataset will be registered under.
    pub domain_data_id: String,
    /// Path relative to the owning datasource root.
    pub relative_uri: String,
    /// Datasource that will hold the file.
    pub datasource_id: String,
}

/// Extracts the catalog identifier from a dataset URI.
pub fn domain_data_id(uri: &str) -> Result<String> {
    let parsed = parse_dm_uri(uri)?;
    query_param(&parsed, uri, "id")
}

/// Parses an output URI into its identifier, relative path and datasource.
pub fn parse_output_uri(uri: &str) -> Result<OutputUri> {
    let parsed = parse_dm_uri(uri)?;
    Ok(OutputUri {
        domain_data_id: query_param(&parsed, uri, "id")?,
        relative_uri: query_param(&parsed, uri, "uri")?,
        datasource_id: query_param(&parsed, uri, "datasource_id")?,
    })
}

// --- Internal helpers ---

fn parse_dm_uri(uri: &str) -> Result<Url> {
    let parsed =
        Url::parse(uri).map_err(|e| Error::Input(format!("invalid dataset uri '{uri}': {e}")))?;
    if parsed.scheme() != DM_SCHEME {
        return Err(Error::Input(format!(
            "unsupported scheme '{}' in dataset uri '{uri}', expected '{DM_SCHEME}'",
            parsed.scheme()
        )));
    }
    Ok(parsed)
}

fn query_param(parsed: &Url, uri: &str, name: &str) -> Result<String> {
    parsed
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| Error::Input(format!("dataset uri '{uri}' is missing the '{name}' parameter")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_data_id() {
        let id = domain_data_id("dm://input?id=alice-data-1").unwrap();
        assert_eq!(id, "alice-data-1");
    }

    #[test]
    fn test_rejects_foreign_scheme() {
        let err = domain_data_id("file:///tmp/data.csv").unwrap_err();
        assert!(matches!(err, Error::Input(_)));
        assert!(err.to_string().contains("file"));
    }

    #[test]
    fn test_rejects_missing_id() {
        let err = domain_data_id("dm://input?name=data").unwrap_err();
        assert!(err.to_string().contains("'id'"));
    }

    #[test]
    fn test_parse_output_uri() {
        let out =
            parse_output_uri("dm://output?id=bob-data-9&uri=received/data.csv&datasource_id=ds-b")
                .unwrap();
        assert_eq!(out.domain_data_id, "bob-data-9");
        assert_eq!(out.relative_uri, "received/data.csv");
        assert_eq!(out.datasource_id, "ds-b");
    }

    #[test]
    fn test_output_uri_requires_all_parameters() {
        let err = parse_output_uri("dm://output?id=bob-data-9&uri=data.csv").unwrap_err();
        assert!(err.to_string().contains("'datasource_id'"));
    }

    #[test]
    fn test_extra_parameters_are_ignored() {
        let id = domain_data_id("dm://input?id=x&vendor=acme").unwrap();
        assert_eq!(id, "x");
    }
}
