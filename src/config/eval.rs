//! Component evaluation parameters.
//!
//! The evaluation parameters select which operation a task runs and carry
//! its typed attributes and dataset references. Attribute names are
//! slash-separated paths such as `receiver/vote_result`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Strs(Vec<String>),
}

/// Named dataset reference of a component input or output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoRef {
    pub name: String,
    pub uri: String,
}

/// Parameters of the component evaluation a task performs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalParam {
    /// Component name, selects the operation to run.
    pub name: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, AttrValue>,
    #[serde(default)]
    pub inputs: Vec<IoRef>,
    #[serde(default)]
    pub outputs: Vec<IoRef>,
}

impl EvalParam {
    /// String attribute by path, or a config error naming what is missing.
    pub fn str_attr(&self, name: &str) -> Result<&str> {
        match self.attrs.get(name) {
            Some(AttrValue::Str(value)) => Ok(value),
            Some(_) => Err(Error::Config(format!(
                "attribute '{name}' of component '{}' is not a string",
                self.name
            ))),
            None => Err(Error::Config(format!(
                "component '{}' is missing attribute '{name}'",
                self.name
            ))),
        }
    }

    /// String-list attribute by path.
    pub fn strs_attr(&self, name: &str) -> Result<&[String]> {
        match self.attrs.get(name) {
            Some(AttrValue::Strs(values)) => Ok(values),
            Some(_) => Err(Error::Config(format!(
                "attribute '{name}' of component '{}' is not a string list",
                self.name
            ))),
            None => Err(Error::Config(format!(
                "component '{}' is missing attribute '{name}'",
                self.name
            ))),
        }
    }

    /// URI of the named input dataset.
    pub fn input_uri(&self, name: &str) -> Result<&str> {
        lookup_io(&self.inputs, name).ok_or_else(|| {
            Error::Config(format!(
                "component '{}' is missing input '{name}'",
                self.name
            ))
        })
    }

    /// URI of the named output dataset.
    pub fn output_uri(&self, name: &str) -> Result<&str> {
        lookup_io(&self.outputs, name).ok_or_else(|| {
            Error::Config(format!(
                "component '{}' is missing output '{name}'",
                self.name
            ))
        })
    }
}

fn lookup_io<'a>(refs: &'a [IoRef], name: &str) -> Option<&'a str> {
    refs.iter()
        .find(|io| io.name == name)
        .map(|io| io.uri.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EvalParam {
        serde_json::from_str(
            r#"{
                "name": "download",
                "attrs": {
                    "receiver/domain_id": "bob",
                    "receiver/vote_result": "signed-vote",
                    "authorization_info/columns": ["age", "income"],
                    "batch": 3,
                    "dry_run": false
                },
                "inputs": [{"name": "sender_input", "uri": "dm://in?id=x"}],
                "outputs": [{"name": "receiver_output", "uri": "dm://out?id=y"}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_attr_accessors() {
        let param = sample();
        assert_eq!(param.str_attr("receiver/domain_id").unwrap(), "bob");
        assert_eq!(
            param.strs_attr("authorization_info/columns").unwrap(),
            ["age".to_string(), "income".to_string()]
        );
        assert_eq!(param.attrs.get("batch"), Some(&AttrValue::Int(3)));
        assert_eq!(param.attrs.get("dry_run"), Some(&AttrValue::Bool(false)));
    }

    #[test]
    fn test_missing_attr_is_config_error() {
        let err = sample().str_attr("uploader/domain_id").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("uploader/domain_id"));
    }

    #[test]
    fn test_attr_type_mismatch() {
        let param = sample();
        assert!(param.str_attr("authorization_info/columns").is_err());
        assert!(param.strs_attr("receiver/domain_id").is_err());
    }

    #[test]
    fn test_io_lookup() {
        let param = sample();
        assert_eq!(param.input_uri("sender_input").unwrap(), "dm://in?id=x");
        assert_eq!(param.output_uri("receiver_output").unwrap(), "dm://out?id=y");
        assert!(param.input_uri("uploader_input").is_err());
        assert!(param.output_uri("receive_output").is_err());
    }
}
