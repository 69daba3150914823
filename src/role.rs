//! Active and passive role resolution.
//!
//! Two-party operations designate one party as active (it drives the
//! transfer) and the other as passive (it serves the peer endpoint). The
//! designation lives in an evaluation attribute naming the active party:
//! with consistent configs on both sides, exactly one party resolves to
//! [`Role::Active`].

use log::info;

use crate::config::TaskConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Drives the transfer against the peer endpoint.
    Active,
    /// Serves the peer endpoint until told to shut down.
    Passive,
}

impl Role {
    /// Resolves the local role from the attribute naming the active party.
    pub fn resolve(config: &TaskConfig, designator_attr: &str) -> Result<Role> {
        let designated = config.tee_app_params.str_attr(designator_attr)?;
        let self_name = &config.self_party()?.name;
        let role = if designated == self_name {
            Role::Active
        } else {
            Role::Passive
        };
        info!(
            "Party '{}' resolved to {:?} role ('{}' = '{}')",
            self_name, role, designator_attr, designated
        );
        Ok(role)
    }
}

/// Rejects tasks whose party count does not match the operation.
pub fn ensure_party_count(config: &TaskConfig, expected: usize) -> Result<()> {
    let actual = config.party_count();
    if actual != expected {
        return Err(Error::Config(format!(
            "operation '{}' requires exactly {expected} {}, got {actual}",
            config.tee_app_params.name,
            if expected == 1 { "party" } else { "parties" }
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(self_idx: usize, designated: &str) -> TaskConfig {
        serde_json::from_str(&format!(
            r#"{{
                "task_id": "task-1",
                "task_cluster_def": {{
                    "parties": [{{"name": "alice"}}, {{"name": "bob"}}],
                    "self_party_idx": {self_idx}
                }},
                "tee_app_params": {{
                    "name": "upload",
                    "attrs": {{"uploader/domain_id": "{designated}"}}
                }},
                "capsule_manager_endpoint": "capsule:8888"
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_exactly_one_party_is_active() {
        let alice = Role::resolve(&config(0, "alice"), "uploader/domain_id").unwrap();
        let bob = Role::resolve(&config(1, "alice"), "uploader/domain_id").unwrap();
        assert_eq!(alice, Role::Active);
        assert_eq!(bob, Role::Passive);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(
                Role::resolve(&config(1, "bob"), "uploader/domain_id").unwrap(),
                Role::Active
            );
        }
    }

    #[test]
    fn test_missing_designator_is_config_error() {
        let err = Role::resolve(&config(0, "alice"), "receiver/domain_id").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_party_count_check() {
        let config = config(0, "alice");
        assert!(ensure_party_count(&config, 2).is_ok());
        let err = ensure_party_count(&config, 1).unwrap_err();
        assert!(err.to_string().contains("requires exactly 1 party"));
    }
}
