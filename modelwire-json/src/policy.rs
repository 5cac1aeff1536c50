//! Access policy: route deny-lists read from a TOML file and turned into
//! [`AccessGates`].
//!
//! Entries are routes as the converter displays them. A registered entity
//! root is shown by its clean name (`Person`, also for a `PersonEntity`
//! type); other roots use the raw type name.
//!
//! ```toml
//! [access]
//! mode = "enforce"
//! deny-read = ["Person.Salary"]
//! deny-write = ["Person[AuditMixin].CreatedBy"]
//! ```

use crate::gates::AccessGates;
use modelwire_model::PropertyRoute;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Whether deny-lists are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    #[default]
    /// Listed routes are vetoed.
    Enforce,
    /// Every route is allowed; lists are ignored.
    Unrestricted,
}

/// Parsed policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub mode: PolicyMode,
    /// Routes (as displayed, e.g. `Person.Address.City`) omitted on write-out.
    #[serde(default)]
    pub deny_read: HashSet<String>,
    /// Routes whose assignment fails a read.
    #[serde(default)]
    pub deny_write: HashSet<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            mode: PolicyMode::Unrestricted,
            deny_read: HashSet::new(),
            deny_write: HashSet::new(),
        }
    }
}

/// Route-level access policy.
#[derive(Debug)]
pub struct AccessPolicy {
    config: PolicyConfig,
    policy_path: Option<PathBuf>,
}

impl AccessPolicy {
    /// Loads policy from a TOML file.
    /// Falls back to unrestricted mode when the file is missing or invalid.
    pub fn load_from(policy_path: impl AsRef<Path>) -> Self {
        let policy_path = policy_path.as_ref().to_path_buf();
        if !policy_path.exists() {
            info!("No access policy found at {:?}, running unrestricted", policy_path);
            return Self {
                config: PolicyConfig::default(),
                policy_path: None,
            };
        }

        match std::fs::read_to_string(&policy_path) {
            Ok(contents) => match toml::from_str::<PolicyFile>(&contents) {
                Ok(file) => {
                    info!("Loaded access policy from {:?}", policy_path);
                    Self {
                        config: file.into_config(),
                        policy_path: Some(policy_path),
                    }
                }
                Err(e) => {
                    warn!(
                        "Failed to parse access policy {:?}: {}. Falling back to unrestricted mode.",
                        policy_path, e
                    );
                    Self {
                        config: PolicyConfig::default(),
                        policy_path: Some(policy_path),
                    }
                }
            },
            Err(e) => {
                warn!("Failed to read access policy {:?}: {}", policy_path, e);
                Self {
                    config: PolicyConfig::default(),
                    policy_path: Some(policy_path),
                }
            }
        }
    }

    /// Creates a policy with explicit config.
    pub fn with_config(config: PolicyConfig) -> Self {
        Self {
            config,
            policy_path: None,
        }
    }

    pub fn can_read(&self, route: &PropertyRoute) -> Option<String> {
        self.check(&self.config.deny_read, route, "read")
    }

    pub fn can_write(&self, route: &PropertyRoute) -> Option<String> {
        self.check(&self.config.deny_write, route, "write")
    }

    fn check(&self, denied: &HashSet<String>, route: &PropertyRoute, action: &str) -> Option<String> {
        if self.config.mode == PolicyMode::Unrestricted {
            return None;
        }
        let route = route.to_string();
        denied
            .contains(&route)
            .then(|| format!("{action} of {route} is denied by access policy"))
    }

    /// Returns whether a policy file was found.
    pub fn has_policy_file(&self) -> bool {
        self.policy_path.is_some()
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Turns the policy into converter gates.
    pub fn into_gates(self) -> AccessGates {
        let policy = Arc::new(self);
        let reader = Arc::clone(&policy);
        AccessGates::allow_all()
            .with_read_gate(move |route| reader.can_read(route))
            .with_write_gate(move |route| policy.can_write(route))
    }
}

/// Raw TOML structure matching the policy file format.
#[derive(Deserialize)]
struct PolicyFile {
    #[serde(default)]
    access: AccessSection,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct AccessSection {
    #[serde(default)]
    mode: PolicyMode,
    #[serde(default)]
    deny_read: Vec<String>,
    #[serde(default)]
    deny_write: Vec<String>,
}

impl PolicyFile {
    fn into_config(self) -> PolicyConfig {
        PolicyConfig {
            mode: self.access.mode,
            deny_read: self.access.deny_read.into_iter().collect(),
            deny_write: self.access.deny_write.into_iter().collect(),
        }
    }
}
