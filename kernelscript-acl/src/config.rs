// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

/// Registry whose name is left out of application identifiers.
pub const DEFAULT_REGISTRY: &str = "aragonpm.eth";

/// Configuration parameters for building and addressing organizations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Registry under which application repositories are published by default. Apps of this
    /// registry are identified by their bare name (`voting:0`), apps of sub-registries by
    /// `<name>.<sub-registry>` (`voting.open:0`).
    pub default_registry: String,
    /// Index assigned to the first installed instance of every application name.
    pub initial_index: u32,
    /// Maximum number of artifact fetches the cache builder performs concurrently.
    pub max_concurrent_fetches: usize,
    /// Name of the application every organization is rooted in.
    pub kernel_app: String,
    /// Name of the application which stores permissions and receives permission actions.
    pub acl_app: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_registry: DEFAULT_REGISTRY.to_string(),
            initial_index: 0,
            max_concurrent_fetches: 8,
            kernel_app: "kernel".to_string(),
            acl_app: "acl".to_string(),
        }
    }
}

impl Config {
    /// Short registry name used in identifiers, `None` for the default registry.
    ///
    /// `open.aragonpm.eth` becomes `open`, names outside the default registry are kept whole.
    pub fn short_registry(&self, registry: &str) -> Option<String> {
        if registry.is_empty() || registry == self.default_registry {
            return None;
        }

        let suffix = format!(".{}", self.default_registry);
        Some(
            registry
                .strip_suffix(&suffix)
                .unwrap_or(registry)
                .to_string(),
        )
    }

    /// Full registry name for a short registry used in an identifier.
    pub fn full_registry(&self, short: Option<&str>) -> String {
        match short {
            None => self.default_registry.clone(),
            Some(short) if short.contains('.') => short.to_string(),
            Some(short) => format!("{short}.{}", self.default_registry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn registry_names() {
        let config = Config::default();
        assert_eq!(config.short_registry("aragonpm.eth"), None);
        assert_eq!(config.short_registry("open.aragonpm.eth"), Some("open".into()));
        assert_eq!(config.short_registry("1hive.eth"), Some("1hive.eth".into()));

        assert_eq!(config.full_registry(None), "aragonpm.eth");
        assert_eq!(config.full_registry(Some("open")), "open.aragonpm.eth");
        assert_eq!(config.full_registry(Some("1hive.eth")), "1hive.eth");
    }

    #[test]
    fn deserialize_partial_config() {
        let config: Config = serde_json::from_str(r#"{ "initialIndex": 1 }"#).unwrap();
        assert_eq!(config.initial_index, 1);
        assert_eq!(config.default_registry, "aragonpm.eth");
    }
}
