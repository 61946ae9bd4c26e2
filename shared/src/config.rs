use tracing::warn;

/// Process configuration for backend selection
#[derive(Clone, Debug)]
pub struct Config {
    pub use_remote: bool,
    pub remote_addr: String,
    pub document_collection: String,
    pub document_value_field: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_remote: false,
            remote_addr: String::new(),
            document_collection: Self::DEFAULT_DOCUMENT_COLLECTION.to_string(),
            document_value_field: Self::DEFAULT_DOCUMENT_VALUE_FIELD.to_string(),
        }
    }
}

impl Config {
    const DEFAULT_DOCUMENT_COLLECTION: &str = "license-keys";
    const DEFAULT_DOCUMENT_VALUE_FIELD: &str = "value";

    pub fn from_env() -> Self {
        Self::from_source(|name| std::env::var(name).ok())
    }

    fn from_source(var: impl Fn(&str) -> Option<String>) -> Self {
        let use_remote = match var("STASH_USE_REMOTE") {
            Some(raw) => parse_flag(&raw).unwrap_or_else(|| {
                warn!("STASH_USE_REMOTE has unrecognised value '{}', using in-process cache", raw);
                false
            }),
            None => false,
        };

        Self {
            use_remote,
            remote_addr: var("STASH_REMOTE_ADDR").unwrap_or_default(),
            document_collection: var("STASH_DOCUMENT_COLLECTION")
                .unwrap_or_else(|| Self::DEFAULT_DOCUMENT_COLLECTION.to_string()),
            document_value_field: var("STASH_DOCUMENT_VALUE_FIELD")
                .unwrap_or_else(|| Self::DEFAULT_DOCUMENT_VALUE_FIELD.to_string()),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_source(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_select_in_process() {
        let config = config_from(&[]);
        assert!(!config.use_remote);
        assert_eq!(config.remote_addr, "");
        assert_eq!(config.document_collection, "license-keys");
        assert_eq!(config.document_value_field, "value");
    }

    #[test]
    fn test_remote_settings_are_read() {
        let config = config_from(&[
            ("STASH_USE_REMOTE", "TRUE"),
            ("STASH_REMOTE_ADDR", "10.0.0.5:6379"),
            ("STASH_DOCUMENT_COLLECTION", "devices"),
        ]);
        assert!(config.use_remote);
        assert_eq!(config.remote_addr, "10.0.0.5:6379");
        assert_eq!(config.document_collection, "devices");
    }

    #[test]
    fn test_unrecognised_flag_falls_back_to_false() {
        let config = config_from(&[("STASH_USE_REMOTE", "maybe")]);
        assert!(!config.use_remote);
    }
}
