// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Configuration
//!
//! Layered configuration resolution: built-in defaults, an optional TOML
//! file, then `CAS_SYNC_*` environment variable overrides, in that order of
//! increasing precedence. Validated eagerly at load time so a malformed
//! `cache.type` or root path is a fatal error surfaced before the engine
//! starts, not a confusing failure three steps into a transfer.
//!
//! ## Example production.toml
//!
//! ```toml
//! [cache]
//! root = "/var/cache/cas-sync"
//! type = ["reflink", "copy"]
//! shared = "group"
//! protected = true
//! verify = false
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use cas_sync_domain::link_strategy::ModeMap;
use cas_sync_domain::{CacheError, LinkStrategy};
use serde::Deserialize;

const ENV_PREFIX: &str = "CAS_SYNC";
const DEFAULT_CACHE_ROOT: &str = ".cas-sync/cache";

#[derive(Debug, Clone, Deserialize)]
struct RawCacheConfig {
    root: Option<String>,
    #[serde(rename = "type")]
    link_types: Option<Vec<String>>,
    shared: Option<String>,
    protected: Option<bool>,
    verify: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    cache: Option<RawCacheConfig>,
}

/// Fully resolved, validated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub cache_root: PathBuf,
    pub link_order: Vec<LinkStrategy>,
    pub mode_map: ModeMap,
    pub protected: bool,
    pub verify: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from(DEFAULT_CACHE_ROOT),
            link_order: LinkStrategy::DEFAULT_ORDER.to_vec(),
            mode_map: ModeMap::DEFAULT,
            protected: true,
            verify: false,
        }
    }
}

impl AppConfig {
    /// Load defaults, then overlay an optional TOML file, then overlay
    /// `CAS_SYNC_*` environment variables. `config_path` is typically the
    /// CLI's `--config` flag value.
    pub fn load(config_path: Option<&std::path::Path>) -> Result<Self, CacheError> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(path.to_path_buf()));
        }
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).separator("_"));

        let resolved = builder
            .build()
            .map_err(|e| CacheError::configuration(format!("failed to load configuration: {e}")))?;

        let raw: RawConfig = resolved
            .try_deserialize()
            .map_err(|e| CacheError::configuration(format!("invalid configuration: {e}")))?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, CacheError> {
        let defaults = AppConfig::default();
        let cache = raw.cache.unwrap_or(RawCacheConfig {
            root: None,
            link_types: None,
            shared: None,
            protected: None,
            verify: None,
        });

        let cache_root = cache.root.map(PathBuf::from).unwrap_or(defaults.cache_root);

        let link_order = match cache.link_types {
            Some(types) => {
                if types.is_empty() {
                    return Err(CacheError::configuration("cache.type must not be empty"));
                }
                types
                    .iter()
                    .map(|s| LinkStrategy::from_str(s).map_err(CacheError::configuration))
                    .collect::<Result<Vec<_>, _>>()?
            }
            None => defaults.link_order,
        };

        let mode_map = match cache.shared.as_deref() {
            None | Some("none") => ModeMap::DEFAULT,
            Some("group") => ModeMap::GROUP_SHARED,
            Some(other) => {
                return Err(CacheError::configuration(format!(
                    "unknown cache.shared '{other}', expected one of: none, group"
                )))
            }
        };

        Ok(AppConfig {
            cache_root,
            link_order,
            mode_map,
            protected: cache.protected.unwrap_or(defaults.protected),
            verify: cache.verify.unwrap_or(defaults.verify),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_nothing_is_provided() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.link_order, LinkStrategy::DEFAULT_ORDER.to_vec());
        assert!(config.protected);
        assert!(!config.verify);
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[cache]\nroot = \"/tmp/my-cache\"\ntype = [\"hardlink\", \"copy\"]\nshared = \"group\"").unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.cache_root, PathBuf::from("/tmp/my-cache"));
        assert_eq!(config.link_order, vec![LinkStrategy::Hardlink, LinkStrategy::Copy]);
        assert_eq!(config.mode_map, ModeMap::GROUP_SHARED);
    }

    #[test]
    fn unknown_cache_type_is_a_configuration_error() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[cache]\ntype = [\"teleport\"]").unwrap();
        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert_eq!(err.category(), "configuration");
    }

    #[test]
    fn env_override_takes_precedence_over_file_s8() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[cache]\nprotected = true").unwrap();

        std::env::set_var("CAS_SYNC_CACHE_PROTECTED", "false");
        let config = AppConfig::load(Some(file.path())).unwrap();
        std::env::remove_var("CAS_SYNC_CACHE_PROTECTED");

        assert!(!config.protected);
    }
}
