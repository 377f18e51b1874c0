// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Remote Scheme Registry
//!
//! Replaces the source system's runtime subclass dispatch on a scheme
//! string with an explicit map from scheme name to constructor. Only the
//! `local` scheme ships in this crate; a host binary can register real
//! backends (S3, GCS, SSH, HTTP) the same way before resolving a `--remote`.

use std::collections::HashMap;
use std::sync::Arc;

use cas_sync_domain::CacheError;

use crate::infrastructure::local_remote::LocalRemote;
use crate::infrastructure::remote::RemoteCache;

type Constructor = Box<dyn Fn(&str) -> Result<Arc<dyn RemoteCache>, CacheError> + Send + Sync>;

/// Maps a scheme string (the part of a remote URL before `://`) to a
/// constructor that builds a [`RemoteCache`] from the remainder of the URL.
pub struct RemoteRegistry {
    constructors: HashMap<String, Constructor>,
}

impl RemoteRegistry {
    /// A registry seeded with the bundled `local` scheme only.
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            constructors: HashMap::new(),
        };
        registry.register("local", |path| Ok(Arc::new(LocalRemote::new(path)) as Arc<dyn RemoteCache>));
        registry
    }

    pub fn register<F>(&mut self, scheme: &str, ctor: F)
    where
        F: Fn(&str) -> Result<Arc<dyn RemoteCache>, CacheError> + Send + Sync + 'static,
    {
        self.constructors.insert(scheme.to_string(), Box::new(ctor));
    }

    /// Resolve a `scheme://path`-shaped remote spec into a concrete
    /// [`RemoteCache`]. Bare paths (no `://`) are treated as `local`.
    pub fn resolve(&self, spec: &str) -> Result<Arc<dyn RemoteCache>, CacheError> {
        let (scheme, rest) = match spec.split_once("://") {
            Some((scheme, rest)) => (scheme, rest),
            None => ("local", spec),
        };

        let ctor = self
            .constructors
            .get(scheme)
            .ok_or_else(|| CacheError::configuration(format!("unknown remote scheme '{scheme}'")))?;
        ctor(rest)
    }
}

impl Default for RemoteRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_bare_path_as_local_scheme() {
        let registry = RemoteRegistry::with_defaults();
        let remote = registry.resolve("/tmp/some/cache").unwrap();
        assert_eq!(remote.jobs() > 0, true);
    }

    #[test]
    fn resolves_explicit_local_scheme() {
        let registry = RemoteRegistry::with_defaults();
        assert!(registry.resolve("local:///tmp/some/cache").is_ok());
    }

    #[test]
    fn unknown_scheme_is_a_configuration_error() {
        let registry = RemoteRegistry::with_defaults();
        let err = registry.resolve("s3://my-bucket").unwrap_err();
        assert_eq!(err.category(), "configuration");
    }
}
