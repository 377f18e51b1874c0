// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # `cas-sync` binary
//!
//! Composition root: parse CLI, load configuration, wire the local cache,
//! state index, and remote registry, build the named cache for the
//! requested targets, and run the transfer engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cas_sync::domain::checksum::Md5ChecksumService;
use cas_sync::domain::{CacheError, Checksum, NamedCache, PathLayout};
use cas_sync::infrastructure::local_cache::{LocalCache, LocalCacheConfig};
use cas_sync::infrastructure::lock::CacheRootLock;
use cas_sync::infrastructure::logging::{init_tracing, TracingProgressReporter};
use cas_sync::infrastructure::registry::RemoteRegistry;
use cas_sync::infrastructure::state_index::StateIndex;
use cas_sync::{AppConfig, TransferEngine};
use cas_sync_bootstrap::cli::{ValidatedCommand, ValidatedSync};
use cas_sync_bootstrap::logger::ConsoleLogger;
use cas_sync_bootstrap::shutdown::ShutdownCoordinator;
use cas_sync_bootstrap::{bootstrap_cli, result_to_exit_code, ExitCode};
use serde::Deserialize;

/// The sidecar file read for each CLI target, the minimal stand-in for an
/// external stage-graph executor's richer dependency resolution.
#[derive(Debug, Deserialize)]
struct TargetMetadata {
    checksum: String,
}

fn sidecar_path(target: &str) -> PathBuf {
    PathBuf::from(format!("{target}.cas-sync.json"))
}

async fn load_named_cache(targets: &[String]) -> Result<NamedCache, CacheError> {
    let mut named = NamedCache::new();
    for target in targets {
        let path = sidecar_path(target);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| CacheError::configuration(format!("failed to read metadata for target '{target}' at {}: {e}", path.display())))?;
        let metadata: TargetMetadata =
            serde_json::from_slice(&bytes).map_err(|e| CacheError::configuration(format!("invalid metadata for target '{target}': {e}")))?;
        named.insert(Checksum::new(metadata.checksum), target.clone());
    }
    Ok(named)
}

fn build_cache(config: &AppConfig, state_index: StateIndex) -> LocalCache {
    LocalCache::new(
        PathLayout::new(config.cache_root.clone()),
        Arc::new(Md5ChecksumService::new()),
        state_index,
        LocalCacheConfig {
            link_order: config.link_order.clone(),
            mode_map: config.mode_map,
            protected: config.protected,
            verify: config.verify,
        },
    )
}

async fn resolve_remote(registry: &RemoteRegistry, sync: &ValidatedSync) -> Result<Arc<dyn cas_sync::RemoteCache>, CacheError> {
    let spec = sync
        .remote
        .as_deref()
        .ok_or_else(|| CacheError::configuration("no --remote given and no default remote is configured"))?;
    registry.resolve(spec)
}

fn warn_unsupported_resolution_flags(sync: &ValidatedSync, logger: &ConsoleLogger) {
    use cas_sync_bootstrap::logger::BootstrapLogger;
    if sync.all_branches || sync.all_tags || sync.all_commits || sync.with_deps || sync.recursive {
        logger.warn(
            "--all-branches/--all-tags/--all-commits/--with-deps/--recursive are accepted for forward \
             compatibility with an external stage-graph executor; this build resolves targets from a single \
             sidecar checksum snapshot and ignores them",
        );
    }
}

async fn checkout_targets(cache: &LocalCache, named: &NamedCache, targets: &[String], force: bool) -> Result<(), CacheError> {
    for target in targets {
        let dest = Path::new(target);
        let checksum = named
            .checksums()
            .find(|c| named.names_for(c).map(|names| names.contains(target)).unwrap_or(false))
            .ok_or_else(|| CacheError::internal(format!("target '{target}' missing from named cache after reconciliation")))?;

        if !force && tokio::fs::try_exists(dest).await? && !cache.changed(dest, checksum).await? {
            continue;
        }
        cache.checkout(dest, checksum).await?;
    }
    Ok(())
}

async fn run(command: ValidatedCommand, config: AppConfig, logger: &ConsoleLogger) -> Result<(), CacheError> {
    let db_path = config.cache_root.join("state.db");
    if let Some(parent) = config.cache_root.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.ok();
    }
    tokio::fs::create_dir_all(&config.cache_root).await?;

    // Hold the cache root lock only across database creation/migration;
    // the pool's own connection serialization covers ordinary reads and
    // writes for the remainder of the process.
    let cache_root = config.cache_root.clone();
    let root_lock = tokio::task::spawn_blocking(move || CacheRootLock::acquire(&cache_root))
        .await
        .map_err(|e| CacheError::internal(e.to_string()))?
        .map_err(CacheError::from)?;

    let state_index = StateIndex::open(&format!("sqlite://{}", db_path.display())).await.map_err(|e| CacheError::Database(e.to_string()))?;
    drop(root_lock);

    let local = Arc::new(build_cache(&config, state_index));
    let registry = RemoteRegistry::with_defaults();
    let progress = Arc::new(TracingProgressReporter);

    let shutdown = ShutdownCoordinator::default();
    shutdown.spawn_signal_listener();

    let (sync, force, is_pull) = match &command {
        ValidatedCommand::Fetch(sync) => (sync, false, false),
        ValidatedCommand::Push(sync) => (sync, false, false),
        ValidatedCommand::Pull(sync, force) => (sync, *force, true),
    };
    warn_unsupported_resolution_flags(sync, logger);

    let remote = resolve_remote(&registry, sync).await?;
    let engine = TransferEngine::new(Arc::clone(&local), remote, sync.jobs, progress);

    let mut named = load_named_cache(&sync.targets).await?;
    engine.expand_named_cache(&mut named).await?;

    let attempted = match &command {
        ValidatedCommand::Fetch(_) => engine.fetch(&named).await?,
        ValidatedCommand::Push(_) => engine.push(&named).await?,
        ValidatedCommand::Pull(_, _) => engine.pull(&named).await?,
    };
    logger_info(logger, &format!("{} object(s) transferred", attempted));

    if is_pull {
        checkout_targets(&local, &named, &sync.targets, force).await?;
    }

    shutdown.complete_shutdown();
    Ok(())
}

fn logger_info(logger: &ConsoleLogger, message: &str) {
    use cas_sync_bootstrap::logger::BootstrapLogger;
    logger.info(message);
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("argument error: {e}");
            return std::process::ExitCode::from(ExitCode::Usage.code() as u8);
        }
    };

    init_tracing(cli.verbose);
    let logger = ConsoleLogger::new();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            return std::process::ExitCode::from(result_to_exit_code(Err(e), &logger).code() as u8);
        }
    };

    let result = run(cli.command, config, &logger).await;
    std::process::ExitCode::from(result_to_exit_code(result, &logger).code() as u8)
}
