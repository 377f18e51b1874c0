// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transfer Engine
//!
//! Drives push/pull/fetch over a reconciler plan with bounded parallelism.
//! Each worker transfer returns success or failure without propagating
//! mid-batch; failures are summed and raised as a single aggregate error
//! once the whole batch has been attempted, mirroring a
//! `ThreadPoolExecutor(max_workers=jobs).map(...)` batch-then-aggregate
//! shape.

use std::collections::HashSet;
use std::sync::Arc;

use cas_sync_domain::status::{local_covers_named, reconcile, Status, StatusRecord};
use cas_sync_domain::{CacheError, Checksum, Manifest, NamedCache};
use tokio::sync::Semaphore;
use tracing::warn;

use crate::infrastructure::local_cache::LocalCache;
use crate::infrastructure::logging::ProgressReporter;
use crate::infrastructure::remote::RemoteCache;

pub struct TransferEngine {
    local: Arc<LocalCache>,
    remote: Arc<dyn RemoteCache>,
    jobs: usize,
    progress: Arc<dyn ProgressReporter>,
}

impl TransferEngine {
    pub fn new(local: Arc<LocalCache>, remote: Arc<dyn RemoteCache>, jobs: Option<usize>, progress: Arc<dyn ProgressReporter>) -> Self {
        let jobs = jobs.unwrap_or_else(|| remote.jobs()).max(1);
        Self { local, remote, jobs, progress }
    }

    /// Expand any directory checksums in `named` into their manifest's
    /// child file checksums, fetching the manifest itself first if it is
    /// present on neither side. A directory is only "present" once every
    /// child is present, so reconciliation must see the flattened set.
    pub async fn expand_named_cache(&self, named: &mut NamedCache) -> Result<(), CacheError> {
        let directory_checksums: Vec<Checksum> = named.checksums().filter(|c| c.is_directory()).cloned().collect();

        for dir_checksum in directory_checksums {
            let names: Vec<String> = named.names_for(&dir_checksum).map(|s| s.iter().cloned().collect()).unwrap_or_default();

            if !self.local.exists(&dir_checksum).await {
                let manifest_path = self.local.layout().object_path(&dir_checksum);
                self.remote.download(&dir_checksum, &manifest_path).await?;
            }

            let manifest_path = self.local.layout().object_path(&dir_checksum);
            let bytes = tokio::fs::read(&manifest_path).await?;
            let manifest = Manifest::from_canonical_bytes(&bytes)?;

            for entry in manifest.entries() {
                named.extend_with(entry.md5.clone(), names.clone());
            }
        }
        Ok(())
    }

    /// Build the status table for `named`, skipping the remote probe when
    /// `for_download` is true and local presence already covers every
    /// named checksum.
    async fn reconcile(&self, named: &NamedCache, for_download: bool) -> Result<Vec<StatusRecord>, CacheError> {
        let checksums: HashSet<Checksum> = named.checksums().cloned().collect();
        let local = self.local.exists_all(&checksums).await;

        let remote = if for_download && local_covers_named(named, &local) {
            local.clone()
        } else {
            self.remote.exists(&checksums).await?
        };

        let records = reconcile(named, &local, &remote);
        for record in &records {
            if record.status == Status::Missing {
                warn!(checksum = %record.checksum, names = ?record.names, "object missing from both local and remote cache");
                self.progress.write(&format!("missing: {} ({})", record.checksum, record.names.join(", ")));
            }
        }
        Ok(records)
    }

    /// Upload every `New` object in `named` to the remote.
    pub async fn push(&self, named: &NamedCache) -> Result<usize, CacheError> {
        let records = self.reconcile(named, false).await?;
        let plan: Vec<Checksum> = records.into_iter().filter(|r| r.status == Status::New).map(|r| r.checksum).collect();
        if plan.is_empty() {
            return Ok(0);
        }
        let attempted = plan.len();
        let failures = self
            .run_batch(plan, |checksum, local, remote| async move {
                let src = local.layout().object_path(&checksum);
                remote.upload(&src, &checksum).await
            })
            .await;
        if failures > 0 {
            return Err(CacheError::UploadError(failures));
        }
        Ok(attempted)
    }

    /// Download every `Deleted` object in `named` from the remote.
    pub async fn pull(&self, named: &NamedCache) -> Result<usize, CacheError> {
        let records = self.reconcile(named, true).await?;
        let plan: Vec<Checksum> = records.into_iter().filter(|r| r.status == Status::Deleted).map(|r| r.checksum).collect();
        if plan.is_empty() {
            return Ok(0);
        }
        let attempted = plan.len();
        let failures = self
            .run_batch(plan, |checksum, local, remote| async move {
                let dst = local.layout().object_path(&checksum);
                remote.download(&checksum, &dst).await
            })
            .await;
        if failures > 0 {
            return Err(CacheError::DownloadError(failures));
        }
        Ok(attempted)
    }

    /// Alias for `pull`, matching the CLI's `fetch` subcommand: populate
    /// the local cache without checking anything out to the working tree.
    pub async fn fetch(&self, named: &NamedCache) -> Result<usize, CacheError> {
        self.pull(named).await
    }

    /// Run `transfer` over every item in `plan` with at most `self.jobs`
    /// concurrent workers, returning the number of failures.
    async fn run_batch<F, Fut>(&self, plan: Vec<Checksum>, transfer: F) -> usize
    where
        F: Fn(Checksum, Arc<LocalCache>, Arc<dyn RemoteCache>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), CacheError>> + Send,
    {
        let semaphore = Arc::new(Semaphore::new(self.jobs));
        let transfer = Arc::new(transfer);
        let mut handles = Vec::with_capacity(plan.len());

        for checksum in plan {
            let permit = Arc::clone(&semaphore);
            let local = Arc::clone(&self.local);
            let remote = Arc::clone(&self.remote);
            let transfer = Arc::clone(&transfer);
            let progress = Arc::clone(&self.progress);

            handles.push(tokio::spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore never closed");
                match transfer(checksum.clone(), local, remote).await {
                    Ok(()) => 0,
                    Err(e) => {
                        progress.write(&format!("transfer failed for {checksum}: {e}"));
                        1
                    }
                }
            }));
        }

        let mut failures = 0;
        for handle in handles {
            failures += handle.await.unwrap_or(1);
        }
        failures
    }
}
