//! Fetch scheduler.
//!
//! Runs one fetch invocation end to end:
//!
//! 1. Dispatch every target to a host (or record it unsupported)
//! 2. Authenticate each distinct host once
//! 3. Resolve targets to tracks, in caller order
//! 4. Process the flattened worklist with a fixed pool of `limit` workers
//!    (download, cover, tag, conflict check, atomic write)
//! 5. Assemble the [`FetchReport`] grouped by target
//!
//! Per-track and per-target failures end up in the report. Only a
//! credential store that cannot be read aborts the invocation.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use futures::StreamExt;
use musicdl_core::{
    ConflictDecision, FetchReport, SkipReason, TargetReport, TargetStatus, Track, TrackError,
    TrackOutcome, TrackReport,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::conflict::{ConflictResolver, Placement, WriteOutcome};
use crate::context::FetchContext;
use crate::error::{FetchError, Stage};
use crate::host::CredentialStore;
use crate::registry::{Dispatch, HostRegistry};
use crate::source::{MusicHost, Session};
use crate::tagger::{Id3Tagger, Tagger};

/// Smallest accepted concurrency limit.
pub const MIN_LIMIT: usize = 1;
/// Largest accepted concurrency limit.
pub const MAX_LIMIT: usize = 8;

// ============================================================================
// Options
// ============================================================================

/// Per-invocation options.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Maximum number of tracks processed at once.
    pub limit: usize,
    /// Policy for existing destination files.
    pub conflict: ConflictDecision,
    /// Destination directory. Created if missing.
    pub destination: PathBuf,
}

impl FetchOptions {
    /// Creates options with the default conflict decision.
    pub fn new(destination: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            limit,
            conflict: ConflictDecision::default(),
            destination: destination.into(),
        }
    }

    /// Sets the conflict decision.
    #[must_use]
    pub fn with_conflict(mut self, conflict: ConflictDecision) -> Self {
        self.conflict = conflict;
        self
    }

    /// Checks the concurrency limit.
    pub fn validate(&self) -> Result<(), FetchError> {
        if (MIN_LIMIT..=MAX_LIMIT).contains(&self.limit) {
            Ok(())
        } else {
            Err(FetchError::InvalidOptions(format!(
                "limit must be between {MIN_LIMIT} and {MAX_LIMIT}, got {}",
                self.limit
            )))
        }
    }
}

// ============================================================================
// Internal Plan
// ============================================================================

/// Where a target stands before the worker pool runs.
struct TargetPlan {
    target: String,
    host: Option<usize>,
    host_id: Option<String>,
    status: Option<TrackError>,
    tracks: Vec<Track>,
}

/// One unit of work for the pool.
struct WorkItem {
    slot: (usize, usize),
    host: Arc<dyn MusicHost>,
    session: Arc<Session>,
    track: Track,
}

/// Shared state handed to every worker.
struct Worker {
    queue: Arc<Mutex<VecDeque<WorkItem>>>,
    resolver: Arc<ConflictResolver>,
    tagger: Arc<dyn Tagger>,
    destination: PathBuf,
    cancel: CancellationToken,
}

// ============================================================================
// Scheduler
// ============================================================================

/// Orchestrates fetch invocations over a [`HostRegistry`].
pub struct FetchScheduler {
    registry: Arc<HostRegistry>,
    credentials: Arc<dyn CredentialStore>,
    tagger: Arc<dyn Tagger>,
}

impl FetchScheduler {
    /// Creates a scheduler reading credentials from `ctx`.
    pub fn new(registry: Arc<HostRegistry>, ctx: &FetchContext) -> Self {
        Self::with_credentials(registry, Arc::clone(&ctx.credentials))
    }

    /// Creates a scheduler with an explicit credential store.
    pub fn with_credentials(
        registry: Arc<HostRegistry>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            registry,
            credentials,
            tagger: Arc::new(Id3Tagger::new()),
        }
    }

    /// Replaces the tagger.
    #[must_use]
    pub fn with_tagger(mut self, tagger: Arc<dyn Tagger>) -> Self {
        self.tagger = tagger;
        self
    }

    /// Runs one invocation and returns the aggregated report.
    ///
    /// Cancelling `cancel` stops new work from starting; in-flight tracks
    /// finish and everything not started is reported `Cancelled`.
    ///
    /// # Errors
    ///
    /// Invalid options, an uncreatable destination, or an unreadable
    /// credential store.
    #[instrument(skip_all, fields(targets = targets.len(), limit = options.limit))]
    pub async fn run(
        &self,
        targets: &[String],
        options: &FetchOptions,
        cancel: CancellationToken,
    ) -> Result<FetchReport, FetchError> {
        options.validate()?;
        let started_at = Utc::now();
        tokio::fs::create_dir_all(&options.destination).await?;

        info!(conflict = %options.conflict, "Starting fetch");

        let mut plans = self.dispatch(targets);
        let sessions = self.authenticate(&plans, &cancel).await?;
        self.resolve(&mut plans, &sessions, options.limit, &cancel).await;

        let results = self.process(&plans, &sessions, options, &cancel).await;
        let report = assemble(started_at, plans, results, cancel.is_cancelled());

        let summary = report.summary();
        info!(
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            failed = summary.failed,
            failed_targets = summary.failed_targets + summary.unsupported,
            "Fetch finished"
        );
        Ok(report)
    }

    fn dispatch(&self, targets: &[String]) -> Vec<TargetPlan> {
        targets
            .iter()
            .map(|target| match self.registry.dispatch(target) {
                Dispatch::Host { index, host, .. } => TargetPlan {
                    target: target.clone(),
                    host: Some(index),
                    host_id: Some(host.id().to_string()),
                    status: None,
                    tracks: Vec::new(),
                },
                Dispatch::Unsupported { target } => {
                    warn!(url = %target, "Unsupported target");
                    TargetPlan {
                        status: Some(TrackError::UnsupportedTarget(target.clone())),
                        target,
                        host: None,
                        host_id: None,
                        tracks: Vec::new(),
                    }
                }
            })
            .collect()
    }

    /// Authenticates every host referenced by `plans`, once each.
    async fn authenticate(
        &self,
        plans: &[TargetPlan],
        cancel: &CancellationToken,
    ) -> Result<HashMap<usize, Result<Arc<Session>, TrackError>>, FetchError> {
        let mut sessions = HashMap::new();

        for index in plans.iter().filter_map(|p| p.host) {
            if sessions.contains_key(&index) {
                continue;
            }
            let host = &self.registry.hosts()[index];

            if cancel.is_cancelled() {
                sessions.insert(index, Err(TrackError::Cancelled));
                continue;
            }

            let session = match host.authenticate(self.credentials.as_ref()).await {
                Ok(session) => {
                    info!(host = host.id(), account = session.account(), "Authenticated");
                    Ok(Arc::new(session))
                }
                Err(e) if e.is_fatal() => {
                    error!(host = host.id(), error = %e, "Credential store unavailable");
                    return Err(e);
                }
                Err(e) => {
                    warn!(host = host.id(), error = %e, "Authentication failed");
                    Err(e.to_track_error(Stage::Authenticate))
                }
            };
            sessions.insert(index, session);
        }

        Ok(sessions)
    }

    /// Resolves authenticated targets into tracks, `limit` targets at a time.
    async fn resolve(
        &self,
        plans: &mut [TargetPlan],
        sessions: &HashMap<usize, Result<Arc<Session>, TrackError>>,
        limit: usize,
        cancel: &CancellationToken,
    ) {
        let registry = &self.registry;
        let resolved: Vec<(Vec<Track>, Option<TrackError>)> =
            futures::stream::iter(plans.iter())
                .map(|plan| async move {
                    if plan.status.is_some() {
                        return (Vec::new(), None);
                    }
                    let Some(index) = plan.host else {
                        return (Vec::new(), None);
                    };
                    let session = match sessions.get(&index) {
                        Some(Ok(session)) => session,
                        Some(Err(e)) => return (Vec::new(), Some(e.clone())),
                        None => return (Vec::new(), Some(TrackError::Cancelled)),
                    };
                    if cancel.is_cancelled() {
                        return (Vec::new(), Some(TrackError::Cancelled));
                    }
                    resolve_target(registry.hosts()[index].as_ref(), &plan.target, session).await
                })
                .buffered(limit)
                .collect()
                .await;

        for (plan, (tracks, error)) in plans.iter_mut().zip(resolved) {
            plan.tracks = tracks;
            if plan.status.is_none() {
                plan.status = error;
            }
        }
    }

    /// Runs the worker pool and returns one outcome per scheduled track slot.
    async fn process(
        &self,
        plans: &[TargetPlan],
        sessions: &HashMap<usize, Result<Arc<Session>, TrackError>>,
        options: &FetchOptions,
        cancel: &CancellationToken,
    ) -> HashMap<(usize, usize), TrackOutcome> {
        let mut queue = VecDeque::new();
        for (target_index, plan) in plans.iter().enumerate() {
            let Some(host_index) = plan.host else { continue };
            let Some(Ok(session)) = sessions.get(&host_index) else {
                continue;
            };
            for (track_index, track) in plan.tracks.iter().enumerate() {
                queue.push_back(WorkItem {
                    slot: (target_index, track_index),
                    host: Arc::clone(&self.registry.hosts()[host_index]),
                    session: Arc::clone(session),
                    track: track.clone(),
                });
            }
        }

        let total = queue.len();
        let workers = options.limit.min(total);
        debug!(tracks = total, workers, "Worklist built");

        let shared = Arc::new(Worker {
            queue: Arc::new(Mutex::new(queue)),
            resolver: Arc::new(ConflictResolver::new(options.conflict)),
            tagger: Arc::clone(&self.tagger),
            destination: options.destination.clone(),
            cancel: cancel.clone(),
        });

        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let shared = Arc::clone(&shared);
                tokio::spawn(async move { shared.run(id).await })
            })
            .collect();

        let mut results = HashMap::with_capacity(total);
        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok(outcomes) => results.extend(outcomes),
                Err(e) => error!(error = %e, "Worker task failed"),
            }
        }
        results
    }
}

impl std::fmt::Debug for FetchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchScheduler")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Drains one target's track stream.
///
/// Tracks yielded before a failure are kept and still processed.
async fn resolve_target(
    host: &dyn MusicHost,
    target: &str,
    session: &Session,
) -> (Vec<Track>, Option<TrackError>) {
    let url = match url::Url::parse(target.trim()) {
        Ok(url) => url,
        Err(e) => return (Vec::new(), Some(TrackError::Resolve(e.to_string()))),
    };

    let mut tracks = Vec::new();
    let mut stream = host.resolve(&url, session);
    while let Some(item) = stream.next().await {
        match item {
            Ok(track) => tracks.push(track),
            Err(e) => {
                warn!(url = target, error = %e, resolved = tracks.len(), "Resolve failed");
                return (tracks, Some(e.to_track_error(Stage::Resolve)));
            }
        }
    }

    info!(url = target, host = host.id(), tracks = tracks.len(), "Target resolved");
    (tracks, None)
}

// ============================================================================
// Worker
// ============================================================================

impl Worker {
    /// Pulls items until the queue is empty or the run is cancelled.
    async fn run(&self, id: usize) -> Vec<((usize, usize), TrackOutcome)> {
        let mut outcomes = Vec::new();

        loop {
            if self.cancel.is_cancelled() {
                debug!(worker = id, "Cancelled, stopping");
                break;
            }
            let next = self
                .queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            let Some(item) = next else { break };

            let outcome = self.process(&item).await;
            match &outcome {
                TrackOutcome::Downloaded { path } => {
                    info!(track = %item.track.display_name(), path = %path.display(), "Downloaded");
                }
                TrackOutcome::Skipped { reason, .. } => {
                    info!(track = %item.track.display_name(), %reason, "Skipped");
                }
                TrackOutcome::Failed { error } => {
                    warn!(track = %item.track.display_name(), %error, "Track failed");
                }
            }
            outcomes.push((item.slot, outcome));
        }

        outcomes
    }

    /// Download, tag and write one track.
    async fn process(&self, item: &WorkItem) -> TrackOutcome {
        let path = destination_path(&self.destination, &item.track);
        let _guard = self.resolver.lock(&path).await;

        match self.resolver.check(&path) {
            Ok(Placement::Skip) => return skipped(path),
            Ok(Placement::Create | Placement::Replace) => {}
            Err(e) => return failed(&FetchError::from(e)),
        }

        let audio = match item.host.download(&item.track, &item.session).await {
            Ok(audio) => audio,
            Err(e) => return failed(&e),
        };

        let cover = match item.host.cover(&item.track, &item.session).await {
            Ok(cover) => cover,
            Err(e) => {
                warn!(track = %item.track.id, error = %e, "Cover download failed, tagging without it");
                None
            }
        };

        let tagged = match self.tagger.apply(&audio, &item.track, cover.as_deref()) {
            Ok(tagged) => tagged,
            Err(e) => return failed(&FetchError::from(e)),
        };

        match self.resolver.write(&path, tagged).await {
            Ok(WriteOutcome::Written) => TrackOutcome::Downloaded { path },
            Ok(WriteOutcome::Skipped) => skipped(path),
            Err(e) => failed(&FetchError::from(e)),
        }
    }
}

fn skipped(path: PathBuf) -> TrackOutcome {
    TrackOutcome::Skipped {
        path,
        reason: SkipReason::AlreadyExists,
    }
}

fn failed(error: &FetchError) -> TrackOutcome {
    TrackOutcome::failed(error.to_track_error(Stage::Process))
}

// ============================================================================
// Report Assembly
// ============================================================================

fn assemble(
    started_at: chrono::DateTime<Utc>,
    plans: Vec<TargetPlan>,
    mut results: HashMap<(usize, usize), TrackOutcome>,
    cancelled: bool,
) -> FetchReport {
    let targets = plans
        .into_iter()
        .enumerate()
        .map(|(target_index, plan)| {
            let tracks = plan
                .tracks
                .into_iter()
                .enumerate()
                .map(|(track_index, track)| {
                    let outcome = results
                        .remove(&(target_index, track_index))
                        .unwrap_or_else(|| missing_outcome(cancelled));
                    TrackReport { track, outcome }
                })
                .collect();

            TargetReport {
                target: plan.target,
                host: plan.host_id,
                status: match plan.status {
                    Some(error) => TargetStatus::Failed { error },
                    None => TargetStatus::Resolved,
                },
                tracks,
            }
        })
        .collect();

    FetchReport::new(started_at, targets)
}

/// Outcome for a track no worker reported on.
fn missing_outcome(cancelled: bool) -> TrackOutcome {
    if cancelled {
        TrackOutcome::failed(TrackError::Cancelled)
    } else {
        TrackOutcome::failed(TrackError::Io("worker terminated unexpectedly".to_string()))
    }
}

/// Returns the destination path for `track` under `dir`.
pub fn destination_path(dir: &Path, track: &Track) -> PathBuf {
    dir.join(track.file_name())
}

// ============================================================================
// Tests
// ============================================================================
