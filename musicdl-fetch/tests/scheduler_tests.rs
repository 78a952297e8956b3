//! End-to-end scheduler behavior against mock hosts.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use musicdl_core::{
    ConflictDecision, CookieRecord, Domain, FetchReport, MAX_FILE_NAME_BYTES, Track, TrackError,
    TrackId, TrackOutcome,
};
use musicdl_fetch::{
    CancellationToken, CredentialError, CredentialStore, FetchError, FetchOptions, FetchScheduler,
    HostRegistry, MemoryCredentialStore, MusicHost, Session, TrackStream, load_session,
};
use url::Url;

// ============================================================================
// Mock Host
// ============================================================================

/// Resolves `/album/<n>` to `n` tracks, `/same` to one fixed track,
/// `/mixed` to one good and one untaggable track, `/long` to a track with
/// a very long Cyrillic title, `/missing` to not-found and `/partial` to one
/// track followed by an error.
struct MockHost {
    domain: Domain,
    required_cookie: Option<&'static str>,
    delay: Duration,
    failing: HashSet<String>,
    cancel_after_first: Option<CancellationToken>,
    auth_calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    downloads: AtomicUsize,
}

impl MockHost {
    fn new(domain: &str) -> Self {
        Self {
            domain: Domain::parse(domain).unwrap(),
            required_cookie: None,
            delay: Duration::from_millis(5),
            failing: HashSet::new(),
            cancel_after_first: None,
            auth_calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
        }
    }

    fn requiring(mut self, cookie: &'static str) -> Self {
        self.required_cookie = Some(cookie);
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn failing_on(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    fn cancelling(mut self, token: CancellationToken) -> Self {
        self.cancel_after_first = Some(token);
        self
    }

    fn track(id: &str, title: &str) -> Track {
        Track::new(TrackId::new(id), title, "Artist", format!("ref-{id}")).with_album("Album")
    }

    fn tracks_for(url: &Url) -> Vec<Result<Track, FetchError>> {
        let segments: Vec<&str> = url.path_segments().map(Iterator::collect).unwrap_or_default();
        match segments.as_slice() {
            ["album", n] => {
                let count: usize = n.parse().unwrap();
                (1..=count)
                    .map(|i| Ok(Self::track(&format!("{n}-{i}"), &format!("Song {i}"))))
                    .collect()
            }
            ["same"] => vec![Ok(Self::track("dup", "Same"))],
            ["mixed"] => vec![
                Ok(Self::track("good", "Good")),
                Ok(Self::track("bad-audio", "Bad")),
            ],
            ["long"] => vec![Ok(Track::new(
                TrackId::new("long"),
                "Ж".repeat(140),
                "Исполнитель",
                "ref-long",
            ))],
            ["missing"] => vec![Err(FetchError::NotFound(url.to_string()))],
            ["partial"] => vec![
                Ok(Self::track("p-1", "First")),
                Err(FetchError::Unresolvable("page 2".to_string())),
            ],
            _ => vec![Err(FetchError::Unresolvable(url.to_string()))],
        }
    }
}

fn mp3_bytes() -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xFB, 0x90, 0x64];
    bytes.extend(std::iter::repeat_n(0u8, 256));
    bytes
}

#[async_trait]
impl MusicHost for MockHost {
    fn id(&self) -> &str {
        "mock"
    }

    fn domain(&self) -> &Domain {
        &self.domain
    }

    async fn authenticate(&self, store: &dyn CredentialStore) -> Result<Session, FetchError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        let required: Vec<&str> = self.required_cookie.into_iter().collect();
        load_session(store, &self.domain, &required).await
    }

    fn resolve<'a>(&'a self, url: &'a Url, _session: &'a Session) -> TrackStream<'a> {
        Box::pin(futures::stream::iter(Self::tracks_for(url)))
    }

    async fn download(&self, track: &Track, _session: &Session) -> Result<Vec<u8>, FetchError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.downloads.fetch_add(1, Ordering::SeqCst);

        if let Some(token) = &self.cancel_after_first {
            token.cancel();
        }

        match track.id.as_str() {
            id if self.failing.contains(id) => {
                Err(FetchError::InvalidResponse(format!("no stream for {id}")))
            }
            "bad-audio" => Ok(b"RIFF....WAVE".to_vec()),
            _ => Ok(mp3_bytes()),
        }
    }
}

/// A store that cannot be read.
struct BrokenStore;

#[async_trait]
impl CredentialStore for BrokenStore {
    async fn get(&self, _: &Domain, _: &str) -> Result<Option<String>, CredentialError> {
        Err(CredentialError::Unavailable("corrupt".into()))
    }

    async fn get_all(&self, _: &Domain) -> Result<Vec<CookieRecord>, CredentialError> {
        Err(CredentialError::Unavailable("corrupt".into()))
    }

    async fn set(&self, _: CookieRecord) -> Result<(), CredentialError> {
        Err(CredentialError::Unavailable("corrupt".into()))
    }

    async fn delete(&self, _: &Domain, _: Option<&str>) -> Result<usize, CredentialError> {
        Err(CredentialError::Unavailable("corrupt".into()))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn scheduler_for(host: Arc<MockHost>, store: Arc<dyn CredentialStore>) -> FetchScheduler {
    let registry = HostRegistry::new(vec![host as Arc<dyn MusicHost>]).unwrap();
    FetchScheduler::with_credentials(Arc::new(registry), store)
}

fn empty_store() -> Arc<dyn CredentialStore> {
    Arc::new(MemoryCredentialStore::new())
}

fn targets(urls: &[&str]) -> Vec<String> {
    urls.iter().map(ToString::to_string).collect()
}

fn outcomes(report: &FetchReport) -> Vec<&TrackOutcome> {
    report
        .targets
        .iter()
        .flat_map(|t| &t.tracks)
        .map(|t| &t.outcome)
        .collect()
}

fn count(report: &FetchReport, pred: impl Fn(&TrackOutcome) -> bool) -> usize {
    outcomes(report).into_iter().filter(|o| pred(*o)).count()
}

fn options(dir: &Path, limit: usize, conflict: ConflictDecision) -> FetchOptions {
    FetchOptions::new(dir, limit).with_conflict(conflict)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_never_exceeds_limit() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(MockHost::new("mock.test").with_delay(Duration::from_millis(20)));
    let scheduler = scheduler_for(Arc::clone(&host), empty_store());

    let report = scheduler
        .run(
            &targets(&["https://mock.test/album/7", "https://mock.test/album/5"]),
            &options(dir.path(), 3, ConflictDecision::Error),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let max = host.max_active.load(Ordering::SeqCst);
    assert!(max <= 3, "observed {max} concurrent downloads");
    assert!(max >= 2, "pool never ran tracks in parallel");
    assert_eq!(report.track_count(), 12);
    assert_eq!(count(&report, |o| matches!(o, TrackOutcome::Downloaded { .. })), 12);
    assert!(report.is_success());
}

#[tokio::test]
async fn test_limit_one_is_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(MockHost::new("mock.test"));
    let scheduler = scheduler_for(Arc::clone(&host), empty_store());

    let report = scheduler
        .run(
            &targets(&["https://mock.test/album/4"]),
            &options(dir.path(), 1, ConflictDecision::Error),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(host.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(report.track_count(), 4);
}

#[tokio::test]
async fn test_authenticates_each_host_once() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(MockHost::new("mock.test"));
    let scheduler = scheduler_for(Arc::clone(&host), empty_store());

    scheduler
        .run(
            &targets(&[
                "https://mock.test/album/1",
                "https://sub.mock.test/album/2",
                "https://mock.test/album/3",
            ]),
            &options(dir.path(), 4, ConflictDecision::Error),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(host.auth_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_report_preserves_target_and_track_order() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(MockHost::new("mock.test"));
    let scheduler = scheduler_for(host, empty_store());

    let report = scheduler
        .run(
            &targets(&[
                "https://mock.test/album/3",
                "https://unknown.example.com/a",
                "https://mock.test/album/2",
            ]),
            &options(dir.path(), 8, ConflictDecision::Error),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.targets.len(), 3);
    assert_eq!(report.targets[0].target, "https://mock.test/album/3");
    assert_eq!(report.targets[0].host.as_deref(), Some("mock"));
    assert_eq!(
        report.targets[1].error(),
        Some(&TrackError::UnsupportedTarget(
            "https://unknown.example.com/a".to_string()
        ))
    );
    assert!(report.targets[1].host.is_none());

    let ids: Vec<&str> = report.targets[0]
        .tracks
        .iter()
        .map(|t| t.track.id.as_str())
        .collect();
    assert_eq!(ids, ["3-1", "3-2", "3-3"]);
    assert_eq!(report.targets[2].tracks.len(), 2);

    assert!(!report.is_success());
    assert_eq!(report.summary().unsupported, 1);
}

#[tokio::test]
async fn test_track_failure_does_not_cancel_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(MockHost::new("mock.test").failing_on("5-2"));
    let scheduler = scheduler_for(host, empty_store());

    let report = scheduler
        .run(
            &targets(&["https://mock.test/album/5"]),
            &options(dir.path(), 2, ConflictDecision::Error),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let tracks = &report.targets[0].tracks;
    assert_eq!(tracks.len(), 5);
    assert!(matches!(
        tracks[1].outcome.error(),
        Some(TrackError::Download(_))
    ));
    assert_eq!(count(&report, |o| matches!(o, TrackOutcome::Downloaded { .. })), 4);
    assert!(!report.is_success());
}

#[tokio::test]
async fn test_tag_failure_is_local() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(MockHost::new("mock.test"));
    let scheduler = scheduler_for(host, empty_store());

    let report = scheduler
        .run(
            &targets(&["https://mock.test/mixed"]),
            &options(dir.path(), 2, ConflictDecision::Error),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let tracks = &report.targets[0].tracks;
    assert!(matches!(tracks[0].outcome, TrackOutcome::Downloaded { .. }));
    assert!(matches!(tracks[1].outcome.error(), Some(TrackError::Tag(_))));

    let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
    let bytes = std::fs::read(dir.path().join("Artist - Good (good).mp3")).unwrap();
    assert!(bytes.starts_with(b"ID3"));
    assert!(!report.is_success());
}

#[tokio::test]
async fn test_missing_cookie_reports_auth_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let host = Arc::new(MockHost::new("yandex.ru").requiring("Session_id"));
    let scheduler = scheduler_for(Arc::clone(&host), empty_store());

    let report = scheduler
        .run(
            &targets(&["https://music.yandex.ru/album/1"]),
            &options(&out, 4, ConflictDecision::Ignore),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.targets.len(), 1);
    match report.targets[0].error() {
        Some(TrackError::Auth(message)) => assert!(message.contains("Session_id")),
        other => panic!("expected auth error, got {other:?}"),
    }
    assert!(report.targets[0].tracks.is_empty());
    assert_eq!(host.downloads.load(Ordering::SeqCst), 0);
    assert!(!report.is_success());
    assert!(out.is_dir());
}

#[tokio::test]
async fn test_stored_cookie_authenticates() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(MockHost::new("yandex.ru").requiring("Session_id"));
    let store: Arc<dyn CredentialStore> =
        Arc::new(MemoryCredentialStore::with_records([CookieRecord::new(
            Domain::parse("yandex.ru").unwrap(),
            "Session_id",
            "abc",
        )]));
    let scheduler = scheduler_for(host, store);

    let report = scheduler
        .run(
            &targets(&["https://music.yandex.ru/album/1"]),
            &options(dir.path(), 4, ConflictDecision::Ignore),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.summary().downloaded, 1);
}

#[tokio::test]
async fn test_unreadable_store_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(MockHost::new("mock.test"));
    let scheduler = scheduler_for(host, Arc::new(BrokenStore));

    let err = scheduler
        .run(
            &targets(&["https://mock.test/album/1"]),
            &options(dir.path(), 4, ConflictDecision::Error),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FetchError::Credential(CredentialError::Unavailable(_))
    ));
}

#[tokio::test]
async fn test_unsupported_only_never_touches_store() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(MockHost::new("mock.test"));
    let scheduler = scheduler_for(Arc::clone(&host), Arc::new(BrokenStore));

    let report = scheduler
        .run(
            &targets(&["https://elsewhere.test/x"]),
            &options(dir.path(), 4, ConflictDecision::Error),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(host.auth_calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.summary().unsupported, 1);
}

#[tokio::test]
async fn test_resolve_errors_are_per_target() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(MockHost::new("mock.test"));
    let scheduler = scheduler_for(host, empty_store());

    let report = scheduler
        .run(
            &targets(&[
                "https://mock.test/missing",
                "https://mock.test/partial",
                "https://mock.test/artist/9",
                "https://mock.test/album/0",
            ]),
            &options(dir.path(), 4, ConflictDecision::Error),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(matches!(report.targets[0].error(), Some(TrackError::NotFound(_))));

    let partial = &report.targets[1];
    assert!(matches!(partial.error(), Some(TrackError::Resolve(_))));
    assert_eq!(partial.tracks.len(), 1);
    assert!(matches!(
        partial.tracks[0].outcome,
        TrackOutcome::Downloaded { .. }
    ));

    assert!(matches!(report.targets[2].error(), Some(TrackError::Resolve(_))));

    let empty = &report.targets[3];
    assert!(empty.error().is_none());
    assert!(empty.tracks.is_empty());
}

#[tokio::test]
async fn test_cancellation_marks_remaining_tracks() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();
    let host = Arc::new(MockHost::new("mock.test").cancelling(cancel.clone()));
    let scheduler = scheduler_for(Arc::clone(&host), empty_store());

    let report = scheduler
        .run(
            &targets(&["https://mock.test/album/5"]),
            &options(dir.path(), 1, ConflictDecision::Error),
            cancel,
        )
        .await
        .unwrap();

    let tracks = &report.targets[0].tracks;
    assert_eq!(tracks.len(), 5);
    assert!(matches!(tracks[0].outcome, TrackOutcome::Downloaded { .. }));
    for track in &tracks[1..] {
        assert_eq!(track.outcome.error(), Some(&TrackError::Cancelled));
    }
    assert_eq!(host.downloads.load(Ordering::SeqCst), 1);
    assert!(!report.is_success());
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(MockHost::new("mock.test"));
    let scheduler = scheduler_for(Arc::clone(&host), empty_store());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = scheduler
        .run(
            &targets(&["https://mock.test/album/3"]),
            &options(dir.path(), 2, ConflictDecision::Error),
            cancel,
        )
        .await
        .unwrap();

    assert_eq!(report.targets[0].error(), Some(&TrackError::Cancelled));
    assert_eq!(host.auth_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_long_multibyte_title_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(MockHost::new("mock.test"));
    let scheduler = scheduler_for(host, empty_store());

    let report = scheduler
        .run(
            &targets(&["https://mock.test/long"]),
            &options(dir.path(), 1, ConflictDecision::Error),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let TrackOutcome::Downloaded { path } = outcomes(&report)[0] else {
        panic!("unexpected outcome: {:?}", outcomes(&report));
    };
    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.len() <= MAX_FILE_NAME_BYTES);
    assert!(name.ends_with(" (long).mp3"));
    assert!(path.exists());
    assert!(report.is_success());
}

#[tokio::test]
async fn test_identical_paths_under_ignore() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(MockHost::new("mock.test"));
    let scheduler = scheduler_for(host, empty_store());

    let report = scheduler
        .run(
            &targets(&["https://mock.test/same", "https://mock.test/same"]),
            &options(dir.path(), 4, ConflictDecision::Ignore),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(count(&report, |o| matches!(o, TrackOutcome::Downloaded { .. })), 1);
    assert_eq!(count(&report, |o| matches!(o, TrackOutcome::Skipped { .. })), 1);
    assert!(report.is_success());
}

#[tokio::test]
async fn test_identical_paths_under_error() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(MockHost::new("mock.test"));
    let scheduler = scheduler_for(host, empty_store());

    let report = scheduler
        .run(
            &targets(&["https://mock.test/same", "https://mock.test/same"]),
            &options(dir.path(), 4, ConflictDecision::Error),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(count(&report, |o| matches!(o, TrackOutcome::Downloaded { .. })), 1);
    assert_eq!(
        count(&report, |o| matches!(o.error(), Some(TrackError::Conflict(_)))),
        1
    );
    assert!(report.has_conflicts());
    assert!(!report.is_success());
}

#[tokio::test]
async fn test_existing_file_policies() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Artist - Same (dup).mp3");
    let target = targets(&["https://mock.test/same"]);

    for decision in ConflictDecision::all() {
        std::fs::write(&path, b"old").unwrap();
        let host = Arc::new(MockHost::new("mock.test"));
        let scheduler = scheduler_for(Arc::clone(&host), empty_store());

        let report = scheduler
            .run(&target, &options(dir.path(), 1, *decision), CancellationToken::new())
            .await
            .unwrap();
        let outcome = &report.targets[0].tracks[0].outcome;
        let content = std::fs::read(&path).unwrap();

        match decision {
            ConflictDecision::Error => {
                assert!(matches!(outcome.error(), Some(TrackError::Conflict(_))));
                assert_eq!(content, b"old");
                assert_eq!(host.downloads.load(Ordering::SeqCst), 0);
            }
            ConflictDecision::Ignore => {
                assert!(matches!(outcome, TrackOutcome::Skipped { .. }));
                assert_eq!(content, b"old");
                assert_eq!(host.downloads.load(Ordering::SeqCst), 0);
            }
            ConflictDecision::Overwrite => {
                assert!(matches!(outcome, TrackOutcome::Downloaded { .. }));
                assert!(content.starts_with(b"ID3"));
            }
        }
    }

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["Artist - Same (dup).mp3"]);
}

#[tokio::test]
async fn test_invalid_limit_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let scheduler = scheduler_for(Arc::new(MockHost::new("mock.test")), empty_store());

    for limit in [0, 9] {
        let err = scheduler
            .run(
                &targets(&["https://mock.test/album/1"]),
                &options(dir.path(), limit, ConflictDecision::Error),
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidOptions(_)));
    }
}
