#![allow(clippy::unwrap_used)]
// Integration tests for `Provisioner`, `Consumer` and `audit` against a
// scratch CCD directory and an in-memory store.

use std::fs;
use std::io;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader, ReadBuf};
use tokio_util::sync::CancellationToken;

use uvpn_core::counter::DEFAULT_COUNTER_KEY;
use uvpn_core::{
    AllocationError, AuditStatus, CounterError, Consumer, Envelope, Identity, KeyValueStore,
    MemoryStore, ProvisionError, ProvisionState, Provisioner, ProvisionerConfig,
    ProvisioningRequest, Resolver, StaticDirectory, StoreError, Subscription,
    UnresolvablePolicy, audit,
};

// ── Helpers ─────────────────────────────────────────────────────────

/// Resolves IPv4 literals and one internal hostname; nothing else.
struct TestResolver;

#[async_trait]
impl Resolver for TestResolver {
    async fn resolve(&self, host: &str) -> Option<Ipv4Addr> {
        match host {
            "git.corp.internal" => Some(Ipv4Addr::new(10, 16, 8, 20)),
            other => other.parse().ok(),
        }
    }
}

/// `TestResolver` behind a delay, so requests overlap.
struct SlowResolver(Duration);

#[async_trait]
impl Resolver for SlowResolver {
    async fn resolve(&self, host: &str) -> Option<Ipv4Addr> {
        tokio::time::sleep(self.0).await;
        TestResolver.resolve(host).await
    }
}

/// A stream whose every read fails.
struct ResetStream;

impl AsyncRead for ResetStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "connection reset",
        )))
    }
}

/// Memory store whose writes to the counter key fail. Optionally swaps the
/// freshly created CCD file for a directory first, so it cannot be removed.
struct BrokenCounterStore {
    inner: MemoryStore,
    sabotage: Option<PathBuf>,
}

#[async_trait]
impl KeyValueStore for BrokenCounterStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if key != DEFAULT_COUNTER_KEY {
            return self.inner.set(key, value).await;
        }
        if let Some(path) = &self.sabotage {
            fs::remove_file(path).unwrap();
            fs::create_dir(path).unwrap();
        }
        Err(StoreError::Unavailable {
            reason: "connection reset".into(),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete(key).await
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.inner.keys(prefix).await
    }
}

fn roster() -> Arc<StaticDirectory> {
    Arc::new(StaticDirectory::new(vec![
        Identity {
            account: "wangerxiao".into(),
            display_name: Some("王二小".into()),
            employee_id: Some("1987".into()),
        },
        Identity {
            account: "lisi".into(),
            display_name: Some("李四".into()),
            employee_id: Some("2001".into()),
        },
    ]))
}

fn config(dir: &Path) -> ProvisionerConfig {
    ProvisionerConfig::new(dir)
}

fn provisioner_with(
    dir: &Path,
    store: Arc<dyn KeyValueStore>,
    tweak: impl FnOnce(&mut ProvisionerConfig),
) -> Provisioner {
    let mut config = config(dir);
    tweak(&mut config);
    Provisioner::new(&config, roster(), store).with_resolver(Arc::new(TestResolver))
}

fn setup(counter: &str) -> (TempDir, Arc<MemoryStore>, Provisioner) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::with_entries([(DEFAULT_COUNTER_KEY, counter)]));
    let provisioner = provisioner_with(dir.path(), store.clone(), |_| {});
    (dir, store, provisioner)
}

fn wangerxiao(tokens: &[&str]) -> ProvisioningRequest {
    ProvisioningRequest::new("王二小", "1987", tokens.iter().copied())
}

fn envelope(msg_id: &str, tokens: &[&str]) -> Envelope {
    envelope_for("王二小", "1987", msg_id, tokens)
}

fn envelope_for(name: &str, id: &str, msg_id: &str, tokens: &[&str]) -> Envelope {
    let body = json!({
        "SpName": "UVPN权限",
        "Userid": id,
        "Eid": id,
        "DisplayName": name,
        "UVPNDestIps": tokens.iter().map(|t| json!({"DestIp": t})).collect::<Vec<_>>(),
    });
    Envelope::new("UVPN", body).with_tag("UVPN").with_msg_id(msg_id)
}

fn ndjson(envelope: &Envelope) -> Vec<u8> {
    let mut line = serde_json::to_vec(envelope).unwrap();
    line.push(b'\n');
    line
}

async fn counter_value(store: &dyn KeyValueStore) -> Option<String> {
    store.get(DEFAULT_COUNTER_KEY).await.unwrap()
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

// ── First-time provisioning ─────────────────────────────────────────

#[tokio::test]
async fn test_new_account_gets_address_and_routes() {
    let (dir, store, provisioner) = setup("5");

    let outcome = provisioner
        .provision(
            &wangerxiao(&[
                "10.16.3.0/24",
                "192.168.5.9",
                "git.corp.internal",
                "no-such-host.invalid",
            ]),
            None,
        )
        .await
        .unwrap();

    assert_eq!(outcome.account, "wangerxiao");
    assert_eq!(outcome.path, dir.path().join("wangerxiao"));
    let allocation = outcome.allocation.unwrap();
    assert_eq!(allocation.offset, 5);
    assert_eq!(allocation.address, Ipv4Addr::new(10, 11, 0, 5));
    assert_eq!(outcome.skipped, vec!["no-such-host.invalid".to_string()]);
    assert_eq!(counter_value(store.as_ref()).await.as_deref(), Some("6"));

    let content = read(&outcome.path);
    assert!(content.ends_with("\"\n\n"));
    insta::assert_snapshot!(content.trim_end(), @r#"
    ifconfig-push 10.11.0.5 255.255.0.0
    push "route 10.16.3.0 255.255.255.0"
    push "route 192.168.5.9 255.255.255.255"
    push "route 10.16.8.20 255.255.255.255"
    "#);
}

#[tokio::test]
async fn test_existing_account_only_gets_routes_appended() {
    let (dir, store, provisioner) = setup("5");
    let path = dir.path().join("wangerxiao");
    fs::write(&path, "ifconfig-push 10.11.0.3 255.255.0.0\n").unwrap();

    let outcome = provisioner
        .provision(&wangerxiao(&["192.168.5.8"]), None)
        .await
        .unwrap();

    assert_eq!(outcome.allocation, None);
    assert_eq!(counter_value(store.as_ref()).await.as_deref(), Some("5"));
    assert_eq!(
        read(&path),
        "ifconfig-push 10.11.0.3 255.255.0.0\npush \"route 192.168.5.8 255.255.255.255\"\n\n"
    );
}

#[tokio::test]
async fn test_consecutive_accounts_get_consecutive_addresses() {
    let (dir, store, provisioner) = setup("2");

    provisioner
        .provision(&wangerxiao(&["10.0.0.0/8"]), None)
        .await
        .unwrap();
    let second = provisioner
        .provision(&ProvisioningRequest::new("李四", "2001", ["10.0.0.0/8"]), None)
        .await
        .unwrap();

    assert_eq!(second.allocation.unwrap().address, Ipv4Addr::new(10, 11, 0, 3));
    assert!(read(&dir.path().join("lisi")).starts_with("ifconfig-push 10.11.0.3 255.255.0.0\n"));
    assert_eq!(counter_value(store.as_ref()).await.as_deref(), Some("4"));
}

#[tokio::test]
async fn test_no_clauses_means_nothing_appended() {
    let (dir, _store, provisioner) = setup("5");

    let outcome = provisioner
        .provision(&wangerxiao(&["no-such-host.invalid"]), None)
        .await
        .unwrap();

    assert!(outcome.clauses.is_empty());
    assert_eq!(
        read(&dir.path().join("wangerxiao")),
        "ifconfig-push 10.11.0.5 255.255.0.0\n"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_events_allocate_once() {
    let (dir, store, provisioner) = setup("7");
    let provisioner = Arc::new(provisioner);

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let provisioner = Arc::clone(&provisioner);
        tasks.spawn(async move {
            provisioner
                .provision(&wangerxiao(&["192.168.5.9"]), None)
                .await
                .unwrap()
        });
    }
    let outcomes = tasks.join_all().await;

    assert_eq!(outcomes.iter().filter(|o| o.allocation.is_some()).count(), 1);
    assert_eq!(counter_value(store.as_ref()).await.as_deref(), Some("8"));

    let content = read(&dir.path().join("wangerxiao"));
    assert_eq!(content.matches("ifconfig-push").count(), 1);
    assert_eq!(content.matches("push \"route 192.168.5.9").count(), 8);
}

// ── Failure exits ───────────────────────────────────────────────────

#[tokio::test]
async fn test_unknown_person_is_identity_not_found() {
    let (dir, store, provisioner) = setup("5");

    let err = provisioner
        .provision(&ProvisioningRequest::new("王二小", "1988", ["10.0.0.0/8"]), None)
        .await
        .unwrap_err();

    assert_eq!(err.state(), ProvisionState::IdentityNotFound);
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    assert_eq!(counter_value(store.as_ref()).await.as_deref(), Some("5"));
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let (_dir, _store, provisioner) = setup("5");

    let err = provisioner
        .handle(&Envelope::new("UVPN", json!({"Eid": "1987"})))
        .await
        .unwrap_err();
    assert_eq!(err.state(), ProvisionState::ParseError);
}

#[tokio::test]
async fn test_unseeded_counter_fails_allocation_without_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let provisioner = provisioner_with(dir.path(), Arc::new(MemoryStore::new()), |_| {});

    let err = provisioner
        .provision(&wangerxiao(&["10.0.0.0/8"]), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProvisionError::AllocationFailed {
            source: AllocationError::Counter(CounterError::CounterMissing { .. }),
            ..
        }
    ));
    assert!(!dir.path().join("wangerxiao").exists());
}

#[tokio::test]
async fn test_exhausted_pool_fails_allocation_without_a_file() {
    let (dir, store, provisioner) = setup("65534");

    let err = provisioner
        .provision(&wangerxiao(&["10.0.0.0/8"]), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProvisionError::AllocationFailed {
            source: AllocationError::Pool(_),
            ..
        }
    ));
    assert!(!dir.path().join("wangerxiao").exists());
    assert_eq!(counter_value(store.as_ref()).await.as_deref(), Some("65534"));
}

#[tokio::test]
async fn test_failed_counter_commit_removes_the_new_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(BrokenCounterStore {
        inner: MemoryStore::with_entries([(DEFAULT_COUNTER_KEY, "5")]),
        sabotage: None,
    });
    let provisioner = provisioner_with(dir.path(), store.clone(), |_| {});

    let err = provisioner
        .provision(&wangerxiao(&["10.0.0.0/8"]), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProvisionError::AllocationFailed {
            source: AllocationError::Counter(CounterError::StoreUnavailable { .. }),
            ..
        }
    ));
    assert!(!err.is_fatal());
    assert!(!dir.path().join("wangerxiao").exists());
    assert_eq!(counter_value(store.as_ref()).await.as_deref(), Some("5"));
}

#[tokio::test]
async fn test_failed_compensation_is_fatal_inconsistency() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wangerxiao");
    let store = Arc::new(BrokenCounterStore {
        inner: MemoryStore::with_entries([(DEFAULT_COUNTER_KEY, "5")]),
        sabotage: Some(path.clone()),
    });
    let provisioner = provisioner_with(dir.path(), store, |_| {});

    let err = provisioner
        .provision(&wangerxiao(&["10.0.0.0/8"]), None)
        .await
        .unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(err.state(), ProvisionState::AllocationFailed);
    let ProvisionError::Inconsistent { offset, path: reported, .. } = &err else {
        panic!("expected Inconsistent, got {err:?}");
    };
    assert_eq!(*offset, 5);
    assert_eq!(reported, &path);
}

#[tokio::test]
async fn test_reject_policy_fails_before_appending() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::with_entries([(DEFAULT_COUNTER_KEY, "5")]));
    let provisioner = provisioner_with(dir.path(), store, |c| {
        c.unresolvable = UnresolvablePolicy::Reject;
    });

    let err = provisioner
        .provision(&wangerxiao(&["192.168.5.9", "no-such-host.invalid"]), None)
        .await
        .unwrap_err();

    let ProvisionError::Rejected { tokens, .. } = &err else {
        panic!("expected Rejected, got {err:?}");
    };
    assert_eq!(tokens, &vec!["no-such-host.invalid".to_string()]);
    assert_eq!(err.state(), ProvisionState::Rejected);
    assert!(!read(&dir.path().join("wangerxiao")).contains("route"));
}

// ── Redelivery ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_redelivery_reappends_by_default() {
    let (dir, _store, provisioner) = setup("5");
    let event = envelope("7F000001", &["192.168.5.9"]);

    provisioner.handle(&event).await.unwrap();
    let again = provisioner.handle(&event).await.unwrap();

    assert!(!again.duplicate);
    let content = read(&dir.path().join("wangerxiao"));
    assert_eq!(content.matches("192.168.5.9").count(), 2);
}

#[tokio::test]
async fn test_redelivery_is_skipped_when_deduplicating() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::with_entries([(DEFAULT_COUNTER_KEY, "5")]));
    let provisioner = provisioner_with(dir.path(), store.clone(), |c| {
        c.dedupe_redelivery = true;
    });
    let event = envelope("7F000001", &["192.168.5.9"]);

    provisioner.handle(&event).await.unwrap();
    let again = provisioner.handle(&event).await.unwrap();
    let fresh = provisioner
        .handle(&envelope("7F000002", &["192.168.5.9"]))
        .await
        .unwrap();

    assert!(again.duplicate);
    assert!(again.clauses.is_empty());
    assert!(!fresh.duplicate);
    assert!(
        store
            .get("uvpn:applied:7F000001:wangerxiao")
            .await
            .unwrap()
            .is_some()
    );
    let content = read(&dir.path().join("wangerxiao"));
    assert_eq!(content.matches("192.168.5.9").count(), 2);
}

#[tokio::test]
async fn test_concurrent_redeliveries_apply_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::with_entries([(DEFAULT_COUNTER_KEY, "5")]));
    let provisioner = provisioner_with(dir.path(), store.clone(), |c| {
        c.dedupe_redelivery = true;
    })
    .with_resolver(Arc::new(SlowResolver(Duration::from_millis(100))));
    let event = envelope("7F000001", &["git.corp.internal"]);

    let (first, second) = tokio::join!(provisioner.handle(&event), provisioner.handle(&event));
    let (first, second) = (first.unwrap(), second.unwrap());

    assert!(first.duplicate != second.duplicate);
    let content = read(&dir.path().join("wangerxiao"));
    assert_eq!(content.matches("10.16.8.20").count(), 1);
    assert_eq!(counter_value(store.as_ref()).await.as_deref(), Some("6"));
}

#[tokio::test]
async fn test_stale_redelivery_markers_are_pruned() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::with_entries([
        (DEFAULT_COUNTER_KEY, "5"),
        ("uvpn:applied:OLD:lisi", "2020-01-01T00:00:00+00:00"),
        ("uvpn:applied:JUNK:lisi", "not a timestamp"),
    ]));
    let provisioner = provisioner_with(dir.path(), store.clone(), |c| {
        c.dedupe_redelivery = true;
    });
    provisioner
        .handle(&envelope("7F000001", &["192.168.5.9"]))
        .await
        .unwrap();

    assert_eq!(provisioner.prune_applied().await.unwrap(), 2);
    assert_eq!(
        store.keys("uvpn:applied:").await.unwrap(),
        ["uvpn:applied:7F000001:wangerxiao"]
    );
    assert_eq!(counter_value(store.as_ref()).await.as_deref(), Some("6"));

    let keep_forever = provisioner_with(dir.path(), store.clone(), |c| {
        c.applied_retention_days = 0;
    });
    store
        .set("uvpn:applied:OLD:lisi", "2020-01-01T00:00:00+00:00")
        .await
        .unwrap();
    assert_eq!(keep_forever.prune_applied().await.unwrap(), 0);
    assert_eq!(store.keys("uvpn:applied:").await.unwrap().len(), 2);
}

// ── Consumer ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_consumer_processes_subscribed_envelopes() {
    let (dir, store, provisioner) = setup("5");
    let consumer = Consumer::new(Arc::new(provisioner), Subscription::default());

    let lines = [
        serde_json::to_string(&envelope("A1", &["10.16.3.0/24"])).unwrap(),
        String::new(),
        serde_json::to_string(&envelope("A2", &["192.168.5.9"]).with_tag("other")).unwrap(),
        "{not json".to_string(),
        serde_json::to_string(&Envelope::new(
            "UVPN",
            json!({"DisplayName": "nobody", "Eid": "0"}),
        ).with_tag("UVPN"))
        .unwrap(),
        serde_json::to_string(&envelope("A3", &["192.168.5.8"])).unwrap(),
    ];
    let input = lines.join("\n");

    let summary = consumer
        .run(input.as_bytes(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.received, 5);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(counter_value(store.as_ref()).await.as_deref(), Some("6"));

    let content = read(&dir.path().join("wangerxiao"));
    assert!(content.contains("10.16.3.0 255.255.255.0"));
    assert!(content.contains("192.168.5.8 255.255.255.255"));
    assert!(!content.contains("192.168.5.9"));
}

#[tokio::test]
async fn test_consumer_drops_a_non_utf8_line_and_keeps_going() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::with_entries([(DEFAULT_COUNTER_KEY, "5")]));
    let provisioner = provisioner_with(dir.path(), store.clone(), |_| {})
        .with_resolver(Arc::new(SlowResolver(Duration::from_millis(100))));
    let consumer = Consumer::new(Arc::new(provisioner), Subscription::default());

    let mut input = ndjson(&envelope("A1", &["10.16.3.0/24"]));
    input.extend_from_slice(b"\xff\xfe garbage\n");
    input.extend(ndjson(&envelope_for("李四", "2001", "A2", &["192.168.5.9"])));

    let summary = consumer
        .run(input.as_slice(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.received, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    let first = read(&dir.path().join("wangerxiao"));
    assert!(first.contains("push \"route 10.16.3.0 255.255.255.0\""));
    let second = read(&dir.path().join("lisi"));
    assert!(second.contains("push \"route 192.168.5.9 255.255.255.255\""));
    assert_eq!(counter_value(store.as_ref()).await.as_deref(), Some("7"));
}

#[tokio::test]
async fn test_stream_failure_waits_for_in_flight_requests() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::with_entries([(DEFAULT_COUNTER_KEY, "5")]));
    let provisioner = provisioner_with(dir.path(), store.clone(), |_| {})
        .with_resolver(Arc::new(SlowResolver(Duration::from_millis(100))));
    let consumer = Consumer::new(Arc::new(provisioner), Subscription::default());

    let first = ndjson(&envelope("A1", &["10.16.3.0/24"]));
    let reader = BufReader::new(first.as_slice().chain(ResetStream));

    let err = consumer
        .run(reader, CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    let content = read(&dir.path().join("wangerxiao"));
    assert!(content.starts_with("ifconfig-push 10.11.0.5 255.255.0.0\n"));
    assert!(content.contains("push \"route 10.16.3.0 255.255.255.0\""));
    assert_eq!(counter_value(store.as_ref()).await.as_deref(), Some("6"));
}

#[tokio::test]
async fn test_cancelled_consumer_reads_nothing() {
    let (dir, _store, provisioner) = setup("5");
    let consumer = Consumer::new(Arc::new(provisioner), Subscription::default());
    let input = serde_json::to_string(&envelope("A1", &["10.16.3.0/24"])).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let summary = consumer.run(input.as_bytes(), cancel).await.unwrap();

    assert_eq!(summary.received, 0);
    assert!(!dir.path().join("wangerxiao").exists());
}

// ── Audit ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_audit_classifies_every_file() {
    let (dir, _store, provisioner) = setup("10");
    let write = |name: &str, content: &str| fs::write(dir.path().join(name), content).unwrap();

    write(
        "wangerxiao",
        "ifconfig-push 10.11.0.5 255.255.0.0\npush \"route 10.0.0.0 255.0.0.0\"\n\n",
    );
    write("lisi", "ifconfig-push 10.11.0.12 255.255.0.0\n");
    write("ghost", "ifconfig-push 10.11.0.6 255.255.0.0\n");
    write("stray", "ifconfig-push 172.16.0.6 255.255.0.0\n");
    write("empty", "push \"route 10.0.0.0 255.0.0.0\"\n");
    write(".wangerxiao.1.0.tmp", "ifconfig-push 10.11.0.7 255.255.0.0\n");

    let report = audit(&provisioner).await.unwrap();

    assert_eq!(report.counter, Some(10));
    let rows: Vec<_> = report
        .rows
        .iter()
        .map(|r| (r.account.as_str(), r.offset, r.status))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("empty", None, AuditStatus::NoAssignment),
            ("ghost", Some(6), AuditStatus::Orphan),
            ("lisi", Some(12), AuditStatus::AboveCounter),
            ("stray", None, AuditStatus::OutsidePool),
            ("wangerxiao", Some(5), AuditStatus::Ok),
        ]
    );
    assert_eq!(report.problems().count(), 4);
}

#[tokio::test]
async fn test_audit_flags_shared_addresses() {
    let (dir, _store, provisioner) = setup("10");
    for name in ["wangerxiao", "lisi"] {
        fs::write(dir.path().join(name), "ifconfig-push 10.11.0.5 255.255.0.0\n").unwrap();
    }

    let report = audit(&provisioner).await.unwrap();
    assert!(report.rows.iter().all(|r| r.status == AuditStatus::Duplicate));
    assert_eq!(AuditStatus::Duplicate.to_string(), "duplicate");
}
