//! End-to-end dispatch flow across the executor, signal hub, fingerprint
//! ledger and result buffer, using a scripted adapter in place of a network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use lingo_core::executor::{
    AdapterReply, ChatMessage, ExecutorConfig, PlatformConfig, ProviderAdapter, TaskDescriptor,
    TaskExecutor, WorkItem,
};
use lingo_core::fingerprint::{FeatureSupport, MemoryStore};
use lingo_core::{ProviderFingerprint, SignalHub, SignalType};

/// Replies keyed by task model; unknown models succeed.
struct ScriptedAdapter {
    replies: Mutex<HashMap<String, AdapterReply>>,
    calls: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl ScriptedAdapter {
    fn new() -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
        }
    }

    fn with_reply(self, model: &str, reply: AdapterReply) -> Self {
        self.replies.lock().unwrap().insert(model.to_string(), reply);
        self
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _system_prompt: &str,
        platform: &PlatformConfig,
    ) -> AdapterReply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.replies
            .lock()
            .unwrap()
            .get(&platform.model)
            .cloned()
            .unwrap_or_else(|| AdapterReply::success("translated line").with_tokens(12, 34))
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

fn task(id: &str, model: &str) -> TaskDescriptor {
    let mut t = TaskDescriptor::new(id, PlatformConfig::new("https://api.example.com/v1", model));
    t.items = vec![WorkItem::new(0, "hello")];
    t.messages = vec![ChatMessage::user("translate: hello")];
    t.system_prompt = "You are a translator.".to_string();
    t
}

#[tokio::test]
async fn mixed_batch_produces_per_task_outcomes_and_signals() {
    let adapter = Arc::new(
        ScriptedAdapter::new()
            .with_reply(
                "rate-limited",
                AdapterReply::failure("soft", "HTTP 429: rate limit exceeded"),
            )
            .with_reply(
                "unauthorized",
                AdapterReply::failure("hard", "HTTP 401: invalid api key"),
            ),
    );

    let hub = Arc::new(SignalHub::new());
    let store = Arc::new(MemoryStore::new());
    let fingerprint = Arc::new(ProviderFingerprint::new(store.clone()));

    let rate_limit_signals = Arc::new(AtomicUsize::new(0));
    let counter = rate_limit_signals.clone();
    hub.subscribe(SignalType::RateLimitHit, move |signal| {
        assert_eq!(signal.source.as_deref(), Some("https://api.example.com/v1"));
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let exec = TaskExecutor::builder(adapter.clone())
        .hub(hub.clone())
        .fingerprint(fingerprint.clone())
        .config(ExecutorConfig {
            max_concurrency: 2,
            progress_bar: false,
        })
        .build();

    let outcomes = exec
        .run(vec![
            task("t-rate", "rate-limited"),
            task("t-auth", "unauthorized"),
            task("t-ok", "fine"),
        ])
        .await
        .expect("batch should run");

    // Input order preserved regardless of completion order.
    assert_eq!(outcomes[0].task_id, "t-rate");
    assert_eq!(outcomes[1].task_id, "t-auth");
    assert_eq!(outcomes[2].task_id, "t-ok");

    assert!(!outcomes[0].success);
    assert_eq!(outcomes[0].error_message, "HTTP 429: rate limit exceeded");
    assert!(!outcomes[1].success);
    assert_eq!(outcomes[1].error_message, "HTTP 401: invalid api key");
    assert!(outcomes[2].success);
    assert_eq!(outcomes[2].translated_items[&0], "translated line");
    assert_eq!(outcomes[2].prompt_tokens, 12);
    assert_eq!(outcomes[2].completion_tokens, 34);

    // The soft rate-limit error was announced to peers exactly once.
    assert_eq!(rate_limit_signals.load(Ordering::SeqCst), 1);
    assert!(hub
        .history()
        .iter()
        .any(|s| s.signal_type == SignalType::RateLimitHit));

    // Neither a 429 nor a 401 is cache-specific: the ledger stays untouched
    // and nothing was persisted.
    assert_eq!(
        fingerprint.get_cache_support("https://api.example.com/v1"),
        FeatureSupport::Unknown
    );
    assert!(store.is_empty());

    // Connection pool closed exactly once, after the batch.
    assert_eq!(adapter.shutdowns.load(Ordering::SeqCst), 1);

    let report = exec.report();
    assert_eq!(report.total, 3);
    assert_eq!(report.completed, 1);
    assert_eq!(report.failed, 2);
    assert!(!report.stopped);
}

#[tokio::test]
async fn cache_rejection_is_learned_once_and_applied_to_later_batches() {
    let adapter = Arc::new(ScriptedAdapter::new().with_reply(
        "no-cache",
        AdapterReply::failure("hard", "400: cache_control is not supported by this provider"),
    ));

    let store = Arc::new(MemoryStore::new());
    let fingerprint = Arc::new(ProviderFingerprint::new(store.clone()));
    let hub = Arc::new(SignalHub::new());

    let exec = TaskExecutor::builder(adapter.clone())
        .hub(hub.clone())
        .fingerprint(fingerprint.clone())
        .config(ExecutorConfig {
            max_concurrency: 1,
            progress_bar: false,
        })
        .build();

    let outcomes = exec.run(vec![task("t0", "no-cache")]).await.unwrap();

    // The rejection triggers one immediate retry without cache; the scripted
    // adapter keeps failing, so the task fails, but the downgrade sticks.
    assert!(!outcomes[0].success);
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 2);
    assert!(hub.is_cache_disabled());
    assert_eq!(
        fingerprint.get_cache_support("https://api.example.com/v1"),
        FeatureSupport::Unsupported
    );

    // A fresh ledger over the same store sees the learned fact.
    let reloaded = ProviderFingerprint::new(store);
    assert!(!reloaded.should_use_cache("https://api.example.com/v1"));
}

#[tokio::test]
async fn pause_holds_queued_tasks_until_resume() {
    let adapter = Arc::new(ScriptedAdapter::new());
    let hub = Arc::new(SignalHub::new());

    let exec = Arc::new(
        TaskExecutor::builder(adapter.clone())
            .hub(hub.clone())
            .config(ExecutorConfig {
                max_concurrency: 2,
                progress_bar: false,
            })
            .build(),
    );

    hub.pause();

    let run = {
        let exec = exec.clone();
        tokio::spawn(async move {
            exec.run(vec![task("a", "m"), task("b", "m")]).await
        })
    };

    // Paused: no task may reach the adapter.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
    assert!(!run.is_finished());

    hub.resume();
    let outcomes = tokio::time::timeout(Duration::from_secs(2), run)
        .await
        .expect("run should finish after resume")
        .expect("join")
        .expect("run ok");

    assert_eq!(adapter.calls.load(Ordering::SeqCst), 2);
    assert!(outcomes.iter().all(|o| o.success));
}

#[tokio::test]
async fn stop_mid_batch_cancels_not_yet_started_tasks() {
    let hub = Arc::new(SignalHub::new());

    // Stop fires from the first completion callback, so later tasks queued
    // behind the single permit see the stop before calling the adapter.
    let stopper = hub.clone();
    let exec = TaskExecutor::builder(Arc::new(ScriptedAdapter::new()))
        .hub(hub.clone())
        .config(ExecutorConfig {
            max_concurrency: 1,
            progress_bar: false,
        })
        .on_task_complete(Arc::new(move |_| {
            stopper.stop();
        }))
        .build();

    let tasks: Vec<_> = (0..5).map(|i| task(&format!("t{i}"), "m")).collect();
    let outcomes = exec.run(tasks).await.unwrap();

    let cancelled = outcomes.iter().filter(|o| o.is_cancelled()).count();
    let finished = outcomes.iter().filter(|o| o.success).count();
    assert_eq!(cancelled + finished, 5);
    assert!(cancelled >= 1, "tasks queued behind the permit must cancel");
    assert!(finished >= 1, "the in-flight task runs to completion");

    let report = exec.report();
    assert!(report.stopped);
}
