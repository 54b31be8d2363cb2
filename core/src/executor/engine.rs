use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use uuid::Uuid;

use crate::buffer::ResultBuffer;
use crate::classifier;
use crate::error::ExecutorError;
use crate::fingerprint::ProviderFingerprint;
use crate::signal::SignalHub;

use super::progress::ProgressMonitor;
use super::traits::{ProgressCallback, ProviderAdapter, TaskCallback};
use super::types::{ExecutionReport, ExecutorConfig, TaskDescriptor, TaskOutcome};

/// Concurrent batch dispatcher.
///
/// Fans a list of [`TaskDescriptor`]s out over the hub's permit pool, drives
/// each one through the provider adapter and aggregates the outcomes in
/// input order. A single task's failure never aborts the batch; the run
/// always drives every task to a terminal state unless `request_stop()` cut
/// it short.
pub struct TaskExecutor {
    hub: Arc<SignalHub>,
    fingerprint: Arc<ProviderFingerprint>,
    adapter: Arc<dyn ProviderAdapter>,
    config: ExecutorConfig,
    buffer: Arc<ResultBuffer<TaskOutcome>>,

    on_task_complete: Option<TaskCallback>,
    on_progress: Option<ProgressCallback>,

    total_tasks: AtomicUsize,
    completed_tasks: AtomicUsize,
    failed_tasks: AtomicUsize,
    running: AtomicBool,
    last_duration_ms: AtomicU64,
}

pub struct TaskExecutorBuilder {
    hub: Option<Arc<SignalHub>>,
    fingerprint: Option<Arc<ProviderFingerprint>>,
    adapter: Arc<dyn ProviderAdapter>,
    config: ExecutorConfig,
    on_task_complete: Option<TaskCallback>,
    on_progress: Option<ProgressCallback>,
}

impl TaskExecutor {
    pub fn builder(adapter: Arc<dyn ProviderAdapter>) -> TaskExecutorBuilder {
        TaskExecutorBuilder::new(adapter)
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn hub(&self) -> &Arc<SignalHub> {
        &self.hub
    }

    pub fn buffer(&self) -> &Arc<ResultBuffer<TaskOutcome>> {
        &self.buffer
    }

    /// Cooperative stop. Tasks not yet past their permit acquisition finish
    /// as cancelled outcomes; calls already in flight run to completion.
    pub fn request_stop(&self) {
        self.hub.stop();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Execute the whole batch and return one outcome per input task, in
    /// input order regardless of completion order.
    pub async fn run(&self, tasks: Vec<TaskDescriptor>) -> Result<Vec<TaskOutcome>, ExecutorError> {
        let mut seen = HashSet::with_capacity(tasks.len());
        for task in &tasks {
            if !seen.insert(task.task_id.clone()) {
                return Err(ExecutorError::DuplicateTaskId(task.task_id.clone()));
            }
        }

        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ExecutorError::AlreadyRunning);
        }

        let result = self.run_inner(tasks).await;
        self.running.store(false, Ordering::SeqCst);
        Ok(result)
    }

    async fn run_inner(&self, tasks: Vec<TaskDescriptor>) -> Vec<TaskOutcome> {
        let start = Instant::now();
        let total = tasks.len();

        self.total_tasks.store(total, Ordering::SeqCst);
        self.completed_tasks.store(0, Ordering::SeqCst);
        self.failed_tasks.store(0, Ordering::SeqCst);

        let concurrency = self.config.effective_concurrency();
        self.hub.set_concurrency(concurrency);

        let task_ids: Vec<String> = tasks.iter().map(|t| t.task_id.clone()).collect();
        self.buffer.prepare(task_ids.iter().cloned());

        let run_id = Uuid::new_v4().to_string();
        tracing::info!(
            run_id = %run_id,
            total_tasks = total,
            concurrency,
            adapter = self.adapter.name(),
            "Starting batch dispatch"
        );

        let progress = Arc::new(Mutex::new(ProgressMonitor::new(
            total,
            self.config.progress_bar,
        )));
        if let Ok(mut monitor) = progress.lock() {
            for id in &task_ids {
                monitor.add_task(id);
            }
        }

        // One placeholder per input; overwritten as units finish so the
        // returned list follows input order, not completion order.
        let mut ordered: Vec<TaskOutcome> = task_ids
            .iter()
            .map(|id| TaskOutcome::failure(id.clone(), "Task did not run"))
            .collect();

        let mut futs: FuturesUnordered<_> = tasks
            .into_iter()
            .enumerate()
            .map(|(idx, task)| {
                let progress = progress.clone();
                async move {
                    let outcome = self.run_unit(task, &progress).await;
                    (idx, outcome)
                }
            })
            .collect();

        while let Some((idx, outcome)) = futs.next().await {
            ordered[idx] = outcome;
        }
        drop(futs);

        // Connection pool teardown happens exactly once, after the full
        // batch, never mid-batch.
        self.adapter.shutdown().await;

        let duration_ms = start.elapsed().as_millis() as u64;
        self.last_duration_ms.store(duration_ms, Ordering::SeqCst);

        let completed = self.completed_tasks.load(Ordering::SeqCst);
        let failed = self.failed_tasks.load(Ordering::SeqCst);
        if let Ok(monitor) = progress.lock() {
            monitor.finish(failed == 0);
        }

        tracing::info!(
            run_id = %run_id,
            total,
            completed,
            failed,
            duration_ms,
            stopped = self.hub.is_stopped(),
            "Batch dispatch finished"
        );

        ordered
    }

    /// Counter, buffer, progress-bar and callback bookkeeping around one
    /// unit of work. Runs on whichever worker finished the task.
    async fn run_unit(
        &self,
        task: TaskDescriptor,
        progress: &Arc<Mutex<ProgressMonitor>>,
    ) -> TaskOutcome {
        let task_id = task.task_id.clone();
        let outcome = self.execute_single(task).await;

        if outcome.success {
            self.completed_tasks.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failed_tasks.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(
                task_id = %task_id,
                error = %outcome.error_message,
                "Task failed"
            );
        }

        self.buffer.write(&task_id, outcome.clone(), outcome.success);

        if let Ok(mut monitor) = progress.lock() {
            monitor.complete_task(
                &task_id,
                outcome.success,
                outcome.prompt_tokens + outcome.completion_tokens,
            );
        }

        if let Some(cb) = &self.on_task_complete {
            if catch_unwind(AssertUnwindSafe(|| cb(&outcome))).is_err() {
                tracing::warn!(task_id = %task_id, "Task completion callback panicked");
            }
        }

        if let Some(cb) = &self.on_progress {
            let done = self.completed_tasks.load(Ordering::SeqCst)
                + self.failed_tasks.load(Ordering::SeqCst);
            let total = self.total_tasks.load(Ordering::SeqCst);
            if catch_unwind(AssertUnwindSafe(|| cb(done, total))).is_err() {
                tracing::warn!(task_id = %task_id, "Progress callback panicked");
            }
        }

        outcome
    }

    /// Drive one task through stop checks, pause gate, permit pool, cache
    /// gating and the adapter call.
    async fn execute_single(&self, task: TaskDescriptor) -> TaskOutcome {
        if self.hub.is_stopped() {
            return TaskOutcome::cancelled(&task.task_id);
        }

        self.hub.wait_if_paused().await;

        // RAII: released when this function returns, success or not.
        let _slot = self.hub.acquire_slot().await;

        // A task may have queued on the permit for a long time.
        if self.hub.is_stopped() {
            return TaskOutcome::cancelled(&task.task_id);
        }
        self.hub.wait_if_paused().await;

        let mut platform = task.platform.clone();
        let wanted_cache = platform.enable_cache;
        if wanted_cache
            && (self.hub.is_cache_disabled() || !self.fingerprint.should_use_cache(&platform.api_url))
        {
            platform.enable_cache = false;
        }

        let reply = self
            .adapter
            .complete(&task.messages, &task.system_prompt, &platform)
            .await;

        if !reply.failed {
            return build_success_outcome(&task, &reply);
        }

        let classification = classifier::classify(&reply.content);
        tracing::debug!(
            task_id = %task.task_id,
            kind = classification.kind.as_str(),
            reason = %classification.reason,
            "Adapter reported failure"
        );

        if classifier::should_reduce_concurrency(&reply.content) {
            self.hub.broadcast_rate_limit(&platform.api_url, 0);
        }

        // A hard, cache-related rejection while we were actually caching is
        // worth one immediate same-task retry without the cache header.
        if platform.enable_cache && classifier::should_disable_cache(&reply.content) {
            self.fingerprint
                .mark_cache_unsupported(&platform.api_url, &reply.content);
            self.hub.disable_cache();

            tracing::info!(
                task_id = %task.task_id,
                api_url = %platform.api_url,
                "Provider rejected prompt caching; retrying once without it"
            );

            platform.enable_cache = false;
            let retry = self
                .adapter
                .complete(&task.messages, &task.system_prompt, &platform)
                .await;

            if !retry.failed {
                return build_success_outcome(&task, &retry);
            }
            return build_failure_outcome(&task, &retry);
        }

        build_failure_outcome(&task, &reply)
    }

    /// Aggregate statistics for the most recent run.
    pub fn report(&self) -> ExecutionReport {
        ExecutionReport {
            total: self.total_tasks.load(Ordering::SeqCst),
            completed: self.completed_tasks.load(Ordering::SeqCst),
            failed: self.failed_tasks.load(Ordering::SeqCst),
            stopped: self.hub.is_stopped(),
            duration_ms: self.last_duration_ms.load(Ordering::SeqCst),
            buffer: self.buffer.finalize(),
        }
    }
}

fn build_success_outcome(task: &TaskDescriptor, reply: &super::traits::AdapterReply) -> TaskOutcome {
    let content = reply.content.trim();
    if content.is_empty() {
        let mut outcome = TaskOutcome::failure(&task.task_id, "Empty response content");
        outcome.prompt_tokens = reply.prompt_tokens;
        outcome.completion_tokens = reply.completion_tokens;
        return outcome;
    }

    // Line i of the reply answers item i; short replies leave the tail
    // items untranslated rather than failing the whole task.
    let lines: Vec<&str> = content.split('\n').collect();
    let mut outcome = TaskOutcome {
        task_id: task.task_id.clone(),
        success: true,
        row_count: task.items.len(),
        prompt_tokens: reply.prompt_tokens,
        completion_tokens: reply.completion_tokens,
        error_message: String::new(),
        translated_items: std::collections::HashMap::with_capacity(task.items.len()),
    };

    for (i, item) in task.items.iter().enumerate() {
        if let Some(line) = lines.get(i) {
            outcome
                .translated_items
                .insert(item.item_index, (*line).to_string());
        }
    }

    outcome
}

fn build_failure_outcome(task: &TaskDescriptor, reply: &super::traits::AdapterReply) -> TaskOutcome {
    let mut outcome = TaskOutcome::failure(&task.task_id, reply.content.clone());
    outcome.prompt_tokens = reply.prompt_tokens;
    outcome.completion_tokens = reply.completion_tokens;
    outcome
}

impl TaskExecutorBuilder {
    pub fn new(adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            hub: None,
            fingerprint: None,
            adapter,
            config: ExecutorConfig::default(),
            on_task_complete: None,
            on_progress: None,
        }
    }

    pub fn hub(mut self, hub: Arc<SignalHub>) -> Self {
        self.hub = Some(hub);
        self
    }

    pub fn fingerprint(mut self, fingerprint: Arc<ProviderFingerprint>) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn on_task_complete(mut self, callback: TaskCallback) -> Self {
        self.on_task_complete = Some(callback);
        self
    }

    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn build(self) -> TaskExecutor {
        TaskExecutor {
            hub: self.hub.unwrap_or_default(),
            fingerprint: self
                .fingerprint
                .unwrap_or_else(|| Arc::new(ProviderFingerprint::in_memory())),
            adapter: self.adapter,
            config: self.config,
            buffer: Arc::new(ResultBuffer::new()),
            on_task_complete: self.on_task_complete,
            on_progress: self.on_progress,
            total_tasks: AtomicUsize::new(0),
            completed_tasks: AtomicUsize::new(0),
            failed_tasks: AtomicUsize::new(0),
            running: AtomicBool::new(false),
            last_duration_ms: AtomicU64::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::traits::AdapterReply;
    use crate::executor::types::{ChatMessage, PlatformConfig, WorkItem};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Scripted adapter: maps task model names to canned replies and tracks
    /// the in-flight high-water mark.
    struct MockAdapter {
        replies: HashMap<String, Vec<AdapterReply>>,
        call_index: Mutex<HashMap<String, usize>>,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
        delay: Duration,
        delay_by_model: HashMap<String, Duration>,
        shutdowns: AtomicUsize,
        saw_cache_flag: Mutex<Vec<bool>>,
    }

    impl MockAdapter {
        fn new(delay: Duration) -> Self {
            Self {
                replies: HashMap::new(),
                call_index: Mutex::new(HashMap::new()),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
                delay,
                delay_by_model: HashMap::new(),
                shutdowns: AtomicUsize::new(0),
                saw_cache_flag: Mutex::new(Vec::new()),
            }
        }

        fn script(mut self, model: &str, replies: Vec<AdapterReply>) -> Self {
            self.replies.insert(model.to_string(), replies);
            self
        }

        fn delay_model(mut self, model: &str, delay: Duration) -> Self {
            self.delay_by_model.insert(model.to_string(), delay);
            self
        }

        fn peak(&self) -> usize {
            self.peak_in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProviderAdapter for MockAdapter {
        fn name(&self) -> &str {
            "mock"
        }

        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _system_prompt: &str,
            platform: &PlatformConfig,
        ) -> AdapterReply {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
            self.saw_cache_flag
                .lock()
                .unwrap()
                .push(platform.enable_cache);

            let delay = self
                .delay_by_model
                .get(&platform.model)
                .copied()
                .unwrap_or(self.delay);
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let reply = match self.replies.get(&platform.model) {
                Some(script) => {
                    let mut index = self.call_index.lock().unwrap();
                    let n = index.entry(platform.model.clone()).or_insert(0);
                    let reply = script
                        .get(*n)
                        .cloned()
                        .unwrap_or_else(|| script.last().cloned().unwrap());
                    *n += 1;
                    reply
                }
                None => AdapterReply::success("translated").with_tokens(10, 20),
            };
            reply
        }

        async fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn make_task(id: &str, model: &str, item_count: u32) -> TaskDescriptor {
        let mut task = TaskDescriptor::new(id, PlatformConfig::new("https://api.example.com", model));
        task.items = (0..item_count)
            .map(|i| WorkItem::new(i, format!("source {i}")))
            .collect();
        task.messages = vec![ChatMessage::user("translate")];
        task
    }

    fn executor_with(adapter: Arc<MockAdapter>, max_concurrency: usize) -> TaskExecutor {
        TaskExecutor::builder(adapter)
            .config(ExecutorConfig {
                max_concurrency,
                progress_bar: false,
            })
            .build()
    }

    #[tokio::test]
    async fn test_outcomes_preserve_input_order() {
        let adapter = Arc::new(
            MockAdapter::new(Duration::from_millis(5)).script(
                "m",
                vec![AdapterReply::success("line0\nline1").with_tokens(5, 7)],
            ),
        );
        let exec = executor_with(adapter, 4);

        let tasks: Vec<_> = (0..8).map(|i| make_task(&format!("t{i}"), "m", 2)).collect();
        let outcomes = exec.run(tasks).await.unwrap();

        assert_eq!(outcomes.len(), 8);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.task_id, format!("t{i}"));
            assert!(outcome.success);
            assert_eq!(outcome.row_count, 2);
            assert_eq!(outcome.translated_items[&0], "line0");
            assert_eq!(outcome.translated_items[&1], "line1");
        }
    }

    #[tokio::test]
    async fn test_reverse_completion_order_still_yields_input_order() {
        // Earlier tasks take longer, so completion order is the reverse of
        // input order; the returned list must still follow the input.
        let mut adapter = MockAdapter::new(Duration::ZERO);
        for i in 0..4u64 {
            adapter = adapter
                .delay_model(&format!("m{i}"), Duration::from_millis((4 - i) * 25))
                .script(
                    &format!("m{i}"),
                    vec![AdapterReply::success(format!("reply {i}"))],
                );
        }
        let exec = executor_with(Arc::new(adapter), 4);

        let tasks: Vec<_> = (0..4)
            .map(|i| make_task(&format!("t{i}"), &format!("m{i}"), 1))
            .collect();
        let outcomes = exec.run(tasks).await.unwrap();

        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.task_id, format!("t{i}"));
            assert_eq!(outcome.translated_items[&0], format!("reply {i}"));
        }

        // The buffer extracts in prepare order as well.
        let payloads = exec.buffer().completed_payloads_in_order();
        let ids: Vec<_> = payloads.iter().map(|o| o.task_id.as_str()).collect();
        assert_eq!(ids, vec!["t0", "t1", "t2", "t3"]);
    }

    #[tokio::test]
    async fn test_peak_concurrency_respects_limit() {
        let adapter = Arc::new(MockAdapter::new(Duration::from_millis(20)));
        let exec = executor_with(adapter.clone(), 5);

        let tasks: Vec<_> = (0..50).map(|i| make_task(&format!("t{i}"), "any", 1)).collect();
        let outcomes = exec.run(tasks).await.unwrap();

        assert_eq!(outcomes.len(), 50);
        assert!(outcomes.iter().all(|o| o.success));
        assert!(
            adapter.peak() <= 5,
            "peak in-flight {} exceeded limit",
            adapter.peak()
        );
        assert_eq!(adapter.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_before_run_cancels_everything() {
        let adapter = Arc::new(MockAdapter::new(Duration::ZERO));
        let exec = executor_with(adapter.clone(), 4);
        exec.request_stop();

        let tasks: Vec<_> = (0..4).map(|i| make_task(&format!("t{i}"), "any", 1)).collect();
        let outcomes = exec.run(tasks).await.unwrap();

        assert!(outcomes.iter().all(|o| o.is_cancelled()));
        // No task ever reached the adapter.
        assert_eq!(adapter.peak(), 0);

        let report = exec.report();
        assert!(report.stopped);
        assert_eq!(report.failed, 4);
        assert_eq!(report.completed, 0);
    }

    #[tokio::test]
    async fn test_duplicate_task_id_rejected() {
        let adapter = Arc::new(MockAdapter::new(Duration::ZERO));
        let exec = executor_with(adapter, 2);

        let tasks = vec![make_task("same", "m", 1), make_task("same", "m", 1)];
        let err = exec.run(tasks).await.unwrap_err();
        assert!(matches!(err, ExecutorError::DuplicateTaskId(id) if id == "same"));
        assert!(!exec.is_running());
    }

    #[tokio::test]
    async fn test_cache_rejection_retries_once_without_cache() {
        let adapter = Arc::new(MockAdapter::new(Duration::ZERO).script(
            "m",
            vec![
                AdapterReply::failure("hard", "400 cache_control is not supported"),
                AdapterReply::success("fixed").with_tokens(1, 2),
            ],
        ));
        let exec = executor_with(adapter.clone(), 1);

        let outcomes = exec.run(vec![make_task("t0", "m", 1)]).await.unwrap();
        assert!(outcomes[0].success);
        assert_eq!(outcomes[0].translated_items[&0], "fixed");

        // First call attempted caching, the retry did not.
        let flags = adapter.saw_cache_flag.lock().unwrap().clone();
        assert_eq!(flags, vec![true, false]);
        assert!(exec.hub().is_cache_disabled());
    }

    #[tokio::test]
    async fn test_rate_limit_failure_broadcasts_to_hub() {
        let adapter = Arc::new(MockAdapter::new(Duration::ZERO).script(
            "m",
            vec![AdapterReply::failure("soft", "429 too many requests")],
        ));
        let exec = executor_with(adapter, 1);

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        exec.hub()
            .subscribe(crate::signal::SignalType::RateLimitHit, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let outcomes = exec.run(vec![make_task("t0", "m", 1)]).await.unwrap();
        assert!(!outcomes[0].success);
        assert_eq!(outcomes[0].error_message, "429 too many requests");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_siblings() {
        let adapter = Arc::new(MockAdapter::new(Duration::ZERO).script(
            "bad",
            vec![AdapterReply::failure("hard", "401 unauthorized")],
        ));
        let exec = executor_with(adapter, 4);

        let tasks = vec![
            make_task("ok1", "any", 1),
            make_task("boom", "bad", 1),
            make_task("ok2", "any", 1),
        ];
        let outcomes = exec.run(tasks).await.unwrap();

        assert!(outcomes[0].success);
        assert!(!outcomes[1].success);
        assert!(outcomes[2].success);

        let report = exec.report();
        assert_eq!(report.total, 3);
        assert_eq!(report.completed, 2);
        assert_eq!(report.failed, 1);
        assert!(!report.stopped);
        assert!((report.buffer.success_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_callbacks_fire_and_panics_are_contained() {
        let adapter = Arc::new(MockAdapter::new(Duration::ZERO));
        let completions = Arc::new(AtomicUsize::new(0));
        let progress_max = Arc::new(AtomicUsize::new(0));

        let c = completions.clone();
        let p = progress_max.clone();
        let exec = TaskExecutor::builder(adapter)
            .config(ExecutorConfig {
                max_concurrency: 2,
                progress_bar: false,
            })
            .on_task_complete(Arc::new(move |outcome| {
                c.fetch_add(1, Ordering::SeqCst);
                if outcome.task_id == "t1" {
                    panic!("callback bug");
                }
            }))
            .on_progress(Arc::new(move |done, _total| {
                p.fetch_max(done, Ordering::SeqCst);
            }))
            .build();

        let tasks: Vec<_> = (0..3).map(|i| make_task(&format!("t{i}"), "any", 1)).collect();
        let outcomes = exec.run(tasks).await.unwrap();

        assert!(outcomes.iter().all(|o| o.success));
        assert_eq!(completions.load(Ordering::SeqCst), 3);
        assert_eq!(progress_max.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_reply_is_a_failure() {
        let adapter = Arc::new(
            MockAdapter::new(Duration::ZERO).script("m", vec![AdapterReply::success("  \n ")]),
        );
        let exec = executor_with(adapter, 1);

        let outcomes = exec.run(vec![make_task("t0", "m", 1)]).await.unwrap();
        assert!(!outcomes[0].success);
        assert_eq!(outcomes[0].error_message, "Empty response content");
    }

    #[tokio::test]
    async fn test_short_reply_leaves_tail_items_untranslated() {
        let adapter = Arc::new(
            MockAdapter::new(Duration::ZERO).script("m", vec![AdapterReply::success("only one")]),
        );
        let exec = executor_with(adapter, 1);

        let outcomes = exec.run(vec![make_task("t0", "m", 3)]).await.unwrap();
        assert!(outcomes[0].success);
        assert_eq!(outcomes[0].row_count, 3);
        assert_eq!(outcomes[0].translated_items.len(), 1);
        assert_eq!(outcomes[0].translated_items[&0], "only one");
    }

    #[tokio::test]
    async fn test_fingerprint_unsupported_disables_cache_upfront() {
        let fingerprint = Arc::new(ProviderFingerprint::in_memory());
        fingerprint.set_cache_support("https://api.example.com", false);

        let adapter = Arc::new(MockAdapter::new(Duration::ZERO));
        let exec = TaskExecutor::builder(adapter.clone())
            .fingerprint(fingerprint)
            .config(ExecutorConfig {
                max_concurrency: 1,
                progress_bar: false,
            })
            .build();

        let outcomes = exec.run(vec![make_task("t0", "any", 1)]).await.unwrap();
        assert!(outcomes[0].success);
        let flags = adapter.saw_cache_flag.lock().unwrap().clone();
        assert_eq!(flags, vec![false]);
    }
}
