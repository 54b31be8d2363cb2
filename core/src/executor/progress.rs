use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Visual progress monitor for a batch run.
///
/// One overall bar plus a spinner per in-flight task. Disabled entirely when
/// the caller consumes progress through callbacks instead (e.g. headless
/// runs), in which case every method is a no-op.
pub struct ProgressMonitor {
    multi: MultiProgress,
    overall: ProgressBar,
    task_bars: HashMap<String, ProgressBar>,
    enabled: bool,
}

impl ProgressMonitor {
    pub fn new(total_tasks: usize, enabled: bool) -> Self {
        if !enabled {
            return Self {
                multi: MultiProgress::new(),
                overall: ProgressBar::hidden(),
                task_bars: HashMap::new(),
                enabled: false,
            };
        }

        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_tasks as u64));

        overall.set_style(
            ProgressStyle::default_bar()
                .template(
                    "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tasks ({percent}%) {msg}",
                )
                .unwrap()
                .progress_chars("█▓▒░  "),
        );

        overall.set_message("Dispatching...");

        Self {
            multi,
            overall,
            task_bars: HashMap::new(),
            enabled: true,
        }
    }

    /// Register a task and give it a spinner.
    pub fn add_task(&mut self, task_id: &str) {
        if !self.enabled {
            return;
        }

        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.green} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.set_message(format!("⏳ {}", task_id));
        bar.enable_steady_tick(Duration::from_millis(100));

        self.task_bars.insert(task_id.to_string(), bar);
    }

    /// Finish a task's spinner and advance the overall bar.
    pub fn complete_task(&mut self, task_id: &str, success: bool, tokens: u64) {
        if !self.enabled {
            return;
        }

        if let Some(bar) = self.task_bars.remove(task_id) {
            let icon = if success { "✅" } else { "❌" };
            bar.finish_with_message(format!("{} {} ({} tokens)", icon, task_id, tokens));
        }

        self.overall.inc(1);
    }

    pub fn set_message(&self, msg: &str) {
        if self.enabled {
            self.overall.set_message(msg.to_string());
        }
    }

    pub fn finish(&self, success: bool) {
        if !self.enabled {
            return;
        }

        let msg = if success {
            "✅ All tasks completed"
        } else {
            "❌ Batch finished with failures"
        };

        self.overall.finish_with_message(msg.to_string());
    }

    pub fn clear(&self) {
        if self.enabled {
            self.overall.finish_and_clear();
        }
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        // Ensure all spinners are cleaned up
        for (_, bar) in self.task_bars.drain() {
            bar.finish_and_clear();
        }
    }
}
