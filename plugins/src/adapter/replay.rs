use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use lingo_core::executor::{AdapterReply, ChatMessage, PlatformConfig, ProviderAdapter};

/// One recorded reply, keyed by model name.
#[derive(Debug, Clone, Deserialize)]
struct RecordedReply {
    model: String,

    #[serde(default)]
    failed: bool,

    #[serde(default)]
    content: String,

    #[serde(default)]
    think: String,

    #[serde(default)]
    prompt_tokens: u64,

    #[serde(default)]
    completion_tokens: u64,
}

/// Adapter that replays recorded provider replies instead of hitting a
/// network. Replies come from a JSONL file (one [`RecordedReply`] per line)
/// and are matched by the request's model name; requests for an unrecorded
/// model fail with a hard error so the mismatch is visible, not silent.
#[derive(Debug)]
pub struct ReplayAdapter {
    replies: HashMap<String, AdapterReply>,
    shut_down: AtomicBool,
}

impl ReplayAdapter {
    /// Load recorded replies from a JSONL file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut replies = HashMap::new();

        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let rec: RecordedReply = serde_json::from_str(line).map_err(|e| {
                anyhow::anyhow!("bad replay record on line {}: {e}", lineno + 1)
            })?;
            replies.insert(rec.model.clone(), rec.into());
        }

        Ok(Self {
            replies,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Build directly from model → reply pairs.
    pub fn from_replies(pairs: impl IntoIterator<Item = (String, AdapterReply)>) -> Self {
        Self {
            replies: pairs.into_iter().collect(),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl From<RecordedReply> for AdapterReply {
    fn from(rec: RecordedReply) -> Self {
        Self {
            failed: rec.failed,
            think: rec.think,
            content: rec.content,
            prompt_tokens: rec.prompt_tokens,
            completion_tokens: rec.completion_tokens,
        }
    }
}

#[async_trait]
impl ProviderAdapter for ReplayAdapter {
    fn name(&self) -> &str {
        "replay"
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _system_prompt: &str,
        platform: &PlatformConfig,
    ) -> AdapterReply {
        match self.replies.get(&platform.model) {
            Some(reply) => reply.clone(),
            None => {
                tracing::warn!(model = %platform.model, "No recorded reply for model");
                AdapterReply::failure(
                    "replay-miss",
                    format!("400: no recorded reply for model '{}'", platform.model),
                )
            }
        }
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_replay_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("replies.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"model":"alpha","content":"bonjour","prompt_tokens":3,"completion_tokens":5}"#,
                "\n",
                r#"{"model":"beta","failed":true,"think":"hard","content":"HTTP 401: bad key"}"#,
                "\n",
            ),
        )
        .expect("write replay file");

        let adapter = ReplayAdapter::from_file(&path).expect("load");
        let platform = PlatformConfig::new("https://api.example.com", "alpha");
        let reply = adapter.complete(&[], "", &platform).await;
        assert!(!reply.failed);
        assert_eq!(reply.content, "bonjour");
        assert_eq!(reply.prompt_tokens, 3);

        let platform = PlatformConfig::new("https://api.example.com", "beta");
        let reply = adapter.complete(&[], "", &platform).await;
        assert!(reply.failed);
        assert_eq!(reply.content, "HTTP 401: bad key");
    }

    #[tokio::test]
    async fn test_unrecorded_model_fails_loudly() {
        let adapter = ReplayAdapter::from_replies([]);
        let platform = PlatformConfig::new("https://api.example.com", "ghost");
        let reply = adapter.complete(&[], "", &platform).await;
        assert!(reply.failed);
        assert!(reply.content.contains("ghost"));
    }

    #[test]
    fn test_malformed_record_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "not json\n").expect("write");
        let err = ReplayAdapter::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }
}
