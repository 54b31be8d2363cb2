//! Error taxonomy for provider failures.
//!
//! Splits raw provider error text into two families:
//! - hard errors (400/401/403/404, parameter/format/auth problems) that must
//!   not be blindly retried and may indicate a permanently unsupported feature
//! - soft errors (429/5xx, rate limits, timeouts, connection trouble) that are
//!   transient and eligible for retry / cooperative throttling
//!
//! The three policy functions at the bottom are the only sanctioned consumers
//! of raw error text; no other module re-matches error strings.

use lazy_static::lazy_static;
use regex::Regex;

/// Coarse failure class assigned from message text alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Empty message, nothing went wrong.
    Success,
    /// Permanent: bad request, auth, unsupported feature.
    Hard,
    /// Transient: rate limit, timeout, upstream trouble.
    Soft,
    /// No pattern matched; treated conservatively.
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Success => "success",
            ErrorKind::Hard => "hard",
            ErrorKind::Soft => "soft",
            ErrorKind::Unknown => "unknown",
        }
    }
}

/// Result of classifying one error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: ErrorKind,
    /// Which pattern decided the classification, for diagnostics.
    pub reason: String,
}

const HARD_ERROR_PATTERNS: &[&str] = &[
    // HTTP status codes
    r"400",
    r"401",
    r"403",
    r"404",
    // Parameter / format problems
    r"invalid.*param",
    r"invalid.*field",
    r"invalid.*format",
    r"unsupported.*field",
    r"unknown.*field",
    r"bad.*request",
    r"malformed",
    r"schema.*error",
    r"validation.*error",
    r"not.*supported",
    r"api.*key.*invalid",
    r"authentication.*failed",
];

const SOFT_ERROR_PATTERNS: &[&str] = &[
    // HTTP status codes
    r"429",
    r"500",
    r"502",
    r"503",
    r"504",
    // Rate limit / timeout keywords
    r"rate.*limit",
    r"too.*many.*requests",
    r"timeout",
    r"timed.*out",
    r"connection.*error",
    r"connection.*reset",
    r"connection.*refused",
    r"service.*unavailable",
    r"bad.*gateway",
    r"internal.*server.*error",
    r"overloaded",
    r"capacity",
    r"retry.*later",
];

// Hard errors that specifically indicate the provider rejects prompt caching.
const CACHE_ERROR_PATTERNS: &[&str] = &[
    r"cache.*control.*not.*supported",
    r"cache.*not.*supported",
    r"unknown.*field.*cache",
    r"invalid.*cache",
    r"ephemeral.*not.*supported",
];

lazy_static! {
    static ref HARD_RES: Vec<Regex> = compile(HARD_ERROR_PATTERNS);
    static ref SOFT_RES: Vec<Regex> = compile(SOFT_ERROR_PATTERNS);
    static ref CACHE_RES: Vec<Regex> = compile(CACHE_ERROR_PATTERNS);
    static ref RATE_RE: Regex =
        Regex::new(r"429|rate.*limit|overloaded|capacity").expect("static pattern");
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("static pattern"))
        .collect()
}

/// Classify an error message. Pure and total: never fails, never does I/O.
///
/// Hard patterns are checked first, then soft; first match wins. An empty
/// message classifies as [`ErrorKind::Success`].
pub fn classify(message: &str) -> Classification {
    if message.is_empty() {
        return Classification {
            kind: ErrorKind::Success,
            reason: String::new(),
        };
    }

    let lower = message.to_lowercase();

    for (re, pat) in HARD_RES.iter().zip(HARD_ERROR_PATTERNS) {
        if re.is_match(&lower) {
            return Classification {
                kind: ErrorKind::Hard,
                reason: format!("matched: {pat}"),
            };
        }
    }

    for (re, pat) in SOFT_RES.iter().zip(SOFT_ERROR_PATTERNS) {
        if re.is_match(&lower) {
            return Classification {
                kind: ErrorKind::Soft,
                reason: format!("matched: {pat}"),
            };
        }
    }

    Classification {
        kind: ErrorKind::Unknown,
        reason: "no pattern matched".to_string(),
    }
}

/// True if the message names a cache-specific rejection. A message can be
/// simultaneously hard and cache-related.
pub fn is_cache_related(message: &str) -> bool {
    if message.is_empty() {
        return false;
    }
    let lower = message.to_lowercase();
    CACHE_RES.iter().any(|re| re.is_match(&lower))
}

/// Soft errors are the only retry-eligible class.
pub fn should_retry(message: &str) -> bool {
    classify(message).kind == ErrorKind::Soft
}

/// Cache is disabled only for hard, cache-related errors. A transient 429 or
/// 500 must never cause a permanent feature downgrade.
pub fn should_disable_cache(message: &str) -> bool {
    match classify(message).kind {
        ErrorKind::Hard => is_cache_related(message),
        _ => false,
    }
}

/// Soft errors that look like rate/overload pressure suggest the whole batch
/// should self-throttle.
pub fn should_reduce_concurrency(message: &str) -> bool {
    if classify(message).kind != ErrorKind::Soft {
        return false;
    }
    RATE_RE.is_match(&message.to_lowercase())
}
