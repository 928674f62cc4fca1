//! SQL injection detection.
//!
//! Detects common SQL injection idioms in queries that already passed the
//! statement-kind and write-keyword checks.

use once_cell::sync::Lazy;
use regex::Regex;

/// Compiled regex patterns for SQL injection detection.
///
/// Order only decides which signature is reported first; every pattern is checked.
static INJECTION_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    // These should never fail since patterns are hardcoded and tested.
    fn compile(pattern: &str) -> Regex {
        Regex::new(pattern).unwrap_or_else(|e| {
            panic!("Internal error: invalid regex pattern '{}': {}", pattern, e)
        })
    }

    vec![
        // Comment injection
        (compile(r";\s*--"), "line comment after semicolon"),
        (compile(r";\s*/\*"), "block comment after semicolon"),
        // Union-based exfiltration
        (compile(r"(?i)UNION\s+ALL\s+SELECT"), "UNION ALL SELECT injection"),
        // OR-based injection (tautology)
        (compile(r"(?i)'\s*OR\s+'1'\s*=\s*'1"), "OR '1'='1' injection"),
        (compile(r"(?i)'\s*OR\s+1\s*=\s*1"), "OR 1=1 injection"),
        (compile(r"--\s*$"), "SQL line comment at end of input"),
        // Stacked queries
        (compile(r"(?i);\s*DROP\b"), "stacked DROP statement"),
        // Time-based blind injection
        (compile(r"(?i)WAITFOR\s+DELAY"), "time-based blind injection (WAITFOR)"),
        (compile(r"(?i)BENCHMARK\s*\("), "time-based blind injection (BENCHMARK)"),
        (compile(r"(?i)SLEEP\s*\("), "time-based blind injection (SLEEP)"),
        (compile(r"(?i)pg_sleep"), "time-based blind injection (pg_sleep)"),
    ]
});

/// SQL injection detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct InjectionDetector;

impl InjectionDetector {
    /// Create a new injection detector, compiling the signature table.
    pub fn new() -> Self {
        Lazy::force(&INJECTION_PATTERNS);
        Self
    }

    /// Return the description of the first signature matching `query`.
    pub fn detect(&self, query: &str) -> Option<&'static str> {
        INJECTION_PATTERNS
            .iter()
            .find(|(pattern, _)| pattern.is_match(query))
            .map(|(_, description)| *description)
    }
}
