//! Feature derivation: map concrete events onto the classifier's fixed
//! six-feature vector.
//!
//! The honeypot heuristics approximate the classifier's training-time
//! extractor; they are lossy by design and clamped downstream. Agent
//! events get a pinned indicator vector — honeytoken access has
//! near-tautological ground truth, so the features are constants.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use dn_classifier::FeatureVector;

/// Cap on the failed-login token count heuristic.
const MAX_FAILED_TOKENS: usize = 150;

fn failure_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(fail|invalid)").unwrap())
}

fn select_from_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)select\s+.+\s+from").unwrap())
}

/// Count "fail"/"invalid" tokens in a payload, capped.
fn count_failure_tokens(payload: &str) -> f64 {
    failure_token_re()
        .find_iter(payload)
        .take(MAX_FAILED_TOKENS)
        .count() as f64
}

/// SQL-injection sentinels: a quote, a comment marker, `union`, or a
/// `select … from` shape, all case-insensitive.
fn has_sql_sentinels(payload: &str) -> bool {
    let lower = payload.to_ascii_lowercase();
    lower.contains('\'')
        || lower.contains("--")
        || lower.contains("union")
        || select_from_re().is_match(payload)
}

fn extra_number(extra: &BTreeMap<String, String>, key: &str, default: f64) -> f64 {
    extra
        .get(key)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(default)
}

/// Derive the feature vector for a honeypot log.
///
/// Request rate and session time are caller-provided through the `extra`
/// map (`request_rate`, `session_time`), defaulting to 1 and 0.
pub fn honeypot_features(
    activity: &str,
    payload: &str,
    extra: &BTreeMap<String, String>,
) -> FeatureVector {
    FeatureVector {
        failed_logins: count_failure_tokens(payload),
        request_rate: extra_number(extra, "request_rate", 1.0),
        commands_count: if activity == "command_exec" { 1.0 } else { 0.0 },
        sql_payload: if has_sql_sentinels(payload) { 1.0 } else { 0.0 },
        honeytoken_access: 0.0,
        session_time_secs: extra_number(extra, "session_time", 0.0),
    }
    .clamped()
}

/// The pinned honeytoken-accessed indicator vector for agent events.
pub fn agent_event_features() -> FeatureVector {
    FeatureVector {
        failed_logins: 90.0,
        request_rate: 550.0,
        commands_count: 8.0,
        sql_payload: 0.0,
        honeytoken_access: 1.0,
        session_time_secs: 300.0,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_tokens_counted_case_insensitively() {
        let v = honeypot_features(
            "login_attempt",
            "FAILED login; Invalid password; fail again",
            &BTreeMap::new(),
        );
        assert_eq!(v.failed_logins, 3.0);
    }

    #[test]
    fn failure_token_count_caps_at_150() {
        let payload = "fail ".repeat(500);
        let v = honeypot_features("login_attempt", &payload, &BTreeMap::new());
        assert_eq!(v.failed_logins, 150.0);
    }

    #[test]
    fn sql_sentinels() {
        let hit = |p: &str| {
            honeypot_features("x", p, &BTreeMap::new()).sql_payload == 1.0
        };
        assert!(hit("id=1' OR 1=1"));
        assert!(hit("comment -- drop"));
        assert!(hit("UNION ALL"));
        assert!(hit("SELECT password FROM users"));
        assert!(!hit("plain old login attempt"));
    }

    #[test]
    fn command_exec_activity_sets_commands_count() {
        let v = honeypot_features("command_exec", "ls -la", &BTreeMap::new());
        assert_eq!(v.commands_count, 1.0);
        let v = honeypot_features("login_attempt", "ls -la", &BTreeMap::new());
        assert_eq!(v.commands_count, 0.0);
    }

    #[test]
    fn extra_map_feeds_rate_and_session_time() {
        let mut extra = BTreeMap::new();
        extra.insert("request_rate".into(), "42".into());
        extra.insert("session_time".into(), "120.5".into());
        let v = honeypot_features("login_attempt", "x", &extra);
        assert_eq!(v.request_rate, 42.0);
        assert_eq!(v.session_time_secs, 120.5);

        // Absent → defaults; garbage → defaults.
        let v = honeypot_features("login_attempt", "x", &BTreeMap::new());
        assert_eq!(v.request_rate, 1.0);
        assert_eq!(v.session_time_secs, 0.0);
        let mut bad = BTreeMap::new();
        bad.insert("request_rate".into(), "lots".into());
        let v = honeypot_features("login_attempt", "x", &bad);
        assert_eq!(v.request_rate, 1.0);
    }

    #[test]
    fn agent_vector_is_pinned() {
        assert_eq!(
            agent_event_features().as_array(),
            [90.0, 550.0, 8.0, 0.0, 1.0, 300.0]
        );
    }
}
