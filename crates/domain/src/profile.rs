//! Per-attacker aggregates keyed by source identifier.
//!
//! The accumulator math lives here so every `Store` implementation applies
//! identical semantics; the store's only job is to make `apply` behave as
//! if serialised per source identifier.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::AttackKind;

/// One observation to fold into a profile.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub source_id: String,
    pub attack_type: AttackKind,
    pub risk_score: f64,
    pub service: String,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate view of one attacker across all events. Global, not
/// user-scoped. Counts and seen-instants are monotone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackerProfile {
    pub source_id: String,
    pub total_attacks: u64,
    pub most_common_attack: AttackKind,
    pub average_risk: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub attack_histogram: BTreeMap<AttackKind, u64>,
    pub services_targeted: BTreeSet<String>,
}

impl AttackerProfile {
    /// Seed a profile from its first observation.
    pub fn new(update: &ProfileUpdate) -> Self {
        let mut histogram = BTreeMap::new();
        histogram.insert(update.attack_type, 1);
        let mut services = BTreeSet::new();
        services.insert(update.service.clone());
        Self {
            source_id: update.source_id.clone(),
            total_attacks: 1,
            most_common_attack: update.attack_type,
            average_risk: update.risk_score,
            first_seen: update.timestamp,
            last_seen: update.timestamp,
            attack_histogram: histogram,
            services_targeted: services,
        }
    }

    /// Fold one observation into the accumulator.
    ///
    /// total, histogram and services are commutative; the running average
    /// depends only on the total, so any serial order of the same updates
    /// converges to the same state.
    pub fn apply(&mut self, update: &ProfileUpdate) {
        self.total_attacks += 1;
        *self.attack_histogram.entry(update.attack_type).or_insert(0) += 1;
        self.most_common_attack = self.argmax_attack();
        self.average_risk = (self.average_risk * (self.total_attacks - 1) as f64
            + update.risk_score)
            / self.total_attacks as f64;
        self.last_seen = self.last_seen.max(update.timestamp);
        self.first_seen = self.first_seen.min(update.timestamp);
        self.services_targeted.insert(update.service.clone());
    }

    /// Histogram argmax; ties broken by the label's lexical order.
    fn argmax_attack(&self) -> AttackKind {
        self.attack_histogram
            .iter()
            .max_by(|(ka, ca), (kb, cb)| {
                ca.cmp(cb)
                    .then_with(|| kb.as_str().cmp(ka.as_str()))
            })
            .map(|(k, _)| *k)
            .unwrap_or(AttackKind::Unknown)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn update(kind: AttackKind, risk: f64, service: &str, ts: i64) -> ProfileUpdate {
        ProfileUpdate {
            source_id: "1.2.3.4".into(),
            attack_type: kind,
            risk_score: risk,
            service: service.into(),
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
        }
    }

    #[test]
    fn first_observation_seeds_everything() {
        let p = AttackerProfile::new(&update(AttackKind::BruteForce, 3.0, "SSH", 100));
        assert_eq!(p.total_attacks, 1);
        assert_eq!(p.most_common_attack, AttackKind::BruteForce);
        assert_eq!(p.average_risk, 3.0);
        assert_eq!(p.first_seen, p.last_seen);
        assert!(p.services_targeted.contains("SSH"));
    }

    #[test]
    fn running_average() {
        let mut p = AttackerProfile::new(&update(AttackKind::BruteForce, 3.0, "SSH", 100));
        p.apply(&update(AttackKind::BruteForce, 9.0, "SSH", 200));
        assert_eq!(p.total_attacks, 2);
        assert!((p.average_risk - 6.0).abs() < 1e-9);
    }

    #[test]
    fn most_common_follows_histogram() {
        let mut p = AttackerProfile::new(&update(AttackKind::BruteForce, 5.0, "SSH", 100));
        p.apply(&update(AttackKind::SqlInjection, 5.0, "HTTP", 200));
        p.apply(&update(AttackKind::SqlInjection, 5.0, "HTTP", 300));
        assert_eq!(p.most_common_attack, AttackKind::SqlInjection);
        assert_eq!(p.attack_histogram[&AttackKind::SqlInjection], 2);
    }

    #[test]
    fn histogram_ties_break_lexically() {
        // brute_force < sql_injection lexically, so a 1-1 tie picks brute_force.
        let mut p = AttackerProfile::new(&update(AttackKind::SqlInjection, 5.0, "HTTP", 100));
        p.apply(&update(AttackKind::BruteForce, 5.0, "SSH", 200));
        assert_eq!(p.most_common_attack, AttackKind::BruteForce);
    }

    #[test]
    fn seen_instants_are_monotone() {
        let mut p = AttackerProfile::new(&update(AttackKind::BruteForce, 5.0, "SSH", 500));
        // An out-of-order timestamp widens the window but never shrinks it.
        p.apply(&update(AttackKind::BruteForce, 5.0, "SSH", 100));
        p.apply(&update(AttackKind::BruteForce, 5.0, "SSH", 300));
        assert_eq!(p.first_seen, Utc.timestamp_opt(100, 0).unwrap());
        assert_eq!(p.last_seen, Utc.timestamp_opt(500, 0).unwrap());
    }

    #[test]
    fn update_order_is_commutative() {
        let a = update(AttackKind::BruteForce, 2.0, "SSH", 100);
        let b = update(AttackKind::DataExfil, 8.0, "HTTP", 200);

        let mut p1 = AttackerProfile::new(&a);
        p1.apply(&b);
        let mut p2 = AttackerProfile::new(&b);
        p2.apply(&a);

        assert_eq!(p1.total_attacks, p2.total_attacks);
        assert_eq!(p1.attack_histogram, p2.attack_histogram);
        assert_eq!(p1.services_targeted, p2.services_targeted);
        assert_eq!(p1.first_seen, p2.first_seen);
        assert_eq!(p1.last_seen, p2.last_seen);
        assert!((p1.average_risk - p2.average_risk).abs() < 1e-9);
    }
}
