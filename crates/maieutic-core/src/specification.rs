// Specification engine (§4.3). Pure functions over plain records: no store handle, no LLM
// call. `extract` (which does call the LLM gateway) lives on the Context agent
// (`agents::context`) - everything here is the deterministic part §8's properties are phrased
// against.

use chrono::Utc;
use uuid::Uuid;

use maieutic_contracts::error::{CoreError, Result};
use maieutic_contracts::{Specification, SpecificationCandidate, MATURITY_CATEGORIES};

/// Outcome of considering one candidate against the current specification set.
pub enum IngestOutcome {
    /// No current spec existed for this `(category, key)`; insert it as current.
    Inserted(Specification),
    /// A current spec already has a semantically-equal value; no-op.
    NoOp,
    /// A current spec disagrees; a Conflict must be created and the candidate withheld until
    /// the conflict resolves. The caller (Context agent) owns conflict creation via
    /// `conflict::detect`.
    Conflicting {
        incumbent: Specification,
    },
}

/// Case/whitespace-normalized equality on scalar JSON values; structural equality otherwise
/// (§4.3 step 3).
pub fn values_semantically_equal(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    match (a, b) {
        (serde_json::Value::String(sa), serde_json::Value::String(sb)) => {
            normalize_scalar(sa) == normalize_scalar(sb)
        }
        _ => a == b,
    }
}

fn normalize_scalar(s: &str) -> String {
    s.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decide the ingest outcome for a single candidate against the current spec for its
/// `(category, key)`, if any. Does not insert or mutate anything; the caller applies the
/// outcome through the store under the serialization discipline described in §5.
pub fn plan_ingest(
    candidate: &SpecificationCandidate,
    current: Option<&Specification>,
) -> IngestOutcome {
    match current {
        None => IngestOutcome::Inserted(new_specification(candidate, None)),
        Some(existing) if values_semantically_equal(&existing.value, &candidate.value) => {
            IngestOutcome::NoOp
        }
        Some(existing) => IngestOutcome::Conflicting {
            incumbent: existing.clone(),
        },
    }
}

/// Build a brand-new current `Specification` record from a candidate. `supersedes` is set by
/// the caller when this is the resolution of a conflict (replace/merge).
pub fn new_specification(
    candidate: &SpecificationCandidate,
    supersedes: Option<Uuid>,
) -> Specification {
    let now = Utc::now();
    Specification {
        id: Uuid::new_v4(),
        project_id: Uuid::nil(), // filled in by the caller, which knows the project
        category: candidate.category.clone(),
        key: candidate.key.clone(),
        value: candidate.value.clone(),
        confidence: candidate.confidence,
        source: candidate.source,
        is_current: true,
        supersedes,
        created_at: now,
        updated_at: now,
    }
}

/// Edge policy for a batch of candidates targeting the same `(category, key)`: only the
/// highest-confidence one is considered; ties broken by later position in the batch (§4.3).
pub fn dedupe_candidates_by_key(
    candidates: Vec<SpecificationCandidate>,
) -> Vec<SpecificationCandidate> {
    use std::collections::HashMap;

    let mut best: HashMap<(String, String), (usize, SpecificationCandidate)> = HashMap::new();
    for (idx, candidate) in candidates.into_iter().enumerate() {
        let key = (candidate.category.clone(), candidate.key.clone());
        match best.get(&key) {
            Some((_, existing)) if existing.confidence > candidate.confidence => {}
            Some((prev_idx, existing))
                if existing.confidence == candidate.confidence && *prev_idx > idx => {}
            _ => {
                best.insert(key, (idx, candidate));
            }
        }
    }
    let mut entries: Vec<_> = best.into_values().collect();
    entries.sort_by_key(|(idx, _)| *idx);
    entries.into_iter().map(|(_, c)| c).collect()
}

/// `cov(n) = min(1, n/3)` - saturating coverage function (§4.3).
fn category_coverage(count: usize) -> f64 {
    (count as f64 / 3.0).min(1.0)
}

/// `maturity(project) = 100 * mean(cov(n_c) for c in categories)`. Pure function of the
/// multiset of current specifications; never hand-set (invariant 3, §3). Reported to one
/// decimal; storage rounds for display only, so this returns the full-precision float.
pub fn maturity(current_specs: &[Specification]) -> f64 {
    let mut counts = std::collections::HashMap::new();
    for spec in current_specs {
        if !spec.is_current {
            continue;
        }
        *counts.entry(spec.category.as_str()).or_insert(0usize) += 1;
    }
    let total: f64 = MATURITY_CATEGORIES
        .iter()
        .copied()
        .map(|category| category_coverage(*counts.get(category).unwrap_or(&0)))
        .sum();
    let score = 100.0 * (total / MATURITY_CATEGORIES.len() as f64);
    round_to_one_decimal(score)
}

/// Per-category maturity, same `cov` function, 0-100 scale. Used by the quality engine for
/// critical-category thresholds (§4.5.1).
pub fn category_maturity(current_specs: &[Specification], category: &str) -> f64 {
    let count = current_specs
        .iter()
        .filter(|s| s.is_current && s.category == category)
        .count();
    round_to_one_decimal(100.0 * category_coverage(count))
}

fn round_to_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// How many of the 10 maturity categories have at least one current spec. Used by
/// `generate_code`'s pre-validation (§4.5.1: "at least 7 of 10").
pub fn covered_category_count(current_specs: &[Specification]) -> usize {
    MATURITY_CATEGORIES
        .iter()
        .copied()
        .filter(|category| {
            current_specs
                .iter()
                .any(|s| s.is_current && s.category == *category)
        })
        .count()
}

/// `ingest` rejects a whole batch-target if the `(category, key)` is already blocked by a
/// pending conflict (§4.3's `ProjectBlocked`). The caller checks this per-key before calling
/// `plan_ingest`.
pub fn ensure_not_blocked(
    category: &str,
    key: &str,
    pending_keys: &[(String, String)],
) -> Result<()> {
    let blocked = pending_keys
        .iter()
        .any(|(c, k)| c == category && k == key);
    if blocked {
        Err(CoreError::ProjectBlocked { count: 1 })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maieutic_contracts::SpecificationSource;

    fn spec(category: &str, key: &str, current: bool) -> Specification {
        let now = Utc::now();
        Specification {
            id: Uuid::new_v4(),
            project_id: Uuid::nil(),
            category: category.to_string(),
            key: key.to_string(),
            value: serde_json::json!("value"),
            confidence: 0.9,
            source: SpecificationSource::Extracted,
            is_current: current,
            supersedes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn maturity_is_zero_with_no_specs() {
        assert_eq!(maturity(&[]), 0.0);
    }

    #[test]
    fn maturity_saturates_at_three_per_category() {
        let specs: Vec<_> = (0..5).map(|_| spec("goals", "g", true)).collect();
        // 1 of 10 categories fully covered -> 100 * (1/10) = 10.0
        assert_eq!(maturity(&specs), 10.0);
    }

    #[test]
    fn maturity_monotone_on_new_covered_category() {
        let mut specs = vec![spec("goals", "g1", true), spec("goals", "g2", true)];
        let before = maturity(&specs);
        specs.push(spec("requirements", "r1", true));
        let after = maturity(&specs);
        assert!(after > before);
    }

    #[test]
    fn maturity_ignores_non_current_specs() {
        let specs = vec![
            spec("goals", "g1", false),
            spec("goals", "g2", false),
            spec("goals", "g3", false),
        ];
        assert_eq!(maturity(&specs), 0.0);
    }

    #[test]
    fn semantic_equality_normalizes_case_and_whitespace() {
        let a = serde_json::json!("  PostgreSQL  ");
        let b = serde_json::json!("postgresql");
        assert!(values_semantically_equal(&a, &b));
    }

    #[test]
    fn dedupe_keeps_highest_confidence_ties_broken_by_position() {
        let candidates = vec![
            SpecificationCandidate {
                category: "tech_stack".into(),
                key: "primary_database".into(),
                value: serde_json::json!("PostgreSQL"),
                confidence: 0.6,
                source: SpecificationSource::Extracted,
            },
            SpecificationCandidate {
                category: "tech_stack".into(),
                key: "primary_database".into(),
                value: serde_json::json!("MySQL"),
                confidence: 0.9,
                source: SpecificationSource::Extracted,
            },
            SpecificationCandidate {
                category: "tech_stack".into(),
                key: "primary_database".into(),
                value: serde_json::json!("SQLite"),
                confidence: 0.9,
                source: SpecificationSource::Extracted,
            },
        ];
        let result = dedupe_candidates_by_key(candidates);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].value, serde_json::json!("SQLite"));
    }

    #[test]
    fn covered_category_count_counts_distinct_categories() {
        let specs = vec![
            spec("goals", "g", true),
            spec("requirements", "r", true),
            spec("requirements", "r2", true),
        ];
        assert_eq!(covered_category_count(&specs), 2);
    }
}
