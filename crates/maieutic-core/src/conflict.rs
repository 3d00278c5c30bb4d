// Conflict engine (§4.4): the specification engine's sub-component for pairwise contradiction
// detection beyond exact-value disagreement. Pure: the LLM-assisted semantic path takes the
// gateway call result as an input rather than making the call itself, so `detect` stays a pure
// function and the async LLM call lives in the Conflict agent.

use maieutic_contracts::{Conflict, ConflictResolution, ConflictType, Specification, SpecificationCandidate};
use maieutic_contracts::specification::PROSE_HEAVY_CATEGORIES;
use chrono::Utc;
use uuid::Uuid;

/// One row of the cross-key rule table (§4.4): two `(category, key)` aliases that are treated
/// as declaring the same underlying fact, so a new value under one conflicts with a current
/// value under the other. A small, documented, configuration-loadable table - adding a
/// row is a configuration change, not a code change.
#[derive(Debug, Clone)]
pub struct CrossKeyRule {
    pub left: (&'static str, &'static str),
    pub right: (&'static str, &'static str),
    pub conflict_type: ConflictType,
}

pub fn default_cross_key_rules() -> Vec<CrossKeyRule> {
    vec![
        CrossKeyRule {
            left: ("tech_stack", "primary_database"),
            right: ("tech_stack", "database"),
            conflict_type: ConflictType::Technology,
        },
        CrossKeyRule {
            left: ("tech_stack", "primary_database"),
            right: ("tech_stack", "datastore"),
            conflict_type: ConflictType::Technology,
        },
        CrossKeyRule {
            left: ("tech_stack", "message_queue"),
            right: ("tech_stack", "queue"),
            conflict_type: ConflictType::Technology,
        },
        CrossKeyRule {
            left: ("tech_stack", "cache"),
            right: ("tech_stack", "caching_layer"),
            conflict_type: ConflictType::Technology,
        },
    ]
}

/// Result of the LLM-assisted semantic contradiction check for a prose-heavy category
/// (§4.4's "semantic path"). Computed by the Conflict agent via the LLM gateway and passed in
/// here; `detect` itself never calls the gateway.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticCheck {
    pub contradicts: bool,
    pub confidence: f64,
}

impl SemanticCheck {
    fn fires(self) -> bool {
        self.contradicts && self.confidence >= 0.7
    }
}

/// Whether `category` is eligible for the semantic contradiction path (§4.4).
pub fn is_prose_heavy(category: &str) -> bool {
    PROSE_HEAVY_CATEGORIES.contains(&category)
}

/// Detect a conflict for `candidate` given the project's current specifications and the
/// (already-run, if applicable) semantic check. Ordering: if multiple rules fire, the
/// highest-severity type wins (`Technology > Requirements > Timeline > Resources`, encoded by
/// `ConflictType`'s `Ord`). Only one conflict is recorded per `(candidate, incumbent)` pair -
/// the caller calls `detect` once per incumbent candidate pairing it found.
pub fn detect(
    candidate: &SpecificationCandidate,
    current_specs: &[Specification],
    cross_key_rules: &[CrossKeyRule],
    semantic: Option<SemanticCheck>,
) -> Option<Conflict> {
    let mut fired: Vec<(ConflictType, Specification)> = Vec::new();

    // Exact-key path.
    if let Some(incumbent) = current_specs.iter().find(|s| {
        s.is_current && s.category == candidate.category && s.key == candidate.key
    }) {
        if !crate::specification::values_semantically_equal(&incumbent.value, &candidate.value) {
            fired.push((category_conflict_type(&candidate.category), incumbent.clone()));
        }
    }

    // Cross-key path.
    for rule in cross_key_rules {
        let candidate_matches_left =
            rule.left == (candidate.category.as_str(), candidate.key.as_str());
        let candidate_matches_right =
            rule.right == (candidate.category.as_str(), candidate.key.as_str());
        if !candidate_matches_left && !candidate_matches_right {
            continue;
        }
        let other_side = if candidate_matches_left { rule.right } else { rule.left };
        if let Some(incumbent) = current_specs.iter().find(|s| {
            s.is_current && (s.category.as_str(), s.key.as_str()) == other_side
        }) {
            if !crate::specification::values_semantically_equal(&incumbent.value, &candidate.value)
            {
                fired.push((rule.conflict_type, incumbent.clone()));
            }
        }
    }

    // Semantic path: only for prose-heavy categories, only when the caller supplied a check
    // result (it already ran the LLM call).
    if is_prose_heavy(&candidate.category) {
        if let Some(check) = semantic {
            if check.fires() {
                if let Some(incumbent) = current_specs.iter().find(|s| {
                    s.is_current && s.category == candidate.category && s.key == candidate.key
                }) {
                    fired.push((category_conflict_type(&candidate.category), incumbent.clone()));
                }
            }
        }
    }

    fired.into_iter().max_by_key(|(t, _)| *t).map(|(conflict_type, incumbent)| Conflict {
        id: Uuid::new_v4(),
        project_id: incumbent.project_id,
        incumbent_spec_id: incumbent.id,
        new_value: candidate.value.clone(),
        conflict_type,
        resolution: ConflictResolution::Pending,
        resolver: None,
        resolved_at: None,
        created_at: Utc::now(),
    })
}

fn category_conflict_type(category: &str) -> ConflictType {
    match category {
        "tech_stack" => ConflictType::Technology,
        "requirements" | "goals" => ConflictType::Requirements,
        "timeline" => ConflictType::Timeline,
        _ => ConflictType::Resources,
    }
}

/// Whether `actor` may action a `merge` resolution: the conflict's creator or, when
/// `merge_requires_editor` is configured on, any project editor - not any project member.
pub fn can_merge(is_creator: bool, is_editor: bool, merge_requires_editor: bool) -> bool {
    if is_creator {
        return true;
    }
    if merge_requires_editor {
        is_editor
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maieutic_contracts::SpecificationSource;

    fn incumbent(category: &str, key: &str, value: serde_json::Value) -> Specification {
        let now = Utc::now();
        Specification {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            category: category.to_string(),
            key: key.to_string(),
            value,
            confidence: 0.9,
            source: SpecificationSource::UserInput,
            is_current: true,
            supersedes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn exact_key_disagreement_produces_conflict() {
        let incumbent_spec = incumbent("tech_stack", "primary_database", serde_json::json!("PostgreSQL"));
        let candidate = SpecificationCandidate {
            category: "tech_stack".into(),
            key: "primary_database".into(),
            value: serde_json::json!("MySQL"),
            confidence: 0.8,
            source: SpecificationSource::Extracted,
        };
        let conflict = detect(&candidate, &[incumbent_spec.clone()], &[], None).unwrap();
        assert_eq!(conflict.conflict_type, ConflictType::Technology);
        assert_eq!(conflict.incumbent_spec_id, incumbent_spec.id);
    }

    #[test]
    fn exact_key_agreement_produces_no_conflict() {
        let incumbent_spec = incumbent("tech_stack", "primary_database", serde_json::json!("PostgreSQL"));
        let candidate = SpecificationCandidate {
            category: "tech_stack".into(),
            key: "primary_database".into(),
            value: serde_json::json!("  postgresql "),
            confidence: 0.8,
            source: SpecificationSource::Extracted,
        };
        assert!(detect(&candidate, &[incumbent_spec], &[], None).is_none());
    }

    #[test]
    fn cross_key_alias_conflict_fires() {
        let incumbent_spec = incumbent("tech_stack", "database", serde_json::json!("PostgreSQL"));
        let candidate = SpecificationCandidate {
            category: "tech_stack".into(),
            key: "primary_database".into(),
            value: serde_json::json!("MySQL"),
            confidence: 0.8,
            source: SpecificationSource::Extracted,
        };
        let conflict = detect(&candidate, &[incumbent_spec], &default_cross_key_rules(), None).unwrap();
        assert_eq!(conflict.conflict_type, ConflictType::Technology);
    }

    #[test]
    fn semantic_path_requires_confidence_threshold() {
        let incumbent_spec = incumbent("requirements", "scope", serde_json::json!("ship web only"));
        let candidate = SpecificationCandidate {
            category: "requirements".into(),
            key: "scope".into(),
            value: serde_json::json!("ship web and native mobile"),
            confidence: 0.8,
            source: SpecificationSource::Extracted,
        };
        let low_confidence = SemanticCheck {
            contradicts: true,
            confidence: 0.5,
        };
        assert!(detect(&candidate, &[incumbent_spec.clone()], &[], Some(low_confidence)).is_none());

        let high_confidence = SemanticCheck {
            contradicts: true,
            confidence: 0.9,
        };
        assert!(detect(&candidate, &[incumbent_spec], &[], Some(high_confidence)).is_some());
    }

    #[test]
    fn only_one_conflict_recorded_even_if_multiple_rules_fire() {
        // Both the exact-key path and a cross-key alias would fire; highest severity wins and
        // exactly one Conflict is returned.
        let exact = incumbent("tech_stack", "primary_database", serde_json::json!("PostgreSQL"));
        let candidate = SpecificationCandidate {
            category: "tech_stack".into(),
            key: "primary_database".into(),
            value: serde_json::json!("MySQL"),
            confidence: 0.8,
            source: SpecificationSource::Extracted,
        };
        let conflict = detect(&candidate, &[exact], &default_cross_key_rules(), None);
        assert!(conflict.is_some());
    }
}
