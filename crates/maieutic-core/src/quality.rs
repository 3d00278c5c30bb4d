// Quality engine (§4.5): pre-validation (readiness gates), post-validation (output quality
// gates), and the path-cost optimizer used to explain blocks. Everything here is a pure
// function of its inputs and the configuration tables in `config`; no store handle, no LLM
// call, no I/O - exactly the property §8 item 4/5/7 needs to hold.

use serde::{Deserialize, Serialize};

use crate::config::{BiasConfig, PathOptimizerConfig, QualityConfig};
use crate::specification;
use maieutic_contracts::project::Phase;
use maieutic_contracts::Specification;

/// One typed issue surfaced in a blocked or degraded response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub code: String,
    pub message: String,
}

/// One candidate decision path in the optimizer's output (§4.5.3 / GLOSSARY "Path analysis").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathCost {
    pub name: String,
    pub immediate_cost: f64,
    pub rework_probability: f64,
    pub rework_cost: f64,
    pub expected_cost: f64,
}

impl PathCost {
    fn new(name: impl Into<String>, immediate_cost: f64, rework_probability: f64, rework_cost: f64) -> Self {
        let rework_probability = rework_probability.clamp(0.0, 0.99);
        let expected_cost = immediate_cost + rework_probability * rework_cost;
        Self {
            name: name.into(),
            immediate_cost,
            rework_probability,
            rework_cost,
            expected_cost,
        }
    }
}

/// Sorted ascending by `expected_cost`; `recommended` is the first entry's name. Order-
/// invariant: permuting the input paths never changes `recommended` or any `expected_cost`
/// (§8 property 7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathAnalysis {
    pub paths: Vec<PathCost>,
    pub recommended: String,
    /// Difference between the cheapest and most expensive path, for transparency.
    pub cost_spread: f64,
}

pub fn analyze_paths(mut paths: Vec<PathCost>) -> PathAnalysis {
    paths.sort_by(|a, b| a.expected_cost.partial_cmp(&b.expected_cost).unwrap());
    let recommended = paths.first().map(|p| p.name.clone()).unwrap_or_default();
    let cost_spread = match (paths.first(), paths.last()) {
        (Some(first), Some(last)) => last.expected_cost - first.expected_cost,
        _ => 0.0,
    };
    PathAnalysis {
        paths,
        recommended,
        cost_spread,
    }
}

/// Count of unfilled critical categories for a target phase (maturity < category threshold).
fn unfilled_critical_gaps(
    current_specs: &[Specification],
    critical_categories: &[String],
    category_threshold: f64,
) -> usize {
    critical_categories
        .iter()
        .filter(|category| specification::category_maturity(current_specs, category) < category_threshold)
        .count()
}

/// Build the `address_gaps` / `skip_gaps` / `advance_now` path set for an `advance_phase`
/// pre-check, using the configured cost tables (§4.5.3).
pub fn build_phase_advance_paths(
    config: &PathOptimizerConfig,
    overall_maturity: f64,
    maturity_threshold: f64,
    critical_gaps: usize,
    pending_conflicts: usize,
) -> PathAnalysis {
    let maturity_gap = (maturity_threshold - overall_maturity).max(0.0);
    let rework_probability = (critical_gaps as f64 * config.critical_gap_factor)
        + (maturity_gap / 100.0) * config.maturity_gap_factor
        + (pending_conflicts as f64 * config.pending_conflict_factor);

    let advance_now = PathCost::new(
        "advance_now",
        *config.immediate_cost.get("advance_now").unwrap_or(&0.0),
        rework_probability,
        *config.rework_cost.get("advance_now").unwrap_or(&0.0),
    );
    let address_gaps = PathCost::new(
        "address_gaps",
        *config.immediate_cost.get("address_gaps").unwrap_or(&0.0),
        0.0,
        *config.rework_cost.get("address_gaps").unwrap_or(&0.0),
    );

    analyze_paths(vec![advance_now, address_gaps])
}

/// `skip_gaps` path analysis (§4.5.1): always computed; blocks the caller when the skip path's
/// expected cost exceeds `skip_block_multiplier` times the address path's.
pub fn build_skip_gaps_paths(
    config: &PathOptimizerConfig,
    critical_gaps: usize,
    pending_conflicts: usize,
) -> PathAnalysis {
    let skip_rework_probability =
        (critical_gaps as f64 * config.critical_gap_factor) + (pending_conflicts as f64 * config.pending_conflict_factor);
    let skip = PathCost::new(
        "skip_gaps",
        *config.immediate_cost.get("skip_gaps").unwrap_or(&0.0),
        skip_rework_probability,
        *config.rework_cost.get("skip_gaps").unwrap_or(&0.0),
    );
    let address = PathCost::new(
        "address_gaps",
        *config.immediate_cost.get("address_gaps").unwrap_or(&0.0),
        0.0,
        *config.rework_cost.get("address_gaps").unwrap_or(&0.0),
    );
    analyze_paths(vec![skip, address])
}

/// Result of `pre_validate` (§4.5.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreValidation {
    pub blocking: bool,
    pub reason: Option<String>,
    pub issues: Vec<Issue>,
    pub path_analysis: Option<PathAnalysis>,
    pub alternatives: Vec<String>,
}

impl PreValidation {
    fn ok() -> Self {
        Self {
            blocking: false,
            reason: None,
            issues: Vec::new(),
            path_analysis: None,
            alternatives: Vec::new(),
        }
    }
}

/// `advance_phase` pre-validation: block unless overall maturity and every critical
/// category clear their thresholds and there are zero pending conflicts (§4.5.1).
pub fn pre_validate_advance_phase(
    quality: &QualityConfig,
    path_optimizer: &PathOptimizerConfig,
    target_phase: Phase,
    current_specs: &[Specification],
    pending_conflict_count: usize,
) -> PreValidation {
    let Some(threshold) = quality.threshold_for(target_phase) else {
        return PreValidation::ok();
    };

    let overall_maturity = specification::maturity(current_specs);
    let mut issues = Vec::new();

    if overall_maturity < threshold.maturity_threshold {
        issues.push(Issue {
            code: "maturity_below_threshold".to_string(),
            message: format!(
                "overall maturity {overall_maturity} is below the {} required for {target_phase}",
                threshold.maturity_threshold
            ),
        });
    }

    let mut incomplete_critical = Vec::new();
    for category in &threshold.critical_categories {
        let score = specification::category_maturity(current_specs, category);
        if score < threshold.category_threshold {
            incomplete_critical.push(category.clone());
            issues.push(Issue {
                code: "critical_category_incomplete".to_string(),
                message: format!(
                    "critical category '{category}' at {score}, below required {}",
                    threshold.category_threshold
                ),
            });
        }
    }

    if pending_conflict_count > 0 {
        issues.push(Issue {
            code: "pending_conflicts".to_string(),
            message: format!("{pending_conflict_count} pending conflict(s) must be resolved first"),
        });
    }

    let blocking = !issues.is_empty();
    if !blocking {
        return PreValidation::ok();
    }

    let path_analysis = build_phase_advance_paths(
        path_optimizer,
        overall_maturity,
        threshold.maturity_threshold,
        incomplete_critical.len(),
        pending_conflict_count,
    );

    PreValidation {
        blocking: true,
        reason: Some(format!(
            "maturity {overall_maturity} / {} required, {} critical categor{} incomplete, {pending_conflict_count} pending conflict(s)",
            threshold.maturity_threshold,
            incomplete_critical.len(),
            if incomplete_critical.len() == 1 { "y" } else { "ies" }
        )),
        issues,
        alternatives: vec![
            "address the listed gaps before advancing".to_string(),
            "advance now and accept rework risk".to_string(),
        ],
        path_analysis: Some(path_analysis),
    }
}

/// `generate_code` pre-validation: block unless >= `generate_code_min_covered_categories` of
/// the 10 maturity categories have a current spec and there are zero pending conflicts.
pub fn pre_validate_generate_code(
    quality: &QualityConfig,
    current_specs: &[Specification],
    pending_conflict_count: usize,
) -> PreValidation {
    let covered = specification::covered_category_count(current_specs);
    let mut issues = Vec::new();
    if covered < quality.generate_code_min_covered_categories {
        issues.push(Issue {
            code: "insufficient_category_coverage".to_string(),
            message: format!(
                "only {covered} of {} maturity categories have a current spec, need at least {}",
                maieutic_contracts::MATURITY_CATEGORIES.len(),
                quality.generate_code_min_covered_categories
            ),
        });
    }
    if pending_conflict_count > 0 {
        issues.push(Issue {
            code: "pending_conflicts".to_string(),
            message: format!("{pending_conflict_count} pending conflict(s) must be resolved first"),
        });
    }
    if issues.is_empty() {
        PreValidation::ok()
    } else {
        PreValidation {
            blocking: true,
            reason: Some("code generation requires broader category coverage and no pending conflicts".to_string()),
            issues,
            path_analysis: None,
            alternatives: vec!["fill in the remaining categories before generating".to_string()],
        }
    }
}

/// `skip_gaps` pre-validation: always runs path analysis; blocks if skip's expected cost
/// exceeds `skip_block_multiplier` times address's (§4.5.1, §8 scenario S5).
pub fn pre_validate_skip_gaps(
    quality: &QualityConfig,
    path_optimizer: &PathOptimizerConfig,
    critical_gaps: usize,
    pending_conflict_count: usize,
) -> PreValidation {
    let analysis = build_skip_gaps_paths(path_optimizer, critical_gaps, pending_conflict_count);
    let skip_cost = analysis.paths.iter().find(|p| p.name == "skip_gaps").map(|p| p.expected_cost).unwrap_or(0.0);
    let address_cost = analysis.paths.iter().find(|p| p.name == "address_gaps").map(|p| p.expected_cost).unwrap_or(1.0);

    let blocking = address_cost > 0.0 && skip_cost > quality.skip_block_multiplier * address_cost;

    PreValidation {
        blocking,
        reason: blocking.then(|| {
            format!(
                "skip path expected cost {skip_cost:.1} exceeds {}x the address path's {address_cost:.1}",
                quality.skip_block_multiplier
            )
        }),
        issues: Vec::new(),
        alternatives: vec!["address the gaps instead of skipping".to_string()],
        path_analysis: Some(analysis),
    }
}

/// Result of `post_validate` (§4.5.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostValidation {
    pub approved: bool,
    pub quality_score: f64,
    pub issues: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub action_required: Option<ActionRequired>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionRequired {
    Regenerate,
}

pub fn post_validate_default() -> PostValidation {
    PostValidation {
        approved: true,
        quality_score: 1.0,
        issues: Vec::new(),
        warnings: Vec::new(),
        action_required: None,
    }
}

/// `generate_question` post-validation: scan for solution bias and leading phrasing.
/// Each finding deducts from a unit score; below the approval threshold, demands a bounded
/// regeneration (§4.5.2, §8 scenario S2).
pub fn post_validate_generate_question(bias: &BiasConfig, question_text: &str) -> PostValidation {
    let lowered = question_text.to_lowercase();
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    for phrase in &bias.solution_bias_keywords {
        if lowered.contains(phrase) {
            issues.push(Issue {
                code: "solution_bias".to_string(),
                message: format!("question contains solution-steering phrase '{phrase}'"),
            });
        }
    }
    for product in &bias.product_denylist {
        if lowered.contains(product) {
            issues.push(Issue {
                code: "concrete_product_named".to_string(),
                message: format!("question names a specific product '{product}'"),
            });
        }
    }
    for pattern in &bias.leading_patterns {
        if lowered.contains(pattern) {
            warnings.push(Issue {
                code: "leading_phrasing".to_string(),
                message: format!("question uses leading phrasing '{pattern}'"),
            });
        }
    }

    let deduction = issues.len() as f64 * bias.issue_penalty + warnings.len() as f64 * bias.warning_penalty;
    let quality_score = (1.0 - deduction).max(0.0);
    let approved = quality_score >= bias.approval_threshold;

    PostValidation {
        approved,
        quality_score,
        issues,
        warnings,
        action_required: (!approved).then_some(ActionRequired::Regenerate),
    }
}

/// `generate_architecture` post-validation (§4.5.2): every requirement-class current spec
/// must be referenced in the generated text, a complexity budget keyed on team size must not
/// be exceeded, and a security section must exist.
pub fn post_validate_generate_architecture(
    requirement_specs: &[Specification],
    architecture_text: &str,
    team_size: Option<u32>,
    complexity_budget_per_engineer: usize,
) -> PostValidation {
    let lowered = architecture_text.to_lowercase();
    let mut issues = Vec::new();

    for spec in requirement_specs {
        let value_text = spec.value.as_str().map(|s| s.to_string()).unwrap_or_else(|| spec.value.to_string());
        let snippet: String = value_text.to_lowercase().chars().take(24).collect();
        if !snippet.is_empty() && !lowered.contains(snippet.trim()) {
            issues.push(Issue {
                code: "requirement_not_referenced".to_string(),
                message: format!("requirement '{}' is not referenced in the generated architecture", spec.key),
            });
        }
    }

    if !lowered.contains("security") {
        issues.push(Issue {
            code: "missing_security_section".to_string(),
            message: "generated architecture has no security section".to_string(),
        });
    }

    if let Some(team_size) = team_size {
        let budget = team_size as usize * complexity_budget_per_engineer;
        let word_count = architecture_text.split_whitespace().count();
        if word_count > budget {
            issues.push(Issue {
                code: "complexity_budget_exceeded".to_string(),
                message: format!(
                    "generated architecture is {word_count} words, over the {budget}-word budget for a team of {team_size}"
                ),
            });
        }
    }

    let quality_score = if issues.is_empty() { 1.0 } else { (1.0 - 0.2 * issues.len() as f64).max(0.0) };
    PostValidation {
        approved: issues.is_empty(),
        quality_score,
        issues,
        warnings: Vec::new(),
        action_required: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathOptimizerConfig;

    #[test]
    fn path_analysis_is_order_invariant() {
        let a = PathCost::new("a", 100.0, 0.2, 500.0);
        let b = PathCost::new("b", 50.0, 0.5, 400.0);
        let c = PathCost::new("c", 10.0, 0.9, 50.0);

        let forward = analyze_paths(vec![a.clone(), b.clone(), c.clone()]);
        let shuffled = analyze_paths(vec![c, a, b]);

        assert_eq!(forward.recommended, shuffled.recommended);
        assert_eq!(forward.cost_spread, shuffled.cost_spread);
        for (p1, p2) in forward.paths.iter().zip(shuffled.paths.iter()) {
            assert_eq!(p1.name, p2.name);
            assert_eq!(p1.expected_cost, p2.expected_cost);
        }
    }

    #[test]
    fn skip_gaps_scenario_matches_spec_example() {
        // S5: 2 critical gaps, immediate_cost(address)=800, rework_cost(skip)=5000.
        let mut config = PathOptimizerConfig::default();
        config.immediate_cost.insert("address_gaps".to_string(), 800.0);
        config.immediate_cost.insert("skip_gaps".to_string(), 0.0);
        config.rework_cost.insert("skip_gaps".to_string(), 5000.0);
        config.critical_gap_factor = 0.30;

        let analysis = build_skip_gaps_paths(&config, 2, 0);
        let skip = analysis.paths.iter().find(|p| p.name == "skip_gaps").unwrap();
        let address = analysis.paths.iter().find(|p| p.name == "address_gaps").unwrap();

        assert!((skip.expected_cost - 3000.0).abs() < 1.0);
        assert_eq!(address.expected_cost, 800.0);
        assert_eq!(analysis.recommended, "address_gaps");
    }

    #[test]
    fn rework_probability_is_clamped() {
        let path = PathCost::new("x", 10.0, 5.0, 100.0);
        assert!(path.rework_probability <= 0.99);
    }

    #[test]
    fn bias_detection_flags_solution_steering_and_product_names() {
        let bias = BiasConfig::default();
        let result = post_validate_generate_question(&bias, "I think we should use React for this, right?");
        assert!(!result.approved);
        assert!(result.issues.iter().any(|i| i.code == "solution_bias"));
        assert!(result.issues.iter().any(|i| i.code == "concrete_product_named"));
    }

    #[test]
    fn bias_detection_approves_neutral_question() {
        let bias = BiasConfig::default();
        let result = post_validate_generate_question(
            &bias,
            "What are your expectations for expected concurrent users at peak load?",
        );
        assert!(result.approved);
        assert_eq!(result.quality_score, 1.0);
    }
}
