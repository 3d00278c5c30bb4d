// Configuration surface for the orchestration core. See §6.
//
// Everything here is data, not code: the path optimizer's cost tables, the bias detector's
// keyword lists, and the quality thresholds table are all loaded as config so tests can swap
// them in to exercise the sorting/selection properties without touching engine code.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use maieutic_contracts::project::Phase;

/// LLM gateway configuration: model defaults, timeout, retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens_default: u32,
    pub timeout_ms: u64,
    pub retry_max: u32,
    pub retry_base_ms: u64,
    /// Overall wall-clock deadline for a `complete` call including all retries.
    pub overall_deadline_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5".to_string(),
            max_tokens_default: 1024,
            timeout_ms: 10_000,
            retry_max: 3,
            retry_base_ms: 200,
            overall_deadline_ms: 30_000,
        }
    }
}

/// Per-phase quality thresholds for `advance_phase` pre-validation (§4.5.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseThreshold {
    pub maturity_threshold: f64,
    pub critical_categories: Vec<String>,
    pub category_threshold: f64,
}

/// Quality engine configuration: thresholds, regeneration cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Keyed by the *target* phase of an `advance_phase` request.
    pub phase_thresholds: HashMap<String, PhaseThreshold>,
    /// Minimum number of the 10 maturity categories that must have at least one current
    /// spec before `generate_code` is allowed.
    pub generate_code_min_covered_categories: usize,
    /// Maximum number of regeneration attempts the orchestrator will dispatch after a
    /// failed post-validation, per top-level `route` call.
    pub regeneration_cap: u32,
    /// Multiplier beyond which a "skip" path is blocked relative to the cheapest
    /// alternative, per §4.5.1 `skip_gaps`.
    pub skip_block_multiplier: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        let mut phase_thresholds = HashMap::new();
        phase_thresholds.insert(
            "analysis".to_string(),
            PhaseThreshold {
                maturity_threshold: 40.0,
                critical_categories: vec!["goals".to_string(), "requirements".to_string()],
                category_threshold: 60.0,
            },
        );
        phase_thresholds.insert(
            "design".to_string(),
            PhaseThreshold {
                maturity_threshold: 100.0,
                critical_categories: vec![
                    "security".to_string(),
                    "testing".to_string(),
                    "tech_stack".to_string(),
                ],
                category_threshold: 80.0,
            },
        );
        phase_thresholds.insert(
            "implementation".to_string(),
            PhaseThreshold {
                maturity_threshold: 100.0,
                critical_categories: vec![
                    "security".to_string(),
                    "testing".to_string(),
                    "tech_stack".to_string(),
                    "deployment".to_string(),
                ],
                category_threshold: 90.0,
            },
        );
        Self {
            phase_thresholds,
            generate_code_min_covered_categories: 7,
            regeneration_cap: 2,
            skip_block_multiplier: 3.0,
        }
    }
}

impl QualityConfig {
    pub fn threshold_for(&self, target_phase: Phase) -> Option<&PhaseThreshold> {
        self.phase_thresholds.get(&target_phase.to_string())
    }
}

/// Bias/leading-question detection tables for `post_validate(generate_question)` (§4.5.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasConfig {
    /// Phrases that suggest the question is steering toward a specific solution.
    pub solution_bias_keywords: Vec<String>,
    /// Concrete product/technology names the question should not name directly.
    pub product_denylist: Vec<String>,
    /// Phrasings that presuppose an answer ("wouldn't it be better to...").
    pub leading_patterns: Vec<String>,
    /// Deduction per finding kind, summed against a unit score.
    pub issue_penalty: f64,
    pub warning_penalty: f64,
    pub approval_threshold: f64,
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self {
            solution_bias_keywords: vec![
                "should use".to_string(),
                "recommend using".to_string(),
                "you should".to_string(),
                "best choice is".to_string(),
            ],
            product_denylist: vec![
                "react".to_string(),
                "postgresql".to_string(),
                "mysql".to_string(),
                "mongodb".to_string(),
                "kubernetes".to_string(),
                "aws".to_string(),
            ],
            leading_patterns: vec![
                "wouldn't it be better".to_string(),
                "don't you think".to_string(),
                "isn't it obvious".to_string(),
            ],
            issue_penalty: 0.20,
            warning_penalty: 0.05,
            approval_threshold: 0.7,
        }
    }
}

/// Path optimizer cost tables (§4.5.3). Keyed by action name; `rework_cost` additionally
/// keyed by target phase for phase-advancement paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathOptimizerConfig {
    pub immediate_cost: HashMap<String, f64>,
    pub rework_cost: HashMap<String, f64>,
    /// Contribution to `rework_probability` per unfilled critical gap.
    pub critical_gap_factor: f64,
    /// Contribution to `rework_probability` per pending conflict.
    pub pending_conflict_factor: f64,
    /// Multiplier applied to `maturity_gap / 100` for phase-advancement shortfalls.
    pub maturity_gap_factor: f64,
    /// Hard ceiling on summed rework probability.
    pub max_rework_probability: f64,
}

impl Default for PathOptimizerConfig {
    fn default() -> Self {
        let mut immediate_cost = HashMap::new();
        immediate_cost.insert("advance_now".to_string(), 50.0);
        immediate_cost.insert("address_gaps".to_string(), 800.0);
        immediate_cost.insert("skip_gaps".to_string(), 50.0);

        let mut rework_cost = HashMap::new();
        rework_cost.insert("advance_now".to_string(), 4000.0);
        rework_cost.insert("address_gaps".to_string(), 200.0);
        rework_cost.insert("skip_gaps".to_string(), 5000.0);

        Self {
            immediate_cost,
            rework_cost,
            critical_gap_factor: 0.30,
            pending_conflict_factor: 0.20,
            maturity_gap_factor: 0.8,
            max_rework_probability: 0.99,
        }
    }
}

/// Top-level configuration surface, assembled from environment + bundled defaults by the
/// `maieutic-api` binary (see `maieutic_api::config::Config::from_env`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub llm: LlmConfig,
    pub quality: QualityConfig,
    pub bias: BiasConfig,
    pub path_optimizer: PathOptimizerConfig,
    /// NLU conversation ring buffer capacity (default 20, per §4.2).
    pub conversation_buffer_size: usize,
    /// Whether `merge` conflict resolution requires the actor to be a project editor
    /// in addition to the conflict's creator being allowed unconditionally.
    pub merge_requires_editor: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            quality: QualityConfig::default(),
            bias: BiasConfig::default(),
            path_optimizer: PathOptimizerConfig::default(),
            conversation_buffer_size: 20,
            merge_requires_editor: true,
        }
    }
}
