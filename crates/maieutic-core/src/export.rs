// Export: deterministic renderings of a project's current
// specifications, pending/resolved conflicts, and maturity into `markdown` or `json`.
// Pure: takes already-loaded records, makes no store call and no LLM call - the API
// layer loads the data and calls this the same way the code generator agent's scaffold
// template does for its README.

use chrono::{DateTime, Utc};
use serde::Serialize;

use maieutic_contracts::error::{CoreError, Result};
use maieutic_contracts::{Conflict, Project, Specification, MATURITY_CATEGORIES};

use crate::specification;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "markdown" => Ok(ExportFormat::Markdown),
            "json" => Ok(ExportFormat::Json),
            other => Err(CoreError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "text/markdown; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ExportDocument<'a> {
    project: &'a Project,
    generated_at: DateTime<Utc>,
    overall_maturity: f64,
    category_maturity: Vec<CategoryMaturity>,
    specifications: &'a [Specification],
    conflicts: &'a [Conflict],
}

#[derive(Debug, Clone, Serialize)]
struct CategoryMaturity {
    category: &'static str,
    maturity: f64,
}

/// Render a project's current export (`bytes`, `content_type`), per the Caller API's
/// `export(identity, project_id, format)` operation (§6). `UnsupportedFormat`
/// is the caller's responsibility to raise for any format string this doesn't parse.
pub fn render(format: ExportFormat, project: &Project, specs: &[Specification], conflicts: &[Conflict]) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Json => render_json(project, specs, conflicts),
        ExportFormat::Markdown => Ok(render_markdown(project, specs, conflicts).into_bytes()),
    }
}

fn render_json(project: &Project, specs: &[Specification], conflicts: &[Conflict]) -> Result<Vec<u8>> {
    let category_maturity = MATURITY_CATEGORIES
        .iter()
        .map(|category| CategoryMaturity {
            category,
            maturity: specification::category_maturity(specs, category),
        })
        .collect();
    let doc = ExportDocument {
        project,
        generated_at: Utc::now(),
        overall_maturity: specification::maturity(specs),
        category_maturity,
        specifications: specs,
        conflicts,
    };
    serde_json::to_vec_pretty(&doc).map_err(CoreError::internal)
}

fn render_markdown(project: &Project, specs: &[Specification], conflicts: &[Conflict]) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", project.name));
    if !project.description.is_empty() {
        out.push_str(&format!("{}\n\n", project.description));
    }
    out.push_str(&format!(
        "Phase: **{}** · Maturity: **{:.1}**\n\n",
        project.current_phase,
        specification::maturity(specs),
    ));

    out.push_str("## Specifications\n\n");
    for category in MATURITY_CATEGORIES {
        let entries: Vec<_> = specs.iter().filter(|s| s.is_current && s.category == category).collect();
        out.push_str(&format!(
            "### {category} ({:.0}% covered)\n\n",
            specification::category_maturity(specs, category)
        ));
        if entries.is_empty() {
            out.push_str("_No current specifications._\n\n");
            continue;
        }
        for spec in entries {
            let value_text = spec.value.as_str().map(|s| s.to_string()).unwrap_or_else(|| spec.value.to_string());
            out.push_str(&format!("- **{}**: {value_text} _(confidence {:.2}, {})_\n", spec.key, spec.confidence, spec.source));
        }
        out.push('\n');
    }

    let pending: Vec<_> = conflicts.iter().filter(|c| c.is_pending()).collect();
    let resolved: Vec<_> = conflicts.iter().filter(|c| !c.is_pending()).collect();

    out.push_str("## Conflicts\n\n");
    if pending.is_empty() {
        out.push_str("No pending conflicts.\n\n");
    } else {
        for conflict in &pending {
            out.push_str(&format!(
                "- **pending** ({}) against specification `{}`\n",
                conflict.conflict_type, conflict.incumbent_spec_id
            ));
        }
        out.push('\n');
    }
    if !resolved.is_empty() {
        out.push_str("### Resolved\n\n");
        for conflict in &resolved {
            out.push_str(&format!("- {} -> **{}**\n", conflict.conflict_type, conflict.resolution));
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use maieutic_contracts::project::Phase;
    use maieutic_contracts::{ProjectStatus, SpecificationSource};
    use uuid::Uuid;

    fn project() -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Acme Widgets".to_string(),
            description: "A widget factory".to_string(),
            current_phase: Phase::Analysis,
            maturity_score: 0.0,
            status: ProjectStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    fn spec(category: &str, key: &str, value: &str) -> Specification {
        let now = Utc::now();
        Specification {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            category: category.to_string(),
            key: key.to_string(),
            value: serde_json::json!(value),
            confidence: 0.9,
            source: SpecificationSource::Extracted,
            is_current: true,
            supersedes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn unsupported_format_is_rejected() {
        let err = "pdf".parse::<ExportFormat>().unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedFormat(_)));
    }

    #[test]
    fn markdown_includes_project_name_and_specs() {
        let project = project();
        let specs = vec![spec("goals", "primary", "ship an MVP")];
        let rendered = render(ExportFormat::Markdown, &project, &specs, &[]).unwrap();
        let text = String::from_utf8(rendered).unwrap();
        assert!(text.contains("Acme Widgets"));
        assert!(text.contains("ship an MVP"));
    }

    #[test]
    fn json_round_trips_overall_maturity() {
        let project = project();
        let specs = vec![spec("goals", "primary", "ship an MVP")];
        let rendered = render(ExportFormat::Json, &project, &specs, &[]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&rendered).unwrap();
        assert!(value["overall_maturity"].as_f64().unwrap() > 0.0);
    }
}
