//! Template data model (spec §3 "Template").

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-orchestrator concurrency and retry knobs carried by a template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemplateConfig {
    pub max_workers: u32,
    pub poll_interval_ms: u64,
    pub worker_timeout_ms: u64,
    pub auto_spawn_workers: bool,
    pub retry_max: u32,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            poll_interval_ms: 1_000,
            worker_timeout_ms: 10 * 60 * 1_000,
            auto_spawn_workers: false,
            retry_max: 1,
        }
    }
}

/// The four prompt bodies a template must supply, one per phase that talks
/// to an assistant session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemplatePrompts {
    pub analysis: String,
    pub task_planning: String,
    pub worker: String,
    pub aggregation: String,
}

/// Default phase ordering (spec §3); templates may not reorder phases,
/// only the set of variables and prompt text differs between templates.
pub fn default_phases() -> Vec<String> {
    ["analysis", "taskPlanning", "workerExecution", "aggregation"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// A template as loaded from disk, before `extends` resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default)]
    pub config: TemplateConfig,
    #[serde(default)]
    pub prompts: TemplatePrompts,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    #[serde(default = "default_phases")]
    pub phases: Vec<String>,
}

impl Template {
    /// System templates (`_`-prefixed ids) are read-only (spec §4.2).
    pub fn is_system(&self) -> bool {
        self.id.starts_with('_')
    }
}

/// A template after its `extends` chain has been deep-merged. Distinct
/// type from `Template` so callers can't accidentally treat an unresolved
/// template as ready to use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedTemplate {
    pub id: String,
    pub name: String,
    pub config: TemplateConfig,
    pub prompts: TemplatePrompts,
    pub variables: HashMap<String, Value>,
    pub phases: Vec<String>,
}

/// Lightweight listing entry, the shape `TemplateStore::listTemplates`
/// returns instead of full bodies (SPEC_FULL §F.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateMetadata {
    pub id: String,
    pub name: String,
    pub is_system: bool,
    pub extends: Option<String>,
}

impl From<&Template> for TemplateMetadata {
    fn from(t: &Template) -> Self {
        Self {
            id: t.id.clone(),
            name: t.name.clone(),
            is_system: t.is_system(),
            extends: t.extends.clone(),
        }
    }
}
