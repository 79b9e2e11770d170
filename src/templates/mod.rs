//! TemplateStore (spec §4.2).
//!
//! Read-mostly: system templates are compiled in and immutable, user
//! templates are loaded eagerly from disk at construction and cached in
//! memory, written back to disk on every mutation. Modeled on the
//! teacher's read-mostly shared caches (template cache, session cache):
//! a `RwLock` guarding the in-memory table, writers briefly excluding
//! readers (spec §5 "Shared-resource policy").

mod error;

pub use error::TemplateError;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::{default_phases, ResolvedTemplate, Template, TemplateConfig, TemplateMetadata, TemplatePrompts};

const RESPONSE_START: &str = "<<<ORCHESTRATOR_RESPONSE>>>";
const RESPONSE_END: &str = "<<<END_ORCHESTRATOR_RESPONSE>>>";

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap())
}

pub struct TemplateStore {
    user_dir: PathBuf,
    templates: RwLock<HashMap<String, Template>>,
}

impl TemplateStore {
    /// Load system templates plus every `*.json` file under `user_dir`
    /// (spec §4.2 "Persistence").
    pub async fn load(user_dir: impl Into<PathBuf>) -> Result<Self, TemplateError> {
        let user_dir = user_dir.into();
        debug!(dir = %user_dir.display(), "TemplateStore::load: called");

        let mut templates = HashMap::new();
        for t in system_templates() {
            templates.insert(t.id.clone(), t);
        }

        if user_dir.exists() {
            let mut entries = fs::read_dir(&user_dir).await.map_err(|e| TemplateError::Io(e.to_string()))?;
            while let Some(entry) = entries.next_entry().await.map_err(|e| TemplateError::Io(e.to_string()))? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                match fs::read_to_string(&path).await {
                    Ok(content) => match serde_json::from_str::<Template>(&content) {
                        Ok(t) => {
                            templates.insert(t.id.clone(), t);
                        }
                        Err(e) => warn!(path = %path.display(), error = %e, "TemplateStore::load: skipping malformed template file"),
                    },
                    Err(e) => warn!(path = %path.display(), error = %e, "TemplateStore::load: failed to read template file"),
                }
            }
        }

        info!(count = templates.len(), "TemplateStore::load: templates loaded");
        Ok(Self {
            user_dir,
            templates: RwLock::new(templates),
        })
    }

    pub async fn list_templates(&self) -> Vec<TemplateMetadata> {
        self.templates.read().await.values().map(TemplateMetadata::from).collect()
    }

    /// Resolve the `extends` chain and deep-merge root-to-leaf (spec §4.2
    /// "Resolution algorithm"). Idempotent: resolving an already-resolved
    /// template is a no-op because `ResolvedTemplate` carries no `extends`.
    pub async fn get_template(&self, id: &str) -> Result<ResolvedTemplate, TemplateError> {
        debug!(%id, "TemplateStore::get_template: called");
        let templates = self.templates.read().await;
        resolve_chain(&templates, id)
    }

    pub async fn create_template(&self, data: Template) -> Result<(), TemplateError> {
        debug!(id = %data.id, "TemplateStore::create_template: called");
        validate(&data)?;
        if data.is_system() {
            return Err(TemplateError::SystemTemplateImmutable(data.id));
        }
        self.persist(&data).await?;
        self.templates.write().await.insert(data.id.clone(), data);
        Ok(())
    }

    pub async fn update_template(&self, id: &str, data: Template) -> Result<(), TemplateError> {
        debug!(%id, "TemplateStore::update_template: called");
        if id.starts_with('_') {
            return Err(TemplateError::SystemTemplateImmutable(id.to_string()));
        }
        validate(&data)?;
        self.persist(&data).await?;
        self.templates.write().await.insert(id.to_string(), data);
        Ok(())
    }

    pub async fn delete_template(&self, id: &str) -> Result<(), TemplateError> {
        debug!(%id, "TemplateStore::delete_template: called");
        if id.starts_with('_') {
            return Err(TemplateError::SystemTemplateImmutable(id.to_string()));
        }
        let mut templates = self.templates.write().await;
        if templates.remove(id).is_none() {
            return Err(TemplateError::NotFound(id.to_string()));
        }
        drop(templates);
        let path = self.user_dir.join(format!("{id}.json"));
        let _ = fs::remove_file(path).await;
        Ok(())
    }

    /// Deep-copies a resolved or unresolved template under a new id,
    /// always user-owned even when the source was a system template
    /// (SPEC_FULL §F.2).
    pub async fn duplicate_template(&self, id: &str, new_name: &str) -> Result<Template, TemplateError> {
        debug!(%id, %new_name, "TemplateStore::duplicate_template: called");
        let templates = self.templates.read().await;
        let source = templates.get(id).ok_or_else(|| TemplateError::NotFound(id.to_string()))?.clone();
        drop(templates);

        let new_id = format!("{}-copy-{}", id.trim_start_matches('_'), uuid::Uuid::now_v7());
        let duplicated = Template {
            id: new_id,
            name: new_name.to_string(),
            extends: source.extends,
            config: source.config,
            prompts: source.prompts,
            variables: source.variables,
            phases: source.phases,
        };
        self.persist(&duplicated).await?;
        self.templates.write().await.insert(duplicated.id.clone(), duplicated.clone());
        Ok(duplicated)
    }

    async fn persist(&self, template: &Template) -> Result<(), TemplateError> {
        fs::create_dir_all(&self.user_dir).await.map_err(|e| TemplateError::Io(e.to_string()))?;
        let path = self.user_dir.join(format!("{}.json", template.id));
        let content = serde_json::to_string_pretty(template).map_err(|e| TemplateError::Io(e.to_string()))?;
        fs::write(path, content).await.map_err(|e| TemplateError::Io(e.to_string()))?;
        Ok(())
    }
}

fn resolve_chain(templates: &HashMap<String, Template>, id: &str) -> Result<ResolvedTemplate, TemplateError> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut current = id.to_string();
    loop {
        if !seen.insert(current.clone()) {
            return Err(TemplateError::CyclicExtends(id.to_string()));
        }
        let t = templates.get(&current).ok_or_else(|| TemplateError::NotFound(current.clone()))?;
        chain.push(t.clone());
        match &t.extends {
            Some(parent) => current = parent.clone(),
            None => break,
        }
    }

    // chain is leaf-first; merge root-to-leaf so descendants override.
    chain.reverse();
    let mut merged = ResolvedTemplate {
        id: id.to_string(),
        name: String::new(),
        config: TemplateConfig::default(),
        prompts: TemplatePrompts::default(),
        variables: HashMap::new(),
        phases: default_phases(),
    };
    for t in chain {
        merged.name = t.name;
        merged.config = t.config;
        merge_prompts(&mut merged.prompts, t.prompts);
        for (k, v) in t.variables {
            merged.variables.insert(k, v);
        }
        merged.phases = t.phases;
    }
    merged.id = id.to_string();
    Ok(merged)
}

fn merge_prompts(base: &mut TemplatePrompts, over: TemplatePrompts) {
    if !over.analysis.is_empty() {
        base.analysis = over.analysis;
    }
    if !over.task_planning.is_empty() {
        base.task_planning = over.task_planning;
    }
    if !over.worker.is_empty() {
        base.worker = over.worker;
    }
    if !over.aggregation.is_empty() {
        base.aggregation = over.aggregation;
    }
}

fn validate(t: &Template) -> Result<(), TemplateError> {
    if t.id.is_empty() || t.name.is_empty() {
        return Err(TemplateError::Invalid {
            id: t.id.clone(),
            reason: "id and name are required".into(),
        });
    }
    let c = &t.config;
    if !(1..=20).contains(&c.max_workers) {
        return Err(TemplateError::Invalid {
            id: t.id.clone(),
            reason: "maxWorkers must be between 1 and 20".into(),
        });
    }
    if c.poll_interval_ms < 100 {
        return Err(TemplateError::Invalid {
            id: t.id.clone(),
            reason: "pollIntervalMs must be at least 100ms".into(),
        });
    }
    if c.worker_timeout_ms > 60 * 60 * 1_000 {
        return Err(TemplateError::Invalid {
            id: t.id.clone(),
            reason: "workerTimeoutMs must be at most 1 hour".into(),
        });
    }
    for (phase, prompt) in [
        ("analysis", &t.prompts.analysis),
        ("taskPlanning", &t.prompts.task_planning),
        ("worker", &t.prompts.worker),
        ("aggregation", &t.prompts.aggregation),
    ] {
        if !prompt.contains(RESPONSE_START) || !prompt.contains(RESPONSE_END) {
            return Err(TemplateError::Invalid {
                id: t.id.clone(),
                reason: format!("{phase} prompt must mention the response-block sentinels"),
            });
        }
    }
    Ok(())
}

/// Replace every `{NAME}` with the string form of `variables[NAME]`;
/// unresolved placeholders are left verbatim and logged, never a failure
/// (spec §4.2 "Variable substitution").
pub fn substitute(template_text: &str, variables: &HashMap<String, Value>) -> String {
    placeholder_re()
        .replace_all(template_text, |caps: &regex::Captures| {
            let name = &caps[1];
            match variables.get(name) {
                Some(Value::String(s)) => s.clone(),
                Some(v) => v.to_string(),
                None => {
                    warn!(%name, "substitute: unresolved placeholder left verbatim");
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

fn system_templates() -> Vec<Template> {
    let body = format!(
        "{{USER_REQUEST}}\n\nRespond with:\n{RESPONSE_START}\n{{\"phase\": \"analysis\", \"data\": {{...}}}}\n{RESPONSE_END}"
    );
    let planning = format!(
        "Plan the split.\n{RESPONSE_START}\n{{\"phase\": \"task_list\", \"data\": {{...}}}}\n{RESPONSE_END}"
    );
    let worker = format!(
        "Task: {{TASK_TITLE}}\n{{TASK_DESCRIPTION}}\n{RESPONSE_START}\n{{\"phase\": \"progress|completion\", \"data\": {{...}}}}\n{RESPONSE_END}"
    );
    let aggregation = format!(
        "Aggregate results.\n{RESPONSE_START}\n{{\"phase\": \"aggregation\", \"data\": {{...}}}}\n{RESPONSE_END}"
    );

    vec![Template {
        id: "_default".to_string(),
        name: "Default orchestrator".to_string(),
        extends: None,
        config: TemplateConfig::default(),
        prompts: TemplatePrompts {
            analysis: body,
            task_planning: planning,
            worker,
            aggregation,
        },
        variables: HashMap::new(),
        phases: default_phases(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_template(id: &str, extends: Option<&str>) -> Template {
        Template {
            id: id.to_string(),
            name: format!("Template {id}"),
            extends: extends.map(|s| s.to_string()),
            config: TemplateConfig::default(),
            prompts: TemplatePrompts {
                analysis: format!("a {RESPONSE_START}{RESPONSE_END}"),
                task_planning: format!("p {RESPONSE_START}{RESPONSE_END}"),
                worker: format!("w {RESPONSE_START}{RESPONSE_END}"),
                aggregation: format!("g {RESPONSE_START}{RESPONSE_END}"),
            },
            variables: HashMap::new(),
            phases: default_phases(),
        }
    }

    #[test]
    fn substitute_replaces_known_variables() {
        let mut vars = HashMap::new();
        vars.insert("NAME".to_string(), Value::String("Ada".to_string()));
        assert_eq!(substitute("hello {NAME}", &vars), "hello Ada");
    }

    #[test]
    fn substitute_leaves_unresolved_placeholders_verbatim() {
        let vars = HashMap::new();
        assert_eq!(substitute("hello {MISSING}", &vars), "hello {MISSING}");
    }

    #[test]
    fn resolve_detects_cycles() {
        let mut templates = HashMap::new();
        templates.insert("a".to_string(), base_template("a", Some("b")));
        templates.insert("b".to_string(), base_template("b", Some("a")));
        let result = resolve_chain(&templates, "a");
        assert!(matches!(result, Err(TemplateError::CyclicExtends(_))));
    }

    #[test]
    fn resolve_merges_root_to_leaf() {
        let mut root = base_template("root", None);
        root.name = "Root".to_string();
        let mut leaf = base_template("leaf", Some("root"));
        leaf.prompts.worker = format!("overridden {RESPONSE_START}{RESPONSE_END}");

        let mut templates = HashMap::new();
        templates.insert("root".to_string(), root);
        templates.insert("leaf".to_string(), leaf);

        let resolved = resolve_chain(&templates, "leaf").unwrap();
        assert_eq!(resolved.prompts.worker, format!("overridden {RESPONSE_START}{RESPONSE_END}"));
        assert_eq!(resolved.prompts.analysis, format!("a {RESPONSE_START}{RESPONSE_END}"));
    }

    #[test]
    fn validate_rejects_max_workers_out_of_bounds() {
        let mut t = base_template("t1", None);
        t.config.max_workers = 100;
        assert!(validate(&t).is_err());
    }

    #[test]
    fn validate_requires_sentinel_in_prompts() {
        let mut t = base_template("t1", None);
        t.prompts.analysis = "no sentinel here".to_string();
        assert!(validate(&t).is_err());
    }
}
