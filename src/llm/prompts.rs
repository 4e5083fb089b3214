//! Prompt template catalogue and placeholder substitution

use crate::error::{JobAgentError, Result};
use log::{info, warn};
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid placeholder regex")
});

/// Catalogue shipped with the crate, used when no catalogue file is configured
pub const BUILTIN_CATALOGUE: &str = include_str!("../../templates/system_prompts.yaml");

/// One catalogue entry as written on disk
#[derive(Debug, Deserialize)]
struct RawTemplate {
    instruction: Option<String>,
    placeholders: Option<Vec<String>>,
    #[serde(default)]
    description: Option<String>,
}

/// A named instruction with `{placeholder}` tokens. Immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    name: String,
    instruction: String,
    placeholders: BTreeSet<String>,
    description: Option<String>,
}

/// Values to substitute into a template, keyed by placeholder name
#[derive(Debug, Clone, Default)]
pub struct PromptParams {
    values: HashMap<String, String>,
}

impl PromptParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

impl PromptTemplate {
    /// Build a template, inferring the placeholder set from the instruction
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        let instruction = instruction.into();
        let placeholders = referenced_placeholders(&instruction);
        Self {
            name: name.into(),
            instruction,
            placeholders,
            description: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn placeholders(&self) -> &BTreeSet<String> {
        &self.placeholders
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Substitute every placeholder token in one pass.
    ///
    /// Replacement is literal; tokens inside supplied values are never
    /// expanded. A placeholder with no value becomes an empty string.
    pub fn render(&self, params: &PromptParams) -> String {
        PLACEHOLDER
            .replace_all(&self.instruction, |caps: &Captures| {
                let token = &caps[1];
                match params.get(token) {
                    Some(value) => value.to_string(),
                    None if self.placeholders.contains(token) => {
                        warn!(
                            "Template '{}' rendered without a value for {{{}}}",
                            self.name, token
                        );
                        String::new()
                    }
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Like [`render`](Self::render) but every declared placeholder must have a value
    pub fn render_strict(&self, params: &PromptParams) -> Result<String> {
        if let Some(missing) = self.placeholders.iter().find(|p| params.get(p).is_none()) {
            return Err(JobAgentError::MissingPlaceholder {
                template: self.name.clone(),
                placeholder: missing.clone(),
            });
        }
        Ok(self.render(params))
    }
}

fn referenced_placeholders(instruction: &str) -> BTreeSet<String> {
    PLACEHOLDER
        .captures_iter(instruction)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Name-indexed set of prompt templates, loaded once and shared read-only
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalogue {
    templates: BTreeMap<String, PromptTemplate>,
}

impl TemplateCatalogue {
    /// Load a catalogue from a YAML (or `.toml`) file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(JobAgentError::CatalogueMissing {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let raw: BTreeMap<String, RawTemplate> = if is_toml {
            toml::from_str(&content)
                .map_err(|e| JobAgentError::CatalogueMalformed(format!("{}: {}", path.display(), e)))?
        } else {
            serde_yaml::from_str(&content)
                .map_err(|e| JobAgentError::CatalogueMalformed(format!("{}: {}", path.display(), e)))?
        };

        let catalogue = Self::from_raw(raw)?;
        info!("Loaded {} prompt templates from {}", catalogue.len(), path.display());
        Ok(catalogue)
    }

    /// Parse a YAML catalogue held in memory
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let raw: BTreeMap<String, RawTemplate> = serde_yaml::from_str(content)
            .map_err(|e| JobAgentError::CatalogueMalformed(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Load `path`, falling back to the built-in catalogue when the file is absent.
    /// A malformed file is still an error.
    pub fn load_or_builtin(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(JobAgentError::CatalogueMissing { path }) => {
                warn!("No prompt catalogue at {}, using built-in templates", path.display());
                Self::builtin()
            }
            other => other,
        }
    }

    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_CATALOGUE)
    }

    fn from_raw(raw: BTreeMap<String, RawTemplate>) -> Result<Self> {
        let mut templates = BTreeMap::new();

        for (name, entry) in raw {
            let instruction = match entry.instruction {
                Some(text) if !text.trim().is_empty() => text,
                _ => {
                    return Err(JobAgentError::CatalogueMalformed(format!(
                        "template '{}' has no instruction",
                        name
                    )))
                }
            };

            let referenced = referenced_placeholders(&instruction);
            let placeholders = match entry.placeholders {
                Some(declared) => {
                    let declared: BTreeSet<String> = declared.into_iter().collect();
                    if let Some(undeclared) = referenced.difference(&declared).next() {
                        return Err(JobAgentError::CatalogueMalformed(format!(
                            "template '{}' references undeclared placeholder {{{}}}",
                            name, undeclared
                        )));
                    }
                    for unused in declared.difference(&referenced) {
                        warn!("Template '{}' declares unused placeholder {{{}}}", name, unused);
                    }
                    declared
                }
                None => referenced,
            };

            templates.insert(
                name.clone(),
                PromptTemplate {
                    name,
                    instruction,
                    placeholders,
                    description: entry.description,
                },
            );
        }

        Ok(Self { templates })
    }

    pub fn insert(&mut self, template: PromptTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    pub fn get(&self, name: &str) -> Result<&PromptTemplate> {
        self.templates
            .get(name)
            .ok_or_else(|| JobAgentError::TemplateNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
