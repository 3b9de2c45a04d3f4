//! Persisted submission history.
//!
//! The store key has carried three record shapes over time. Everything is
//! decoded once, at load, through [`StoredEntry`]; the rest of the app only
//! ever sees the canonical [`HistoryEntry`].

use serde::{Deserialize, Serialize};

use crate::config::{opt_id_string, ApiConfig};

/// Group name for legacy records whose template cannot be recovered.
pub const DEFAULT_GROUP: &str = "default";

/// One completed submission, in the canonical (current) shape. This is the
/// only shape ever written back to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub template_name: String,
    /// 1–3 strings in placeholder index order: input_txt, input2_txt, input3_txt.
    pub input_texts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,
    /// Present iff the config used declared `default_temperature`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub response: String,
    /// ISO-8601, the sort key.
    pub timestamp: String,
}

impl HistoryEntry {
    /// Build an entry for a submission finishing right now.
    pub fn now(
        template_name: impl Into<String>,
        input_texts: Vec<String>,
        config_id: Option<String>,
        temperature: Option<f32>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            template_name: template_name.into(),
            input_texts,
            config_id,
            temperature,
            response: response.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// First input, for list previews.
    pub fn first_input(&self) -> &str {
        self.input_texts.first().map(String::as_str).unwrap_or("")
    }
}

/// Which historical generation a stored record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// `template_name` + `input_texts`.
    Canonical,
    /// Single `input_text` field instead of the sequence.
    LegacyInputText,
    /// No structured inputs at all; template and input live inside a
    /// formatted `prompt` string.
    LegacyPrompt,
}

/// A raw record as found on disk. Every field is optional so that any of the
/// three generations (and any partially written record) decodes without
/// crashing; [`canonicalize`](StoredEntry::canonicalize) projects it to the
/// current shape.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StoredEntry {
    #[serde(default)]
    pub template_name: Option<String>,
    #[serde(default)]
    pub input_texts: Option<Vec<String>>,
    #[serde(default)]
    pub input_text: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub config_id: Option<String>,
    #[serde(default)]
    pub api_config: Option<LegacyApiConfig>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// The oldest generation embedded the whole config instead of referencing it.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LegacyApiConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl LegacyApiConfig {
    /// Best-effort match against the configs currently served: exact
    /// url+model+name first, then url+model, then name alone.
    pub fn resolve(&self, configs: &[ApiConfig]) -> Option<String> {
        let url = |c: &ApiConfig| both_eq(&self.url, &c.url);
        let model = |c: &ApiConfig| both_eq(&self.model, &c.model);
        let name = |c: &ApiConfig| self.name.as_deref() == Some(c.name.as_str());

        configs
            .iter()
            .find(|c| url(c) && model(c) && name(c))
            .or_else(|| configs.iter().find(|c| url(c) && model(c)))
            .or_else(|| configs.iter().find(|c| name(c)))
            .map(|c| c.id.clone())
    }
}

fn both_eq(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

impl StoredEntry {
    pub fn shape(&self) -> RecordShape {
        if self.input_texts.is_some() {
            RecordShape::Canonical
        } else if self.input_text.is_some() {
            RecordShape::LegacyInputText
        } else {
            RecordShape::LegacyPrompt
        }
    }

    /// Project to the canonical shape. Infallible: missing pieces degrade to
    /// empty strings or the `"default"` group, never to an error.
    pub fn canonicalize(self, configs: &[ApiConfig]) -> HistoryEntry {
        let shape = self.shape();
        let parsed = self.prompt.as_deref().and_then(parse_legacy_prompt);

        let template_name = self
            .template_name
            .filter(|n| !n.is_empty())
            .or_else(|| parsed.as_ref().map(|(name, _)| name.clone()))
            .unwrap_or_else(|| DEFAULT_GROUP.to_string());

        let input_texts = match shape {
            RecordShape::Canonical => self.input_texts.unwrap_or_default(),
            RecordShape::LegacyInputText => vec![self.input_text.unwrap_or_default()],
            RecordShape::LegacyPrompt => {
                vec![parsed
                    .map(|(_, text)| text)
                    .or(self.prompt)
                    .unwrap_or_default()]
            }
        };

        let config_id = self
            .config_id
            .or_else(|| self.api_config.as_ref().and_then(|c| c.resolve(configs)));

        HistoryEntry {
            template_name,
            input_texts,
            config_id,
            temperature: self.temperature,
            response: self.response.unwrap_or_default(),
            timestamp: self.timestamp.unwrap_or_default(),
        }
    }
}

/// Recover `(template_name, input_text)` from a legacy prompt string of the
/// form `[Template: <name>] <text>` or `[<name>] <text>`.
pub fn parse_legacy_prompt(prompt: &str) -> Option<(String, String)> {
    let rest = prompt.strip_prefix('[')?;
    let close = rest.find(']')?;
    let inside = &rest[..close];
    let name = inside
        .strip_prefix("Template:")
        .map(str::trim)
        .unwrap_or_else(|| inside.trim());
    if name.is_empty() {
        return None;
    }
    let text = rest[close + 1..].trim_start();
    Some((name.to_string(), text.to_string()))
}
