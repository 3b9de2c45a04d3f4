use serde::{Deserialize, Deserializer, Serialize};

/// One backend-side LLM provider/model profile, as served by `/api/configs`.
///
/// Read-only reference data, fetched once per page load. The optional
/// `url`/`model` fields are not displayed; they only exist so old history
/// records carrying an embedded config can be matched back to a live id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ApiConfig {
    /// Temperature control is a capability, not a preference: a config
    /// without `default_temperature` gets no temperature at all.
    pub fn supports_temperature(&self) -> bool {
        self.default_temperature.is_some()
    }
}

/// Config ids are server-assigned and opaque; some backends serve them as
/// JSON numbers, so accept either and keep the string form.
pub(crate) fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "config id must be a string or number, got {}",
            other
        ))),
    }
}

pub(crate) fn opt_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Ok(None),
    }
}
