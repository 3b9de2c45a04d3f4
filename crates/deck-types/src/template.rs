use serde::{Deserialize, Serialize};

/// Placeholder tokens a template body may contain. The backend substitutes
/// them literally; the client only needs to know which fields to require.
pub const PLACEHOLDER_INPUT: &str = "{input_txt}";
pub const PLACEHOLDER_INPUT2: &str = "{input2_txt}";
pub const PLACEHOLDER_INPUT3: &str = "{input3_txt}";

/// A backend-stored prompt template. Immutable once fetched; a session
/// re-fetches it every time the template is (re-)selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub body: String,
}

impl Template {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }

    /// Pure substring test, no escaping. `{input_txt}` is always required
    /// once a template is selected, so only the optional slots are derived.
    pub fn has_input2(&self) -> bool {
        self.body.contains(PLACEHOLDER_INPUT2)
    }

    pub fn has_input3(&self) -> bool {
        self.body.contains(PLACEHOLDER_INPUT3)
    }
}
