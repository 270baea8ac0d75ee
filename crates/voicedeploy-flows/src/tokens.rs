use serde_json::{Map, Value};

/// Placeholder tokens used by the bundled flow templates.
pub mod token {
    pub const ARN_PREFIX: &str = "arn_prefix";
    pub const QUEUE_NAME: &str = "contact_queue_name";
    pub const CONTACT_NAME: &str = "contact_name";
    /// The templates are authored with this Polly voice.
    pub const VOICE: &str = "Joanna";
    pub const SURVEY_MESSAGE: &str = "survey_message";
    pub const SURVEY_FEEDBACK: &str = "survey_feedback";
    pub const WELCOME_MESSAGE: &str = "welcome-message";
    pub const OPEN_HOUR_MESSAGE: &str = "open-hour-message";
    pub const ERROR_MESSAGE: &str = "error-message";
    pub const QUEUE_ARN: &str = "queue-arn";
    pub const SCREENPOP_FLOW_NAME: &str = "contact_screenpop_flow_name";
    pub const SCREENPOP_FLOW_ID: &str = "contact_screenpop_flow_id";
    pub const SURVEY_FLOW_NAME: &str = "contact_survey_flow_name";
    pub const SURVEY_FLOW_ID: &str = "contact_survey_flow_id";
}

/// Ordered token to value replacements.
///
/// Order matters when one value contains a later token; entries are applied
/// first to last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMap {
    entries: Vec<(String, String)>,
}

impl TokenMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(token, value);
        self
    }

    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) {
        self.entries.push((token.into(), value.into()));
    }

    pub fn extend(&mut self, other: TokenMap) {
        self.entries.extend(other.entries);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (token, value) in self.iter() {
            if !token.is_empty() && out.contains(token) {
                out = out.replace(token, value);
            }
        }
        out
    }
}

/// Replace every literal occurrence of each token in raw text.
///
/// Values are inserted verbatim. A value containing `"` or `\` produces
/// invalid JSON when `text` is a JSON document; use [`substitute_json`] there.
pub fn substitute_text(text: &str, tokens: &TokenMap) -> String {
    tokens.apply(text)
}

/// Replace tokens inside every string of a JSON document, object keys included.
///
/// Numbers, booleans and structure are untouched, and values come out
/// correctly escaped when the document is serialized again.
pub fn substitute_json(value: &Value, tokens: &TokenMap) -> Value {
    match value {
        Value::String(s) => Value::String(tokens.apply(s)),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute_json(v, tokens)).collect()),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, v) in map {
                out.insert(tokens.apply(key), substitute_json(v, tokens));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}
