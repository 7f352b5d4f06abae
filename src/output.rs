//! Output shapes for validation results.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::message::ValidationMessage;
use crate::path::PathType;

/// How a validation outcome is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The messages themselves, as a JSON array
    #[default]
    Default,
    /// `{"valid": bool}`
    Flag,
    /// `{"valid": bool, "details": [..]}` with one flat entry per error
    List,
}

/// One entry of the `List` output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputUnit {
    pub valid: bool,
    pub instance_location: String,
    pub keyword_location: String,
    pub absolute_keyword_location: String,
    pub error: String,
}

impl OutputUnit {
    fn from_message(message: &ValidationMessage, path_type: PathType) -> Self {
        Self {
            valid: false,
            instance_location: message.instance_location.render(path_type),
            keyword_location: message.evaluation_path.to_pointer(),
            absolute_keyword_location: message.schema_location.to_string(),
            error: message.message.clone(),
        }
    }
}

impl OutputFormat {
    pub fn render(&self, errors: &[ValidationMessage], path_type: PathType) -> Value {
        match self {
            OutputFormat::Default => {
                serde_json::to_value(errors).unwrap_or_else(|_| Value::Array(Vec::new()))
            }
            OutputFormat::Flag => json!({ "valid": errors.is_empty() }),
            OutputFormat::List => {
                let details: Vec<OutputUnit> = errors
                    .iter()
                    .map(|message| OutputUnit::from_message(message, path_type))
                    .collect();
                json!({ "valid": errors.is_empty(), "details": details })
            }
        }
    }
}

/// Human-readable report, one line per error
pub fn format_text(errors: &[ValidationMessage]) -> String {
    if errors.is_empty() {
        return "valid\n".to_string();
    }
    let mut output = format!(
        "invalid - {} error{}\n",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    );
    for error in errors {
        output.push_str(&format!("    [{}] {}\n", error.keyword, error.message));
    }
    output
}
