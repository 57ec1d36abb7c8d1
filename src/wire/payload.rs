//! Wire Payloads
//!
//! JSON shapes printed by instrumented programs and read back by the
//! demultiplexer. Field names are camelCase on the wire.
//!
//! @module wire/payload

use crate::text::FilePosition;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Byte range of a declaring identifier, used to tell same-named variables apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclarationSpan {
    pub start: usize,
    pub end: usize,
}

/// Characters of concatenated stdout produced before a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputRange {
    pub start: usize,
    pub end: usize,
}

impl OutputRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One variable in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableState {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_at: Option<DeclarationSpan>,
}

/// Program state captured right before a statement ran
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramStateAtPosition {
    #[serde(default)]
    pub file_position: FilePosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(default)]
    pub locals: Vec<VariableState>,
    #[serde(default)]
    pub parameters: Vec<VariableState>,
    #[serde(default)]
    pub fields: Vec<VariableState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_range: Option<OutputRange>,
    /// Keys this crate does not know about, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProgramStateAtPosition {
    pub fn variable_count(&self) -> usize {
        self.locals.len() + self.parameters.len() + self.fields.len()
    }

    /// Look a variable up by name across locals, parameters and fields
    pub fn variable(&self, name: &str) -> Option<&VariableState> {
        self.locals
            .iter()
            .chain(&self.parameters)
            .chain(&self.fields)
            .find(|v| v.name == name)
    }
}

/// Source coordinates of one mention of a variable (0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRange {
    pub start_line: usize,
    pub end_line: usize,
    pub start_column: usize,
    pub end_column: usize,
}

/// Every mention of one variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableLocationEntry {
    pub name: String,
    pub declared_at: DeclarationSpan,
    pub locations: Vec<LineRange>,
}

/// The one-time location dump printed at program start
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableLocationDump {
    pub variable_locations: Vec<VariableLocationEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_decodes_with_missing_fields() {
        let state: ProgramStateAtPosition = serde_json::from_str(r#"{"b":2}"#).unwrap();

        assert!(state.locals.is_empty());
        assert_eq!(state.output_range, None);
        assert_eq!(state.extra.get("b"), Some(&Value::from(2)));
    }

    #[test]
    fn test_state_wire_names() {
        let state = ProgramStateAtPosition {
            file_position: FilePosition {
                line: 3,
                character: 4,
                file: "main.js".to_string(),
            },
            locals: vec![VariableState {
                name: "total".to_string(),
                value: Value::from(10),
                declared_at: Some(DeclarationSpan { start: 6, end: 11 }),
            }],
            output_range: Some(OutputRange { start: 0, end: 5 }),
            ..Default::default()
        };

        let json: Value = serde_json::to_value(&state).unwrap();
        assert_eq!(json["filePosition"]["line"], 3);
        assert_eq!(json["locals"][0]["declaredAt"]["start"], 6);
        assert_eq!(json["outputRange"]["end"], 5);
        assert!(json.get("stackTrace").is_none(), "Absent stack trace is omitted");
    }

    #[test]
    fn test_location_dump_wire_names() {
        let dump = VariableLocationDump {
            variable_locations: vec![VariableLocationEntry {
                name: "x".to_string(),
                declared_at: DeclarationSpan { start: 4, end: 5 },
                locations: vec![LineRange {
                    start_line: 0,
                    end_line: 0,
                    start_column: 4,
                    end_column: 5,
                }],
            }],
        };

        let json = serde_json::to_string(&dump).unwrap();
        assert!(json.starts_with(r#"{"variableLocations":[{"name":"x""#));
        assert!(json.contains(r#""startColumn":4"#));
    }
}
