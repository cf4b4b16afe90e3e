//! Natural language command surface.
//!
//! `classifier` turns free text into a [`Command`] with ordered regex
//! rules; `dispatcher` executes commands against a graph and wraps
//! every outcome in a serializable [`Envelope`].

pub mod classifier;
pub mod dispatcher;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::llm::LlmCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    Search,
    AddEntity,
    AddRelation,
    Filter,
    Neighbors,
    Export,
    Stats,
    Clear,
    Help,
    Types,
    History,
    Unknown,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::Search => "search",
            CommandType::AddEntity => "add_entity",
            CommandType::AddRelation => "add_relation",
            CommandType::Filter => "filter",
            CommandType::Neighbors => "neighbors",
            CommandType::Export => "export",
            CommandType::Stats => "stats",
            CommandType::Clear => "clear",
            CommandType::Help => "help",
            CommandType::Types => "types",
            CommandType::History => "history",
            CommandType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Search {
        query: String,
    },
    AddEntity {
        name: String,
        entity_type: String,
    },
    AddRelation {
        from: String,
        to: String,
        relation_type: Option<String>,
    },
    Filter {
        types: Vec<String>,
    },
    Neighbors {
        name: String,
        depth: usize,
    },
    Export {
        format: String,
    },
    Stats,
    Clear,
    Help,
    Types,
    History,
    Unknown,
}

impl Command {
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Search { .. } => CommandType::Search,
            Command::AddEntity { .. } => CommandType::AddEntity,
            Command::AddRelation { .. } => CommandType::AddRelation,
            Command::Filter { .. } => CommandType::Filter,
            Command::Neighbors { .. } => CommandType::Neighbors,
            Command::Export { .. } => CommandType::Export,
            Command::Stats => CommandType::Stats,
            Command::Clear => CommandType::Clear,
            Command::Help => CommandType::Help,
            Command::Types => CommandType::Types,
            Command::History => CommandType::History,
            Command::Unknown => CommandType::Unknown,
        }
    }

    /// Build a command from an external interpreter's output. Unknown
    /// types and missing required params come back as `None`.
    pub fn from_llm(llm: &LlmCommand) -> Option<Command> {
        let p = &llm.params;
        let string = |keys: &[&str]| -> Option<String> {
            keys.iter()
                .find_map(|k| p.get(k).and_then(Value::as_str))
                .map(str::to_string)
        };

        match llm.command_type.as_str() {
            "search" => Some(Command::Search {
                query: string(&["query"])?,
            }),
            "add_entity" => Some(Command::AddEntity {
                name: string(&["name"])?,
                entity_type: string(&["entityType", "entity_type", "type"])
                    .unwrap_or_else(|| kgraph_common::DEFAULT_ENTITY_TYPE.to_string()),
            }),
            "add_relation" => Some(Command::AddRelation {
                from: string(&["from"])?,
                to: string(&["to"])?,
                relation_type: string(&["relationType", "relation_type", "type"]),
            }),
            "filter" => {
                let types: Vec<String> = p
                    .get("types")?
                    .as_array()?
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect();
                if types.is_empty() {
                    None
                } else {
                    Some(Command::Filter { types })
                }
            }
            "neighbors" => Some(Command::Neighbors {
                name: string(&["name", "entity"])?,
                depth: p
                    .get("depth")
                    .and_then(Value::as_u64)
                    .map(|d| d as usize)
                    .unwrap_or(1),
            }),
            "export" => Some(Command::Export {
                format: string(&["format"])?,
            }),
            "stats" => Some(Command::Stats),
            "clear" => Some(Command::Clear),
            "help" => Some(Command::Help),
            "types" => Some(Command::Types),
            "history" => Some(Command::History),
            _ => None,
        }
    }
}

/// A classified input, keeping the raw text for echoing and history.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    pub command: Command,
    pub raw: String,
}

/// Uniform result wrapper for every dispatched command.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub command_type: CommandType,
    pub command: String,
    pub success: bool,
    pub data: Value,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    pub fn ok(
        command_type: CommandType,
        command: impl Into<String>,
        data: Value,
        message: impl Into<String>,
    ) -> Self {
        Self {
            command_type,
            command: command.into(),
            success: true,
            data,
            message: message.into(),
            suggestions: None,
            timestamp: Utc::now(),
        }
    }

    pub fn fail(
        command_type: CommandType,
        command: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            command_type,
            command: command.into(),
            success: false,
            data: Value::Null,
            message: message.into(),
            suggestions: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        if !suggestions.is_empty() {
            self.suggestions = Some(suggestions);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&CommandType::AddEntity).unwrap(),
            "\"add_entity\""
        );
        assert_eq!(CommandType::AddRelation.as_str(), "add_relation");
    }

    #[test]
    fn test_envelope_omits_empty_suggestions() {
        let envelope = Envelope::ok(CommandType::Stats, "stats", json!({}), "ok");
        let text = serde_json::to_string(&envelope).unwrap();
        assert!(!text.contains("suggestions"));

        let envelope = Envelope::fail(CommandType::Unknown, "wat", "no idea")
            .with_suggestions(vec!["search".into()]);
        let text = serde_json::to_string(&envelope).unwrap();
        assert!(text.contains("\"suggestions\":[\"search\"]"));
    }

    #[test]
    fn test_from_llm_add_entity() {
        let llm = LlmCommand {
            command_type: "add_entity".into(),
            params: json!({"name": "Unity", "entityType": "Technology"}),
        };
        assert_eq!(
            Command::from_llm(&llm),
            Some(Command::AddEntity {
                name: "Unity".into(),
                entity_type: "Technology".into(),
            })
        );
    }

    #[test]
    fn test_from_llm_defaults() {
        let llm = LlmCommand {
            command_type: "add_entity".into(),
            params: json!({"name": "Unity"}),
        };
        assert_eq!(
            Command::from_llm(&llm),
            Some(Command::AddEntity {
                name: "Unity".into(),
                entity_type: "Unknown".into(),
            })
        );

        let llm = LlmCommand {
            command_type: "neighbors".into(),
            params: json!({"name": "Unity"}),
        };
        assert_eq!(
            Command::from_llm(&llm),
            Some(Command::Neighbors {
                name: "Unity".into(),
                depth: 1,
            })
        );
    }

    #[test]
    fn test_from_llm_rejects_unknown_or_incomplete() {
        let llm = LlmCommand {
            command_type: "dance".into(),
            params: json!({}),
        };
        assert!(Command::from_llm(&llm).is_none());

        let llm = LlmCommand {
            command_type: "add_relation".into(),
            params: json!({"from": "Unity"}),
        };
        assert!(Command::from_llm(&llm).is_none());
    }
}
