//! Ordered regex rules mapping free text to commands.
//!
//! Rules are tried top to bottom and the first matching pattern wins.
//! The order is load-bearing: every specific command must precede the
//! search catch-all, which matches almost any two-character string.
//! Tests pin the order; reordering silently changes classifications.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{Command, CommandType, ParsedCommand};

struct CommandRule {
    command_type: CommandType,
    patterns: Vec<Regex>,
    extract: fn(&Captures) -> Option<Command>,
}

fn group(caps: &Captures, i: usize) -> Option<String> {
    caps.get(i).map(|m| m.as_str().trim().to_string())
}

fn extract_add_entity(caps: &Captures) -> Option<Command> {
    Some(Command::AddEntity {
        name: group(caps, 1)?,
        entity_type: group(caps, 2)?,
    })
}

fn extract_add_relation(caps: &Captures) -> Option<Command> {
    Some(Command::AddRelation {
        from: group(caps, 1)?,
        to: group(caps, 2)?,
        relation_type: group(caps, 3),
    })
}

fn extract_filter(caps: &Captures) -> Option<Command> {
    let types: Vec<String> = group(caps, 1)?
        .split([',', ' '])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if types.is_empty() {
        return None;
    }
    Some(Command::Filter { types })
}

fn extract_neighbors(caps: &Captures) -> Option<Command> {
    Some(Command::Neighbors {
        name: group(caps, 1)?,
        depth: group(caps, 2)
            .and_then(|d| d.parse().ok())
            .unwrap_or(1),
    })
}

fn extract_export(caps: &Captures) -> Option<Command> {
    Some(Command::Export {
        format: group(caps, 1)?.to_lowercase(),
    })
}

fn extract_search(caps: &Captures) -> Option<Command> {
    Some(Command::Search {
        query: group(caps, 1)?,
    })
}

macro_rules! patterns {
    ($($re:expr),+ $(,)?) => {
        vec![$(Regex::new($re).expect("static command pattern")),+]
    };
}

static RULES: Lazy<Vec<CommandRule>> = Lazy::new(|| {
    vec![
        CommandRule {
            command_type: CommandType::AddEntity,
            patterns: patterns![
                r#"(?i)^add\s+(?:entity\s+)?["']?(.+?)["']?\s+as\s+["']?(.+?)["']?$"#,
                r#"(?i)^create\s+(?:entity\s+)?["']?(.+?)["']?\s+(?:type|as)\s+["']?(.+?)["']?$"#,
                r#"(?i)^new\s+(?:entity\s+)?["']?(.+?)["']?\s+(?:type|as)\s+["']?(.+?)["']?$"#,
            ],
            extract: extract_add_entity,
        },
        CommandRule {
            command_type: CommandType::AddRelation,
            patterns: patterns![
                r#"(?i)^(?:relate|connect|link)\s+["']?(.+?)["']?\s+(?:to|with|->)\s+["']?(.+?)["']?(?:\s+(?:as|type)\s+["']?(.+?)["']?)?$"#,
                r#"(?i)^["']?(.+?)["']?\s+(?:->|-->|relates to|connects to)\s+["']?(.+?)["']?(?:\s+(?:as|type)\s+["']?(.+?)["']?)?$"#,
            ],
            extract: extract_add_relation,
        },
        CommandRule {
            command_type: CommandType::Filter,
            patterns: patterns![
                r#"(?i)^filter\s+(?:by\s+)?["']?(.+?)["']?$"#,
                r#"(?i)^show\s+(?:only\s+)?["']?(.+?)["']?$"#,
                // Requires a separator after "type" so the bare `types`
                // command below stays reachable.
                r#"(?i)^type[\s:=]+["']?(.+?)["']?$"#,
            ],
            extract: extract_filter,
        },
        CommandRule {
            command_type: CommandType::Neighbors,
            patterns: patterns![
                r#"(?i)^neighbors?\s+(?:of\s+)?["']?(.+?)["']?(?:\s+depth\s+(\d+))?$"#,
                r#"(?i)^related\s+(?:to\s+)?["']?(.+?)["']?(?:\s+depth\s+(\d+))?$"#,
                r#"(?i)^connections?\s+(?:of|for|to)\s+["']?(.+?)["']?(?:\s+depth\s+(\d+))?$"#,
            ],
            extract: extract_neighbors,
        },
        CommandRule {
            command_type: CommandType::Export,
            patterns: patterns![
                r#"(?i)^export\s+(?:as\s+)?["']?(mermaid|json|csv)["']?$"#,
                r#"(?i)^save\s+(?:as\s+)?["']?(mermaid|json|csv)["']?$"#,
                r#"(?i)^download\s+["']?(mermaid|json|csv)["']?$"#,
            ],
            extract: extract_export,
        },
        CommandRule {
            command_type: CommandType::Stats,
            patterns: patterns![r"(?i)^(?:stats?|statistics?|info|summary)$"],
            extract: |_| Some(Command::Stats),
        },
        CommandRule {
            command_type: CommandType::Clear,
            patterns: patterns![r"(?i)^(?:clear|reset|empty)(?:\s+(?:graph|all|data))?$"],
            extract: |_| Some(Command::Clear),
        },
        CommandRule {
            command_type: CommandType::Help,
            patterns: patterns![r"(?i)^(?:help|\?|commands?)$"],
            extract: |_| Some(Command::Help),
        },
        CommandRule {
            command_type: CommandType::Types,
            patterns: patterns![r"(?i)^(?:types|categories)$"],
            extract: |_| Some(Command::Types),
        },
        CommandRule {
            command_type: CommandType::History,
            patterns: patterns![r"(?i)^(?:recent|history)$"],
            extract: |_| Some(Command::History),
        },
        CommandRule {
            command_type: CommandType::Search,
            patterns: patterns![
                r#"(?i)^(?:search|find|query|lookup)\s+(.+)$"#,
                r#"^["'](.+)["']$"#,
                r"^(.{2,})$",
            ],
            extract: extract_search,
        },
    ]
});

static AT_SHORTCUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@(\w+)\s*(.*)$").expect("static command pattern"));
static LETTER_SHORTCUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([a-z])\s+(.+)$").expect("static command pattern"));

/// Expand `@search …` and single-letter aliases (`s`, `f`, `a`, `r`,
/// `e`, `t`, `h`) into full command words before classification.
fn expand_shortcuts(input: &str) -> Option<String> {
    let (alias, rest) = if let Some(caps) = AT_SHORTCUT.captures(input) {
        (caps[1].to_lowercase(), caps[2].trim().to_string())
    } else if let Some(caps) = LETTER_SHORTCUT.captures(input) {
        (caps[1].to_lowercase(), caps[2].trim().to_string())
    } else {
        return None;
    };

    let expanded = match alias.as_str() {
        "s" => "search",
        "f" => "filter",
        "a" => "add",
        "e" => "export",
        "t" => "types",
        "h" => "help",
        // "r A to B" creates a relation; "r Unity" lists neighbors.
        "r" => {
            if rest.contains(" to ") {
                "relate"
            } else {
                "related"
            }
        }
        _ => return None,
    };

    if rest.is_empty() {
        Some(expanded.to_string())
    } else {
        Some(format!("{} {}", expanded, rest))
    }
}

#[derive(Debug, Default)]
pub struct CommandClassifier;

impl CommandClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, input: &str) -> ParsedCommand {
        let trimmed = input.trim();
        let expanded = expand_shortcuts(trimmed);
        let text = expanded.as_deref().unwrap_or(trimmed);

        if text.is_empty() {
            return ParsedCommand {
                command: Command::Unknown,
                raw: input.to_string(),
            };
        }

        for rule in RULES.iter() {
            for pattern in &rule.patterns {
                if let Some(caps) = pattern.captures(text) {
                    if let Some(command) = (rule.extract)(&caps) {
                        debug_assert_eq!(command.command_type(), rule.command_type);
                        return ParsedCommand {
                            command,
                            raw: input.to_string(),
                        };
                    }
                }
            }
        }

        ParsedCommand {
            command: Command::Unknown,
            raw: input.to_string(),
        }
    }
}
