//! Executes classified commands against a graph.
//!
//! Every outcome, including handler failures, is returned as an
//! [`Envelope`]; nothing propagates to the host as a panic or error.
//! Unknown input is optionally retried through an LLM handler before
//! falling back to "did you mean" suggestions.

use std::collections::VecDeque;

use serde_json::{json, Value};
use tracing::warn;

use super::classifier::CommandClassifier;
use super::{Command, CommandType, Envelope};
use crate::engine::KnowledgeGraph;
use crate::export::{ExportEngine, ExportFormat};
use crate::llm::LlmHandler;
use crate::search::{similarity, SearchOptions};
use kgraph_common::config::{AppConfig, ClassifierConfig, ExportConfig};
use kgraph_common::{Entity, EntitySpec, RelationSpec};

/// Fixed keyword list that "did you mean" suggestions rank against.
const COMMAND_KEYWORDS: &[&str] = &[
    "search", "find", "add", "create", "relate", "connect", "filter", "show", "neighbors",
    "related", "export", "save", "stats", "clear", "help", "types",
];

const HELP_TABLE: &[(&str, &str, &str)] = &[
    ("search <query>", "Fuzzy search entities", "search ar foundation"),
    ("add <name> as <type>", "Add an entity", "add Unity as Technology"),
    (
        "relate <a> to <b> [as <type>]",
        "Connect two entities",
        "relate Unity to ARFoundation as uses",
    ),
    ("filter by <types>", "List entities of the given types", "filter by Technology"),
    (
        "neighbors of <name> [depth N]",
        "Entities connected to one entity",
        "neighbors of Unity depth 2",
    ),
    ("export <mermaid|json|csv>", "Render the graph", "export mermaid"),
    ("types", "Entity types with counts", "types"),
    ("history", "Recent commands", "history"),
    ("stats", "Graph counters", "stats"),
    ("clear", "Drop all data", "clear"),
    ("help", "This table", "help"),
];

fn keyword_suggestions(input: &str, config: &ClassifierConfig) -> Vec<String> {
    let input = input.trim().to_lowercase();
    let mut ranked: Vec<(f64, &str)> = COMMAND_KEYWORDS
        .iter()
        .map(|kw| (similarity(&input, kw), *kw))
        .filter(|(score, _)| *score >= config.suggestion_threshold)
        .collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(config.max_suggestions);
    ranked.into_iter().map(|(_, kw)| kw.to_string()).collect()
}

pub struct CommandDispatcher {
    graph: KnowledgeGraph,
    classifier: CommandClassifier,
    llm: Option<Box<dyn LlmHandler>>,
    history: VecDeque<String>,
    config: ClassifierConfig,
    export_config: ExportConfig,
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            graph: KnowledgeGraph::with_config(config.search),
            classifier: CommandClassifier::new(),
            llm: None,
            history: VecDeque::new(),
            config: config.classifier,
            export_config: config.export,
        }
    }

    /// Install or replace the fallback interpreter for unknown input.
    pub fn set_llm_handler(&mut self, handler: Box<dyn LlmHandler>) {
        self.llm = Some(handler);
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut KnowledgeGraph {
        &mut self.graph
    }

    /// Recent inputs, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    /// Classify and run one input, always returning an envelope.
    pub fn execute(&mut self, input: &str) -> Envelope {
        self.record_history(input);

        let parsed = self.classifier.classify(input);
        let mut command = parsed.command;

        if command == Command::Unknown {
            if let Some(recovered) = self.try_llm(input) {
                command = recovered;
            }
        }

        let command_type = command.command_type();
        match self.dispatch(command, input) {
            Ok(envelope) => envelope,
            Err(err) => Envelope::fail(command_type, input, err.to_string()),
        }
    }

    fn record_history(&mut self, input: &str) {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return;
        }
        self.history.push_back(trimmed.to_string());
        while self.history.len() > self.config.history_limit {
            self.history.pop_front();
        }
    }

    /// LLM failures are logged and swallowed; the caller falls back to
    /// the standard unknown-command response.
    fn try_llm(&mut self, input: &str) -> Option<Command> {
        let handler = self.llm.as_ref()?;
        match handler.interpret(input) {
            Ok(Some(llm_command)) => Command::from_llm(&llm_command),
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "LLM fallback failed");
                None
            }
        }
    }

    fn dispatch(&mut self, command: Command, raw: &str) -> anyhow::Result<Envelope> {
        match command {
            Command::Search { query } => self.handle_search(&query, raw),
            Command::AddEntity { name, entity_type } => {
                self.handle_add_entity(&name, &entity_type, raw)
            }
            Command::AddRelation {
                from,
                to,
                relation_type,
            } => self.handle_add_relation(&from, &to, relation_type.as_deref(), raw),
            Command::Filter { types } => self.handle_filter(&types, raw),
            Command::Neighbors { name, depth } => self.handle_neighbors(&name, depth, raw),
            Command::Export { format } => self.handle_export(&format, raw),
            Command::Stats => self.handle_stats(raw),
            Command::Clear => self.handle_clear(raw),
            Command::Help => self.handle_help(raw),
            Command::Types => self.handle_types(raw),
            Command::History => self.handle_history(raw),
            Command::Unknown => Ok(self.handle_unknown(raw)),
        }
    }

    /// Best fuzzy match for a free-text entity reference.
    fn resolve_entity(&mut self, reference: &str) -> Option<Entity> {
        let options = SearchOptions {
            limit: 1,
            ..self.graph.default_options()
        };
        self.graph
            .search(reference, &options)
            .into_iter()
            .next()
            .map(|hit| hit.entity)
    }

    fn handle_search(&mut self, query: &str, raw: &str) -> anyhow::Result<Envelope> {
        let options = self.graph.default_options();
        let hits = self.graph.search(query, &options);
        if hits.is_empty() {
            let suggestions: Vec<String> = self
                .graph
                .suggestions(query, self.config.max_suggestions)
                .into_iter()
                .map(|s| s.text)
                .collect();
            let envelope = Envelope::ok(
                CommandType::Search,
                raw,
                json!({ "query": query, "results": [] }),
                format!("No results found for \"{}\"", query),
            )
            .with_suggestions(suggestions);
            return Ok(envelope);
        }

        let message = format!("Found {} results for \"{}\"", hits.len(), query);
        Ok(Envelope::ok(
            CommandType::Search,
            raw,
            json!({ "query": query, "results": serde_json::to_value(&hits)? }),
            message,
        ))
    }

    fn handle_add_entity(
        &mut self,
        name: &str,
        entity_type: &str,
        raw: &str,
    ) -> anyhow::Result<Envelope> {
        let entity = self.graph.add_entity(EntitySpec::new(name, entity_type));
        let message = format!("Added entity \"{}\" ({})", entity.name, entity.entity_type);
        Ok(Envelope::ok(
            CommandType::AddEntity,
            raw,
            serde_json::to_value(&entity)?,
            message,
        ))
    }

    /// Both endpoints must already resolve through fuzzy search; the
    /// stored edge uses their canonical names.
    fn handle_add_relation(
        &mut self,
        from: &str,
        to: &str,
        relation_type: Option<&str>,
        raw: &str,
    ) -> anyhow::Result<Envelope> {
        let Some(from_entity) = self.resolve_entity(from) else {
            return Ok(Envelope::fail(
                CommandType::AddRelation,
                raw,
                format!("Entity not found: \"{}\"", from),
            ));
        };
        let Some(to_entity) = self.resolve_entity(to) else {
            return Ok(Envelope::fail(
                CommandType::AddRelation,
                raw,
                format!("Entity not found: \"{}\"", to),
            ));
        };

        let mut spec = RelationSpec::new(from_entity.name.clone(), to_entity.name.clone());
        if let Some(rt) = relation_type {
            spec = spec.with_type(rt);
        }
        let relation = self.graph.add_relation(spec);
        let message = format!(
            "Related \"{}\" {} \"{}\"",
            relation.from, relation.relation_type, relation.to
        );
        Ok(Envelope::ok(
            CommandType::AddRelation,
            raw,
            serde_json::to_value(&relation)?,
            message,
        ))
    }

    fn handle_filter(&mut self, types: &[String], raw: &str) -> anyhow::Result<Envelope> {
        let mut results: Vec<Value> = Vec::new();
        for entity_type in types {
            for entity in self.graph.entities_by_type(entity_type) {
                results.push(json!({
                    "name": entity.name,
                    "type": entity.entity_type,
                }));
            }
        }
        let message = format!(
            "Filtered to {} entities of type: {}",
            results.len(),
            types.join(", ")
        );
        Ok(Envelope::ok(
            CommandType::Filter,
            raw,
            json!({ "types": types, "results": results }),
            message,
        ))
    }

    fn handle_neighbors(&mut self, name: &str, depth: usize, raw: &str) -> anyhow::Result<Envelope> {
        let Some(entity) = self.resolve_entity(name) else {
            let suggestions: Vec<String> = self
                .graph
                .suggestions(name, self.config.max_suggestions)
                .into_iter()
                .map(|s| s.text)
                .collect();
            return Ok(Envelope::fail(
                CommandType::Neighbors,
                raw,
                format!("Entity not found: \"{}\"", name),
            )
            .with_suggestions(suggestions));
        };

        let related = self.graph.related_entities(&entity.id, depth)?;
        let message = format!(
            "{} entities connected to \"{}\" within depth {}",
            related.len(),
            entity.name,
            depth
        );
        Ok(Envelope::ok(
            CommandType::Neighbors,
            raw,
            json!({
                "source": serde_json::to_value(&entity)?,
                "related": serde_json::to_value(&related)?,
            }),
            message,
        ))
    }

    fn handle_export(&mut self, format: &str, raw: &str) -> anyhow::Result<Envelope> {
        let format: ExportFormat = match format.parse() {
            Ok(format) => format,
            Err(err) => {
                return Ok(Envelope::fail(
                    CommandType::Export,
                    raw,
                    err.to_string(),
                ))
            }
        };
        let engine = ExportEngine::with_config(&self.graph, self.export_config.clone());
        let content = engine.render(format);
        let message = format!(
            "Exported {} entities as {}",
            self.graph.stats().entity_count,
            format
        );
        Ok(Envelope::ok(
            CommandType::Export,
            raw,
            json!({ "format": format.as_str(), "content": content }),
            message,
        ))
    }

    fn handle_stats(&mut self, raw: &str) -> anyhow::Result<Envelope> {
        let stats = self.graph.stats();
        let types: Vec<Value> = self
            .graph
            .type_counts()
            .into_iter()
            .map(|(t, count)| json!({ "type": t, "count": count }))
            .collect();
        let message = format!(
            "{} entities, {} relations",
            stats.entity_count, stats.relation_count
        );
        Ok(Envelope::ok(
            CommandType::Stats,
            raw,
            json!({ "stats": serde_json::to_value(&stats)?, "types": types }),
            message,
        ))
    }

    fn handle_clear(&mut self, raw: &str) -> anyhow::Result<Envelope> {
        let before = self.graph.stats();
        self.graph.clear();
        let message = format!(
            "Cleared {} entities and {} relations",
            before.entity_count, before.relation_count
        );
        Ok(Envelope::ok(
            CommandType::Clear,
            raw,
            serde_json::to_value(&before)?,
            message,
        ))
    }

    fn handle_help(&mut self, raw: &str) -> anyhow::Result<Envelope> {
        let commands: Vec<Value> = HELP_TABLE
            .iter()
            .map(|(command, description, example)| {
                json!({
                    "command": command,
                    "description": description,
                    "example": example,
                })
            })
            .collect();
        Ok(Envelope::ok(
            CommandType::Help,
            raw,
            json!({ "commands": commands }),
            "Available commands",
        ))
    }

    fn handle_types(&mut self, raw: &str) -> anyhow::Result<Envelope> {
        let types: Vec<Value> = self
            .graph
            .type_counts()
            .into_iter()
            .map(|(t, count)| json!({ "type": t, "count": count }))
            .collect();
        let message = format!("{} entity types", types.len());
        Ok(Envelope::ok(
            CommandType::Types,
            raw,
            json!({ "types": types }),
            message,
        ))
    }

    /// The triggering input is already recorded, so it shows up in its
    /// own listing.
    fn handle_history(&mut self, raw: &str) -> anyhow::Result<Envelope> {
        let entries: Vec<String> = self.history().map(str::to_string).collect();
        let message = format!("{} recent commands", entries.len());
        Ok(Envelope::ok(
            CommandType::History,
            raw,
            json!({ "entries": entries }),
            message,
        ))
    }

    fn handle_unknown(&mut self, raw: &str) -> Envelope {
        Envelope::fail(
            CommandType::Unknown,
            raw,
            "Unknown command. Type \"help\" for available commands.",
        )
        .with_suggestions(keyword_suggestions(raw, &self.config))
    }
}
