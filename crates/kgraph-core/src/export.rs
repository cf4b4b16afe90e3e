//! Graph snapshots in JSON, Mermaid flowchart and CSV form.

use std::fmt;
use std::str::FromStr;

use serde_json::json;

use crate::engine::KnowledgeGraph;
use kgraph_common::config::ExportConfig;
use kgraph_common::{Entity, GraphError};

const NODE_ID_MAX_LEN: usize = 30;
const NODE_LABEL_MAX_LEN: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Mermaid,
    Csv,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Mermaid => "mermaid",
            ExportFormat::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "mermaid" | "mmd" => Ok(ExportFormat::Mermaid),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(GraphError::UnknownExportFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct ExportEngine<'a> {
    graph: &'a KnowledgeGraph,
    config: ExportConfig,
}

impl<'a> ExportEngine<'a> {
    pub fn new(graph: &'a KnowledgeGraph) -> Self {
        Self {
            graph,
            config: ExportConfig::default(),
        }
    }

    pub fn with_config(graph: &'a KnowledgeGraph, config: ExportConfig) -> Self {
        Self { graph, config }
    }

    pub fn render(&self, format: ExportFormat) -> String {
        match format {
            ExportFormat::Json => self.to_json().to_string(),
            ExportFormat::Mermaid => self.to_mermaid(),
            ExportFormat::Csv => self.to_csv(),
        }
    }

    /// Full snapshot: entities in insertion order, relations in append
    /// order, plus the current counters.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "entities": self.graph.all_entities(),
            "relations": self.graph.all_relations(),
            "stats": self.graph.stats(),
        })
    }

    /// Mermaid flowchart of the first `max_nodes` entities. Edges are
    /// emitted only when both endpoints survive the node cap. An empty
    /// graph renders just the header line.
    pub fn to_mermaid(&self) -> String {
        let mut out = format!("flowchart {}\n", self.config.direction);

        let nodes: Vec<&Entity> = self
            .graph
            .all_entities()
            .into_iter()
            .take(self.config.max_nodes)
            .collect();

        for entity in &nodes {
            let id = node_id(&entity.name);
            let label = truncate(&entity.name, NODE_LABEL_MAX_LEN);
            let (open, close) = node_shape(&entity.entity_type);
            out.push_str(&format!("    {}{}\"{}\"{}\n", id, open, label, close));
        }

        for relation in self.graph.all_relations() {
            let from = match self.resolve_name(&relation.from) {
                Some(name) if nodes.iter().any(|e| e.name == name) => name,
                _ => continue,
            };
            let to = match self.resolve_name(&relation.to) {
                Some(name) if nodes.iter().any(|e| e.name == name) => name,
                _ => continue,
            };
            let arrow = relation_arrow(&relation.relation_type);
            out.push_str(&format!(
                "    {} {}|\"{}\"| {}\n",
                node_id(&from),
                arrow,
                relation.relation_type,
                node_id(&to)
            ));
        }

        out
    }

    /// Flat rows: `type,category,data` with one row per entity and one
    /// per relation.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("type,category,data\n");
        for entity in self.graph.all_entities() {
            out.push_str(&format!(
                "entity,{},{}\n",
                csv_field(&entity.entity_type),
                csv_field(&entity.name)
            ));
        }
        for relation in self.graph.all_relations() {
            out.push_str(&format!(
                "relation,{},{}\n",
                csv_field(&relation.relation_type),
                csv_field(&format!("{} -> {}", relation.from, relation.to))
            ));
        }
        out
    }

    /// Relation endpoints may be ids or names; nodes are keyed by name.
    fn resolve_name(&self, endpoint: &str) -> Option<String> {
        self.graph
            .get_entity(endpoint)
            .or_else(|| self.graph.get_entity_by_name(endpoint))
            .map(|e| e.name.clone())
    }
}

fn node_id(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .take(NODE_ID_MAX_LEN)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("n_{}", sanitized.to_lowercase())
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn node_shape(entity_type: &str) -> (&'static str, &'static str) {
    match entity_type.to_lowercase().as_str() {
        "project" => ("([", "])"),
        "repository" => ("[[", "]]"),
        "pattern" => ("{{", "}}"),
        "technology" => ("[/", "/]"),
        "concept" => ("((", "))"),
        _ => ("[", "]"),
    }
}

fn relation_arrow(relation_type: &str) -> &'static str {
    match relation_type.to_lowercase().as_str() {
        "extends" => "--|>",
        "implements" => "..|>",
        "depends_on" => "-.->",
        "contains" => "--o",
        "related_to" => "---",
        _ => "-->",
    }
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
