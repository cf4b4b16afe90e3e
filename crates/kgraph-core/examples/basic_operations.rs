use anyhow::Result;
use kgraph_core::{EntitySpec, ExportEngine, ExportFormat, KnowledgeGraph, RelationSpec, SearchOptions};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("🚀 Starting kgraph basic operations example...");

    // 1. Build a small graph
    let mut graph = KnowledgeGraph::new();
    let mut spec = EntitySpec::new("ARFoundation", "Technology");
    spec.observations.push("Unity's AR abstraction layer".into());
    graph.add_entity(spec);
    graph.add_entity(EntitySpec::new("Unity", "Technology"));
    graph.add_entity(EntitySpec::new("Occlusion Demo", "Project"));
    graph.add_relation(RelationSpec::new("Occlusion Demo", "ARFoundation").with_type("uses"));
    graph.add_relation(RelationSpec::new("ARFoundation", "Unity").with_type("depends_on"));
    println!("✅ Stored {} entities.", graph.stats().entity_count);

    // 2. Fuzzy search
    println!("\n🔍 Searching for 'arfound'...");
    for hit in graph.search("arfound", &SearchOptions::default()) {
        println!("   - {} ({}) score {:.2}", hit.entity.name, hit.entity.entity_type, hit.score);
    }

    // 3. Traversal
    println!("\n🕸️  Entities related to 'Occlusion Demo' (depth 2):");
    for related in graph.related_entities("Occlusion Demo", 2)? {
        let name = related
            .entity
            .as_ref()
            .map(|e| e.name.as_str())
            .unwrap_or("<unresolved>");
        println!(
            "   - depth {}: {} via '{}'",
            related.depth, name, related.relation.relation_type
        );
    }

    // 4. Export as a Mermaid diagram
    println!("\n📤 Mermaid export:");
    let export = ExportEngine::new(&graph);
    println!("{}", export.render(ExportFormat::Mermaid));

    Ok(())
}
