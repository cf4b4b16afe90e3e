use kgraph_core::CommandDispatcher;

fn main() {
    tracing_subscriber::fmt::init();

    println!("💬 Simulated chat session against the command layer...\n");

    let mut dispatcher = CommandDispatcher::new();
    let session = [
        "add Unity as Technology",
        "add ARFoundation as Technology",
        "add Occlusion Demo as Project",
        "relate occlusion demo to arfoundation as uses",
        "search arfound",
        "neighbors of occlusion demo",
        "filter by Technology",
        "types",
        "stats",
        "export mermaid",
        "relate Ghost to Unity",
        "s unity",
    ];

    for input in session {
        let envelope = dispatcher.execute(input);
        let marker = if envelope.success { "✅" } else { "❌" };
        println!("> {}", input);
        println!("{} [{}] {}", marker, envelope.command_type.as_str(), envelope.message);
        if let Some(suggestions) = &envelope.suggestions {
            println!("   did you mean: {}", suggestions.join(", "));
        }
        println!();
    }

    println!("📜 History: {:?}", dispatcher.history().collect::<Vec<_>>());
}
