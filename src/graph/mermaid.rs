//! Mermaid flowchart export

use super::store::KnowledgeGraph;

/// Render every edge as a Mermaid `graph TD` line: `A -->|relation| B`.
/// Spaces in identifiers become underscores.
pub fn export_mermaid(graph: &KnowledgeGraph) -> String {
    let mut output = String::from("graph TD\n");
    for edge in graph.edges() {
        output.push_str(&format!(
            "    {} -->|{}| {}\n",
            edge.source.replace(' ', "_"),
            edge.relation().unwrap_or(""),
            edge.target.replace(' ', "_"),
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::{relation_attributes, Attributes};

    #[test]
    fn test_export() {
        let mut graph = KnowledgeGraph::new();
        graph.add_edge("John Locke", "Hume", relation_attributes("influenced"));
        graph.add_edge("Hume", "Kant", Attributes::new());

        assert_eq!(
            export_mermaid(&graph),
            "graph TD\n    John_Locke -->|influenced| Hume\n    Hume -->|| Kant\n"
        );
    }

    #[test]
    fn test_export_empty() {
        assert_eq!(export_mermaid(&KnowledgeGraph::new()), "graph TD\n");
    }
}
