//! Built-in seed data

use serde_json::json;

use super::model::{relation_attributes, Attributes};
use super::store::KnowledgeGraph;

fn philosopher(label: &str, school: &str) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert("label".to_string(), json!(label));
    attributes.insert("school".to_string(), json!(school));
    attributes
}

fn label(label: &str) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert("label".to_string(), json!(label));
    attributes
}

/// Add contemporary philosophers and their connections.
///
/// Idempotent: applying it twice leaves the graph unchanged.
pub fn contemporary_philosophers(graph: &mut KnowledgeGraph) {
    graph.add_node("Singer", philosopher("Peter Singer (1946-)", "Utilitarianism"));
    graph.add_node(
        "West",
        philosopher("Cornel West (1953-)", "Pragmatism, Critical Theory"),
    );

    graph.add_node("Nussbaum", label("Martha Nussbaum (1947-)"));
    graph.add_node("Habermas", label("Jürgen Habermas (1929-)"));
    graph.add_node("Butler", label("Judith Butler (1956-)"));

    let relations = [
        ("Singer", "Nussbaum", "collaborated"),
        ("Singer", "Rawls", "influenced by"),
        ("West", "Dewey", "influenced by"),
        ("West", "Marx", "influenced by"),
        ("Habermas", "West", "debated"),
        ("Butler", "Foucault", "influenced by"),
        ("Butler", "Derrida", "influenced by"),
        ("Nussbaum", "Rawls", "influenced by"),
        ("Nussbaum", "Sen", "collaborated"),
    ];
    for (a, b, relation) in relations {
        graph.add_edge(a, b, relation_attributes(relation));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_idempotent() {
        let mut graph = KnowledgeGraph::new();
        contemporary_philosophers(&mut graph);
        let nodes = graph.node_count();
        let edges = graph.edge_count();

        contemporary_philosophers(&mut graph);

        assert_eq!(edges, 9);
        assert_eq!(graph.node_count(), nodes);
        assert_eq!(graph.edge_count(), edges);
        assert_eq!(
            graph.node_attributes("Habermas").unwrap()["label"],
            "Jürgen Habermas (1929-)"
        );
    }

    #[test]
    fn test_seed_keeps_existing_attributes() {
        let mut graph = KnowledgeGraph::new();
        graph.add_node("Butler", philosopher("Judith Butler", "Post-structuralism"));
        contemporary_philosophers(&mut graph);

        let attributes = graph.node_attributes("Butler").unwrap();
        assert_eq!(attributes["school"], "Post-structuralism");
        assert_eq!(attributes["label"], "Judith Butler (1956-)");
    }
}
