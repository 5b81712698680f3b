//! Graph analytics delegated to `petgraph`

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::{astar, page_rank as petgraph_page_rank};
use petgraph::graph::DiGraph;

use super::store::KnowledgeGraph;
use super::GraphError;

/// Damping factor used for PageRank
pub const DAMPING: f64 = 0.85;

/// PageRank iterations
pub const ITERATIONS: usize = 100;

/// Directed view of the undirected graph with one arc per direction, so that
/// algorithms defined on digraphs see each relation as mutual.
fn symmetric_view(graph: &KnowledgeGraph) -> (DiGraph<String, ()>, Vec<String>) {
    let ids = graph.node_ids();
    let mut view = DiGraph::with_capacity(ids.len(), graph.edge_count() * 2);
    let mut lookup = HashMap::with_capacity(ids.len());

    for id in &ids {
        lookup.insert(id.as_str(), view.add_node(id.clone()));
    }

    for edge in graph.edges() {
        let (Some(&a), Some(&b)) = (
            lookup.get(edge.source.as_str()),
            lookup.get(edge.target.as_str()),
        ) else {
            continue;
        };
        view.add_edge(a, b, ());
        if a != b {
            view.add_edge(b, a, ());
        }
    }

    (view, ids)
}

/// PageRank score of every node
pub fn page_rank(graph: &KnowledgeGraph) -> BTreeMap<String, f64> {
    if graph.is_empty() {
        return BTreeMap::new();
    }

    let (view, ids) = symmetric_view(graph);
    let scores = petgraph_page_rank(&view, DAMPING, ITERATIONS);

    ids.into_iter().zip(scores).collect()
}

/// Nodes sorted by descending score
pub fn ranking(scores: &BTreeMap<String, f64>) -> Vec<(String, f64)> {
    let mut ranked: Vec<_> = scores.iter().map(|(k, v)| (k.clone(), *v)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// Shortest path (fewest hops) from `source` to `target`, endpoints included.
/// `Ok(None)` when the nodes are not connected.
pub fn shortest_path(
    graph: &KnowledgeGraph,
    source: &str,
    target: &str,
) -> Result<Option<Vec<String>>, GraphError> {
    let start = graph.node_index(source)?;
    let goal = graph.node_index(target)?;

    let found = astar(
        graph.petgraph(),
        start,
        |n| n == goal,
        |_| 1usize,
        |_| 0usize,
    );

    Ok(found.map(|(_, path)| {
        path.into_iter()
            .filter_map(|ix| graph.id_of(ix))
            .collect()
    }))
}

/// Human-readable shortest path message
pub fn describe_path(source: &str, target: &str, path: Option<&[String]>) -> String {
    match path {
        Some(path) => format!(
            "Shortest path from {} to {}: {}",
            source,
            target,
            path.join(" -> ")
        ),
        None => format!("No path exists between {} and {}", source, target),
    }
}

/// Partition the graph into communities with the Louvain method.
///
/// Nodes are visited in identifier order and ties keep a node where it is,
/// so the partition is deterministic. Community ids are dense, starting at
/// 0, and ordered by each community's alphabetically smallest member.
pub fn detect_communities(graph: &KnowledgeGraph) -> BTreeMap<String, usize> {
    let mut ids = graph.node_ids();
    ids.sort();
    let position: HashMap<&str, usize> =
        ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();

    let mut edges: Vec<(usize, usize, f64)> = graph
        .edges()
        .iter()
        .filter_map(|edge| {
            let a = *position.get(edge.source.as_str())?;
            let b = *position.get(edge.target.as_str())?;
            Some((a, b, 1.0))
        })
        .collect();

    // membership[i] is the current super-node of the i-th identifier
    let mut membership: Vec<usize> = (0..ids.len()).collect();
    let mut level_size = ids.len();

    loop {
        let (mut community, improved) = louvain_level(level_size, &edges);
        if !improved {
            break;
        }
        level_size = renumber(&mut community);
        for member in membership.iter_mut() {
            *member = community[*member];
        }
        edges = aggregate(&edges, &community);
    }

    let mut groups: Vec<Vec<&String>> = vec![Vec::new(); level_size];
    for (id, &group) in ids.iter().zip(&membership) {
        groups[group].push(id);
    }
    groups.retain(|members| !members.is_empty());
    groups.sort_by(|a, b| a[0].cmp(b[0]));

    groups
        .into_iter()
        .enumerate()
        .flat_map(|(community, members)| {
            members.into_iter().map(move |m| (m.clone(), community))
        })
        .collect()
}

/// One Louvain local-moving phase over a weighted undirected edge list.
/// Returns each node's community and whether any node moved.
fn louvain_level(node_count: usize, edges: &[(usize, usize, f64)]) -> (Vec<usize>, bool) {
    let mut community: Vec<usize> = (0..node_count).collect();
    let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); node_count];
    let mut degree = vec![0.0; node_count];
    let mut total_weight = 0.0;

    for &(a, b, weight) in edges {
        degree[a] += weight;
        degree[b] += weight;
        total_weight += weight;
        if a != b {
            adjacency[a].push((b, weight));
            adjacency[b].push((a, weight));
        }
    }

    if total_weight == 0.0 {
        return (community, false);
    }

    let two_m = 2.0 * total_weight;
    let mut community_degree = degree.clone();
    let mut improved = false;

    loop {
        let mut moved = false;

        for node in 0..node_count {
            let current = community[node];
            let mut links: BTreeMap<usize, f64> = BTreeMap::new();
            for &(neighbor, weight) in &adjacency[node] {
                *links.entry(community[neighbor]).or_insert(0.0) += weight;
            }

            community_degree[current] -= degree[node];
            let gain = |target: usize, links_in: f64| {
                links_in - community_degree[target] * degree[node] / two_m
            };

            let mut best = current;
            let mut best_gain = gain(current, links.get(&current).copied().unwrap_or(0.0));
            for (&target, &links_in) in &links {
                let candidate = gain(target, links_in);
                if candidate > best_gain + MODULARITY_EPSILON {
                    best = target;
                    best_gain = candidate;
                }
            }

            community_degree[best] += degree[node];
            if best != current {
                community[node] = best;
                moved = true;
                improved = true;
            }
        }

        if !moved {
            break;
        }
    }

    (community, improved)
}

const MODULARITY_EPSILON: f64 = 1e-12;

/// Relabel communities densely in order of first appearance; returns the count
fn renumber(community: &mut [usize]) -> usize {
    let mut labels: HashMap<usize, usize> = HashMap::new();
    for label in community.iter_mut() {
        let next = labels.len();
        *label = *labels.entry(*label).or_insert(next);
    }
    labels.len()
}

/// Collapse every community into one node; internal edges become self-loops
fn aggregate(edges: &[(usize, usize, f64)], community: &[usize]) -> Vec<(usize, usize, f64)> {
    let mut merged: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    for &(a, b, weight) in edges {
        let (ca, cb) = (community[a], community[b]);
        *merged.entry((ca.min(cb), ca.max(cb))).or_insert(0.0) += weight;
    }
    merged.into_iter().map(|((a, b), w)| (a, b, w)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::{relation_attributes, Attributes};

    fn star() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        for leaf in ["Plato", "Aristotle", "Xenophon"] {
            graph.add_edge("Socrates", leaf, relation_attributes("taught"));
        }
        graph
    }

    #[test]
    fn test_page_rank_favours_hub() {
        let scores = page_rank(&star());

        assert_eq!(scores.len(), 4);
        assert!(scores.values().all(|s| *s > 0.0));
        let ranked = ranking(&scores);
        assert_eq!(ranked[0].0, "Socrates");
        assert!((scores["Plato"] - scores["Xenophon"]).abs() < 1e-9);
    }

    #[test]
    fn test_page_rank_empty_graph() {
        assert!(page_rank(&KnowledgeGraph::new()).is_empty());
    }

    #[test]
    fn test_shortest_path() {
        let mut graph = star();
        graph.add_edge("Aristotle", "Alexander", relation_attributes("taught"));

        let path = shortest_path(&graph, "Plato", "Alexander").unwrap().unwrap();
        assert_eq!(path, vec!["Plato", "Socrates", "Aristotle", "Alexander"]);
        assert_eq!(
            describe_path("Plato", "Alexander", Some(&path)),
            "Shortest path from Plato to Alexander: Plato -> Socrates -> Aristotle -> Alexander"
        );
    }

    #[test]
    fn test_shortest_path_disconnected() {
        let mut graph = star();
        graph.add_node("Confucius", Attributes::new());

        assert_eq!(shortest_path(&graph, "Plato", "Confucius").unwrap(), None);
        assert_eq!(
            describe_path("Plato", "Confucius", None),
            "No path exists between Plato and Confucius"
        );
    }

    #[test]
    fn test_shortest_path_unknown_node() {
        let err = shortest_path(&star(), "Plato", "Kant").unwrap_err();
        assert_eq!(err, GraphError::NodeNotFound("Kant".to_string()));
    }

    #[test]
    fn test_communities_split_bridged_clusters() {
        let mut graph = KnowledgeGraph::new();
        for (a, b) in [("A1", "A2"), ("A2", "A3"), ("A1", "A3")] {
            graph.add_edge(a, b, relation_attributes("debated"));
        }
        for (a, b) in [("B1", "B2"), ("B2", "B3"), ("B1", "B3")] {
            graph.add_edge(a, b, relation_attributes("debated"));
        }
        graph.add_edge("A3", "B1", relation_attributes("influenced"));

        let communities = detect_communities(&graph);

        assert_eq!(communities.len(), 6);
        assert_ne!(communities["A1"], communities["B2"]);
        for id in ["A1", "A2", "A3"] {
            assert_eq!(communities[id], 0);
        }
        for id in ["B1", "B2", "B3"] {
            assert_eq!(communities[id], 1);
        }
    }

    #[test]
    fn test_communities_isolated_and_empty() {
        assert!(detect_communities(&KnowledgeGraph::new()).is_empty());

        let mut graph = KnowledgeGraph::new();
        graph.add_node("Diogenes", Attributes::new());
        graph.add_node("Antisthenes", Attributes::new());

        let communities = detect_communities(&graph);
        assert_eq!(communities["Antisthenes"], 0);
        assert_eq!(communities["Diogenes"], 1);
    }

    #[test]
    fn test_communities_follow_clusters() {
        let mut graph = star();
        graph.add_edge("Laozi", "Zhuangzi", relation_attributes("influenced"));

        let communities = detect_communities(&graph);

        assert_eq!(communities.len(), 6);
        assert_eq!(communities["Laozi"], communities["Zhuangzi"]);
        assert_eq!(communities["Plato"], communities["Socrates"]);
        assert_ne!(communities["Plato"], communities["Laozi"]);
        // "Aristotle" sorts before "Laozi"
        assert_eq!(communities["Aristotle"], 0);
        assert_eq!(communities["Laozi"], 1);
    }
}
