use std::collections::{HashMap, HashSet};

use dialoq_core::error::{DialoqError, Result};

const ARROW: &str = "-->";

/// Immutable DAG of subtasks parsed from a flow description.
///
/// Nodes are referenced by string id. Outgoing edges per node keep their
/// declaration order (later tie-breaking prefers the first-declared edge),
/// and every node referenced anywhere in the source text has an edge entry,
/// possibly empty, so "no next nodes" is a well-formed query result rather
/// than an error. The parser does not validate acyclicity or reachability.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    /// node id -> outgoing edge targets, in declaration order.
    edges: HashMap<String, Vec<String>>,
    /// node id -> display label. Last write wins: the label shown for a node
    /// is whatever the most recently parsed declaration or edge into it
    /// declared, condition prefix included.
    labels: HashMap<String, String>,
    /// Node ids in order of first reference in the source text.
    order: Vec<String>,
    /// The raw flow description, kept for prompting.
    source: String,
}

/// Split an `ID[Label]` fragment into id and label.
///
/// A fragment with no bracket is the whole trimmed fragment with an empty
/// label; otherwise the id is the text before the first `[` and the label
/// runs from there to the first `]` (or the end of the fragment).
fn parse_node_ref(fragment: &str) -> (String, String) {
    match fragment.find('[') {
        None => (fragment.trim().to_string(), String::new()),
        Some(pos) => {
            let id = fragment[..pos].trim().to_string();
            let after = &fragment[pos + 1..];
            let label = after.split(']').next().unwrap_or("").trim().to_string();
            (id, label)
        }
    }
}

impl TaskGraph {
    /// Parse a flow description into a graph.
    ///
    /// Each non-empty line is either a standalone declaration `ID[Label]` or
    /// an edge `SOURCE --> TARGET`, where TARGET may carry a `|condition|`
    /// annotation. A line containing the arrow that does not split into
    /// exactly two fragments fails the whole parse; a partially built graph
    /// never escapes.
    pub fn parse(text: &str) -> Result<Self> {
        let mut graph = TaskGraph {
            source: text.to_string(),
            ..Default::default()
        };

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if line.contains(ARROW) {
                let fragments: Vec<&str> = line.split(ARROW).collect();
                if fragments.len() != 2 {
                    return Err(DialoqError::FlowParse(format!(
                        "edge line must have exactly one '{}': {:?}",
                        ARROW, line
                    )));
                }

                let (from_id, from_label) = parse_node_ref(fragments[0]);
                if from_id.is_empty() {
                    return Err(DialoqError::FlowParse(format!(
                        "edge line has empty source: {:?}",
                        line
                    )));
                }
                if !from_label.is_empty() {
                    graph.labels.insert(from_id.clone(), from_label);
                }

                // A `|condition|` segment annotates the target's label rather
                // than the stored edge: "after user <condition>: <label>".
                let mut target_fragment = fragments[1];
                let mut condition = String::new();
                if target_fragment.contains('|') {
                    // split on '|' yields at least two parts here
                    let parts: Vec<&str> = target_fragment.split('|').collect();
                    condition = format!("after user {}: ", parts[1].trim());
                    target_fragment = parts[parts.len() - 1];
                }

                let (to_id, to_label) = parse_node_ref(target_fragment);
                if to_id.is_empty() {
                    return Err(DialoqError::FlowParse(format!(
                        "edge line has empty target: {:?}",
                        line
                    )));
                }
                if !to_label.is_empty() {
                    graph.labels.insert(to_id.clone(), format!("{}{}", condition, to_label));
                }

                graph.register(&from_id);
                graph.register(&to_id);
                graph.edges.entry(from_id).or_default().push(to_id);
            } else {
                let (node_id, label) = parse_node_ref(line);
                if node_id.is_empty() {
                    return Err(DialoqError::FlowParse(format!(
                        "line has no node id: {:?}",
                        line
                    )));
                }
                graph.register(&node_id);
                if !label.is_empty() {
                    graph.labels.insert(node_id, label);
                }
            }
        }

        Ok(graph)
    }

    /// Ensure a node has an edge entry and a position in declaration order.
    fn register(&mut self, id: &str) {
        if !self.edges.contains_key(id) {
            self.edges.insert(id.to_string(), Vec::new());
            self.order.push(id.to_string());
        }
    }

    /// Total number of nodes referenced anywhere in the source.
    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Node ids in order of first reference.
    pub fn nodes(&self) -> &[String] {
        &self.order
    }

    /// Display label for a node; empty if none was ever declared.
    pub fn label(&self, id: &str) -> &str {
        self.labels.get(id).map(String::as_str).unwrap_or("")
    }

    /// Outgoing edge targets of a node, in declaration order.
    pub fn next_nodes(&self, id: &str) -> &[String] {
        self.edges.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    /// The raw flow description this graph was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Derive start nodes (no incoming edges) and end nodes (no outgoing
    /// edges), both in declaration order so callers get a deterministic
    /// first pick. An isolated node is both.
    pub fn start_end_nodes(&self) -> (Vec<String>, Vec<String>) {
        let destinations: HashSet<&String> = self.edges.values().flatten().collect();

        let start_nodes = self
            .order
            .iter()
            .filter(|id| !destinations.contains(id))
            .cloned()
            .collect();

        let end_nodes = self
            .order
            .iter()
            .filter(|id| self.next_nodes(id).is_empty())
            .cloned()
            .collect();

        (start_nodes, end_nodes)
    }

    /// Human-readable summary of the graph structure, for operator output.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for id in &self.order {
            let label = self.label(id);
            if label.is_empty() {
                out.push_str(&format!("{}\n", id));
            } else {
                out.push_str(&format!("{} [{}]\n", id, label));
            }
            for target in self.next_nodes(id) {
                let target_label = self.label(target);
                if target_label.is_empty() {
                    out.push_str(&format!("  -> {}\n", target));
                } else {
                    out.push_str(&format!("  -> {} [{}]\n", target, target_label));
                }
            }
        }
        let (starts, ends) = self.start_end_nodes();
        out.push_str(&format!("start nodes: {:?}\n", starts));
        out.push_str(&format!("end nodes: {:?}\n", ends));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_node_ref_plain() {
        assert_eq!(parse_node_ref(" N1 "), ("N1".to_string(), String::new()));
    }

    #[test]
    fn test_parse_node_ref_labeled() {
        assert_eq!(
            parse_node_ref("N1[Greet the user]"),
            ("N1".to_string(), "Greet the user".to_string())
        );
    }

    #[test]
    fn test_parse_node_ref_unclosed_bracket() {
        // A missing `]` takes the rest of the fragment as the label.
        assert_eq!(
            parse_node_ref("N1[Greet"),
            ("N1".to_string(), "Greet".to_string())
        );
    }

    #[test]
    fn test_parse_linear_chain() {
        let graph = TaskGraph::parse("A --> B\nB --> C").unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.next_nodes("A"), ["B"]);
        assert_eq!(graph.next_nodes("B"), ["C"]);
        assert!(graph.next_nodes("C").is_empty());

        let (starts, ends) = graph.start_end_nodes();
        assert_eq!(starts, ["A"]);
        assert_eq!(ends, ["C"]);
    }

    #[test]
    fn test_parse_isolated_node() {
        let graph = TaskGraph::parse("A[X]").unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.label("A"), "X");
        assert!(graph.next_nodes("A").is_empty());

        let (starts, ends) = graph.start_end_nodes();
        assert_eq!(starts, ["A"]);
        assert_eq!(ends, ["A"]);
    }

    #[test]
    fn test_every_referenced_node_has_edge_entry() {
        let graph = TaskGraph::parse("N1[Greet]\nN1 --> N2[Collect]\nN3[Orphan]").unwrap();
        for id in ["N1", "N2", "N3"] {
            assert!(graph.contains(id), "missing edge entry for {}", id);
        }
    }

    #[test]
    fn test_condition_annotates_target_label() {
        let graph = TaskGraph::parse("N2 --> |confirms| N3[Confirm Details]").unwrap();
        assert_eq!(graph.label("N3"), "after user confirms: Confirm Details");
        // The condition is not part of the edge itself.
        assert_eq!(graph.next_nodes("N2"), ["N3"]);
    }

    #[test]
    fn test_label_last_write_wins() {
        let text = "N2[First Label]\nN1 --> |accepts| N2[Second Label]";
        let graph = TaskGraph::parse(text).unwrap();
        assert_eq!(graph.label("N2"), "after user accepts: Second Label");
    }

    #[test]
    fn test_branching_preserves_declaration_order() {
        let text = "N1 --> N2[Left]\nN1 --> N3[Right]";
        let graph = TaskGraph::parse(text).unwrap();
        assert_eq!(graph.next_nodes("N1"), ["N2", "N3"]);
    }

    #[test]
    fn test_malformed_edge_line_fails_whole_parse() {
        let err = TaskGraph::parse("A --> B --> C").unwrap_err();
        assert!(matches!(err, DialoqError::FlowParse(_)));

        let err = TaskGraph::parse("--> B").unwrap_err();
        assert!(matches!(err, DialoqError::FlowParse(_)));
    }

    #[test]
    fn test_multiple_start_nodes_in_declaration_order() {
        let text = "B --> C\nA --> C";
        let graph = TaskGraph::parse(text).unwrap();
        let (starts, _) = graph.start_end_nodes();
        assert_eq!(starts, ["B", "A"]);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let graph = TaskGraph::parse("\nA --> B\n\n\nB --> C\n").unwrap();
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_describe_lists_structure() {
        let graph = TaskGraph::parse("N1[Greet]\nN1 --> N2[Collect Info]").unwrap();
        let desc = graph.describe();
        assert!(desc.contains("N1 [Greet]"));
        assert!(desc.contains("-> N2 [Collect Info]"));
        assert!(desc.contains("start nodes"));
    }

    #[test]
    fn test_four_node_conditional_flow() {
        let text = "N1[Greet]\nN1 --> N2[Collect Info]\nN2 --> |user confirms| N3[Confirm]\nN3 --> N4[Farewell]";
        let graph = TaskGraph::parse(text).unwrap();
        assert_eq!(graph.node_count(), 4);
        let (starts, ends) = graph.start_end_nodes();
        assert_eq!(starts, ["N1"]);
        assert_eq!(ends, ["N4"]);
        assert_eq!(graph.label("N3"), "after user user confirms: Confirm");
    }
}
