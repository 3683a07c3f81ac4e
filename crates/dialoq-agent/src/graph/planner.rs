use std::collections::HashSet;
use std::sync::Arc;

use dialoq_core::error::{DialoqError, Result};

use super::flow::TaskGraph;

/// Result of a successful transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    /// The node the cursor now occupies.
    pub current: String,
    /// Its display label.
    pub label: String,
    /// Distinct visited nodes divided by total node count.
    pub progress: f64,
}

/// Cursor into a [`TaskGraph`]: the dialogue's current subtask plus the
/// visited history.
///
/// The graph itself is shared and immutable; each dialogue session owns its
/// own planner. A transition is legal only to an outgoing edge target of the
/// current node, or back to the current node itself (an explicit stay; the
/// graph stores no self-loops). Failed transitions leave the planner
/// untouched.
#[derive(Debug, Clone)]
pub struct FlowPlanner {
    graph: Arc<TaskGraph>,
    current: String,
    visited: Vec<String>,
}

impl FlowPlanner {
    /// Create a planner positioned at the graph's first-declared start node.
    pub fn new(graph: Arc<TaskGraph>) -> Result<Self> {
        if graph.is_empty() {
            return Err(DialoqError::EmptyGraph);
        }

        let (start_nodes, _) = graph.start_end_nodes();
        // A cyclic graph may have no start node at all; fall back to the
        // first-declared node so the planner still has a defined cursor.
        let start = start_nodes
            .into_iter()
            .next()
            .unwrap_or_else(|| graph.nodes()[0].clone());

        Ok(Self {
            current: start.clone(),
            visited: vec![start],
            graph,
        })
    }

    /// The current node id.
    pub fn current(&self) -> &str {
        &self.current
    }

    /// The current node's display label (empty if none declared).
    pub fn current_label(&self) -> &str {
        self.graph.label(&self.current)
    }

    /// Legal transition targets out of the current node, in declaration
    /// order. An empty slice is the terminal signal: no further subtasks.
    pub fn legal_next(&self) -> &[String] {
        self.graph.next_nodes(&self.current)
    }

    /// Visited node ids in order, including repeats.
    pub fn visited(&self) -> &[String] {
        &self.visited
    }

    /// Distinct visited nodes divided by total node count.
    pub fn progress(&self) -> f64 {
        let distinct: HashSet<&String> = self.visited.iter().collect();
        distinct.len() as f64 / self.graph.node_count() as f64
    }

    /// The shared graph this planner walks.
    pub fn graph(&self) -> &Arc<TaskGraph> {
        &self.graph
    }

    /// Move the cursor to `target`.
    ///
    /// Legal iff `target` is in [`legal_next`](Self::legal_next) or equals
    /// the current node (explicit stay). On success the cursor moves and the
    /// visit is recorded; on failure the planner is unchanged and the
    /// attempted target is reported in the error.
    pub fn transition(&mut self, target: &str) -> Result<TransitionOutcome> {
        let legal = target == self.current || self.legal_next().iter().any(|t| t == target);
        if !legal {
            return Err(DialoqError::InvalidTransition {
                from: self.current.clone(),
                to: target.to_string(),
            });
        }

        self.current = target.to_string();
        self.visited.push(target.to_string());

        Ok(TransitionOutcome {
            current: self.current.clone(),
            label: self.graph.label(&self.current).to_string(),
            progress: self.progress(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Arc<TaskGraph> {
        Arc::new(TaskGraph::parse("A[First]\nA --> B[Second]\nB --> C[Third]").unwrap())
    }

    #[test]
    fn test_initializes_at_first_start_node() {
        let planner = FlowPlanner::new(chain()).unwrap();
        assert_eq!(planner.current(), "A");
        assert_eq!(planner.current_label(), "First");
        assert_eq!(planner.visited(), ["A"]);
    }

    #[test]
    fn test_empty_graph_rejected() {
        let err = FlowPlanner::new(Arc::new(TaskGraph::parse("").unwrap())).unwrap_err();
        assert!(matches!(err, DialoqError::EmptyGraph));
    }

    #[test]
    fn test_legal_transition_moves_cursor() {
        let mut planner = FlowPlanner::new(chain()).unwrap();
        let outcome = planner.transition("B").unwrap();
        assert_eq!(outcome.current, "B");
        assert_eq!(outcome.label, "Second");
        assert!((outcome.progress - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(planner.visited(), ["A", "B"]);
    }

    #[test]
    fn test_invalid_transition_leaves_state_unchanged() {
        let mut planner = FlowPlanner::new(chain()).unwrap();
        let err = planner.transition("C").unwrap_err();
        match err {
            DialoqError::InvalidTransition { from, to } => {
                assert_eq!(from, "A");
                assert_eq!(to, "C");
            }
            other => panic!("expected InvalidTransition, got {:?}", other),
        }
        assert_eq!(planner.current(), "A");
        assert_eq!(planner.visited(), ["A"]);
    }

    #[test]
    fn test_explicit_stay_is_legal() {
        let mut planner = FlowPlanner::new(chain()).unwrap();
        let outcome = planner.transition("A").unwrap();
        assert_eq!(outcome.current, "A");
        assert_eq!(planner.visited(), ["A", "A"]);
        // Repeats don't inflate progress.
        assert!((planner.progress() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_progress_counts_distinct_nodes_only() {
        let graph = Arc::new(TaskGraph::parse("A --> B\nB --> A\nB --> C").unwrap());
        let mut planner = FlowPlanner::new(graph).unwrap();
        planner.transition("B").unwrap();
        planner.transition("A").unwrap();
        planner.transition("B").unwrap();
        // Visited A,B,A,B: two distinct of three nodes.
        assert_eq!(planner.visited().len(), 4);
        assert!((planner.progress() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_terminal_node_has_empty_legal_next() {
        let mut planner = FlowPlanner::new(chain()).unwrap();
        planner.transition("B").unwrap();
        planner.transition("C").unwrap();
        assert!(planner.legal_next().is_empty());
        assert!((planner.progress() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_planners_share_one_graph() {
        let graph = chain();
        let mut first = FlowPlanner::new(graph.clone()).unwrap();
        let second = FlowPlanner::new(graph).unwrap();
        first.transition("B").unwrap();
        // Independent cursors over the same immutable graph.
        assert_eq!(first.current(), "B");
        assert_eq!(second.current(), "A");
    }
}
