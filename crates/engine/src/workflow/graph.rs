//! Node/edge view of a workflow.
//!
//! Nodes are placed left to right in list order. The layout is illustrative
//! only: edges may point backwards and cycles are allowed. A cycle is surfaced
//! through [`WorkflowGraph::cycle_warning`] rather than rejected.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use flowdesk_types::WorkflowStep;
use indexmap::IndexMap;

pub const UNNAMED_STEP: &str = "Unnamed Step";
/// Horizontal distance between consecutive nodes.
pub const NODE_SPACING: i32 = 150;
pub const NODE_Y: i32 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    /// `<dependency>-<step>`
    pub id: String,
    pub source: String,
    pub target: String,
}

/// Steps caught in at least one dependency cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleWarning {
    pub step_ids: Vec<String>,
    pub step_labels: Vec<String>,
}

impl fmt::Display for CycleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dependency cycle between steps: {}", self.step_labels.join(", "))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl WorkflowGraph {
    pub fn from_steps(steps: &[WorkflowStep]) -> Self {
        let nodes = steps
            .iter()
            .enumerate()
            .map(|(index, step)| GraphNode {
                id: step.id.clone(),
                label: node_label(step),
                x: NODE_SPACING * index as i32,
                y: NODE_Y,
            })
            .collect();

        let edges = steps
            .iter()
            .flat_map(|step| {
                step.dependencies.iter().map(move |dependency| GraphEdge {
                    id: format!("{dependency}-{}", step.id),
                    source: dependency.clone(),
                    target: step.id.clone(),
                })
            })
            .collect();

        Self { nodes, edges }
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Edges whose endpoints both exist as nodes.
    pub fn resolved_edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges
            .iter()
            .filter(|edge| self.node(&edge.source).is_some() && self.node(&edge.target).is_some())
    }

    /// Steps in dependency order, or the steps left over when a cycle blocks
    /// the ordering. Edges to unknown steps and self loops are ignored.
    pub fn dependency_order(&self) -> Result<Vec<&str>, CycleWarning> {
        let lookup: IndexMap<&str, &GraphNode> = self.nodes.iter().map(|node| (node.id.as_str(), node)).collect();
        let mut in_degrees: HashMap<&str, usize> = lookup.keys().map(|id| (*id, 0)).collect();
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut seen: HashSet<(&str, &str)> = HashSet::new();

        for edge in self.resolved_edges() {
            if edge.source == edge.target || !seen.insert((edge.source.as_str(), edge.target.as_str())) {
                continue;
            }
            if let Some(degree) = in_degrees.get_mut(edge.target.as_str()) {
                *degree += 1;
            }
            adjacency.entry(edge.source.as_str()).or_default().push(edge.target.as_str());
        }

        let mut queue: VecDeque<&str> = lookup
            .keys()
            .filter(|id| in_degrees.get(*id).copied().unwrap_or(0) == 0)
            .copied()
            .collect();

        let mut ordered = Vec::with_capacity(lookup.len());
        while let Some(id) = queue.pop_front() {
            ordered.push(id);
            if let Some(children) = adjacency.get(id) {
                for child in children {
                    if let Some(degree) = in_degrees.get_mut(child) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(*child);
                        }
                    }
                }
            }
        }

        if ordered.len() == lookup.len() {
            return Ok(ordered);
        }

        let (step_ids, step_labels) = lookup
            .iter()
            .filter(|(id, _)| in_degrees.get(*id).copied().unwrap_or(0) > 0)
            .map(|(id, node)| (id.to_string(), node.label.clone()))
            .unzip();
        Err(CycleWarning { step_ids, step_labels })
    }

    pub fn cycle_warning(&self) -> Option<CycleWarning> {
        self.dependency_order().err()
    }
}

fn node_label(step: &WorkflowStep) -> String {
    if step.name.trim().is_empty() { UNNAMED_STEP.to_string() } else { step.name.clone() }
}

/// Show/hide toggle for the graph panel. Pure presentation state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphView {
    visible: bool,
}

impl GraphView {
    pub fn new(visible: bool) -> Self {
        Self { visible }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, name: &str, dependencies: &[&str]) -> WorkflowStep {
        let mut step = WorkflowStep::new(id);
        step.name = name.to_string();
        step.dependencies = dependencies.iter().map(|dependency| dependency.to_string()).collect();
        step
    }

    #[test]
    fn lays_out_nodes_in_list_order_with_one_edge_per_dependency() {
        let steps = vec![step("a", "Request", &[]), step("b", "", &["a"]), step("c", "Ship", &["a", "b"])];
        let graph = WorkflowGraph::from_steps(&steps);

        let positions: Vec<(i32, i32)> = graph.nodes.iter().map(|node| (node.x, node.y)).collect();
        assert_eq!(positions, vec![(0, 60), (150, 60), (300, 60)]);
        assert_eq!(graph.nodes[1].label, UNNAMED_STEP);

        let edge_ids: Vec<&str> = graph.edges.iter().map(|edge| edge.id.as_str()).collect();
        assert_eq!(edge_ids, vec!["a-b", "a-c", "b-c"]);
        assert_eq!(graph.edges[0].source, "a");
        assert_eq!(graph.edges[0].target, "b");
    }

    #[test]
    fn backwards_edges_are_allowed_without_a_warning() {
        let steps = vec![step("a", "First", &["b"]), step("b", "Second", &[])];
        let graph = WorkflowGraph::from_steps(&steps);
        assert!(graph.cycle_warning().is_none());
        assert_eq!(graph.dependency_order().expect("acyclic"), vec!["b", "a"]);
    }

    #[test]
    fn cycles_are_reported_as_warnings() {
        let steps = vec![step("a", "First", &["c"]), step("b", "Second", &["a"]), step("c", "Third", &["b"]), step("d", "Free", &[])];
        let warning = WorkflowGraph::from_steps(&steps).cycle_warning().expect("cycle");
        assert_eq!(warning.step_ids, vec!["a", "b", "c"]);
        assert_eq!(warning.to_string(), "dependency cycle between steps: First, Second, Third");
    }

    #[test]
    fn dangling_dependencies_are_ignored_for_ordering() {
        let steps = vec![step("a", "Only", &["gone"])];
        let graph = WorkflowGraph::from_steps(&steps);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.resolved_edges().count(), 0);
        assert!(graph.cycle_warning().is_none());
    }

    #[test]
    fn view_toggles_visibility() {
        let mut view = GraphView::new(false);
        view.toggle();
        assert!(view.is_visible());
        view.toggle();
        assert!(!view.is_visible());
    }
}
