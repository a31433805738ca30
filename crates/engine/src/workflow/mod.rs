//! Workflow step editing and graph presentation.
//!
//! [`StepList`] owns the ordered steps of a template under construction and
//! keeps dependency references consistent as steps come and go.
//! [`WorkflowGraph`] derives a read-only node/edge view from a step slice.

pub mod graph;
pub mod steps;

pub use graph::{CycleWarning, GraphEdge, GraphNode, GraphView, NODE_SPACING, NODE_Y, UNNAMED_STEP, WorkflowGraph};
pub use steps::StepList;
