//! Text rendering of a workflow's dependency graph.
//!
//! Nodes are drawn as boxes in workflow order, left to right, wrapping to a
//! new row when the area is too narrow. Edges are listed below as
//! `Source -> Target`, followed by the cycle warning when dependencies loop.

use flowdesk_engine::WorkflowGraph;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::ui::theme::Theme;

const NODE_GAP: usize = 2;

pub struct GraphWidget<'a> {
    graph: &'a WorkflowGraph,
    selected: Option<usize>,
    theme: &'a dyn Theme,
}

impl<'a> GraphWidget<'a> {
    pub fn new(graph: &'a WorkflowGraph, theme: &'a dyn Theme) -> Self {
        Self { graph, selected: None, theme }
    }

    pub fn selected(mut self, index: usize) -> Self {
        self.selected = Some(index);
        self
    }

    pub fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        if self.graph.nodes.is_empty() {
            lines.push(Line::from(Span::styled("No steps yet", self.theme.text_muted_style())));
            return lines;
        }

        let boxes: Vec<(String, bool)> = self
            .graph
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (format!(" {}. {} ", index + 1, node.label), self.selected == Some(index)))
            .collect();

        // Pack boxes into rows that fit the width.
        let mut rows: Vec<Vec<&(String, bool)>> = vec![Vec::new()];
        let mut used = 0usize;
        for entry in &boxes {
            let needed = entry.0.width() + 2 + NODE_GAP;
            if used > 0 && used + needed > width as usize {
                rows.push(Vec::new());
                used = 0;
            }
            used += needed;
            if let Some(row) = rows.last_mut() {
                row.push(entry);
            }
        }

        for row in rows {
            let mut top = Vec::new();
            let mut middle = Vec::new();
            let mut bottom = Vec::new();
            for (label, selected) in row {
                let style = if *selected { self.theme.selection_style() } else { self.theme.accent_primary_style() };
                let inner = label.width();
                top.push(Span::styled(format!("┌{}┐", "─".repeat(inner)), style));
                middle.push(Span::styled(format!("│{label}│"), style));
                bottom.push(Span::styled(format!("└{}┘", "─".repeat(inner)), style));
                for spans in [&mut top, &mut middle, &mut bottom] {
                    spans.push(Span::raw(" ".repeat(NODE_GAP)));
                }
            }
            lines.push(Line::from(top));
            lines.push(Line::from(middle));
            lines.push(Line::from(bottom));
        }

        let edges: Vec<Line<'static>> = self
            .graph
            .resolved_edges()
            .filter_map(|edge| {
                let source = self.graph.node(&edge.source)?;
                let target = self.graph.node(&edge.target)?;
                Some(Line::from(vec![
                    Span::styled(source.label.clone(), self.theme.text_primary_style()),
                    Span::styled(" -> ", self.theme.text_muted_style()),
                    Span::styled(target.label.clone(), self.theme.text_primary_style()),
                ]))
            })
            .collect();
        if !edges.is_empty() {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled("Dependencies", self.theme.text_secondary_style())));
            lines.extend(edges);
        }

        if let Some(warning) = self.graph.cycle_warning() {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(warning.to_string(), self.theme.status_warning())));
        }
        lines
    }
}

impl Widget for GraphWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.lines(area.width)).wrap(Wrap { trim: false }).render(area, buf);
    }
}
