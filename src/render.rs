//! Visualisation outputs: compact JSON for the web view and a DOT graph of
//! the community evolution.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;

use petgraph::Graph;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{EdgeReference, NodeIndex};
use serde::Serialize;
use tracing::warn;

use crate::community::Step;
use crate::error::Result;
use crate::events::{EventKind, EventLog};
use crate::timeline::Timeline;

/// Write `value` as a single line of compact JSON.
pub fn write_json<W: Write, T: Serialize + ?Sized>(mut writer: W, value: &T) -> Result<()> {
    serde_json::to_writer(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// A dynamic community observed at one time step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepNode {
    pub name: String,
    pub step: Step,
    /// Position of the community in the timeline, used for colouring.
    pub lineage: usize,
}

impl fmt::Display for StepNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} (c{})", self.name, self.step.number, self.step.community)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Continues,
    Split,
    Merge,
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Continues => "",
            Self::Split => "split",
            Self::Merge => "merge",
        })
    }
}

/// Build the evolution graph: one node per remaining `(community, step)`,
/// chained along each lineage, plus split and merge edges.
pub fn evolution_graph(timeline: &Timeline, events: &EventLog) -> Graph<StepNode, Link> {
    let mut graph = Graph::new();
    let mut nodes: HashMap<(&str, u32), NodeIndex> = HashMap::new();

    for (lineage, d) in timeline.iter().enumerate() {
        let mut prev = None;
        for &step in d.steps() {
            let node = graph.add_node(StepNode {
                name: d.name().to_string(),
                step,
                lineage,
            });
            nodes.insert((d.name(), step.number), node);
            if let Some(prev) = prev {
                graph.add_edge(prev, node, Link::Continues);
            }
            prev = Some(node);
        }
    }

    for event in events.splits.iter().chain(events.merges.iter()) {
        let link = match event.kind() {
            EventKind::Split => Link::Split,
            EventKind::Merge => Link::Merge,
            _ => continue,
        };
        let Some(target) = event.target() else {
            continue;
        };
        let source = event.source();
        match (
            nodes.get(&(source.name.as_str(), source.step)),
            nodes.get(&(target.name.as_str(), target.step)),
        ) {
            (Some(&from), Some(&to)) => {
                graph.add_edge(from, to, link);
            }
            _ => warn!(%source, %target, kind = %event.kind(), "event endpoint not in timeline"),
        }
    }

    graph
}

/// Render the evolution graph in Graphviz DOT, one colour per lineage.
pub fn to_dot(graph: &Graph<StepNode, Link>) -> String {
    let lineages = graph
        .node_weights()
        .map(|n| n.lineage + 1)
        .max()
        .unwrap_or(1);
    let edge_attrs = |_, edge: EdgeReference<'_, Link>| match edge.weight() {
        Link::Continues => String::new(),
        link => format!("label=\"{link}\", style=dashed"),
    };
    let node_attrs = |_, (_, node): (NodeIndex, &StepNode)| {
        let hue = node.lineage as f64 / lineages as f64;
        format!(
            "label=\"{}\", style=filled, fillcolor=\"{:.3} 0.5 0.7\"",
            escape(&node.to_string()),
            hue
        )
    };

    let dot = Dot::with_attr_getters(
        graph,
        &[Config::EdgeNoLabel, Config::NodeNoLabel],
        &edge_attrs,
        &node_attrs,
    );
    format!("{dot}")
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
