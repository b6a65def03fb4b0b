//! Static hierarchical layout.
//!
//! Assigns every node a hierarchy level by walking the edge direction from
//! the roots, then places the levels on a regular grid. The result can seed
//! the simulation (levels feed the hierarchical solvers) or stand on its
//! own as a deterministic layout.

use std::collections::VecDeque;

use glam::Vec2;
use petgraph::visit::NodeIndexable;
use petgraph::Direction;

use crate::graph::{LayoutGraph, NodeIndex};
use crate::settings::{HierarchicalDirection, HierarchicalLayoutSettings};
use crate::simulator::Simulator;

/// Grid slot computed for one node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub node: NodeIndex,
    pub position: Vec2,
    pub level: u32,
}

pub struct HierarchicalLayout {
    settings: HierarchicalLayoutSettings,
}

impl HierarchicalLayout {
    pub fn new(settings: HierarchicalLayoutSettings) -> Self {
        Self { settings }
    }

    /// Compute grid positions for every node without touching the graph.
    ///
    /// Nodes without incoming edges are the roots at level zero; every other
    /// node sits one level below its first discovered parent. Cycles and
    /// detached components that no root reaches get seeded as extra roots.
    pub fn compute(&self, graph: &LayoutGraph) -> Vec<Placement> {
        let levels = assign_levels(graph);

        let level_count = levels
            .iter()
            .filter_map(|slot| *slot)
            .max()
            .map_or(0, |max| max as usize + 1);
        let mut rows: Vec<Vec<NodeIndex>> = vec![Vec::new(); level_count];
        for id in graph.node_indices() {
            if let Some(level) = levels[id.index()] {
                rows[level as usize].push(id);
            }
        }

        let (main_axis_x, main_sign) = match self.settings.direction {
            HierarchicalDirection::UpDown => (false, 1.0),
            HierarchicalDirection::DownUp => (false, -1.0),
            HierarchicalDirection::LeftRight => (true, 1.0),
            HierarchicalDirection::RightLeft => (true, -1.0),
        };

        let mut placements = Vec::with_capacity(graph.node_count());
        for (level, row) in rows.iter().enumerate() {
            let main = main_sign * level as f32 * self.settings.level_separation;
            // Center the row on the cross axis.
            let first = -(row.len() as f32 - 1.0) * 0.5 * self.settings.node_spacing;
            for (slot, &id) in row.iter().enumerate() {
                let cross = first + slot as f32 * self.settings.node_spacing;
                let position = if main_axis_x {
                    Vec2::new(main, cross)
                } else {
                    Vec2::new(cross, main)
                };
                placements.push(Placement {
                    node: id,
                    position,
                    level: level as u32,
                });
            }
        }
        placements
    }

    /// Place the simulator's nodes on the grid and store their levels.
    ///
    /// Velocities are reset so the next simulation steps start from rest;
    /// with `pin_placed` set, the nodes are additionally fixed in place.
    pub fn apply(&self, simulator: &mut Simulator) {
        let placements = self.compute(simulator.graph());
        let pin = self.settings.pin_placed;
        let graph = simulator.graph_mut();
        for placement in &placements {
            if let Some(node) = graph.node_weight_mut(placement.node) {
                node.position = placement.position;
                node.level = placement.level;
                node.velocity = Vec2::ZERO;
                if pin {
                    node.fixed = true;
                }
            }
        }
        simulator.wake();
    }
}

/// Level per node slot, `None` only for vacant slots of the stable graph.
fn assign_levels(graph: &LayoutGraph) -> Vec<Option<u32>> {
    let mut levels: Vec<Option<u32>> = vec![None; graph.node_bound()];
    let mut queue = VecDeque::new();

    for id in graph.node_indices() {
        if graph
            .neighbors_directed(id, Direction::Incoming)
            .next()
            .is_none()
        {
            levels[id.index()] = Some(0);
            queue.push_back(id);
        }
    }
    propagate(graph, &mut levels, &mut queue);

    // Cycles and components no root reaches: seed them in index order.
    for id in graph.node_indices() {
        if levels[id.index()].is_none() {
            levels[id.index()] = Some(0);
            queue.push_back(id);
            propagate(graph, &mut levels, &mut queue);
        }
    }
    levels
}

fn propagate(graph: &LayoutGraph, levels: &mut [Option<u32>], queue: &mut VecDeque<NodeIndex>) {
    while let Some(id) = queue.pop_front() {
        let next = levels[id.index()].unwrap_or(0) + 1;
        for child in graph.neighbors_directed(id, Direction::Outgoing) {
            if levels[child.index()].is_none() {
                levels[child.index()] = Some(next);
                queue.push_back(child);
            }
        }
    }
}
