//! Spring attraction for layered layouts.
//!
//! Cross-level forces are collected separately, clamped, and merged so a
//! long chain of levels cannot catapult a single node; the mean residual
//! force is then subtracted from every node so the layout as a whole does
//! not drift.

use glam::Vec2;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};

use crate::graph::LayoutGraph;
use crate::settings::SpringSettings;

/// Floor substituted for an exact-zero distance.
const MIN_DISTANCE: f32 = 0.01;

/// Per-component limit on the merged cross-level spring force.
const SPRING_FORCE_LIMIT: f32 = 1.0;

/// Damping applied to springs between nodes on the same level.
const SAME_LEVEL_FACTOR: f32 = 0.5;

pub struct HierarchicalSpringSolver {
    spring_length: f32,
    spring_constant: f32,
}

impl HierarchicalSpringSolver {
    pub fn new(settings: &SpringSettings) -> Self {
        Self {
            spring_length: settings.spring_length,
            spring_constant: settings.spring_constant,
        }
    }

    /// Add the level-aware spring forces into `forces`.
    pub fn solve(&self, graph: &LayoutGraph, forces: &mut [Vec2]) {
        if graph.node_count() == 0 {
            return;
        }
        let mut spring_forces = vec![Vec2::ZERO; forces.len()];

        for edge in graph.edge_references() {
            let (source, target) = (edge.source(), edge.target());
            let spring = edge.weight();
            let length = spring.length.unwrap_or(self.spring_length);
            let constant = spring.constant.unwrap_or(self.spring_constant);

            let displacement = graph[source].position - graph[target].position;
            let mut distance = displacement.length();
            if distance == 0.0 {
                distance = MIN_DISTANCE;
            }
            let force = displacement * (constant * (length - distance) / distance);

            if graph[source].level == graph[target].level {
                forces[source.index()] += force * SAME_LEVEL_FACTOR;
                forces[target.index()] -= force * SAME_LEVEL_FACTOR;
            } else {
                spring_forces[source.index()] += force;
                spring_forces[target.index()] -= force;
            }
        }

        // Merge the clamped cross-level forces.
        let limit = Vec2::splat(SPRING_FORCE_LIMIT);
        for index in graph.node_indices() {
            forces[index.index()] += spring_forces[index.index()].clamp(-limit, limit);
        }

        // Momentum correction: a layered layout must not drift as a whole.
        let total: Vec2 = graph
            .node_indices()
            .map(|index| forces[index.index()])
            .sum();
        let correction = total / graph.node_count() as f32;
        for index in graph.node_indices() {
            forces[index.index()] -= correction;
        }
    }
}
