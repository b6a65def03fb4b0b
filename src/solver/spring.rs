//! Spring attraction along edges.

use glam::Vec2;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};

use crate::graph::LayoutGraph;
use crate::settings::SpringSettings;

/// Floor substituted for an exact-zero distance.
const MIN_DISTANCE: f32 = 0.01;

pub struct SpringSolver {
    spring_length: f32,
    spring_constant: f32,
    self_reference_length: f32,
}

impl SpringSolver {
    pub fn new(settings: &SpringSettings) -> Self {
        Self {
            spring_length: settings.spring_length,
            spring_constant: settings.spring_constant,
            self_reference_length: settings.self_reference_length(),
        }
    }

    /// Add the spring force of every edge into `forces`.
    ///
    /// Edges with a via point act as two half-length springs meeting in it.
    /// A self-referencing edge only exerts a force through its via point,
    /// keeping the loop shape at the configured self-reference length.
    pub fn solve(&self, graph: &LayoutGraph, forces: &mut [Vec2]) {
        for edge in graph.edge_references() {
            let (source, target) = (edge.source(), edge.target());
            let spring = edge.weight();
            let length = spring.length.unwrap_or(self.spring_length);
            let constant = spring.constant.unwrap_or(self.spring_constant);

            if source == target {
                if let Some(via) = spring.via {
                    let force = self.force(
                        constant,
                        graph[source].position,
                        via,
                        self.self_reference_length,
                    );
                    forces[source.index()] += force;
                }
                continue;
            }

            match spring.via {
                Some(via) => {
                    let half = length * 0.5;
                    let force = self.force(constant, graph[source].position, via, half);
                    forces[source.index()] += force;
                    let force = self.force(constant, graph[target].position, via, half);
                    forces[target.index()] += force;
                }
                None => {
                    let force = self.force(
                        constant,
                        graph[source].position,
                        graph[target].position,
                        length,
                    );
                    forces[source.index()] += force;
                    forces[target.index()] -= force;
                }
            }
        }
    }

    /// Spring force on the node at `from`, anchored at `to`.
    fn force(&self, constant: f32, from: Vec2, to: Vec2, length: f32) -> Vec2 {
        let displacement = from - to;
        let mut distance = displacement.length();
        if distance == 0.0 {
            distance = MIN_DISTANCE;
        }
        // The 1/distance folds the direction normalization into the
        // magnitude.
        displacement * (constant * (length - distance) / distance)
    }
}
