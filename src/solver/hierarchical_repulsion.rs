//! Pairwise repulsion restricted to nodes on the same hierarchy level.
//!
//! Layered layouts ping-pong under an inverse-square law, so this solver
//! uses a smooth quadratic falloff that reaches zero at the configured
//! node distance.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::graph::LayoutGraph;
use crate::settings::HierarchicalRepulsionSettings;

/// Slope of the quadratic falloff.
const STEEPNESS: f32 = 0.05;

/// Floor substituted for an exact-zero distance.
const MIN_DISTANCE: f32 = 0.1;

pub struct HierarchicalRepulsion {
    node_distance: f32,
    rng: StdRng,
}

impl HierarchicalRepulsion {
    pub fn new(settings: &HierarchicalRepulsionSettings) -> Self {
        Self {
            node_distance: settings.node_distance,
            rng: StdRng::seed_from_u64(settings.seed),
        }
    }

    /// Add the same-level repulsion into `forces`.
    pub fn solve(&mut self, graph: &LayoutGraph, forces: &mut [Vec2]) {
        let node_distance = self.node_distance;
        if node_distance <= 0.0 {
            return;
        }

        let nodes: Vec<(usize, Vec2, u32)> = graph
            .node_indices()
            .map(|i| (i.index(), graph[i].position, graph[i].level))
            .collect();

        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let (slot_a, pos_a, level_a) = nodes[i];
                let (slot_b, pos_b, level_b) = nodes[j];
                if level_a != level_b {
                    continue;
                }

                let mut displacement = pos_b - pos_a;
                let mut distance = displacement.length();
                if distance == 0.0 {
                    distance = MIN_DISTANCE * self.rng.gen_range(0.1..=1.0);
                    let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
                    displacement = Vec2::from_angle(angle) * distance;
                }
                if distance >= node_distance {
                    continue;
                }

                let magnitude = STEEPNESS * STEEPNESS
                    * (node_distance * node_distance - distance * distance);
                let force = displacement * (magnitude / distance);
                forces[slot_a] -= force;
                forces[slot_b] += force;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeBody;

    fn graph_with_levels(nodes: &[(Vec2, u32)]) -> LayoutGraph {
        let mut graph = LayoutGraph::default();
        for &(pos, level) in nodes {
            let mut body = NodeBody::new(pos);
            body.level = level;
            graph.add_node(body);
        }
        graph
    }

    #[test]
    fn different_levels_do_not_interact() {
        let graph = graph_with_levels(&[(Vec2::ZERO, 0), (Vec2::new(10.0, 0.0), 1)]);
        let mut solver = HierarchicalRepulsion::new(&HierarchicalRepulsionSettings::default());
        let mut forces = vec![Vec2::ZERO; 2];
        solver.solve(&graph, &mut forces);
        assert_eq!(forces, vec![Vec2::ZERO; 2]);
    }

    #[test]
    fn same_level_nodes_repel_inside_the_node_distance() {
        let graph = graph_with_levels(&[(Vec2::ZERO, 1), (Vec2::new(60.0, 0.0), 1)]);
        let mut solver = HierarchicalRepulsion::new(&HierarchicalRepulsionSettings::default());
        let mut forces = vec![Vec2::ZERO; 2];
        solver.solve(&graph, &mut forces);

        // magnitude = steepness² * (120² − 60²) = 27, along the x axis.
        let expected = 0.05f32.powi(2) * (120.0f32.powi(2) - 60.0f32.powi(2));
        assert!((forces[1].x - expected).abs() < 1e-3);
        assert!((forces[0].x + expected).abs() < 1e-3);
    }

    #[test]
    fn force_is_zero_at_and_beyond_the_node_distance() {
        let graph = graph_with_levels(&[(Vec2::ZERO, 0), (Vec2::new(120.0, 0.0), 0)]);
        let mut solver = HierarchicalRepulsion::new(&HierarchicalRepulsionSettings::default());
        let mut forces = vec![Vec2::ZERO; 2];
        solver.solve(&graph, &mut forces);
        assert_eq!(forces, vec![Vec2::ZERO; 2]);
    }

    #[test]
    fn coincident_same_level_nodes_are_nudged_apart() {
        let graph = graph_with_levels(&[(Vec2::new(5.0, 5.0), 0), (Vec2::new(5.0, 5.0), 0)]);
        let mut solver = HierarchicalRepulsion::new(&HierarchicalRepulsionSettings::default());
        let mut forces = vec![Vec2::ZERO; 2];
        solver.solve(&graph, &mut forces);
        assert!(forces[0].length() > 0.0);
        assert_eq!(forces[0], -forces[1]);
    }
}
