//! Direct pairwise repulsion with a piecewise-linear falloff.
//!
//! O(n²), intended for small graphs where the quadtree overhead is not
//! worth paying. The curve is flat at maximal repulsion inside half the
//! node distance, decays linearly out to twice the node distance, and is
//! zero beyond.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::graph::LayoutGraph;
use crate::settings::RepulsionSettings;

/// Floor substituted for an exact-zero distance.
const MIN_DISTANCE: f32 = 0.1;

pub struct Repulsion {
    node_distance: f32,
    rng: StdRng,
}

impl Repulsion {
    pub fn new(settings: &RepulsionSettings) -> Self {
        Self {
            node_distance: settings.node_distance,
            rng: StdRng::seed_from_u64(settings.seed),
        }
    }

    /// Add the pairwise repulsion into `forces`.
    pub fn solve(&mut self, graph: &LayoutGraph, forces: &mut [Vec2]) {
        let node_distance = self.node_distance;
        if node_distance <= 0.0 {
            // Invalid configuration: contribute nothing rather than divide
            // by a non-positive range.
            return;
        }

        // Linear approximation of the repulsion curve.
        let a = -2.0 / 3.0 / node_distance;
        let b = 4.0 / 3.0;

        let nodes: Vec<(usize, Vec2)> = graph
            .node_indices()
            .map(|i| (i.index(), graph[i].position))
            .collect();

        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let (slot_a, pos_a) = nodes[i];
                let (slot_b, pos_b) = nodes[j];

                let mut displacement = pos_b - pos_a;
                let mut distance = displacement.length();
                if distance == 0.0 {
                    distance = MIN_DISTANCE * self.rng.gen_range(0.1..=1.0);
                    let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
                    displacement = Vec2::from_angle(angle) * distance;
                }

                if distance < 2.0 * node_distance {
                    let magnitude = if distance < 0.5 * node_distance {
                        1.0
                    } else {
                        a * distance + b
                    };
                    let force = displacement * (magnitude / distance);
                    forces[slot_a] -= force;
                    forces[slot_b] += force;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeBody;

    fn graph_at(positions: &[Vec2]) -> LayoutGraph {
        let mut graph = LayoutGraph::default();
        for &pos in positions {
            graph.add_node(NodeBody::new(pos));
        }
        graph
    }

    #[test]
    fn non_positive_node_distance_contributes_nothing() {
        let graph = graph_at(&[Vec2::ZERO, Vec2::new(1.0, 0.0)]);
        let mut solver = Repulsion::new(&RepulsionSettings {
            node_distance: -5.0,
            ..RepulsionSettings::default()
        });
        let mut forces = vec![Vec2::ZERO; 2];
        solver.solve(&graph, &mut forces);
        assert_eq!(forces, vec![Vec2::ZERO; 2]);
    }

    #[test]
    fn close_pairs_repel_at_maximum() {
        // Inside half the node distance the curve is flat at 1.
        let graph = graph_at(&[Vec2::ZERO, Vec2::new(20.0, 0.0)]);
        let mut solver = Repulsion::new(&RepulsionSettings::default());
        let mut forces = vec![Vec2::ZERO; 2];
        solver.solve(&graph, &mut forces);
        assert!((forces[1].x - 1.0).abs() < 1e-5);
        assert!((forces[0].x + 1.0).abs() < 1e-5);
    }

    #[test]
    fn falloff_reaches_zero_at_twice_the_node_distance() {
        let graph = graph_at(&[Vec2::ZERO, Vec2::new(200.0, 0.0)]);
        let mut solver = Repulsion::new(&RepulsionSettings::default());
        let mut forces = vec![Vec2::ZERO; 2];
        solver.solve(&graph, &mut forces);
        assert!(forces[0].length() < 1e-5);
        assert!(forces[1].length() < 1e-5);

        let graph = graph_at(&[Vec2::ZERO, Vec2::new(250.0, 0.0)]);
        let mut forces = vec![Vec2::ZERO; 2];
        solver.solve(&graph, &mut forces);
        assert_eq!(forces, vec![Vec2::ZERO; 2]);
    }

    #[test]
    fn decay_is_linear_between_the_knees() {
        let graph = graph_at(&[Vec2::ZERO, Vec2::new(100.0, 0.0)]);
        let mut solver = Repulsion::new(&RepulsionSettings::default());
        let mut forces = vec![Vec2::ZERO; 2];
        solver.solve(&graph, &mut forces);
        // a * d + b = -2/3 + 4/3 = 2/3 at the node distance itself.
        assert!((forces[1].x - 2.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn coincident_nodes_are_nudged_apart() {
        let graph = graph_at(&[Vec2::new(4.0, 4.0), Vec2::new(4.0, 4.0)]);
        let mut solver = Repulsion::new(&RepulsionSettings::default());
        let mut forces = vec![Vec2::ZERO; 2];
        solver.solve(&graph, &mut forces);
        assert!(forces[0].length() > 0.0);
        assert_eq!(forces[0], -forces[1]);
        // The nudge direction is drawn, not axis-locked.
        assert!(forces[0].y.abs() > 0.0);
    }
}
