//! Central gravity: pulls every node towards the origin.

use glam::Vec2;

use crate::graph::LayoutGraph;
use crate::settings::CentralGravitySettings;

/// Standard central gravity with a constant pull.
pub struct CentralGravity {
    central_gravity: f32,
}

impl CentralGravity {
    pub fn new(settings: &CentralGravitySettings) -> Self {
        Self {
            central_gravity: settings.central_gravity,
        }
    }

    /// Add a constant-magnitude pull towards the origin into `forces`.
    ///
    /// A node sitting exactly on the origin feels nothing; this is not a
    /// singularity.
    pub fn solve(&self, graph: &LayoutGraph, forces: &mut [Vec2]) {
        if self.central_gravity == 0.0 {
            return;
        }
        for index in graph.node_indices() {
            let to_origin = -graph[index].position;
            let distance = to_origin.length();
            if distance > 0.0 {
                forces[index.index()] += to_origin * (self.central_gravity / distance);
            }
        }
    }
}

/// Degree- and mass-weighted central gravity in the manner of ForceAtlas2.
pub struct ForceAtlas2Gravity {
    central_gravity: f32,
}

impl ForceAtlas2Gravity {
    pub fn new(settings: &CentralGravitySettings) -> Self {
        Self {
            central_gravity: settings.central_gravity,
        }
    }

    /// Add the degree-weighted pull towards the origin into `forces`.
    pub fn solve(&self, graph: &LayoutGraph, degrees: &[u32], forces: &mut [Vec2]) {
        if self.central_gravity == 0.0 {
            return;
        }
        for index in graph.node_indices() {
            let node = &graph[index];
            let to_origin = -node.position;
            let distance = to_origin.length();
            if distance > 0.0 {
                let degree = degrees.get(index.index()).copied().unwrap_or(0);
                let magnitude =
                    self.central_gravity * (degree as f32 + 1.0) * node.effective_mass();
                forces[index.index()] += (to_origin / distance) * magnitude;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeBody;

    #[test]
    fn pull_magnitude_is_the_configured_gravity() {
        let mut graph = LayoutGraph::default();
        graph.add_node(NodeBody::new(Vec2::new(300.0, -400.0)));
        let solver = CentralGravity::new(&CentralGravitySettings {
            central_gravity: 0.3,
        });
        let mut forces = vec![Vec2::ZERO];
        solver.solve(&graph, &mut forces);
        assert!((forces[0].length() - 0.3).abs() < 1e-5);
        // Pointing back at the origin.
        assert!(forces[0].x < 0.0 && forces[0].y > 0.0);
    }

    #[test]
    fn origin_is_not_a_singularity() {
        let mut graph = LayoutGraph::default();
        graph.add_node(NodeBody::new(Vec2::ZERO));
        let solver = CentralGravity::new(&CentralGravitySettings {
            central_gravity: 0.3,
        });
        let mut forces = vec![Vec2::ZERO];
        solver.solve(&graph, &mut forces);
        assert_eq!(forces[0], Vec2::ZERO);
    }

    #[test]
    fn force_atlas2_variant_scales_with_degree_and_mass() {
        let mut graph = LayoutGraph::default();
        graph.add_node(NodeBody::new(Vec2::new(100.0, 0.0)).with_mass(2.0));
        let solver = ForceAtlas2Gravity::new(&CentralGravitySettings {
            central_gravity: 0.01,
        });
        let mut forces = vec![Vec2::ZERO];
        solver.solve(&graph, &[3], &mut forces);
        // 0.01 * (3 + 1) * 2.0 towards the origin.
        assert!((forces[0].x + 0.08).abs() < 1e-5);
        assert_eq!(forces[0].y, 0.0);
    }

    #[test]
    fn zero_gravity_is_a_no_op() {
        let mut graph = LayoutGraph::default();
        graph.add_node(NodeBody::new(Vec2::new(50.0, 50.0)));
        let solver = CentralGravity::new(&CentralGravitySettings {
            central_gravity: 0.0,
        });
        let mut forces = vec![Vec2::ZERO];
        solver.solve(&graph, &mut forces);
        assert_eq!(forces[0], Vec2::ZERO);
    }
}
