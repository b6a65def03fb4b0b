//! Node and edge state stored in the layout graph.

use glam::Vec2;
use petgraph::stable_graph::StableGraph;

pub use petgraph::stable_graph::{EdgeIndex, NodeIndex};

/// Storage for the simulated graph.
///
/// Node and edge handles stay valid across removals, so they double as the
/// identities shared with the rendering collaborator. Dense per-step arrays
/// (force accumulator, degree cache) are indexed by [`NodeIndex::index`].
pub type LayoutGraph = StableGraph<NodeBody, Spring>;

/// Physical state of a single node.
#[derive(Clone, Debug)]
pub struct NodeBody {
    /// Current position.
    pub position: Vec2,
    /// Current velocity.
    pub velocity: Vec2,
    /// Mass used by repulsion and the integrator.
    ///
    /// Nodes with a non-positive mass never enter the spatial index and are
    /// integrated as if their mass were `1.0`.
    pub mass: f32,
    /// Visual radius, used by overlap avoidance. `0.0` disables it.
    pub radius: f32,
    /// A fixed node does not compute movement.
    pub fixed: bool,
    /// Hierarchy level assigned by the static layout.
    pub level: u32,
}

impl NodeBody {
    /// A unit-mass node at `position`, at rest.
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            mass: 1.0,
            radius: 0.0,
            fixed: false,
            level: 0,
        }
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Mass as seen by the integrator.
    pub(crate) fn effective_mass(&self) -> f32 {
        if self.mass > 0.0 {
            self.mass
        } else {
            1.0
        }
    }
}

impl Default for NodeBody {
    fn default() -> Self {
        Self::new(Vec2::ZERO)
    }
}

/// Spring parameters of an edge.
///
/// If edge is shorter than its target length it pushes apart.
/// If edge is longer than its target length it pulls together.
#[derive(Clone, Copy, Debug, Default)]
pub struct Spring {
    /// Target length override; falls back to the solver's spring length.
    pub length: Option<f32>,
    /// Stiffness override; falls back to the solver's spring constant.
    pub constant: Option<f32>,
    /// Support point for curved edges.
    ///
    /// A spring with a via point acts as two half-length springs meeting in
    /// it. The point itself is owned and repositioned by the renderer.
    pub via: Option<Vec2>,
}

impl Spring {
    pub fn with_length(mut self, length: f32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_constant(mut self, constant: f32) -> Self {
        self.constant = Some(constant);
        self
    }

    pub fn with_via(mut self, via: Vec2) -> Self {
        self.via = Some(via);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_mass_is_integrated_as_unit_mass() {
        let node = NodeBody::new(Vec2::ZERO).with_mass(0.0);
        assert_eq!(node.effective_mass(), 1.0);
        let node = NodeBody::new(Vec2::ZERO).with_mass(2.5);
        assert_eq!(node.effective_mass(), 2.5);
    }

    #[test]
    fn spring_overrides() {
        let spring = Spring::default()
            .with_length(42.0)
            .with_constant(0.5)
            .with_via(Vec2::new(1.0, 2.0));
        assert_eq!(spring.length, Some(42.0));
        assert_eq!(spring.constant, Some(0.5));
        assert_eq!(spring.via, Some(Vec2::new(1.0, 2.0)));
    }
}
