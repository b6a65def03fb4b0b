//! Tree-based repulsion: one quadtree walk, pluggable force laws.

use glam::Vec2;
use petgraph::visit::NodeIndexable;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::graph::LayoutGraph;
use crate::quadtree::{PointMass, QuadTree};
use crate::settings::{BarnesHutSettings, ForceAtlas2Settings};

/// Keeps a single contribution from blowing up the integrator.
const MAX_FORCE: f32 = 100_000.0;

/// Floor substituted for an exact-zero distance.
const MIN_DISTANCE: f32 = 0.1;

/// Pairwise repulsion law applied to every point mass produced by the
/// quadtree walk.
///
/// `displacement` points from the node towards the mass; a repulsive law
/// returns a force in the opposite direction.
pub trait RepulsionLaw {
    fn force(
        &self,
        distance: f32,
        displacement: Vec2,
        branch_mass: f32,
        node_mass: f32,
        degree: u32,
    ) -> Vec2;
}

/// Standard Barnes-Hut gravity-style law.
///
/// The cubed denominator folds the unit-vector normalization into the
/// magnitude, so the displacement can be used as-is.
pub struct BarnesHutLaw {
    pub gravitational_constant: f32,
}

impl RepulsionLaw for BarnesHutLaw {
    fn force(
        &self,
        distance: f32,
        displacement: Vec2,
        branch_mass: f32,
        node_mass: f32,
        _degree: u32,
    ) -> Vec2 {
        let f = self.gravitational_constant * branch_mass * node_mass
            / (distance * distance * distance);
        displacement * f
    }
}

/// Degree-weighted inverse-square law in the manner of ForceAtlas2.
///
/// The magnitude is `G * m1 * m2 * (degree + 1) / d^2` applied along the
/// unit displacement, which costs one extra normalization by `d` compared
/// to [`BarnesHutLaw`].
pub struct ForceAtlas2Law {
    pub gravitational_constant: f32,
}

impl RepulsionLaw for ForceAtlas2Law {
    fn force(
        &self,
        distance: f32,
        displacement: Vec2,
        branch_mass: f32,
        node_mass: f32,
        degree: u32,
    ) -> Vec2 {
        let f = self.gravitational_constant * branch_mass * node_mass * (degree as f32 + 1.0)
            / (distance * distance);
        (displacement / distance) * f
    }
}

/// Quadtree-backed repulsion solver, generic over the force law.
pub struct TreeRepulsion<L> {
    law: L,
    gravitational_constant: f32,
    theta: f32,
    avoid_overlap: f32,
    rng: StdRng,
}

impl TreeRepulsion<BarnesHutLaw> {
    pub fn barnes_hut(settings: &BarnesHutSettings) -> Self {
        Self {
            law: BarnesHutLaw {
                gravitational_constant: settings.gravitational_constant,
            },
            gravitational_constant: settings.gravitational_constant,
            theta: settings.theta,
            avoid_overlap: settings.avoid_overlap,
            rng: StdRng::seed_from_u64(settings.seed),
        }
    }
}

impl TreeRepulsion<ForceAtlas2Law> {
    pub fn force_atlas2(settings: &ForceAtlas2Settings) -> Self {
        Self {
            law: ForceAtlas2Law {
                gravitational_constant: settings.gravitational_constant,
            },
            gravitational_constant: settings.gravitational_constant,
            theta: settings.theta,
            avoid_overlap: settings.avoid_overlap,
            rng: StdRng::seed_from_u64(settings.seed),
        }
    }
}

impl<L: RepulsionLaw> TreeRepulsion<L> {
    /// Add the repulsive force on every positive-mass node into `forces`.
    pub fn solve(
        &mut self,
        graph: &LayoutGraph,
        tree: &QuadTree,
        degrees: &[u32],
        forces: &mut [Vec2],
    ) {
        if self.gravitational_constant == 0.0 || tree.is_empty() {
            return;
        }

        for index in graph.node_indices() {
            let node = &graph[index];
            if node.mass <= 0.0 {
                continue;
            }
            let slot = index.index();
            let mut force = Vec2::ZERO;
            for approximation in tree.approximations(node.position, self.theta, slot) {
                force += self.contribution(
                    node.position,
                    node.mass,
                    node.radius,
                    degrees.get(slot).copied().unwrap_or(0),
                    approximation,
                );
            }
            forces[slot] += force.clamp(Vec2::splat(-MAX_FORCE), Vec2::splat(MAX_FORCE));
        }
        debug_assert!(forces.len() >= graph.node_bound());
    }

    fn contribution(
        &mut self,
        position: Vec2,
        mass: f32,
        radius: f32,
        degree: u32,
        approximation: PointMass,
    ) -> Vec2 {
        let mut displacement = approximation.position - position;
        let mut distance = displacement.length();
        if distance == 0.0 {
            // Coincident: substitute a small random offset so the pair
            // separates instead of sticking. The direction is drawn too,
            // otherwise a collinear configuration can never leave its line.
            distance = MIN_DISTANCE * self.rng.gen_range(0.1..=1.0);
            let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
            displacement = Vec2::from_angle(angle) * distance;
        }

        let avoid_overlap = self.avoid_overlap.clamp(0.0, 1.0);
        if avoid_overlap > 0.0 && radius > 0.0 {
            let min_distance = (0.1 + avoid_overlap) * radius;
            if distance < min_distance {
                // Push straight apart, proportional to the overlap depth.
                let overlap = min_distance - distance;
                return displacement.normalize_or(Vec2::ZERO)
                    * -(self.gravitational_constant.abs() * overlap);
            }
        }

        self.law
            .force(distance, displacement, approximation.mass, mass, degree)
    }
}
