//! Simulation loop and integrator.
//!
//! One [`Simulator::step`] per frame tick: rebuild the spatial index,
//! accumulate forces from the configured solvers, integrate velocity and
//! position, and check for stabilization. External mutation (dragging,
//! adding or removing graph elements) is only safe between steps, which the
//! single-threaded cooperative loop guarantees by construction.

use glam::Vec2;
use log::debug;
use petgraph::visit::{EdgeRef, NodeIndexable};
use petgraph::EdgeType;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::graph::{EdgeIndex, LayoutGraph, NodeBody, NodeIndex, Spring};
use crate::quadtree::QuadTree;
use crate::settings::{PhysicsSettings, SolverKind};
use crate::solver::{
    edge_degrees, BarnesHutLaw, CentralGravity, ForceAtlas2Gravity, ForceAtlas2Law,
    HierarchicalRepulsion, HierarchicalSpringSolver, Repulsion, SpringSolver, TreeRepulsion,
};

/// Lifecycle of the simulation loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    /// No step has run yet.
    #[default]
    Idle,
    /// Steps are being scheduled.
    Running,
    /// Node speeds stayed below the threshold long enough; no further
    /// steps are needed until something changes.
    Stabilized,
    /// The loop observed the cancellation flag and stopped.
    Cancelled,
}

/// Configures and creates a [`Simulator`].
pub struct SimulatorBuilder {
    settings: PhysicsSettings,
}

impl SimulatorBuilder {
    pub fn new() -> Self {
        Self {
            settings: PhysicsSettings::default(),
        }
    }

    /// Select the repulsion model and reset the dependent parameters to its
    /// tuned defaults. Apply before the fine-grained overrides below.
    pub fn solver(mut self, solver: SolverKind) -> Self {
        self.settings = PhysicsSettings::for_solver(solver);
        self
    }

    /// Replace the full parameter set.
    pub fn settings(mut self, settings: PhysicsSettings) -> Self {
        self.settings = settings;
        self
    }

    /// How much time a simulation step should simulate.
    pub fn delta_time(mut self, timestep: f32) -> Self {
        self.settings.timestep = timestep;
        self
    }

    /// Amount of damping applied to node movement.
    pub fn damping(mut self, damping: f32) -> Self {
        self.settings.damping = damping;
        self
    }

    /// Speed below which nodes count as settled. Negative values keep the
    /// simulation running forever.
    pub fn freeze_threshold(mut self, min_velocity: f32) -> Self {
        self.settings.min_velocity = min_velocity;
        self
    }

    /// Accuracy of the tree-based solvers.
    pub fn theta(mut self, theta: f32) -> Self {
        self.settings.barnes_hut.theta = theta;
        self.settings.force_atlas2.theta = theta;
        self
    }

    /// Seed every randomized solver from one value.
    pub fn seed(mut self, seed: u64) -> Self {
        self.settings.barnes_hut.seed = seed;
        self.settings.force_atlas2.seed = seed.wrapping_add(1);
        self.settings.repulsion.seed = seed.wrapping_add(2);
        self.settings.hierarchical_repulsion.seed = seed.wrapping_add(3);
        self
    }

    /// Build a simulator over an already populated layout graph.
    pub fn build(self, graph: LayoutGraph) -> Simulator {
        Simulator::from_parts(graph, self.settings)
    }

    /// Build a simulator with an empty graph.
    pub fn build_empty(self) -> Simulator {
        self.build(LayoutGraph::default())
    }

    /// Build a simulator from the topology of any petgraph graph.
    ///
    /// Nodes get unit mass and a deterministic scattered start position;
    /// edges get default springs.
    pub fn build_topology<N, E, Ty: EdgeType>(
        self,
        graph: &petgraph::Graph<N, E, Ty>,
    ) -> Simulator {
        let mut rng = StdRng::seed_from_u64(self.settings.barnes_hut.seed);
        let spread = 100.0 * (graph.node_count() as f32).sqrt().max(1.0);
        let mut layout = LayoutGraph::with_capacity(graph.node_count(), graph.edge_count());
        let nodes: Vec<NodeIndex> = graph
            .node_indices()
            .map(|_| {
                layout.add_node(NodeBody::new(Vec2::new(
                    rng.gen_range(-spread..=spread),
                    rng.gen_range(-spread..=spread),
                )))
            })
            .collect();
        for edge in graph.edge_references() {
            layout.add_edge(
                nodes[edge.source().index()],
                nodes[edge.target().index()],
                Spring::default(),
            );
        }
        self.build(layout)
    }
}

/// Force-directed layout simulation over a graph.
pub struct Simulator {
    graph: LayoutGraph,
    settings: PhysicsSettings,
    /// Per-node force accumulator, indexed by `NodeIndex::index`.
    forces: Vec<Vec2>,
    phase: Phase,
    /// Consecutive steps with every node below the freeze threshold.
    settled_steps: u32,
    cancelled: bool,
    barnes_hut: TreeRepulsion<BarnesHutLaw>,
    force_atlas2: TreeRepulsion<ForceAtlas2Law>,
    repulsion: Repulsion,
    hierarchical_repulsion: HierarchicalRepulsion,
    /// Jitter source for the per-step tree rebuild.
    tree_rng: StdRng,
}

impl Simulator {
    pub fn builder() -> SimulatorBuilder {
        SimulatorBuilder::new()
    }

    fn from_parts(graph: LayoutGraph, settings: PhysicsSettings) -> Self {
        let forces = vec![Vec2::ZERO; graph.node_bound()];
        let mut simulator = Self {
            graph,
            settings,
            forces,
            phase: Phase::Idle,
            settled_steps: 0,
            cancelled: false,
            barnes_hut: TreeRepulsion::barnes_hut(&settings.barnes_hut),
            force_atlas2: TreeRepulsion::force_atlas2(&settings.force_atlas2),
            repulsion: Repulsion::new(&settings.repulsion),
            hierarchical_repulsion: HierarchicalRepulsion::new(&settings.hierarchical_repulsion),
            tree_rng: StdRng::seed_from_u64(settings.barnes_hut.seed),
        };
        simulator.rebuild_solvers();
        simulator
    }

    fn rebuild_solvers(&mut self) {
        self.barnes_hut = TreeRepulsion::barnes_hut(&self.settings.barnes_hut);
        self.force_atlas2 = TreeRepulsion::force_atlas2(&self.settings.force_atlas2);
        self.repulsion = Repulsion::new(&self.settings.repulsion);
        self.hierarchical_repulsion =
            HierarchicalRepulsion::new(&self.settings.hierarchical_repulsion);
        let tree_seed = match self.settings.solver {
            SolverKind::ForceAtlas2Based => self.settings.force_atlas2.seed,
            _ => self.settings.barnes_hut.seed,
        };
        self.tree_rng = StdRng::seed_from_u64(tree_seed);
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_stabilized(&self) -> bool {
        self.phase == Phase::Stabilized
    }

    /// Request a cooperative stop; observed at the top of the next step.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    /// Replace the configuration and resume the loop.
    pub fn set_settings(&mut self, settings: PhysicsSettings) {
        self.settings = settings;
        self.rebuild_solvers();
        self.wake();
    }

    /// Switch the repulsion model, keeping all other parameters.
    pub fn set_solver(&mut self, solver: SolverKind) {
        debug!("switching repulsion solver to {solver:?}");
        self.settings.solver = solver;
        self.rebuild_solvers();
        self.wake();
    }

    pub fn graph(&self) -> &LayoutGraph {
        &self.graph
    }

    pub(crate) fn graph_mut(&mut self) -> &mut LayoutGraph {
        &mut self.graph
    }

    pub fn node(&self, id: NodeIndex) -> Option<&NodeBody> {
        self.graph.node_weight(id)
    }

    pub fn add_node(&mut self, body: NodeBody) -> NodeIndex {
        let id = self.graph.add_node(body);
        self.wake();
        id
    }

    pub fn remove_node(&mut self, id: NodeIndex) -> Option<NodeBody> {
        let body = self.graph.remove_node(id);
        if body.is_some() {
            self.wake();
        }
        body
    }

    pub fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, spring: Spring) -> EdgeIndex {
        let id = self.graph.add_edge(source, target, spring);
        self.wake();
        id
    }

    pub fn remove_edge(&mut self, id: EdgeIndex) -> Option<Spring> {
        let spring = self.graph.remove_edge(id);
        if spring.is_some() {
            self.wake();
        }
        spring
    }

    /// Read-only snapshot of the current node positions.
    pub fn positions(&self) -> impl Iterator<Item = (NodeIndex, Vec2)> + '_ {
        self.graph
            .node_indices()
            .map(|id| (id, self.graph[id].position))
    }

    /// Read-only snapshot of the current edge endpoints.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeIndex, NodeIndex, NodeIndex)> + '_ {
        self.graph.edge_indices().filter_map(|id| {
            self.graph
                .edge_endpoints(id)
                .map(|(source, target)| (id, source, target))
        })
    }

    /// Pin a node under the cursor: the integrator leaves it alone until
    /// [`Simulator::end_drag`].
    pub fn begin_drag(&mut self, id: NodeIndex, position: Vec2) {
        if let Some(node) = self.graph.node_weight_mut(id) {
            node.fixed = true;
            node.velocity = Vec2::ZERO;
            node.position = position;
            debug!("[{}] drag start", id.index());
            self.wake();
        }
    }

    /// Move a pinned node to the cursor position.
    pub fn update_drag(&mut self, id: NodeIndex, position: Vec2) {
        if let Some(node) = self.graph.node_weight_mut(id) {
            if node.fixed {
                node.position = position;
                self.wake();
            }
        }
    }

    /// Release a pinned node with no residual momentum.
    pub fn end_drag(&mut self, id: NodeIndex) {
        if let Some(node) = self.graph.node_weight_mut(id) {
            node.fixed = false;
            node.velocity = Vec2::ZERO;
            debug!("[{}] drag end", id.index());
            self.wake();
        }
    }

    /// Resume the loop after a topology or configuration change.
    pub(crate) fn wake(&mut self) {
        self.phase = Phase::Running;
        self.settled_steps = 0;
        self.cancelled = false;
        self.sync_capacity();
    }

    fn sync_capacity(&mut self) {
        self.forces.resize(self.graph.node_bound(), Vec2::ZERO);
    }

    /// Advance the simulation by one step.
    ///
    /// This is the frame-clock entry point; it is a no-op while the loop is
    /// stabilized or cancelled.
    pub fn step(&mut self) -> Phase {
        if self.cancelled {
            self.cancelled = false;
            self.phase = Phase::Cancelled;
            debug!("simulation cancelled");
            return self.phase;
        }
        if matches!(self.phase, Phase::Stabilized | Phase::Cancelled) {
            return self.phase;
        }
        self.phase = Phase::Running;
        self.sync_capacity();

        for force in &mut self.forces {
            *force = Vec2::ZERO;
        }
        let degrees = edge_degrees(&self.graph);

        // Repulsion.
        match self.settings.solver {
            SolverKind::BarnesHut => {
                let tree = self.build_tree();
                self.barnes_hut
                    .solve(&self.graph, &tree, &degrees, &mut self.forces);
            }
            SolverKind::ForceAtlas2Based => {
                let tree = self.build_tree();
                self.force_atlas2
                    .solve(&self.graph, &tree, &degrees, &mut self.forces);
            }
            SolverKind::Repulsion => {
                self.repulsion.solve(&self.graph, &mut self.forces);
            }
            SolverKind::HierarchicalRepulsion => {
                self.hierarchical_repulsion.solve(&self.graph, &mut self.forces);
            }
        }

        // Springs.
        match self.settings.solver {
            SolverKind::HierarchicalRepulsion => {
                HierarchicalSpringSolver::new(&self.settings.spring)
                    .solve(&self.graph, &mut self.forces);
            }
            _ => {
                SpringSolver::new(&self.settings.spring).solve(&self.graph, &mut self.forces);
            }
        }

        // Central gravity.
        match self.settings.solver {
            SolverKind::ForceAtlas2Based => {
                ForceAtlas2Gravity::new(&self.settings.central_gravity).solve(
                    &self.graph,
                    &degrees,
                    &mut self.forces,
                );
            }
            _ => {
                CentralGravity::new(&self.settings.central_gravity)
                    .solve(&self.graph, &mut self.forces);
            }
        }

        let max_speed = self.integrate();

        if max_speed < self.settings.min_velocity {
            self.settled_steps += 1;
            if self.settled_steps >= self.settings.stable_steps {
                self.phase = Phase::Stabilized;
                debug!("simulation stabilized after {} settled steps", self.settled_steps);
            }
        } else {
            self.settled_steps = 0;
        }
        self.phase
    }

    /// Run steps until the loop stabilizes or `max_steps` is reached.
    ///
    /// Returns the number of steps executed.
    pub fn run(&mut self, max_steps: usize) -> usize {
        for step in 0..max_steps {
            if self.step() != Phase::Running {
                return step + 1;
            }
        }
        max_steps
    }

    fn build_tree(&mut self) -> QuadTree {
        let graph = &self.graph;
        let rng = &mut self.tree_rng;
        QuadTree::build(
            graph.node_indices().map(|id| {
                let node = &graph[id];
                (id.index(), node.position, node.mass)
            }),
            rng,
        )
    }

    /// Integrate velocity and position; returns the maximum node speed.
    fn integrate(&mut self) -> f32 {
        let timestep = self.settings.timestep;
        let damping = self.settings.damping;
        let max_velocity = self.settings.max_velocity;
        let mut max_speed = 0.0f32;

        let ids: Vec<NodeIndex> = self.graph.node_indices().collect();
        for id in ids {
            let force = self.forces[id.index()];
            let node = &mut self.graph[id];
            if node.fixed {
                node.velocity = Vec2::ZERO;
                continue;
            }
            let acceleration = force / node.effective_mass();
            let mut velocity = (node.velocity + acceleration * timestep) * (1.0 - damping);
            let speed = velocity.length();
            if speed > max_velocity {
                velocity *= max_velocity / speed;
            }
            node.velocity = velocity;
            node.position += velocity * timestep;
            max_speed = max_speed.max(velocity.length());
        }
        max_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::BarnesHutSettings;

    fn quiet_settings() -> PhysicsSettings {
        // No forces at all: useful for exercising the loop machinery.
        let mut settings = PhysicsSettings::default();
        settings.barnes_hut.gravitational_constant = 0.0;
        settings.central_gravity.central_gravity = 0.0;
        settings.spring.spring_constant = 0.0;
        settings
    }

    #[test]
    fn empty_graph_stabilizes() {
        let mut simulator = SimulatorBuilder::new().build_empty();
        let steps = simulator.run(100);
        assert!(simulator.is_stabilized());
        assert_eq!(steps as u32, simulator.settings().stable_steps);
    }

    #[test]
    fn cancel_is_observed_before_the_next_step() {
        let mut simulator = SimulatorBuilder::new().build_empty();
        simulator.add_node(NodeBody::new(Vec2::new(100.0, 0.0)));
        simulator.cancel();
        assert_eq!(simulator.step(), Phase::Cancelled);
        // Still cancelled: no work happens.
        assert_eq!(simulator.step(), Phase::Cancelled);
        // A topology change resumes the loop.
        simulator.add_node(NodeBody::new(Vec2::new(-100.0, 0.0)));
        assert_eq!(simulator.step(), Phase::Running);
    }

    #[test]
    fn velocity_is_capped() {
        let mut settings = quiet_settings();
        settings.barnes_hut = BarnesHutSettings {
            gravitational_constant: -1e9,
            ..BarnesHutSettings::default()
        };
        let mut simulator = SimulatorBuilder::new().settings(settings).build_empty();
        let a = simulator.add_node(NodeBody::new(Vec2::ZERO));
        simulator.add_node(NodeBody::new(Vec2::new(1.0, 0.0)));
        let before = simulator.node(a).unwrap().position;
        simulator.step();
        let after = simulator.node(a).unwrap().position;
        let limit = simulator.settings().max_velocity * simulator.settings().timestep;
        assert!(before.distance(after) <= limit + 1e-3);
    }

    #[test]
    fn dragged_node_is_pinned_and_released_without_momentum() {
        let mut simulator = SimulatorBuilder::new().settings(quiet_settings()).build_empty();
        let a = simulator.add_node(NodeBody::new(Vec2::ZERO));
        let b = simulator.add_node(NodeBody::new(Vec2::new(10.0, 0.0)));
        simulator.add_edge(a, b, Spring::default());

        simulator.begin_drag(a, Vec2::new(500.0, 500.0));
        simulator.step();
        assert_eq!(simulator.node(a).unwrap().position, Vec2::new(500.0, 500.0));
        assert!(simulator.node(a).unwrap().fixed);

        simulator.update_drag(a, Vec2::new(400.0, 400.0));
        simulator.step();
        assert_eq!(simulator.node(a).unwrap().position, Vec2::new(400.0, 400.0));

        simulator.end_drag(a);
        assert!(!simulator.node(a).unwrap().fixed);
        assert_eq!(simulator.node(a).unwrap().velocity, Vec2::ZERO);
        assert_eq!(simulator.phase(), Phase::Running);
    }

    #[test]
    fn removal_survives_stable_handles() {
        let mut simulator = SimulatorBuilder::new().settings(quiet_settings()).build_empty();
        let a = simulator.add_node(NodeBody::new(Vec2::ZERO));
        let b = simulator.add_node(NodeBody::new(Vec2::new(10.0, 0.0)));
        let c = simulator.add_node(NodeBody::new(Vec2::new(20.0, 0.0)));
        simulator.remove_node(b);
        simulator.step();
        assert!(simulator.node(a).is_some());
        assert!(simulator.node(b).is_none());
        assert_eq!(simulator.node(c).unwrap().position.x, 20.0);
    }

    #[test]
    fn topology_change_resumes_a_stabilized_loop() {
        let mut simulator = SimulatorBuilder::new().settings(quiet_settings()).build_empty();
        simulator.add_node(NodeBody::new(Vec2::new(5.0, 5.0)));
        simulator.run(100);
        assert!(simulator.is_stabilized());

        simulator.add_node(NodeBody::new(Vec2::new(-5.0, -5.0)));
        assert_eq!(simulator.phase(), Phase::Running);
    }

    #[test]
    fn builder_topology_scatters_deterministically() {
        let mut graph = petgraph::Graph::<(), ()>::new();
        let a = graph.add_node(());
        let b = graph.add_node(());
        graph.add_edge(a, b, ());

        let first = SimulatorBuilder::new().seed(9).build_topology(&graph);
        let second = SimulatorBuilder::new().seed(9).build_topology(&graph);
        let lhs: Vec<_> = first.positions().collect();
        let rhs: Vec<_> = second.positions().collect();
        assert_eq!(lhs, rhs);
        assert_ne!(lhs[0].1, lhs[1].1);
    }
}
