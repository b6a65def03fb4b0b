//! Tunable parameters consumed by the solvers and the integrator.

/// Which repulsion model drives the layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SolverKind {
    /// Quadtree approximated repulsion, inverse-square falloff.
    #[default]
    BarnesHut,
    /// Quadtree approximated repulsion, degree-weighted.
    ForceAtlas2Based,
    /// Direct pairwise repulsion with a piecewise-linear falloff.
    Repulsion,
    /// Direct pairwise repulsion restricted to equal hierarchy levels.
    HierarchicalRepulsion,
}

/// Parameters of the Barnes-Hut repulsion solver.
#[derive(Clone, Copy, Debug)]
pub struct BarnesHutSettings {
    /// How strong nodes should push others away. Negative repels.
    pub gravitational_constant: f32,
    /// How accurate the force calculations should be.
    ///
    /// Towards `0.0` every pair is computed exactly; larger values
    /// approximate whole branches by their center of mass.
    pub theta: f32,
    /// How strongly overlapping nodes are separated, clamped to `0..=1`.
    pub avoid_overlap: f32,
    /// Seed for the zero-distance and duplicate-position jitter.
    pub seed: u64,
}

impl Default for BarnesHutSettings {
    fn default() -> Self {
        Self {
            gravitational_constant: -2000.0,
            theta: 0.5,
            avoid_overlap: 0.0,
            seed: 0xB42_0001,
        }
    }
}

/// Parameters of the ForceAtlas2-style repulsion solver.
#[derive(Clone, Copy, Debug)]
pub struct ForceAtlas2Settings {
    /// How strong nodes should push others away. Negative repels.
    pub gravitational_constant: f32,
    /// How accurate the force calculations should be.
    pub theta: f32,
    /// How strongly overlapping nodes are separated, clamped to `0..=1`.
    pub avoid_overlap: f32,
    /// Seed for the zero-distance and duplicate-position jitter.
    pub seed: u64,
}

impl Default for ForceAtlas2Settings {
    fn default() -> Self {
        Self {
            gravitational_constant: -50.0,
            theta: 0.5,
            avoid_overlap: 0.0,
            seed: 0xB42_0002,
        }
    }
}

/// Parameters of the plain pairwise repulsion solver.
#[derive(Clone, Copy, Debug)]
pub struct RepulsionSettings {
    /// Range of the repulsion. Non-positive values disable the solver.
    pub node_distance: f32,
    /// Seed for the zero-distance jitter.
    pub seed: u64,
}

impl Default for RepulsionSettings {
    fn default() -> Self {
        Self {
            node_distance: 100.0,
            seed: 0xB42_0003,
        }
    }
}

/// Parameters of the level-constrained repulsion solver.
#[derive(Clone, Copy, Debug)]
pub struct HierarchicalRepulsionSettings {
    /// Distance at which the quadratic falloff reaches zero.
    pub node_distance: f32,
    /// Seed for the zero-distance jitter.
    pub seed: u64,
}

impl Default for HierarchicalRepulsionSettings {
    fn default() -> Self {
        Self {
            node_distance: 120.0,
            seed: 0xB42_0004,
        }
    }
}

/// Parameters shared by the spring solvers.
#[derive(Clone, Copy, Debug)]
pub struct SpringSettings {
    /// Length of an edge in neutral position.
    pub spring_length: f32,
    /// How strong the edge force should be.
    pub spring_constant: f32,
    /// Target length of a self-referencing edge; defaults to half the
    /// spring length.
    pub self_reference_length: Option<f32>,
}

impl SpringSettings {
    /// Resolved target length for a self-referencing edge.
    pub fn self_reference_length(&self) -> f32 {
        self.self_reference_length
            .unwrap_or(self.spring_length * 0.5)
    }
}

impl Default for SpringSettings {
    fn default() -> Self {
        Self {
            spring_length: 95.0,
            spring_constant: 0.04,
            self_reference_length: None,
        }
    }
}

/// Parameters of the central gravity solvers.
#[derive(Clone, Copy, Debug)]
pub struct CentralGravitySettings {
    /// How strong the pull towards the origin should be.
    pub central_gravity: f32,
}

impl Default for CentralGravitySettings {
    fn default() -> Self {
        Self {
            central_gravity: 0.3,
        }
    }
}

/// Complete configuration of a layout session.
#[derive(Clone, Copy, Debug)]
pub struct PhysicsSettings {
    /// Selected repulsion model. Also selects the matching gravity and
    /// spring variants.
    pub solver: SolverKind,
    pub barnes_hut: BarnesHutSettings,
    pub force_atlas2: ForceAtlas2Settings,
    pub repulsion: RepulsionSettings,
    pub hierarchical_repulsion: HierarchicalRepulsionSettings,
    pub spring: SpringSettings,
    pub central_gravity: CentralGravitySettings,
    /// How much time a simulation step should simulate.
    pub timestep: f32,
    /// Amount of damping applied to node movement, `0..1`.
    pub damping: f32,
    /// Upper bound on node speed.
    pub max_velocity: f32,
    /// Speed below which a node counts as settled.
    pub min_velocity: f32,
    /// Consecutive settled steps required before the loop stabilizes.
    pub stable_steps: u32,
}

impl PhysicsSettings {
    /// Default parameter set for the given repulsion model.
    ///
    /// The spring, gravity and damping defaults differ per model; these are
    /// the combinations the solvers were tuned with.
    pub fn for_solver(solver: SolverKind) -> Self {
        let mut settings = Self {
            solver,
            barnes_hut: BarnesHutSettings::default(),
            force_atlas2: ForceAtlas2Settings::default(),
            repulsion: RepulsionSettings::default(),
            hierarchical_repulsion: HierarchicalRepulsionSettings::default(),
            spring: SpringSettings::default(),
            central_gravity: CentralGravitySettings::default(),
            timestep: 0.5,
            damping: 0.09,
            max_velocity: 50.0,
            min_velocity: 0.1,
            stable_steps: 5,
        };
        match solver {
            SolverKind::BarnesHut => {}
            SolverKind::ForceAtlas2Based => {
                settings.spring.spring_length = 100.0;
                settings.spring.spring_constant = 0.08;
                settings.central_gravity.central_gravity = 0.01;
                settings.damping = 0.4;
            }
            SolverKind::Repulsion => {
                settings.spring.spring_length = 200.0;
                settings.spring.spring_constant = 0.05;
                settings.central_gravity.central_gravity = 0.2;
            }
            SolverKind::HierarchicalRepulsion => {
                settings.spring.spring_length = 100.0;
                settings.spring.spring_constant = 0.01;
                settings.central_gravity.central_gravity = 0.0;
            }
        }
        settings
    }
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self::for_solver(SolverKind::BarnesHut)
    }
}

/// Main axis orientation of the static hierarchical layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HierarchicalDirection {
    /// Roots at the top, levels grow downwards.
    #[default]
    UpDown,
    /// Roots at the bottom, levels grow upwards.
    DownUp,
    /// Roots at the left, levels grow to the right.
    LeftRight,
    /// Roots at the right, levels grow to the left.
    RightLeft,
}

/// Parameters of the static hierarchical layout.
#[derive(Clone, Copy, Debug)]
pub struct HierarchicalLayoutSettings {
    pub direction: HierarchicalDirection,
    /// Distance between consecutive levels along the main axis.
    pub level_separation: f32,
    /// Distance between neighbouring nodes within a level.
    pub node_spacing: f32,
    /// Mark placed nodes as fixed so the integrator leaves them alone.
    pub pin_placed: bool,
}

impl Default for HierarchicalLayoutSettings {
    fn default() -> Self {
        Self {
            direction: HierarchicalDirection::UpDown,
            level_separation: 150.0,
            node_spacing: 100.0,
            pin_placed: false,
        }
    }
}
