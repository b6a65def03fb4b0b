//! Force-directed 2D graph layout.
//!
//! A simulation moves the nodes of a graph under repulsion, edge springs
//! and central gravity until the layout stabilizes. Repulsion comes in four
//! interchangeable models; a static hierarchical layout covers layered
//! graphs.
//!
//! # Example
//! ```
//! use forcegraph::{Phase, SimulatorBuilder};
//! use petgraph::Directed;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let graph: petgraph::Graph<(), (), Directed> =
//!     petgraph_gen::barabasi_albert_graph(&mut rng, 100, 1, None);
//!
//! let mut simulator = SimulatorBuilder::new()
//!     .delta_time(0.5)
//!     .freeze_threshold(0.1)
//!     .build_topology(&graph);
//!
//! while simulator.step() == Phase::Running {
//!     // draw simulator.positions() ...
//! }
//! assert_eq!(simulator.phase(), Phase::Stabilized);
//! ```

pub mod graph;
pub mod layout;
pub mod quadtree;
pub mod settings;
pub mod simulator;
pub mod solver;

pub use graph::{EdgeIndex, LayoutGraph, NodeBody, NodeIndex, Spring};
pub use layout::{HierarchicalLayout, Placement};
pub use settings::{
    BarnesHutSettings, CentralGravitySettings, ForceAtlas2Settings, HierarchicalDirection,
    HierarchicalLayoutSettings, HierarchicalRepulsionSettings, PhysicsSettings, RepulsionSettings,
    SolverKind, SpringSettings,
};
pub use simulator::{Phase, Simulator, SimulatorBuilder};
