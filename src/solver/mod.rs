//! Force solvers.
//!
//! Every solver adds into the shared per-node force accumulator; the
//! simulation loop decides which combination runs each step.

mod barnes_hut;
mod central_gravity;
mod hierarchical_repulsion;
mod hierarchical_spring;
mod repulsion;
mod spring;

pub use barnes_hut::{BarnesHutLaw, ForceAtlas2Law, RepulsionLaw, TreeRepulsion};
pub use central_gravity::{CentralGravity, ForceAtlas2Gravity};
pub use hierarchical_repulsion::HierarchicalRepulsion;
pub use hierarchical_spring::HierarchicalSpringSolver;
pub use repulsion::Repulsion;
pub use spring::SpringSolver;

use petgraph::visit::{EdgeRef, IntoEdgeReferences, NodeIndexable};

use crate::graph::LayoutGraph;

/// Edge degree per node slot, used by the degree-weighted force laws.
///
/// A self-loop counts as one degree, not two.
pub(crate) fn edge_degrees(graph: &LayoutGraph) -> Vec<u32> {
    let mut degrees = vec![0; graph.node_bound()];
    for edge in graph.edge_references() {
        degrees[edge.source().index()] += 1;
        if edge.source() != edge.target() {
            degrees[edge.target().index()] += 1;
        }
    }
    degrees
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeBody, Spring};
    use glam::Vec2;

    #[test]
    fn degrees_count_both_endpoints() {
        let mut graph = LayoutGraph::default();
        let a = graph.add_node(NodeBody::new(Vec2::ZERO));
        let b = graph.add_node(NodeBody::new(Vec2::ZERO));
        let c = graph.add_node(NodeBody::new(Vec2::ZERO));
        graph.add_edge(a, b, Spring::default());
        graph.add_edge(a, c, Spring::default());

        let degrees = edge_degrees(&graph);
        assert_eq!(degrees[a.index()], 2);
        assert_eq!(degrees[b.index()], 1);
        assert_eq!(degrees[c.index()], 1);
    }

    #[test]
    fn self_loop_counts_as_one_degree() {
        let mut graph = LayoutGraph::default();
        let a = graph.add_node(NodeBody::new(Vec2::ZERO));
        let b = graph.add_node(NodeBody::new(Vec2::ZERO));
        graph.add_edge(a, a, Spring::default());
        graph.add_edge(a, b, Spring::default());

        let degrees = edge_degrees(&graph);
        assert_eq!(degrees[a.index()], 2);
        assert_eq!(degrees[b.index()], 1);
    }
}
