//! Square-region quadtree with per-branch mass aggregation.
//!
//! Rebuilt from scratch every simulation step; branches live in a flat
//! arena and reference each other by index, so a rebuild is a couple of
//! `Vec` allocations rather than a pointer chase.

use glam::Vec2;
use log::warn;
use rand::rngs::StdRng;
use rand::Rng;

/// Branches below this size stay leaves; an incoming node is dropped from
/// their contribution instead of splitting further.
const MIN_SPLIT_SIZE: f32 = 1e-6;

/// Bounding boxes with a smaller extent get a synthesized default square.
const MIN_REGION_SIZE: f32 = 1e-5;

/// Side length of the square synthesized around a degenerate bounding box.
const DEFAULT_REGION_SIZE: f32 = 1.0;

/// Item id passed to [`QuadTree::approximations`] when the queried position
/// does not belong to a node in the tree.
pub const NO_NODE: usize = usize::MAX;

/// A square region in 2D space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox2D {
    pub center: Vec2,
    /// Side length of the square.
    pub size: f32,
}

impl BoundingBox2D {
    /// Quadrant of `pos` relative to the midpoint; ties resolve west/north.
    fn quadrant(&self, pos: Vec2) -> usize {
        match (self.center.x < pos.x, self.center.y < pos.y) {
            (false, false) => 0, // NW
            (true, false) => 1,  // NE
            (false, true) => 2,  // SW
            (true, true) => 3,   // SE
        }
    }

    fn child(&self, quadrant: usize) -> BoundingBox2D {
        let offset = self.size * 0.25;
        let center = match quadrant {
            0 => self.center + Vec2::new(-offset, -offset),
            1 => self.center + Vec2::new(offset, -offset),
            2 => self.center + Vec2::new(-offset, offset),
            _ => self.center + Vec2::new(offset, offset),
        };
        BoundingBox2D {
            center,
            size: self.size * 0.5,
        }
    }
}

/// Aggregated point mass produced by the approximation walk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointMass {
    pub position: Vec2,
    pub mass: f32,
}

#[derive(Clone, Copy)]
struct Item {
    position: Vec2,
    mass: f32,
    /// Arena slot of the node this item was built from.
    node: usize,
}

#[derive(Clone, Copy)]
enum BranchKind {
    Empty,
    Leaf(u32),
    Internal([u32; 4]),
}

struct Branch {
    region: BoundingBox2D,
    mass: f32,
    center_of_mass: Vec2,
    /// Cached `1 / size`, used by the acceptance test.
    size_inv: f32,
    kind: BranchKind,
}

impl Branch {
    fn new(region: BoundingBox2D) -> Self {
        Self {
            region,
            mass: 0.0,
            center_of_mass: region.center,
            size_inv: 1.0 / region.size,
            kind: BranchKind::Empty,
        }
    }
}

/// Spatial index over all nodes with positive mass.
pub struct QuadTree {
    branches: Vec<Branch>,
    items: Vec<Item>,
}

impl QuadTree {
    /// Build a fresh tree over `(node slot, position, mass)` triples.
    ///
    /// Entries with a non-positive mass are skipped. Coincident positions
    /// are jittered (on the tree's copy only) with `rng` so they separate
    /// into distinct quadrants.
    pub fn build<I>(nodes: I, rng: &mut StdRng) -> Self
    where
        I: IntoIterator<Item = (usize, Vec2, f32)>,
    {
        let items: Vec<Item> = nodes
            .into_iter()
            .filter(|&(_, _, mass)| mass > 0.0)
            .map(|(node, position, mass)| Item {
                position,
                mass,
                node,
            })
            .collect();

        let region = Self::bounding_square(&items);
        let mut tree = Self {
            branches: vec![Branch::new(region)],
            items,
        };
        for item in 0..tree.items.len() as u32 {
            tree.insert(0, item, rng);
        }
        tree
    }

    /// Smallest square containing every item, with degenerate extents
    /// replaced by a minimal default square.
    fn bounding_square(items: &[Item]) -> BoundingBox2D {
        let mut min = Vec2::splat(f32::MAX);
        let mut max = Vec2::splat(f32::MIN);
        for item in items {
            min = min.min(item.position);
            max = max.max(item.position);
        }
        if items.is_empty() {
            min = Vec2::ZERO;
            max = Vec2::ZERO;
        }

        // Pad the shorter axis symmetrically until the region is square.
        let extent = max - min;
        let diff = (extent.x - extent.y) * 0.5;
        if diff > 0.0 {
            min.y -= diff;
            max.y += diff;
        } else {
            min.x += diff;
            max.x -= diff;
        }

        let mut size = (max.x - min.x).abs();
        if size < MIN_REGION_SIZE {
            // One node, or all coincident: give the jitter room to work.
            size = DEFAULT_REGION_SIZE;
        }
        BoundingBox2D {
            center: (min + max) * 0.5,
            size,
        }
    }

    fn insert(&mut self, branch: u32, item: u32, rng: &mut StdRng) {
        self.add_mass(branch, item);
        self.place(branch, item, rng);
    }

    /// Route `item` into `branch` without touching the branch's own mass
    /// aggregate (used when re-inserting the occupant of a split leaf).
    fn place(&mut self, branch: u32, item: u32, rng: &mut StdRng) {
        let region = self.branches[branch as usize].region;
        match self.branches[branch as usize].kind {
            BranchKind::Empty => {
                self.branches[branch as usize].kind = BranchKind::Leaf(item);
            }
            BranchKind::Internal(children) => {
                let quadrant = region.quadrant(self.items[item as usize].position);
                self.insert(children[quadrant], item, rng);
            }
            BranchKind::Leaf(occupant) => {
                if region.size < MIN_SPLIT_SIZE {
                    // Accuracy degradation, not an error: the region cannot
                    // split further, so the item only counts towards the
                    // ancestors' aggregates.
                    warn!(
                        "quadtree branch below minimum size, dropping node {} from its contribution",
                        self.items[item as usize].node
                    );
                    return;
                }

                if self.items[item as usize].position == self.items[occupant as usize].position {
                    self.jitter(item, region.size, rng);
                }

                let first = self.branches.len() as u32;
                for quadrant in 0..4 {
                    self.branches.push(Branch::new(region.child(quadrant)));
                }
                self.branches[branch as usize].kind =
                    BranchKind::Internal([first, first + 1, first + 2, first + 3]);

                // The occupant's mass already counts towards this branch.
                self.place(branch, occupant, rng);
                self.place(branch, item, rng);
            }
        }
    }

    /// Perturb the tree's copy of an item by up to 1% of the branch size.
    fn jitter(&mut self, item: u32, size: f32, rng: &mut StdRng) {
        let offset = Vec2::new(
            rng.gen_range(-0.01..=0.01) * size,
            rng.gen_range(-0.01..=0.01) * size,
        );
        self.items[item as usize].position += offset;
    }

    fn add_mass(&mut self, branch: u32, item: u32) {
        let Item { position, mass, .. } = self.items[item as usize];
        let branch = &mut self.branches[branch as usize];
        let total = branch.mass + mass;
        if total <= 0.0 {
            // Keeps the prior aggregate instead of dividing by zero.
            return;
        }
        branch.center_of_mass =
            (branch.center_of_mass * branch.mass + position * mass) / total;
        branch.mass = total;
    }

    /// Total mass aggregated at the root.
    pub fn total_mass(&self) -> f32 {
        self.branches[0].mass
    }

    /// The (squared) region covered by the root branch.
    pub fn region(&self) -> BoundingBox2D {
        self.branches[0].region
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The tree's (possibly jittered) copy of each indexed node position.
    pub fn positions(&self) -> impl Iterator<Item = (usize, Vec2)> + '_ {
        self.items.iter().map(|item| (item.node, item.position))
    }

    /// Walk the tree from `pos`, yielding point masses to compute forces
    /// against.
    ///
    /// A branch whose size over distance ratio is below `theta` is treated
    /// as a single point mass at its center of mass; otherwise its children
    /// are visited. The leaf holding `skip` is excluded so a node never
    /// repels itself; pass [`NO_NODE`] to keep every leaf.
    pub fn approximations(&self, pos: Vec2, theta: f32, skip: usize) -> Approximations<'_> {
        let theta_inv = if theta > 0.0 { 1.0 / theta } else { f32::INFINITY };
        Approximations {
            tree: self,
            pos,
            theta_inv,
            skip,
            stack: if self.items.is_empty() { Vec::new() } else { vec![0] },
        }
    }
}

/// Iterator over the point-mass approximations seen from one position.
pub struct Approximations<'a> {
    tree: &'a QuadTree,
    pos: Vec2,
    theta_inv: f32,
    skip: usize,
    stack: Vec<u32>,
}

impl Iterator for Approximations<'_> {
    type Item = PointMass;

    fn next(&mut self) -> Option<PointMass> {
        while let Some(id) = self.stack.pop() {
            let branch = &self.tree.branches[id as usize];
            match branch.kind {
                BranchKind::Empty => {}
                BranchKind::Leaf(item) => {
                    let item = &self.tree.items[item as usize];
                    if item.node != self.skip {
                        return Some(PointMass {
                            position: item.position,
                            mass: item.mass,
                        });
                    }
                }
                BranchKind::Internal(children) => {
                    let distance = (branch.center_of_mass - self.pos).length();
                    if distance * branch.size_inv > self.theta_inv {
                        return Some(PointMass {
                            position: branch.center_of_mass,
                            mass: branch.mass,
                        });
                    }
                    self.stack.extend_from_slice(&children);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn empty_tree_yields_nothing() {
        let tree = QuadTree::build(std::iter::empty(), &mut rng());
        assert!(tree.is_empty());
        assert_eq!(tree.total_mass(), 0.0);
        assert_eq!(
            tree.approximations(Vec2::new(1.0, 2.0), 0.5, NO_NODE).count(),
            0
        );
    }

    #[test]
    fn mass_is_conserved_at_the_root() {
        let nodes = vec![
            (0, Vec2::new(-10.0, 4.0), 1.0),
            (1, Vec2::new(25.0, -3.0), 2.0),
            (2, Vec2::new(3.0, 17.0), 0.5),
            (3, Vec2::new(-8.0, -12.0), 4.0),
            (4, Vec2::new(0.1, 0.2), 0.0), // massless, excluded
        ];
        let tree = QuadTree::build(nodes.clone(), &mut rng());
        let expected: f32 = nodes
            .iter()
            .filter(|&&(_, _, m)| m > 0.0)
            .map(|&(_, _, m)| m)
            .sum();
        assert!((tree.total_mass() - expected).abs() < 1e-4);
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn center_of_mass_is_the_weighted_centroid() {
        let nodes = vec![
            (0, Vec2::new(0.0, 0.0), 1.0),
            (1, Vec2::new(10.0, 0.0), 3.0),
        ];
        let tree = QuadTree::build(nodes, &mut rng());
        // Far away, the whole tree collapses into one approximation.
        let all: Vec<_> = tree
            .approximations(Vec2::new(10_000.0, 0.0), 0.5, NO_NODE)
            .collect();
        assert_eq!(all.len(), 1);
        assert!((all[0].mass - 4.0).abs() < 1e-5);
        assert!((all[0].position.x - 7.5).abs() < 1e-3);
        assert!(all[0].position.y.abs() < 1e-3);
    }

    #[test]
    fn theta_zero_visits_every_node() {
        let nodes: Vec<_> = (0..16)
            .map(|i| (i, Vec2::new(i as f32 * 3.0, (i % 4) as f32 * 5.0), 1.0))
            .collect();
        let tree = QuadTree::build(nodes, &mut rng());
        let seen = tree
            .approximations(Vec2::new(-100.0, -100.0), 0.0, NO_NODE)
            .count();
        assert_eq!(seen, 16);
    }

    #[test]
    fn own_leaf_is_skipped() {
        let nodes = vec![
            (0, Vec2::new(0.0, 0.0), 1.0),
            (1, Vec2::new(50.0, 0.0), 1.0),
        ];
        let tree = QuadTree::build(nodes, &mut rng());
        let seen: Vec<_> = tree
            .approximations(Vec2::new(0.0, 0.0), 0.0, 0)
            .collect();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].position, Vec2::new(50.0, 0.0));
    }

    #[test]
    fn coincident_nodes_end_up_in_distinct_positions() {
        let nodes = vec![
            (0, Vec2::new(5.0, 5.0), 1.0),
            (1, Vec2::new(5.0, 5.0), 1.0),
            (2, Vec2::new(-20.0, -20.0), 1.0),
        ];
        let tree = QuadTree::build(nodes, &mut rng());
        let positions: Vec<_> = tree.positions().collect();
        let a = positions.iter().find(|(n, _)| *n == 0).unwrap().1;
        let b = positions.iter().find(|(n, _)| *n == 1).unwrap().1;
        assert_ne!(a, b, "duplicate positions must be jittered apart");
        // Jitter is bounded to ~1% of the branch size.
        assert!(a.distance(Vec2::new(5.0, 5.0)) <= tree.region().size * 0.02);
        // Both leaves are visible from the third node.
        assert_eq!(tree.approximations(Vec2::new(-20.0, -20.0), 0.0, 2).count(), 2);
    }

    #[test]
    fn jitter_is_deterministic_per_seed() {
        let nodes = vec![
            (0, Vec2::new(1.0, 1.0), 1.0),
            (1, Vec2::new(1.0, 1.0), 1.0),
        ];
        let first = QuadTree::build(nodes.clone(), &mut rng());
        let second = QuadTree::build(nodes, &mut rng());
        let a: Vec<_> = first.positions().collect();
        let b: Vec<_> = second.positions().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn single_node_gets_a_minimal_region() {
        let tree = QuadTree::build(vec![(0, Vec2::new(3.0, -2.0), 1.0)], &mut rng());
        assert!(tree.region().size >= MIN_REGION_SIZE);
        assert_eq!(tree.total_mass(), 1.0);
    }
}
