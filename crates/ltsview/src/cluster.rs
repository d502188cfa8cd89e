use std::fmt;

use glam::Vec3;

use mcrl2rust_lts::StateIndex;

/// Addresses a cluster by its rank and its position within that rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterIndex {
    pub rank: usize,
    pub position: usize,
}

impl ClusterIndex {
    pub fn new(rank: usize, position: usize) -> ClusterIndex {
        ClusterIndex { rank, position }
    }
}

impl fmt::Display for ClusterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.rank, self.position)
    }
}

/// A group of states of the same rank, the unit of the spatial layout. The
/// clusters form a tree in which the descendants of a cluster are in the next
/// rank.
#[derive(Clone, Debug, PartialEq)]
pub struct Cluster {
    pub(crate) rank: usize,
    pub(crate) position_in_rank: usize,

    pub(crate) states: Vec<StateIndex>,
    pub(crate) ancestor: Option<ClusterIndex>,
    pub(crate) descendants: Vec<ClusterIndex>,

    pub(crate) top_radius: f32,
    pub(crate) base_radius: f32,
    pub(crate) bc_radius: f32,
    pub(crate) bc_height: f32,

    // Angle in degrees on the base circle of the ancestor, negative when centered.
    pub(crate) position: f32,

    // Absolute centre of the top disk and the accumulated rotation of the cluster frame.
    pub(crate) position_abs: Vec3,
    pub(crate) rotation: f32,

    pub(crate) info: ClusterInfo,
    pub(crate) selected: bool,
}

/// Aggregate counts that are computed bottom-up by `compute_cluster_info`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterInfo {
    /// The number of deadlock states in this cluster.
    pub num_deadlocks: usize,

    /// The number of states in the subtree rooted in this cluster.
    pub num_subtree_states: usize,

    /// The number of deadlock states in the subtree rooted in this cluster.
    pub num_subtree_deadlocks: usize,

    /// The number of clusters in the subtree rooted in this cluster.
    pub num_subtree_clusters: usize,
}

impl Cluster {
    pub(crate) fn new(rank: usize, position_in_rank: usize, states: Vec<StateIndex>) -> Cluster {
        Cluster {
            rank,
            position_in_rank,
            states,
            ancestor: None,
            descendants: Vec::new(),
            top_radius: 0.0,
            base_radius: 0.0,
            bc_radius: 0.0,
            bc_height: 0.0,
            position: -1.0,
            position_abs: Vec3::ZERO,
            rotation: 0.0,
            info: ClusterInfo::default(),
            selected: false,
        }
    }

    pub fn index(&self) -> ClusterIndex {
        ClusterIndex::new(self.rank, self.position_in_rank)
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn position_in_rank(&self) -> usize {
        self.position_in_rank
    }

    pub fn states(&self) -> &[StateIndex] {
        &self.states
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn ancestor(&self) -> Option<ClusterIndex> {
        self.ancestor
    }

    pub fn descendants(&self) -> &[ClusterIndex] {
        &self.descendants
    }

    pub fn has_descendants(&self) -> bool {
        !self.descendants.is_empty()
    }

    /// Returns the descendants that are not severed, this is used to pretend
    /// that some descendants do not exist without modifying the tree.
    pub fn active_descendants<'a>(&'a self, severed: &'a [ClusterIndex]) -> impl Iterator<Item = ClusterIndex> + 'a {
        self.descendants.iter().copied().filter(move |index| !severed.contains(index))
    }

    pub fn top_radius(&self) -> f32 {
        self.top_radius
    }

    pub fn base_radius(&self) -> f32 {
        self.base_radius
    }

    /// The radius of the bounding cylinder of the subtree rooted in this cluster.
    pub fn bc_radius(&self) -> f32 {
        self.bc_radius
    }

    /// The height of the bounding cylinder of the subtree rooted in this cluster.
    pub fn bc_height(&self) -> f32 {
        self.bc_height
    }

    /// The angle in degrees on the base circle of the ancestor.
    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn is_centered(&self) -> bool {
        self.position < -0.9
    }

    pub fn position_abs(&self) -> Vec3 {
        self.position_abs
    }

    /// The rotation in degrees of the frame of this cluster, which is the sum
    /// of the positions on the path from the root.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn info(&self) -> &ClusterInfo {
        &self.info
    }

    pub fn has_deadlock(&self) -> bool {
        self.info.num_deadlocks > 0
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_descendants() {
        let mut cluster = Cluster::new(0, 0, vec![0]);
        cluster.descendants = vec![ClusterIndex::new(1, 0), ClusterIndex::new(1, 1), ClusterIndex::new(1, 2)];

        let severed = [ClusterIndex::new(1, 1)];
        let active: Vec<ClusterIndex> = cluster.active_descendants(&severed).collect();
        assert_eq!(active, vec![ClusterIndex::new(1, 0), ClusterIndex::new(1, 2)]);
        assert!(cluster.is_centered());
    }
}
