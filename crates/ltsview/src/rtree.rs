use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::ops::Range;

use glam::Vec2;

/// The maximum number of children of a node.
const NODE_CAPACITY: usize = 16;

#[derive(Clone, Debug)]
struct Entry<T> {
    point: Vec2,
    data: T,
    removed: bool,
    leaf: usize,
}

#[derive(Clone, Debug)]
struct Node {
    min: Vec2,
    max: Vec2,

    /// A range in `leaf_items` for leaves, otherwise a range in `nodes`.
    children: Range<usize>,
    is_leaf: bool,
    parent: Option<usize>,

    /// The number of entries in this subtree that have not been removed.
    live: usize,
}

impl Node {
    /// The squared distance from the point to the bounding box of this node.
    fn distance_squared(&self, point: Vec2) -> f32 {
        let closest = point.clamp(self.min, self.max);
        closest.distance_squared(point)
    }
}

/// A static R-tree over points that is bulk loaded with the sort-tile-recursive
/// method. Entries cannot be inserted afterwards, but they can be removed,
/// which makes it suitable to repeatedly claim the nearest free slot.
#[derive(Clone, Debug)]
pub struct PackedRTree<T> {
    entries: Vec<Entry<T>>,
    leaf_items: Vec<usize>,
    nodes: Vec<Node>,
    root: Option<usize>,
}

impl<T> PackedRTree<T> {
    /// Builds the tree for the given points, entries are identified by their
    /// index in the input.
    pub fn new(items: impl IntoIterator<Item = (Vec2, T)>) -> PackedRTree<T> {
        let entries: Vec<Entry<T>> = items
            .into_iter()
            .map(|(point, data)| Entry {
                point,
                data,
                removed: false,
                leaf: 0,
            })
            .collect();

        let mut tree = PackedRTree {
            leaf_items: (0..entries.len()).collect(),
            entries,
            nodes: Vec::new(),
            root: None,
        };

        if !tree.entries.is_empty() {
            tree.build();
        }

        tree
    }

    /// The number of entries that have not been removed.
    pub fn len(&self) -> usize {
        self.root.map_or(0, |root| self.nodes[root].live)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data(&self, entry: usize) -> &T {
        &self.entries[entry].data
    }

    /// Returns the entry that is nearest to the given point and has not been
    /// removed. Among entries at the same distance the lowest index is returned.
    pub fn nearest(&self, point: Vec2) -> Option<usize> {
        let root = self.root?;
        if self.nodes[root].live == 0 {
            return None;
        }

        let mut queue = BinaryHeap::new();
        queue.push(Candidate {
            distance: self.nodes[root].distance_squared(point),
            kind: CandidateKind::Node,
            index: root,
        });

        while let Some(candidate) = queue.pop() {
            match candidate.kind {
                CandidateKind::Entry => return Some(candidate.index),
                CandidateKind::Node => {
                    let node = &self.nodes[candidate.index];
                    if node.is_leaf {
                        for entry in &self.leaf_items[node.children.clone()] {
                            let entry_data = &self.entries[*entry];
                            if !entry_data.removed {
                                queue.push(Candidate {
                                    distance: entry_data.point.distance_squared(point),
                                    kind: CandidateKind::Entry,
                                    index: *entry,
                                });
                            }
                        }
                    } else {
                        for child in node.children.clone() {
                            if self.nodes[child].live > 0 {
                                queue.push(Candidate {
                                    distance: self.nodes[child].distance_squared(point),
                                    kind: CandidateKind::Node,
                                    index: child,
                                });
                            }
                        }
                    }
                }
            }
        }

        None
    }

    /// Removes the given entry, returns false when it was already removed.
    pub fn remove(&mut self, entry: usize) -> bool {
        if self.entries[entry].removed {
            return false;
        }

        self.entries[entry].removed = true;
        let mut current = Some(self.entries[entry].leaf);
        while let Some(index) = current {
            self.nodes[index].live -= 1;
            current = self.nodes[index].parent;
        }

        true
    }

    /// Creates the nodes level by level, the root is the last node.
    fn build(&mut self) {
        // Sort the entries into vertical slices, and every slice from bottom to top.
        let points: Vec<Vec2> = self.entries.iter().map(|entry| entry.point).collect();
        sort_tiles(&mut self.leaf_items, |index| points[*index]);

        let mut level: Vec<usize> = Vec::new();
        for (chunk_index, chunk) in self.leaf_items.chunks(NODE_CAPACITY).enumerate() {
            let start = chunk_index * NODE_CAPACITY;
            let (min, max) = bounds(chunk.iter().map(|index| points[*index]));

            let node = self.nodes.len();
            for index in chunk {
                self.entries[*index].leaf = node;
            }

            self.nodes.push(Node {
                min,
                max,
                children: start..start + chunk.len(),
                is_leaf: true,
                parent: None,
                live: chunk.len(),
            });
            level.push(node);
        }

        while level.len() > 1 {
            let mut next_level = Vec::new();

            // The nodes of a level are contiguous, so every chunk is a range.
            for chunk in level.chunks(NODE_CAPACITY) {
                let first = chunk[0];
                let last = chunk[chunk.len() - 1];
                let (min, max) = bounds(
                    chunk
                        .iter()
                        .flat_map(|child| [self.nodes[*child].min, self.nodes[*child].max]),
                );
                let live = chunk.iter().map(|child| self.nodes[*child].live).sum();

                let node = self.nodes.len();
                for child in chunk {
                    self.nodes[*child].parent = Some(node);
                }

                self.nodes.push(Node {
                    min,
                    max,
                    children: first..last + 1,
                    is_leaf: false,
                    parent: None,
                    live,
                });
                next_level.push(node);
            }

            level = next_level;
        }

        self.root = level.first().copied();
    }
}

/// Orders the items such that consecutive chunks of `NODE_CAPACITY` items are
/// spatially close.
fn sort_tiles<F>(items: &mut [usize], point: F)
where
    F: Fn(&usize) -> Vec2,
{
    let num_leaves = items.len().div_ceil(NODE_CAPACITY);
    let num_slices = (num_leaves as f64).sqrt().ceil().max(1.0) as usize;
    let slice_size = num_slices * NODE_CAPACITY;

    items.sort_by(|a, b| point(a).x.total_cmp(&point(b).x).then(a.cmp(b)));
    for slice in items.chunks_mut(slice_size) {
        slice.sort_by(|a, b| point(a).y.total_cmp(&point(b).y).then(a.cmp(b)));
    }
}

/// The bounding box of the given points.
fn bounds(points: impl Iterator<Item = Vec2>) -> (Vec2, Vec2) {
    points.fold((Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)), |(min, max), point| {
        (min.min(point), max.max(point))
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum CandidateKind {
    Node,
    Entry,
}

/// An element of the best-first search queue.
#[derive(Debug)]
struct Candidate {
    distance: f32,
    kind: CandidateKind,
    index: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed, the queue is a max-heap. Nodes are expanded before entries
        // at the same distance so that ties are resolved by the entry index.
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.kind.cmp(&self.kind))
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}
