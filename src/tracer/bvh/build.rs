use partition::partition;

use crate::tracer::bvh::aabb::BoundsBox;
use crate::tracer::scene::Triangle;

// candidate split planes at i/SAH_SPLITS for i in 1..SAH_SPLITS
const SAH_SPLITS: usize = 10;
const SAH_TRAVERSAL_COST: f32 = 10.0;
const SAH_TRIANGLE_WEIGHT: f32 = 15.0;

#[derive(Clone, Debug)]
pub enum BuildNodeKind {
    /// Indices into the scene triangle array.
    Leaf { triangles: Vec<usize> },
    /// Arena indices of the two children.
    Internal { child_a: usize, child_b: usize },
}

#[derive(Clone, Debug)]
pub struct BuildNode {
    pub bounds: BoundsBox,
    pub depth: u32,
    pub kind: BuildNodeKind,
}

/// The build-time partition tree: an arena of nodes addressed by index, root
/// at 0. It exists only between scene load and bake; the flattener consumes
/// it and the renderer never sees it.
pub struct BuildTree {
    pub nodes: Vec<BuildNode>,
    triangles_per_leaf: usize,
    max_depth: u32,
}

impl BuildTree {
    pub fn new(bounds: BoundsBox, triangles_per_leaf: usize, max_depth: u32) -> BuildTree {
        BuildTree {
            nodes: vec![BuildNode {
                bounds,
                depth: 0,
                kind: BuildNodeKind::Leaf { triangles: vec![] },
            }],
            // a threshold of zero would split forever before any insert lands
            triangles_per_leaf: triangles_per_leaf.max(2),
            max_depth,
        }
    }

    /// Descends to the leaf whose bounds contain the triangle's centroid and
    /// appends the triangle there. At each internal node the first child is
    /// tested before the second, so a centroid exactly on the split plane
    /// lands in the first child; when neither child contains it (the centroid
    /// fell outside the root bounds) the first child is used as well.
    pub fn insert(&mut self, triangle_idx: usize, triangles: &[Triangle]) {
        let centroid = triangles[triangle_idx].centroid;

        let mut cur = 0;
        loop {
            let (child_a, child_b) = match self.nodes[cur].kind {
                BuildNodeKind::Internal { child_a, child_b } => (child_a, child_b),
                BuildNodeKind::Leaf { .. } => break,
            };
            cur = if self.nodes[child_a].bounds.is_point_inside(centroid) {
                child_a
            } else if self.nodes[child_b].bounds.is_point_inside(centroid) {
                child_b
            } else {
                child_a
            };
        }

        let depth = self.nodes[cur].depth;
        let should_split = match &mut self.nodes[cur].kind {
            BuildNodeKind::Leaf { triangles: list } => {
                list.push(triangle_idx);
                list.len() >= self.triangles_per_leaf && depth < self.max_depth
            }
            BuildNodeKind::Internal { .. } => false,
        };
        if should_split {
            self.split_leaf(cur, triangles);
        }
    }

    /// Tightens every volume bottom-up: a populated leaf shrinks to the exact
    /// union of its triangles' bounds, an internal node to the union of its
    /// children. Empty leaves keep the bounds they were split with.
    pub fn finish_generation(&mut self, triangles: &[Triangle]) {
        self.recompute_bounds(0, triangles);
    }

    fn recompute_bounds(&mut self, node_idx: usize, triangles: &[Triangle]) {
        let children = match &self.nodes[node_idx].kind {
            BuildNodeKind::Internal { child_a, child_b } => Some((*child_a, *child_b)),
            BuildNodeKind::Leaf { .. } => None,
        };

        match children {
            Some((child_a, child_b)) => {
                self.recompute_bounds(child_a, triangles);
                self.recompute_bounds(child_b, triangles);
                let mut bounds = BoundsBox::empty();
                bounds.expand_with_bounds(&self.nodes[child_a].bounds);
                bounds.expand_with_bounds(&self.nodes[child_b].bounds);
                self.nodes[node_idx].bounds = bounds;
            }
            None => {
                if let BuildNodeKind::Leaf { triangles: list } = &self.nodes[node_idx].kind {
                    if list.is_empty() {
                        return;
                    }
                    let mut bounds = BoundsBox::empty();
                    for &t in list {
                        bounds.expand_with_triangle(&triangles[t]);
                    }
                    self.nodes[node_idx].bounds = bounds;
                }
            }
        }
    }

    fn split_leaf(&mut self, node_idx: usize, triangles: &[Triangle]) {
        let mut list = match std::mem::replace(
            &mut self.nodes[node_idx].kind,
            BuildNodeKind::Leaf { triangles: vec![] },
        ) {
            BuildNodeKind::Leaf { triangles } => triangles,
            kind @ BuildNodeKind::Internal { .. } => {
                self.nodes[node_idx].kind = kind;
                return;
            }
        };

        let bounds = self.nodes[node_idx].bounds;
        let depth = self.nodes[node_idx].depth;

        let (axis, ratio) = best_split(&bounds, &list, triangles);
        let (bounds_a, bounds_b) = bounds.split(axis, ratio);

        // in-place redistribution; a centroid on the plane belongs to child a
        let (in_a, in_b) = partition(&mut list, |&t| {
            bounds_a.is_point_inside(triangles[t].centroid)
        });
        let list_a = in_a.to_vec();
        let list_b = in_b.to_vec();

        let child_a = self.nodes.len();
        self.nodes.push(BuildNode {
            bounds: bounds_a,
            depth: depth + 1,
            kind: BuildNodeKind::Leaf { triangles: list_a },
        });
        let child_b = self.nodes.len();
        self.nodes.push(BuildNode {
            bounds: bounds_b,
            depth: depth + 1,
            kind: BuildNodeKind::Leaf { triangles: list_b },
        });
        self.nodes[node_idx].kind = BuildNodeKind::Internal { child_a, child_b };

        // a lopsided redistribution can leave a child already at the
        // threshold; depth growth bounds the cascade
        for child in [child_a, child_b] {
            let over = match &self.nodes[child].kind {
                BuildNodeKind::Leaf { triangles: list } => {
                    list.len() >= self.triangles_per_leaf
                        && self.nodes[child].depth < self.max_depth
                }
                BuildNodeKind::Internal { .. } => false,
            };
            if over {
                self.split_leaf(child, triangles);
            }
        }
    }
}

/// Coarse surface-area heuristic: nine candidate ratios per axis, cost
/// weighted by how many centroids land on each side of the plane. Cheaper
/// than an exact SAH sweep and good enough for static scenes.
fn best_split(bounds: &BoundsBox, list: &[usize], triangles: &[Triangle]) -> (usize, f32) {
    let mut best_axis = 0;
    let mut best_ratio = 0.5;
    let mut best_cost = f32::MAX;

    for axis in 0..3 {
        let origin = bounds.min[axis];
        let size = bounds.max[axis] - bounds.min[axis];

        for i in 1..SAH_SPLITS {
            let ratio = i as f32 / SAH_SPLITS as f32;
            let plane = origin + size * ratio;

            let qty_before = list
                .iter()
                .filter(|&&t| triangles[t].centroid[axis] <= plane)
                .count();
            let qty_after = list.len() - qty_before;

            let cost = SAH_TRAVERSAL_COST
                + ratio * SAH_TRIANGLE_WEIGHT * qty_before as f32
                + (1.0 - ratio) * SAH_TRIANGLE_WEIGHT * qty_after as f32;
            if cost < best_cost {
                best_cost = cost;
                best_axis = axis;
                best_ratio = ratio;
            }
        }
    }

    (best_axis, best_ratio)
}
