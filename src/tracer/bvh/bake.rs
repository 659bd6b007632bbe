use crate::tracer::bvh::build::{BuildNode, BuildNodeKind, BuildTree};
use crate::tracer::bvh::{FlatNode, NO_CHILD};
use crate::tracer::scene::{Light, LightKind, Triangle};

/// Bakes the finished build tree into the flat node array. Nodes are numbered
/// in pre-order; the triangle array is reordered so every leaf owns one
/// contiguous range, and each reordered triangle records its owning node.
/// The build tree is dropped by the caller right after this.
pub fn flatten(
    tree: &BuildTree,
    triangles: Vec<Triangle>,
    lights: &[Light],
) -> (Vec<FlatNode>, Vec<Triangle>) {
    // pre-order index assignment over the arena
    let mut order = Vec::with_capacity(tree.nodes.len());
    let mut flat_of = vec![0usize; tree.nodes.len()];
    let mut stack = vec![0usize];
    while let Some(build_idx) = stack.pop() {
        flat_of[build_idx] = order.len();
        order.push(build_idx);
        if let BuildNodeKind::Internal { child_a, child_b } = &tree.nodes[build_idx].kind {
            // push b first so a is visited first
            stack.push(*child_b);
            stack.push(*child_a);
        }
    }

    let mut nodes = Vec::with_capacity(order.len());
    let mut sorted = Vec::with_capacity(triangles.len());

    for (flat_idx, &build_idx) in order.iter().enumerate() {
        let node = &tree.nodes[build_idx];
        match &node.kind {
            BuildNodeKind::Leaf { triangles: list } => {
                let start = sorted.len() as u32;
                for &t in list {
                    let mut triangle = triangles[t].clone();
                    triangle.node_index = flat_idx as u32;
                    sorted.push(triangle);
                }
                nodes.push(FlatNode {
                    bounds: node.bounds,
                    depth: node.depth,
                    is_leaf: true,
                    child_a: NO_CHILD,
                    child_b: NO_CHILD,
                    start,
                    count: list.len() as u32,
                    light_indices: relevant_lights(node, list, &triangles, lights),
                });
            }
            BuildNodeKind::Internal { child_a, child_b } => {
                nodes.push(FlatNode {
                    bounds: node.bounds,
                    depth: node.depth,
                    is_leaf: false,
                    child_a: flat_of[*child_a] as u32,
                    child_b: flat_of[*child_b] as u32,
                    start: 0,
                    count: 0,
                    light_indices: vec![],
                });
            }
        }
    }

    (nodes, sorted)
}

/// Which lights can matter to the triangles of this leaf. Purely an
/// optimization: dropping the culling changes nothing in the final image,
/// only how many shadow rays the integrator pays for.
fn relevant_lights(
    node: &BuildNode,
    list: &[usize],
    triangles: &[Triangle],
    lights: &[Light],
) -> Vec<u32> {
    let mut relevant = Vec::new();

    for (l, light) in lights.iter().enumerate() {
        if node.bounds.is_point_inside(light.position) {
            relevant.push(l as u32);
            continue;
        }

        // directional lights have no position or range to cull against
        if light.kind == LightKind::Directional {
            relevant.push(l as u32);
            continue;
        }

        if node.bounds.squared_dist_to_point(light.position) > light.range * light.range {
            continue;
        }

        let has_relevant_triangles = match light.kind {
            LightKind::Point => list.iter().any(|&t| {
                let triangle = &triangles[t];
                triangle
                    .face_normal
                    .dot(&(triangle.centroid - light.position))
                    < 0.0
            }),
            LightKind::Spot => list.iter().any(|&t| {
                let triangle = &triangles[t];
                (triangle.pos_a - light.position).dot(&light.forward) > 0.0
                    && (triangle.pos_b - light.position).dot(&light.forward) > 0.0
                    && (triangle.pos_c - light.position).dot(&light.forward) > 0.0
            }),
            LightKind::Directional => true,
        };
        if has_relevant_triangles {
            relevant.push(l as u32);
        }
    }

    relevant
}
