//! Generic N-dimensional KD-tree for radius search.
//!
//! The dimension is a const parameter. Sky positions use `KdTree<3>` over
//! unit vectors; nothing in the tree is specific to the sphere.

/// Tree nodes, stored flat and addressed by position.
#[derive(Debug, Clone)]
enum Node {
    /// Left subtree has `p[dim] <= value`, right subtree `p[dim] >= value`.
    Split {
        dim: usize,
        value: f64,
        left: usize,
        right: usize,
    },
    /// `points[start..end]`.
    Leaf { start: usize, end: usize },
}

/// A balanced KD-tree over a fixed point set.
///
/// The tree is never mutated after construction; a different point set or
/// leaf size means building a new tree.
#[derive(Debug, Clone)]
pub struct KdTree<const DIM: usize> {
    nodes: Vec<Node>,
    points: Vec<[f64; DIM]>,
    indices: Vec<usize>,
    leaf_size: usize,
}

impl<const DIM: usize> KdTree<DIM> {
    /// Build a tree from points. `indices` maps each point to its caller-side ID.
    ///
    /// Nodes holding at most `leaf_size` points are not split further; a
    /// `leaf_size` of zero is treated as one.
    pub fn build(points: Vec<[f64; DIM]>, indices: Vec<usize>, leaf_size: usize) -> Self {
        assert_eq!(points.len(), indices.len());

        let mut entries: Vec<([f64; DIM], usize)> = points.into_iter().zip(indices).collect();
        let mut nodes = Vec::new();
        let leaf_size = leaf_size.max(1);

        if !entries.is_empty() {
            let n = entries.len();
            split_range(&mut entries, 0, n, leaf_size, &mut nodes);
        }

        let (points, indices) = entries.into_iter().unzip();
        KdTree {
            nodes,
            points,
            indices,
            leaf_size,
        }
    }

    /// Caller-side IDs of all points within Euclidean `radius` of `query` (inclusive).
    pub fn within_radius(&self, query: &[f64; DIM], radius: f64) -> Vec<usize> {
        let mut found = Vec::new();
        if !self.nodes.is_empty() && radius >= 0.0 {
            self.visit(0, query, radius * radius, &mut found);
        }
        found
    }

    fn visit(&self, node_idx: usize, query: &[f64; DIM], radius_sq: f64, found: &mut Vec<usize>) {
        match self.nodes[node_idx] {
            Node::Leaf { start, end } => {
                found.extend(
                    (start..end)
                        .filter(|&i| squared_distance(query, &self.points[i]) <= radius_sq)
                        .map(|i| self.indices[i]),
                );
            }
            Node::Split {
                dim,
                value,
                left,
                right,
            } => {
                let diff = query[dim] - value;
                let (near, far) = if diff <= 0.0 { (left, right) } else { (right, left) };

                self.visit(near, query, radius_sq, found);
                if diff * diff <= radius_sq {
                    self.visit(far, query, radius_sq, found);
                }
            }
        }
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Maximum number of points per leaf this tree was built with.
    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }
}

/// Recursively partition `entries[start..end]` around the median of the
/// widest axis, appending nodes in pre-order. Returns the node index.
fn split_range<const DIM: usize>(
    entries: &mut [([f64; DIM], usize)],
    start: usize,
    end: usize,
    leaf_size: usize,
    nodes: &mut Vec<Node>,
) -> usize {
    let node_idx = nodes.len();
    if end - start <= leaf_size {
        nodes.push(Node::Leaf { start, end });
        return node_idx;
    }

    let dim = widest_axis(&entries[start..end]);
    let mid = (end - start) / 2;
    entries[start..end].select_nth_unstable_by(mid, |a, b| a.0[dim].total_cmp(&b.0[dim]));
    let value = entries[start + mid].0[dim];

    // Placeholder until both children exist.
    nodes.push(Node::Leaf { start: 0, end: 0 });
    let left = split_range(entries, start, start + mid, leaf_size, nodes);
    let right = split_range(entries, start + mid, end, leaf_size, nodes);
    nodes[node_idx] = Node::Split {
        dim,
        value,
        left,
        right,
    };
    node_idx
}

fn widest_axis<const DIM: usize>(entries: &[([f64; DIM], usize)]) -> usize {
    let mut lo = [f64::INFINITY; DIM];
    let mut hi = [f64::NEG_INFINITY; DIM];
    for (p, _) in entries {
        for d in 0..DIM {
            lo[d] = lo[d].min(p[d]);
            hi[d] = hi[d].max(p[d]);
        }
    }
    (0..DIM)
        .max_by(|&a, &b| (hi[a] - lo[a]).total_cmp(&(hi[b] - lo[b])))
        .unwrap_or(0)
}

#[inline]
fn squared_distance<const DIM: usize>(a: &[f64; DIM], b: &[f64; DIM]) -> f64 {
    let mut sum = 0.0;
    for i in 0..DIM {
        let d = a[i] - b[i];
        sum += d * d;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xorshift(seed: u64) -> impl FnMut() -> f64 {
        let mut state = seed;
        move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state as f64) / (u64::MAX as f64)
        }
    }

    fn brute_force<const DIM: usize>(points: &[[f64; DIM]], query: &[f64; DIM], radius: f64) -> Vec<usize> {
        points
            .iter()
            .enumerate()
            .filter(|(_, p)| squared_distance(query, p) <= radius * radius)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn empty_tree() {
        let tree = KdTree::<3>::build(vec![], vec![], 16);
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert!(tree.within_radius(&[0.0, 0.0, 0.0], 1.0).is_empty());
    }

    #[test]
    fn single_point() {
        let tree = KdTree::<3>::build(vec![[1.0, 2.0, 3.0]], vec![42], 16);

        assert_eq!(tree.within_radius(&[1.0, 2.0, 3.0], 0.1), vec![42]);
        assert!(tree.within_radius(&[100.0, 100.0, 100.0], 0.1).is_empty());
    }

    #[test]
    fn radius_is_inclusive() {
        let points = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let tree = KdTree::<2>::build(points, (0..4).collect(), 1);

        let mut found = tree.within_radius(&[0.0, 0.0], 1.0);
        found.sort();
        assert_eq!(found, vec![0, 1, 2]);
    }

    #[test]
    fn negative_radius_finds_nothing() {
        let tree = KdTree::<2>::build(vec![[0.0, 0.0]], vec![0], 4);
        assert!(tree.within_radius(&[0.0, 0.0], -1.0).is_empty());
    }

    #[test]
    fn brute_force_equivalence_3d() {
        let mut rng = xorshift(123456789);
        let n = 1000;
        let points: Vec<[f64; 3]> = (0..n).map(|_| [rng(), rng(), rng()]).collect();
        let tree = KdTree::<3>::build(points.clone(), (0..n).collect(), 8);

        for _ in 0..50 {
            let query = [rng(), rng(), rng()];
            let radius = rng() * 0.5;

            let mut found = tree.within_radius(&query, radius);
            found.sort();
            assert_eq!(found, brute_force(&points, &query, radius), "query {query:?} radius {radius}");
        }
    }

    #[test]
    fn leaf_size_does_not_change_results() {
        let mut rng = xorshift(987654321);
        let n = 600;
        let points: Vec<[f64; 3]> = (0..n).map(|_| [rng(), rng(), rng()]).collect();

        let coarse = KdTree::<3>::build(points.clone(), (0..n).collect(), 100);
        let fine = KdTree::<3>::build(points.clone(), (0..n).collect(), 10);
        assert_eq!(coarse.leaf_size(), 100);
        assert_eq!(fine.leaf_size(), 10);

        for _ in 0..40 {
            let query = [rng(), rng(), rng()];
            let radius = rng() * 0.4;
            let mut a = coarse.within_radius(&query, radius);
            let mut b = fine.within_radius(&query, radius);
            a.sort();
            b.sort();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn index_preservation() {
        let points = vec![[10.0, 20.0], [30.0, 40.0], [50.0, 60.0]];
        let tree = KdTree::<2>::build(points.clone(), vec![100, 200, 300], 1);

        for (point, expected) in points.iter().zip([100, 200, 300]) {
            assert_eq!(tree.within_radius(point, 1e-9), vec![expected]);
        }
    }

    #[test]
    fn duplicate_points() {
        let tree = KdTree::<2>::build(vec![[1.0, 1.0]; 10], (0..10).collect(), 2);
        assert_eq!(tree.within_radius(&[1.0, 1.0], 0.01).len(), 10);
    }

    #[test]
    fn zero_leaf_size_is_clamped() {
        let tree = KdTree::<2>::build(vec![[0.0, 0.0], [1.0, 1.0]], vec![0, 1], 0);
        assert_eq!(tree.leaf_size(), 1);
        assert_eq!(tree.within_radius(&[1.0, 1.0], 0.1), vec![1]);
    }
}
