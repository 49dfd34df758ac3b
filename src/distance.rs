//! Pairwise leaf-to-leaf path-length matrix, sequential or parallel.
//!
//! # Overview
//! The distance between two leaves is the sum of edge lengths on the path
//! between them, or equivalently the sum over all edges that *separate*
//! them. The kernel exploits the second view:
//!
//! 1. **Precompute** (sequential, read-only): enumerate leaves and edges
//!    in pre-order, then walk once from every leaf to the root, marking
//!    the leaf in the descendant [`Bitset`] of each edge it passes.
//! 2. **Accumulate**: every edge adds its length to the cell of every
//!    (descendant, non-descendant) leaf pair. The outer loop runs over
//!    *edges* and can be distributed across rayon workers; since several
//!    edges feed the same cell concurrently, each add is a lock-free
//!    compare-and-retry on an atomic bit-cast of the float cell.
//!
//! Only the lower triangle is stored; the diagonal is implicitly zero.
//! Sequential and parallel runs produce the same matrix up to
//! floating-point accumulation order. There is no cancellation: once
//! invoked the kernel runs to completion.

use crate::bitset::Bitset;
use crate::tree::{NodeId, Tree};
use rayon::prelude::*;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Below this leaf count the auto mode (`max_parallelism == 0`) stays
/// sequential: the inner work only outweighs thread handoff past it.
const PARALLEL_LEAF_THRESHOLD: usize = 1500;

/// Progress callback, handed a completed fraction in `[0, 1]` after each
/// edge's contribution is fully applied. Invoked from worker threads under
/// an internal lock; the callee must still be safe to call reentrantly.
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Sync);

/// Lower-triangular pairwise leaf distance matrix.
///
/// Row and column order is the tree's pre-order leaf enumeration. Entry
/// `(i, j)` for `i > j` is the path length between leaves `i` and `j`;
/// the matrix is conceptually symmetric and the diagonal is zero, neither
/// of which is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix<T> {
    labels: Vec<String>,
    rows: Vec<Vec<T>>,
}

impl<T: Copy + Default> DistanceMatrix<T> {
    /// Leaf labels in matrix order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of leaves (rows/columns).
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Symmetric lookup: `get(i, j) == get(j, i)`, `get(i, i)` is zero.
    pub fn get(&self, i: usize, j: usize) -> T {
        match i.cmp(&j) {
            std::cmp::Ordering::Greater => self.rows[i][j],
            std::cmp::Ordering::Less => self.rows[j][i],
            std::cmp::Ordering::Equal => T::default(),
        }
    }

    /// The stored lower triangle; `rows()[i]` has length `i`.
    pub fn rows(&self) -> &[Vec<T>] {
        &self.rows
    }
}

/// A matrix element type backed by an atomic cell supporting
/// compare-and-retry float accumulation.
trait MatrixElement: Copy + Default + Send + Sync {
    type Cell: Send + Sync;

    fn new_cell() -> Self::Cell;

    /// Lock-free add: read, compute, replace-if-unchanged, retry.
    fn accumulate(cell: &Self::Cell, delta: f64);

    fn load(cell: &Self::Cell) -> Self;
}

impl MatrixElement for f64 {
    type Cell = AtomicU64;

    fn new_cell() -> AtomicU64 {
        AtomicU64::new(0.0f64.to_bits())
    }

    fn accumulate(cell: &AtomicU64, delta: f64) {
        let mut current = cell.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match cell.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return,
                Err(seen) => current = seen,
            }
        }
    }

    fn load(cell: &AtomicU64) -> f64 {
        f64::from_bits(cell.load(Ordering::Relaxed))
    }
}

impl MatrixElement for f32 {
    type Cell = AtomicU32;

    fn new_cell() -> AtomicU32 {
        AtomicU32::new(0.0f32.to_bits())
    }

    fn accumulate(cell: &AtomicU32, delta: f64) {
        let delta = delta as f32;
        let mut current = cell.load(Ordering::Relaxed);
        loop {
            let next = (f32::from_bits(current) + delta).to_bits();
            match cell.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return,
                Err(seen) => current = seen,
            }
        }
    }

    fn load(cell: &AtomicU32) -> f32 {
        f32::from_bits(cell.load(Ordering::Relaxed))
    }
}

/// Index into the flat lower triangle for `i > j`.
#[inline]
fn triangle_index(i: usize, j: usize) -> usize {
    i * (i - 1) / 2 + j
}

/// Full pairwise leaf distance matrix in double precision.
///
/// `max_parallelism`: 0 auto-selects by leaf count (sequential up to 1500
/// leaves, the runtime-default rayon pool above); a positive value caps
/// the worker count (1 forces sequential); a negative value always uses
/// the runtime-default pool.
pub fn distance_matrix(
    tree: &Tree,
    max_parallelism: i32,
    progress: Option<ProgressFn<'_>>,
) -> DistanceMatrix<f64> {
    compute(tree, max_parallelism, progress)
}

/// Single-precision variant of [`distance_matrix`], same parallelism and
/// progress contract.
pub fn distance_matrix_f32(
    tree: &Tree,
    max_parallelism: i32,
    progress: Option<ProgressFn<'_>>,
) -> DistanceMatrix<f32> {
    compute(tree, max_parallelism, progress)
}

fn compute<T: MatrixElement>(
    tree: &Tree,
    max_parallelism: i32,
    progress: Option<ProgressFn<'_>>,
) -> DistanceMatrix<T> {
    let leaves = tree.leaves(tree.root_id());
    let n = leaves.len();
    let labels: Vec<String> = leaves.iter().map(|&id| tree[id].name().to_string()).collect();

    // Fixed, stable enumerations: leaves and edges both in pre-order. The
    // edge above a node shares that node's index.
    let edge_nodes: Vec<NodeId> = tree
        .preorder(tree.root_id())
        .filter(|&id| tree[id].parent().is_some())
        .collect();
    let mut edge_of_node = vec![usize::MAX; tree.len()];
    for (e, &id) in edge_nodes.iter().enumerate() {
        edge_of_node[id] = e;
    }

    // One walk to the root per leaf fills the per-edge descendant sets.
    let words = n.div_ceil(64);
    let mut below: Vec<Bitset> = vec![Bitset::zeros(words); edge_nodes.len()];
    for (i, &leaf) in leaves.iter().enumerate() {
        let mut current = leaf;
        while let Some(parent) = tree[current].parent() {
            below[edge_of_node[current]].set(i);
            current = parent;
        }
    }

    let cells: Vec<T::Cell> = (0..n * n.saturating_sub(1) / 2)
        .map(|_| T::new_cell())
        .collect();
    let completed = Mutex::new(0usize);
    let edge_count = edge_nodes.len();

    let contribute = |e: usize| {
        let length = tree[edge_nodes[e]].length();
        // Unspecified lengths contribute nothing.
        if length.is_finite() && length != 0.0 {
            let side = &below[e];
            for i in (0..n).filter(|&i| side.contains(i)) {
                for j in (0..n).filter(|&j| !side.contains(j)) {
                    let (hi, lo) = if i > j { (i, j) } else { (j, i) };
                    T::accumulate(&cells[triangle_index(hi, lo)], length);
                }
            }
        }
        if let Some(report) = progress {
            if let Ok(mut done) = completed.lock() {
                *done += 1;
                report(*done as f64 / edge_count as f64);
            }
        }
    };

    let sequential = match max_parallelism {
        0 => n <= PARALLEL_LEAF_THRESHOLD,
        1 => true,
        _ => false,
    };
    if sequential {
        (0..edge_count).for_each(contribute);
    } else if max_parallelism > 1 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(max_parallelism as usize)
            .build()
        {
            Ok(pool) => pool.install(|| (0..edge_count).into_par_iter().for_each(contribute)),
            // A capped pool that cannot be built falls back to the
            // runtime-default one.
            Err(_) => (0..edge_count).into_par_iter().for_each(contribute),
        }
    } else {
        (0..edge_count).into_par_iter().for_each(contribute);
    }

    let rows: Vec<Vec<T>> = (0..n)
        .map(|i| (0..i).map(|j| T::load(&cells[triangle_index(i, j)])).collect())
        .collect();
    DistanceMatrix { labels, rows }
}

impl<T: Copy + Default + fmt::Display> fmt::Display for DistanceMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.len() {
            write!(f, "{}", self.labels[i])?;
            for j in 0..i {
                write!(f, "\t{}", self.rows[i][j])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick::parse_newick;

    #[test]
    fn three_leaf_example() {
        // (A,B) under an internal node of length 1, C at the root with
        // length 2, A and B edges both 1.
        let tree = parse_newick("((A:1,B:1):1,C:2);").unwrap();
        let matrix = distance_matrix(&tree, 0, None);

        assert_eq!(matrix.labels(), &["A", "B", "C"]);
        assert_eq!(matrix.get(1, 0), 2.0); // A–B
        assert_eq!(matrix.get(2, 0), 4.0); // A–C
        assert_eq!(matrix.get(2, 1), 4.0); // B–C
        // Symmetric lookup, implicit zero diagonal.
        assert_eq!(matrix.get(0, 2), 4.0);
        assert_eq!(matrix.get(1, 1), 0.0);
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let tree = parse_newick("(((A:1,B:4):2,C:1):1,(D:3,E:1):2,(F:2,(G:1,H:1):3):1);").unwrap();
        let sequential = distance_matrix(&tree, 1, None);
        let parallel = distance_matrix(&tree, -1, None);
        let capped = distance_matrix(&tree, 2, None);

        assert_eq!(sequential.rows(), parallel.rows());
        assert_eq!(sequential.rows(), capped.rows());
    }

    #[test]
    fn single_precision_variant() {
        let tree = parse_newick("((A:1,B:1):1,C:2);").unwrap();
        let matrix = distance_matrix_f32(&tree, 0, None);
        assert_eq!(matrix.get(2, 0), 4.0f32);
    }

    #[test]
    fn unspecified_lengths_contribute_nothing() {
        let tree = parse_newick("((A:1,B),C:2);").unwrap();
        let matrix = distance_matrix(&tree, 0, None);
        // B's edge and the inner edge have no length.
        assert_eq!(matrix.get(1, 0), 1.0); // A–B: only A's edge
        assert_eq!(matrix.get(2, 1), 2.0); // B–C: only C's edge
    }

    #[test]
    fn progress_reaches_one() {
        let tree = parse_newick("((A:1,B:1):1,C:2);").unwrap();
        let seen = Mutex::new(Vec::new());
        let callback = |fraction: f64| seen.lock().unwrap().push(fraction);
        distance_matrix(&tree, 1, Some(&callback));

        let seen = seen.into_inner().unwrap();
        // One report per edge (4 non-root nodes), ending at exactly 1.
        assert_eq!(seen.len(), 4);
        assert_eq!(*seen.last().unwrap(), 1.0);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn matrix_of_single_leaf_tree_is_empty_triangle() {
        let tree = parse_newick("A:1;").unwrap();
        let matrix = distance_matrix(&tree, 0, None);
        assert_eq!(matrix.len(), 1);
        assert!(matrix.rows()[0].is_empty());
    }
}
