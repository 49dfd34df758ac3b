//! Crate root: lightweight module orchestration and public re-exports.
//!
//! Modules:
//! - `tree`: arena-based tree model with stable node ids.
//! - `attributes`: ordered per-node attribute store with reserved keys.
//! - `traverse`: pre-order traversal, path lengths, levels, sorting, LCA.
//! - `transform`: subtree extraction, unrooting, rerooting, pruning.
//! - `split`: leaf-set splits, compatibility, tree reconstruction.
//! - `distance`: pairwise leaf distance matrix, sequential or parallel.
//! - `newick`: Newick parsing and rendering.
//! - `io`: Newick files in, TSV matrices out.
//! - `bitset`: compact bitset representation for per-edge leaf sets.
//!
//! Public API kept stable by re-exporting key items from the modules.

pub mod attributes;
pub mod bitset;
pub mod distance;
pub mod error;
pub mod io;
pub mod newick;
pub mod split;
pub mod transform;
pub mod traverse;
pub mod tree;

// Re-export frequently used types & functions
pub use attributes::{AttributeValue, Attributes};
pub use bitset::Bitset;
pub use distance::{DistanceMatrix, distance_matrix, distance_matrix_f32};
pub use error::{ParseError, TreeError};
pub use io::{read_newick_trees, write_matrix_tsv};
pub use newick::parse_newick;
pub use split::{LengthType, Split, are_compatible, build_tree};
pub use traverse::{Levels, Preorder, Relationship};
pub use tree::{Node, NodeId, Tree};
