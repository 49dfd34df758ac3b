//! Error types for tree measurement and the Newick boundary.

use crate::tree::NodeId;
use thiserror::Error;

/// Errors raised by measurement operations on a tree.
///
/// Lookups that can legitimately miss (by-name/by-id searches, last common
/// ancestor) return `Option` instead; these variants signal violated
/// expectations that the caller must handle explicitly.
#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    /// The two nodes do not belong to the same connected tree, or a claimed
    /// ancestor/descendant relationship does not hold.
    #[error("nodes {0} and {1} are not part of the same tree")]
    InvalidRelationship(NodeId, NodeId),
}

/// Errors raised while parsing a Newick string.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unexpected character '{found}' at byte {position}")]
    UnexpectedCharacter { found: char, position: usize },

    #[error("unterminated quoted label starting at byte {position}")]
    UnterminatedQuote { position: usize },

    #[error("unbalanced parentheses at byte {position}")]
    UnbalancedParentheses { position: usize },

    #[error("invalid branch length '{text}' at byte {position}")]
    InvalidBranchLength { text: String, position: usize },

    #[error("empty input")]
    Empty,

    #[error("trailing characters after ';' at byte {position}")]
    TrailingCharacters { position: usize },
}
