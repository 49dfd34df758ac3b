//! Newick serialization boundary.
//!
//! # Overview
//! [`parse_newick`] turns a Newick string into a [`Tree`]; [`Tree::to_newick`]
//! renders one back. The dialect is the common one:
//!
//! ```text
//! ((A:1,B:1)90:1,C:2);
//!   └leaf┘ └support + edge length on the internal node┘
//! ```
//!
//! - `[...]` comments are stripped before parsing and never round-trip.
//! - Labels may be quoted with `'`, with `''` as an embedded quote.
//! - An unquoted label on an *internal* node that parses as a number is
//!   taken as edge support, not a name. Quoted labels are always names.
//! - The root's edge length is meaningless and the writer omits it, as it
//!   omits any edge length that is not a finite number.

use crate::error::ParseError;
use crate::tree::{NodeId, Tree};

/// Characters that end an unquoted label or a branch-length token, and
/// force quoting on output.
const DELIMITERS: &str = " \t\r\n(),:;[]'";

/// Parses a single Newick tree. The trailing `;` is optional; anything
/// after it is an error.
pub fn parse_newick(text: &str) -> Result<Tree, ParseError> {
    let stripped = strip_comments(text);
    let mut parser = Parser {
        input: &stripped,
        pos: 0,
    };

    parser.skip_whitespace();
    if parser.peek().is_none() {
        return Err(ParseError::Empty);
    }

    let mut tree = Tree::new();
    let root = tree.root_id();
    parser.subtree(&mut tree, root)?;

    parser.skip_whitespace();
    match parser.peek() {
        None => {}
        Some(';') => {
            parser.advance(';');
            parser.skip_whitespace();
            if parser.peek().is_some() {
                return Err(ParseError::TrailingCharacters { position: parser.pos });
            }
        }
        Some(found) => {
            return Err(ParseError::UnexpectedCharacter {
                found,
                position: parser.pos,
            });
        }
    }

    Ok(tree)
}

/// Removes bracketed comments, honoring nesting. Unclosed comments simply
/// swallow the rest of the input; the parser reports whatever is missing.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for ch in text.chars() {
        match ch {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self, ch: char) {
        self.pos += ch.len_utf8();
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.advance(ch);
        }
    }

    /// Parses one subtree into the already-allocated `node`: either a
    /// parenthesized child list followed by a label, or a bare leaf label.
    fn subtree(&mut self, tree: &mut Tree, node: NodeId) -> Result<(), ParseError> {
        self.skip_whitespace();
        if self.peek() == Some('(') {
            let open = self.pos;
            self.advance('(');
            loop {
                let child = tree.add_child(node);
                self.subtree(tree, child)?;
                self.skip_whitespace();
                match self.peek() {
                    Some(',') => self.advance(','),
                    Some(')') => {
                        self.advance(')');
                        break;
                    }
                    _ => return Err(ParseError::UnbalancedParentheses { position: open }),
                }
            }
            self.label(tree, node, true)
        } else {
            self.label(tree, node, false)
        }
    }

    /// Parses the optional label and `:length` suffix of a node.
    fn label(&mut self, tree: &mut Tree, node: NodeId, internal: bool) -> Result<(), ParseError> {
        self.skip_whitespace();

        if self.peek() == Some('\'') {
            let name = self.quoted_label()?;
            tree[node].set_name(name);
        } else {
            let text = self.unquoted_token();
            if !text.is_empty() {
                match text.parse::<f64>() {
                    Ok(support) if internal => tree[node].set_support(support),
                    _ => tree[node].set_name(text),
                }
            }
        }

        self.skip_whitespace();
        if self.peek() == Some(':') {
            self.advance(':');
            let length = self.branch_length()?;
            tree[node].set_length(length);
        }
        Ok(())
    }

    fn quoted_label(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.advance('\'');
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(ParseError::UnterminatedQuote { position: start }),
                Some('\'') => {
                    self.advance('\'');
                    if self.peek() == Some('\'') {
                        out.push('\'');
                        self.advance('\'');
                    } else {
                        return Ok(out);
                    }
                }
                Some(ch) => {
                    out.push(ch);
                    self.advance(ch);
                }
            }
        }
    }

    fn unquoted_token(&mut self) -> String {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if DELIMITERS.contains(ch) {
                break;
            }
            self.advance(ch);
        }
        self.input[start..self.pos].to_string()
    }

    fn branch_length(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let text = self.unquoted_token();
        text.parse::<f64>().map_err(|_| ParseError::InvalidBranchLength {
            text,
            position: start,
        })
    }
}

impl Tree {
    /// Renders the subtree under the root as a Newick string with a
    /// trailing `;`. Inverse of [`parse_newick`] up to comments and
    /// insignificant whitespace.
    pub fn to_newick(&self) -> String {
        let mut out = String::new();
        self.write_newick_node(self.root_id(), &mut out);
        out.push(';');
        out
    }

    fn write_newick_node(&self, id: NodeId, out: &mut String) {
        let node = &self[id];
        if !node.is_leaf() {
            out.push('(');
            for (i, &child) in node.children().iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                self.write_newick_node(child, out);
            }
            out.push(')');
        }

        let name = node.name();
        if !name.is_empty() {
            write_label(name, out);
        } else if !node.is_leaf() && node.support().is_finite() {
            out.push_str(&node.support().to_string());
        }

        if id != self.root_id() && node.length().is_finite() {
            out.push(':');
            out.push_str(&node.length().to_string());
        }
    }
}

fn write_label(name: &str, out: &mut String) {
    if name.chars().any(|ch| DELIMITERS.contains(ch)) {
        out.push('\'');
        out.push_str(&name.replace('\'', "''"));
        out.push('\'');
    } else {
        out.push_str(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_tree_with_lengths() {
        let tree = parse_newick("((A:1,B:1):1,C:2);").unwrap();
        assert!(tree.is_valid());
        assert_eq!(tree.leaf_names(tree.root_id()), vec!["A", "B", "C"]);
        assert_eq!(tree.root().children().len(), 2);

        let a = tree.find_by_name(tree.root_id(), "A").unwrap();
        assert_eq!(tree[a].length(), 1.0);
        let c = tree.find_by_name(tree.root_id(), "C").unwrap();
        assert_eq!(tree[c].length(), 2.0);
        // The root received no length.
        assert!(tree.root().length().is_nan());
    }

    #[test]
    fn round_trips() {
        for text in [
            "((A:1,B:1):1,C:2);",
            "(A,B,(C,D));",
            "((A:0.1,B:0.2)inner:0.3,C:0.4)top;",
            "A;",
        ] {
            let tree = parse_newick(text).unwrap();
            assert_eq!(tree.to_newick(), text);
        }
    }

    #[test]
    fn numeric_internal_label_is_support() {
        let tree = parse_newick("((A:1,B:1)95:2,C:3);").unwrap();
        let inner = tree.root().children()[0];
        assert_eq!(tree[inner].support(), 95.0);
        assert_eq!(tree[inner].name(), "");
        // And it renders back as a label.
        assert_eq!(tree.to_newick(), "((A:1,B:1)95:2,C:3);");
    }

    #[test]
    fn quoted_labels() {
        let tree = parse_newick("('Homo sapiens':1,'it''s':2);").unwrap();
        let names = tree.leaf_names(tree.root_id());
        assert_eq!(names, vec!["Homo sapiens", "it's"]);
        assert_eq!(tree.to_newick(), "('Homo sapiens':1,'it''s':2);");
    }

    #[test]
    fn quoted_numeric_internal_label_stays_a_name() {
        let tree = parse_newick("((A,B)'42',C);").unwrap();
        let inner = tree.root().children()[0];
        assert_eq!(tree[inner].name(), "42");
        assert!(tree[inner].support().is_nan());
    }

    #[test]
    fn comments_are_stripped() {
        let tree = parse_newick("((A[&rate=0.3]:1,B:1):1,C:2);[final]").unwrap();
        assert_eq!(tree.to_newick(), "((A:1,B:1):1,C:2);");
    }

    #[test]
    fn whitespace_is_insignificant() {
        let tree = parse_newick("( (A : 1, B : 1) : 1,\n  C : 2\n);").unwrap();
        assert_eq!(tree.to_newick(), "((A:1,B:1):1,C:2);");
    }

    #[test]
    fn missing_semicolon_is_tolerated() {
        let tree = parse_newick("(A:1,B:2)").unwrap();
        assert_eq!(tree.to_newick(), "(A:1,B:2);");
    }

    #[test]
    fn writer_skips_root_and_unspecified_lengths() {
        let mut tree = Tree::new();
        tree[0].set_length(7.0);
        let a = tree.add_child(tree.root_id());
        tree[a].set_name("A");
        let b = tree.add_child(tree.root_id());
        tree[b].set_name("B");
        tree[b].set_length(2.0);

        assert_eq!(tree.to_newick(), "(A,B:2);");
    }

    #[test]
    fn error_empty() {
        assert_eq!(parse_newick("  "), Err(ParseError::Empty));
    }

    #[test]
    fn error_unterminated_quote() {
        assert_eq!(
            parse_newick("('oops:1);"),
            Err(ParseError::UnterminatedQuote { position: 1 })
        );
    }

    #[test]
    fn error_unbalanced_parentheses() {
        assert_eq!(
            parse_newick("((A,B;"),
            Err(ParseError::UnbalancedParentheses { position: 1 })
        );
    }

    #[test]
    fn error_invalid_branch_length() {
        assert_eq!(
            parse_newick("(A:fast,B:1);"),
            Err(ParseError::InvalidBranchLength {
                text: "fast".to_string(),
                position: 3,
            })
        );
    }

    #[test]
    fn error_unexpected_character() {
        assert_eq!(
            parse_newick("(A,B)),C;"),
            Err(ParseError::UnexpectedCharacter {
                found: ')',
                position: 5,
            })
        );
    }

    #[test]
    fn error_trailing_characters() {
        assert_eq!(
            parse_newick("(A,B); (C,D);"),
            Err(ParseError::TrailingCharacters { position: 7 })
        );
    }
}
