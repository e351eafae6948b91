//! Node revision identifiers
//!
//! An id is a dotted sequence of decimal numbers of even length: `NODE.REV`
//! for a node's line of history, extended by `.BRANCH.REV` pairs when a
//! successor has to fork off a revision that already has one. Ids compare
//! component by component.

use crate::error::FsError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRevId(Vec<u64>);

impl NodeRevId {
    /// Root directory of revision 0
    pub fn root() -> Self {
        Self(vec![0, 0])
    }

    /// First revision of a brand-new node
    pub fn new_node(node: u64) -> Self {
        Self(vec![node, 1])
    }

    /// The node number this id belongs to
    pub fn node(&self) -> u64 {
        self.0[0]
    }

    /// The next revision on the same line: last component plus one.
    pub fn next_revision(&self) -> Self {
        let mut parts = self.0.clone();
        if let Some(last) = parts.last_mut() {
            *last += 1;
        }
        Self(parts)
    }

    /// First revision of branch number `branch` forked off this id.
    pub fn branch(&self, branch: u64) -> Self {
        let mut parts = self.0.clone();
        parts.push(branch);
        parts.push(1);
        Self(parts)
    }

    /// Key under which the node revision is stored
    pub fn to_key(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for NodeRevId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

impl FromStr for NodeRevId {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split('.')
            .map(|part| {
                // Reject signs and empty components, which u64::from_str would
                // partly accept.
                if part.is_empty() || !part.bytes().all(|c| c.is_ascii_digit()) {
                    return None;
                }
                part.parse::<u64>().ok()
            })
            .collect::<Option<Vec<_>>>()
            .filter(|parts| parts.len() % 2 == 0)
            .ok_or_else(|| FsError::malformed(format!("invalid node revision id '{}'", s)))?;
        Ok(Self(parts))
    }
}
