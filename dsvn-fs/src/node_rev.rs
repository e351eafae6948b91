//! Node revision records
//!
//! ```text
//! NODE-REVISION ::= (HEADER KIND-SPECIFIC)
//! HEADER        ::= (KIND PROPLIST FLAG ...)
//! KIND          ::= "file" | "dir"
//! PROPLIST      ::= (NAME VALUE ...)
//! FLAG          ::= ("mutable" OWNER) | (other ...)
//! KIND-SPECIFIC ::= ((NAME ID) ...)          ; directories
//!                 | REP-KEY                   ; files, empty atom if no contents
//! ```

use crate::error::{FsError, Result};
use crate::id::NodeRevId;
use crate::skel::Skel;
use bytes::Bytes;

const MUTABLE_FLAG: &str = "mutable";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Dir,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Dir => "dir",
        }
    }
}

/// Ordered property list of (name, value) atoms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropList(Vec<(Bytes, Bytes)>);

impl PropList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&Bytes> {
        self.0
            .iter()
            .find(|(n, _)| n.as_ref() == name.as_bytes())
            .map(|(_, v)| v)
    }

    /// Replace the value of `name` in place, or append it.
    pub fn set(&mut self, name: &str, value: impl Into<Bytes>) {
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| n.as_ref() == name.as_bytes()) {
            Some((_, v)) => *v = value,
            None => self
                .0
                .push((Bytes::copy_from_slice(name.as_bytes()), value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Bytes> {
        let idx = self.0.iter().position(|(n, _)| n.as_ref() == name.as_bytes())?;
        Some(self.0.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Bytes, &Bytes)> {
        self.0.iter().map(|(n, v)| (n, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Validate and convert a flat `(NAME VALUE ...)` skel.
    ///
    /// The list must have an even number of elements, all of them atoms.
    pub fn from_skel(skel: &Skel) -> Result<Self> {
        let items = skel
            .as_list()
            .ok_or_else(|| FsError::malformed("proplist is not a list"))?;
        if items.len() % 2 != 0 {
            return Err(FsError::malformed("proplist has an odd number of elements"));
        }

        let mut props = Vec::with_capacity(items.len() / 2);
        for pair in items.chunks(2) {
            match (&pair[0], &pair[1]) {
                (Skel::Atom(name), Skel::Atom(value)) => props.push((name.clone(), value.clone())),
                _ => return Err(FsError::malformed("proplist element is not an atom")),
            }
        }
        Ok(Self(props))
    }

    pub fn to_skel(&self) -> Skel {
        Skel::List(
            self.0
                .iter()
                .flat_map(|(n, v)| [Skel::Atom(n.clone()), Skel::Atom(v.clone())])
                .collect(),
        )
    }
}

/// A header flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flag {
    /// Node may be modified in place; `owner` is the parent node id or
    /// transaction that created it.
    Mutable { owner: String },
    /// Any other flag, preserved as read
    Other(Skel),
}

impl Flag {
    fn from_skel(skel: &Skel) -> Result<Self> {
        let items = skel
            .as_list()
            .ok_or_else(|| FsError::malformed("header flag is not a list"))?;
        match items {
            [name, owner] if name.matches_atom(MUTABLE_FLAG) => Ok(Flag::Mutable {
                owner: owner.atom_str()?.to_string(),
            }),
            [name, ..] if name.matches_atom(MUTABLE_FLAG) => {
                Err(FsError::malformed("mutable flag must name exactly one owner"))
            }
            _ => Ok(Flag::Other(skel.clone())),
        }
    }

    fn to_skel(&self) -> Skel {
        match self {
            Flag::Mutable { owner } => {
                Skel::list(vec![Skel::str_atom(MUTABLE_FLAG), Skel::str_atom(owner)])
            }
            Flag::Other(skel) => skel.clone(),
        }
    }
}

/// One entry of a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub id: NodeRevId,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, id: NodeRevId) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

/// Kind-specific part of a node revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeBody {
    Dir(Vec<DirEntry>),
    /// Key of the contents representation, if any
    File(Option<String>),
}

/// One version of a file or directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRevision {
    pub proplist: PropList,
    pub flags: Vec<Flag>,
    pub body: NodeBody,
}

impl NodeRevision {
    /// Empty, immutable directory
    pub fn empty_dir() -> Self {
        Self {
            proplist: PropList::new(),
            flags: Vec::new(),
            body: NodeBody::Dir(Vec::new()),
        }
    }

    /// New mutable node owned by `owner`, with empty contents
    pub fn new_mutable(kind: NodeKind, owner: &str) -> Self {
        let body = match kind {
            NodeKind::File => NodeBody::File(None),
            NodeKind::Dir => NodeBody::Dir(Vec::new()),
        };
        Self {
            proplist: PropList::new(),
            flags: vec![Flag::Mutable {
                owner: owner.to_string(),
            }],
            body,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self.body {
            NodeBody::Dir(_) => NodeKind::Dir,
            NodeBody::File(_) => NodeKind::File,
        }
    }

    pub fn is_mutable(&self) -> bool {
        self.flags.iter().any(|f| matches!(f, Flag::Mutable { .. }))
    }

    /// Copy of this node revision flagged mutable for `owner`
    pub fn to_mutable(&self, owner: &str) -> Self {
        let mut node_rev = self.clone();
        node_rev.clear_mutable();
        node_rev.flags.push(Flag::Mutable {
            owner: owner.to_string(),
        });
        node_rev
    }

    pub fn clear_mutable(&mut self) {
        self.flags.retain(|f| !matches!(f, Flag::Mutable { .. }));
    }

    pub fn entries(&self) -> Option<&[DirEntry]> {
        match &self.body {
            NodeBody::Dir(entries) => Some(entries),
            NodeBody::File(_) => None,
        }
    }

    pub fn entries_mut(&mut self) -> Option<&mut Vec<DirEntry>> {
        match &mut self.body {
            NodeBody::Dir(entries) => Some(entries),
            NodeBody::File(_) => None,
        }
    }

    pub fn find_entry(&self, name: &str) -> Option<&DirEntry> {
        self.entries()?.iter().find(|e| e.name == name)
    }

    pub fn rep_key(&self) -> Option<&str> {
        match &self.body {
            NodeBody::File(key) => key.as_deref(),
            NodeBody::Dir(_) => None,
        }
    }

    pub fn from_skel(skel: &Skel) -> Result<Self> {
        let (header, body) = match skel.as_list() {
            Some([header, body]) => (header, body),
            _ => return Err(FsError::malformed("node revision must be (HEADER KIND-SPECIFIC)")),
        };
        let header = match header.as_list() {
            Some(items) if items.len() >= 2 => items,
            _ => return Err(FsError::malformed("node header must be (KIND PROPLIST FLAG ...)")),
        };

        let proplist = PropList::from_skel(&header[1])?;
        let flags = header[2..]
            .iter()
            .map(Flag::from_skel)
            .collect::<Result<Vec<_>>>()?;

        let body = if header[0].matches_atom(NodeKind::Dir.as_str()) {
            let entries = body
                .as_list()
                .ok_or_else(|| FsError::malformed("directory entries must be a list"))?;
            NodeBody::Dir(
                entries
                    .iter()
                    .map(parse_entry)
                    .collect::<Result<Vec<_>>>()?,
            )
        } else if header[0].matches_atom(NodeKind::File.as_str()) {
            let key = body.atom_str()?;
            NodeBody::File((!key.is_empty()).then(|| key.to_string()))
        } else {
            return Err(FsError::malformed("unknown node kind"));
        };

        Ok(Self {
            proplist,
            flags,
            body,
        })
    }

    pub fn to_skel(&self) -> Skel {
        let mut header = vec![Skel::str_atom(self.kind().as_str()), self.proplist.to_skel()];
        header.extend(self.flags.iter().map(Flag::to_skel));

        let body = match &self.body {
            NodeBody::Dir(entries) => Skel::List(
                entries
                    .iter()
                    .map(|e| {
                        Skel::list(vec![Skel::str_atom(&e.name), Skel::str_atom(&e.id.to_string())])
                    })
                    .collect(),
            ),
            NodeBody::File(key) => Skel::str_atom(key.as_deref().unwrap_or("")),
        };

        Skel::list(vec![Skel::List(header), body])
    }
}

fn parse_entry(skel: &Skel) -> Result<DirEntry> {
    match skel.as_list() {
        Some([name, id]) => Ok(DirEntry {
            name: name.atom_str()?.to_string(),
            id: id.atom_str()?.parse()?,
        }),
        _ => Err(FsError::malformed("directory entry must be (NAME ID)")),
    }
}
