//! DAG nodes
//!
//! The filesystem is a directed acyclic graph of node revisions. Committed
//! node revisions are immutable; a transaction edits the tree by cloning the
//! path it touches, root first, into mutable successors and changing those in
//! place. Every operation runs inside a [`Trail`], so nothing it writes is
//! visible to other trails until the trail completes.
//!
//! A `DagNode` is a handle holding a node revision id together with the node
//! revision as last read. Operations that change a node through its handle
//! reload it first, write the change to the trail and update the handle.
//! Read-only inspectors use the copy held by the handle.

use crate::error::{FsError, Result};
use crate::id::NodeRevId;
use crate::node_rev::{DirEntry, NodeBody, NodeKind, NodeRevision, PropList};
use crate::reps;
use crate::skel::Skel;
use crate::tables::{self, Revision};
use crate::trail::Trail;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DagNode {
    id: NodeRevId,
    node_rev: NodeRevision,
}

impl DagNode {
    /// Load the node revision `id`.
    pub fn load(trail: &Trail<'_>, id: &NodeRevId) -> Result<Self> {
        let node_rev = tables::get_node_revision(trail, id)?;
        Ok(Self {
            id: id.clone(),
            node_rev,
        })
    }

    pub fn id(&self) -> &NodeRevId {
        &self.id
    }

    pub fn node_revision(&self) -> &NodeRevision {
        &self.node_rev
    }

    pub fn kind(&self) -> NodeKind {
        self.node_rev.kind()
    }

    pub fn is_mutable(&self) -> bool {
        self.node_rev.is_mutable()
    }

    pub fn is_file(&self) -> bool {
        self.kind() == NodeKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind() == NodeKind::Dir
    }

    pub fn entries(&self) -> Result<&[DirEntry]> {
        self.node_rev
            .entries()
            .ok_or_else(|| FsError::NotDirectory(self.id.clone()))
    }

    pub fn get_proplist(&self) -> &PropList {
        &self.node_rev.proplist
    }

    /// Replace the node's property list with `proplist`, a flat
    /// `(NAME VALUE ...)` list of atoms.
    pub fn set_proplist(&mut self, trail: &mut Trail<'_>, proplist: &Skel) -> Result<()> {
        self.reload(trail)?;
        self.require_mutable()?;
        let proplist = PropList::from_skel(proplist)?;

        self.node_rev.proplist = proplist;
        tables::put_node_revision(trail, &self.id, &self.node_rev);
        tracing::debug!(id = %self.id, "set proplist");
        Ok(())
    }

    /// Open the child `name` read-only.
    pub fn open(&self, trail: &Trail<'_>, name: &str) -> Result<DagNode> {
        let entry = self
            .entries()?
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| FsError::NotFound(format!("'{}' in {}", name, self.id)))?;
        DagNode::load(trail, &entry.id)
    }

    /// Make the child `name` of this mutable directory mutable.
    ///
    /// An already mutable child is returned as is. Otherwise a mutable
    /// successor of the child is created and the entry redirected to it.
    pub fn clone_child(&mut self, trail: &mut Trail<'_>, name: &str) -> Result<DagNode> {
        self.reload(trail)?;
        self.require_mutable()?;

        let child_id = self
            .entries()?
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.id.clone())
            .ok_or_else(|| FsError::NotFound(format!("'{}' in {}", name, self.id)))?;
        let child = DagNode::load(trail, &child_id)?;
        if child.is_mutable() {
            return Ok(child);
        }

        let node_rev = child.node_rev.to_mutable(&self.id.to_string());
        let new_id = tables::create_successor(trail, &child_id, &node_rev)?;

        if let Some(entry) = self
            .node_rev
            .entries_mut()
            .and_then(|entries| entries.iter_mut().find(|e| e.name == name))
        {
            entry.id = new_id.clone();
        }
        tables::put_node_revision(trail, &self.id, &self.node_rev);

        tracing::debug!(
            parent = %self.id,
            entry = name,
            from = %child_id,
            to = %new_id,
            "cloned child"
        );
        Ok(DagNode {
            id: new_id,
            node_rev,
        })
    }

    pub fn make_file(&mut self, trail: &mut Trail<'_>, name: &str) -> Result<DagNode> {
        self.make_entry(trail, name, NodeKind::File)
    }

    pub fn make_dir(&mut self, trail: &mut Trail<'_>, name: &str) -> Result<DagNode> {
        self.make_entry(trail, name, NodeKind::Dir)
    }

    fn make_entry(&mut self, trail: &mut Trail<'_>, name: &str, kind: NodeKind) -> Result<DagNode> {
        self.reload(trail)?;
        self.require_mutable()?;
        if self.entries()?.iter().any(|e| e.name == name) {
            return Err(FsError::AlreadyExists(name.to_string()));
        }

        let node_rev = NodeRevision::new_mutable(kind, &self.id.to_string());
        let id = tables::create_node(trail, &node_rev)?;

        if let Some(entries) = self.node_rev.entries_mut() {
            entries.push(DirEntry::new(name, id.clone()));
        }
        tables::put_node_revision(trail, &self.id, &self.node_rev);

        tracing::debug!(
            parent = %self.id,
            entry = name,
            id = %id,
            kind = kind.as_str(),
            "created entry"
        );
        Ok(DagNode { id, node_rev })
    }

    /// Remove the entry `name` from this mutable directory.
    ///
    /// A mutable child directory must be empty; immutable children are
    /// unlinked whatever they contain.
    pub fn delete(&mut self, trail: &mut Trail<'_>, name: &str) -> Result<()> {
        self.reload(trail)?;
        if !self.is_directory() {
            return Err(FsError::NotDirectory(self.id.clone()));
        }
        self.require_mutable()?;

        let position = self
            .entries()?
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| FsError::NoSuchEntry(name.to_string()))?;

        let child = DagNode::load(trail, &self.entries()?[position].id)?;
        if child.is_mutable() && child.entries().is_ok_and(|entries| !entries.is_empty()) {
            return Err(FsError::DirNotEmpty(name.to_string()));
        }

        if let Some(entries) = self.node_rev.entries_mut() {
            entries.remove(position);
        }
        tables::put_node_revision(trail, &self.id, &self.node_rev);

        tracing::debug!(parent = %self.id, entry = name, "deleted entry");
        Ok(())
    }

    /// Replace the contents of this mutable file.
    pub fn set_contents(&mut self, trail: &mut Trail<'_>, data: &[u8]) -> Result<()> {
        self.reload(trail)?;
        if !self.is_file() {
            return Err(FsError::NotFile(self.id.clone()));
        }
        self.require_mutable()?;

        let key = reps::store_contents(trail, self.node_rev.rep_key(), data)?;
        self.node_rev.body = NodeBody::File(Some(key));
        tables::put_node_revision(trail, &self.id, &self.node_rev);
        tracing::debug!(id = %self.id, len = data.len(), "set contents");
        Ok(())
    }

    /// Contents of this file; empty if none were ever set.
    pub fn get_contents(&self, trail: &Trail<'_>) -> Result<Vec<u8>> {
        if !self.is_file() {
            return Err(FsError::NotFile(self.id.clone()));
        }
        match self.node_rev.rep_key() {
            Some(key) => reps::read_contents(trail, key),
            None => Ok(Vec::new()),
        }
    }

    fn require_mutable(&self) -> Result<()> {
        if self.is_mutable() {
            Ok(())
        } else {
            Err(FsError::NotMutable(self.id.clone()))
        }
    }

    /// Re-read the node revision from the trail.
    ///
    /// Inspectors (`entries`, `get_proplist`, `is_mutable`, ...) answer from
    /// the copy read last; another handle to the same node, or a commit that
    /// froze it, is only seen after a reload. Every mutating operation
    /// reloads before checking its preconditions.
    pub fn reload(&mut self, trail: &Trail<'_>) -> Result<()> {
        self.node_rev = tables::get_node_revision(trail, &self.id)?;
        Ok(())
    }
}

/// Root directory of revision `rev`
pub fn revision_root(trail: &Trail<'_>, rev: u64) -> Result<DagNode> {
    let root_id = tables::get_rev_root(trail, rev)?;
    DagNode::load(trail, &root_id)
}

/// Make the root of transaction `txn` mutable and return it.
pub fn clone_root(trail: &mut Trail<'_>, txn: &str) -> Result<DagNode> {
    let (root_id, base_root_id) = tables::get_txn_roots(trail, txn)?;
    if root_id != base_root_id {
        return DagNode::load(trail, &root_id);
    }

    let base = DagNode::load(trail, &base_root_id)?;
    let node_rev = base.node_rev.to_mutable(txn);
    let new_id = tables::create_successor(trail, &base_root_id, &node_rev)?;
    tables::set_txn_root(trail, txn, &new_id)?;

    tracing::debug!(txn, from = %base_root_id, to = %new_id, "cloned root");
    Ok(DagNode {
        id: new_id,
        node_rev,
    })
}

/// Follow a `/`-separated path down from `root`. Empty components are
/// skipped, so `""` and `"/"` name the root itself.
pub fn open_path(trail: &Trail<'_>, root: &DagNode, path: &str) -> Result<DagNode> {
    path.split('/')
        .filter(|component| !component.is_empty())
        .try_fold(root.clone(), |node, component| node.open(trail, component))
}

/// Freeze every mutable node reachable from `id`, returning how many were
/// frozen. Mutable nodes are only reachable through mutable parents, so the
/// walk stops at the first immutable node on each path.
pub fn freeze_tree(trail: &mut Trail<'_>, id: &NodeRevId) -> Result<usize> {
    let mut node_rev = tables::get_node_revision(trail, id)?;
    if !node_rev.is_mutable() {
        return Ok(0);
    }
    node_rev.clear_mutable();
    tables::put_node_revision(trail, id, &node_rev);

    let mut frozen = 1;
    if let Some(entries) = node_rev.entries() {
        for entry in entries {
            frozen += freeze_tree(trail, &entry.id)?;
        }
    }
    Ok(frozen)
}

/// Create the empty root directory `0.0` and revision 0.
pub fn init_fs(trail: &mut Trail<'_>) -> Result<()> {
    let root_id = NodeRevId::root();
    tables::put_node_revision(trail, &root_id, &NodeRevision::empty_dir());

    let mut proplist = PropList::new();
    proplist.set(tables::PROP_REVISION_DATE, tables::timestamp());
    let rev = tables::put_rev(trail, &Revision { root_id, proplist })?;
    if rev != 0 {
        return Err(FsError::corrupt(format!(
            "initial revision is {}, not 0",
            rev
        )));
    }

    tracing::info!("initialized filesystem at revision 0");
    Ok(())
}
