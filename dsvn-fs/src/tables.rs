//! Typed access to the filesystem tables
//!
//! ```text
//! nodes         ID        -> NODE-REVISION
//! revisions     REV       -> (revision ROOT-ID PROPLIST)
//! transactions  NAME      -> (transaction ROOT-ID BASE-ROOT-ID BASE-REV)
//! meta          next-node-id | next-txn-key | next-rep-key | youngest | metadata
//! ```

use crate::error::{FsError, Result};
use crate::id::NodeRevId;
use crate::key_gen::next_key;
use crate::node_rev::{NodeRevision, PropList};
use crate::skel::Skel;
use crate::store::Table;
use crate::trail::Trail;

const NEXT_NODE_ID: &[u8] = b"next-node-id";
const YOUNGEST: &[u8] = b"youngest";
pub(crate) const NEXT_TXN_KEY: &[u8] = b"next-txn-key";
pub(crate) const NEXT_REP_KEY: &[u8] = b"next-rep-key";

fn read_skel(trail: &Trail<'_>, table: Table, key: &[u8]) -> Result<Option<Skel>> {
    trail
        .get(table, key)?
        .map(|data| Skel::parse(&data))
        .transpose()
}

fn read_u64(trail: &Trail<'_>, key: &[u8]) -> Result<Option<u64>> {
    let Some(data) = trail.get(Table::Meta, key)? else {
        return Ok(None);
    };
    std::str::from_utf8(&data)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Some)
        .ok_or_else(|| {
            FsError::corrupt(format!(
                "meta record '{}' is not a number",
                String::from_utf8_lossy(key)
            ))
        })
}

fn write_u64(trail: &mut Trail<'_>, key: &[u8], value: u64) {
    trail.put(Table::Meta, key, value.to_string().into_bytes());
}

/// Allocate the next base-36 key from the counter stored under `counter`.
pub fn allocate_key(trail: &mut Trail<'_>, counter: &[u8]) -> Result<String> {
    let key = match trail.get(Table::Meta, counter)? {
        Some(data) => String::from_utf8(data)
            .map_err(|_| FsError::corrupt("key counter is not valid UTF-8"))?,
        None => "0".to_string(),
    };
    let next = next_key(&key)
        .ok_or_else(|| FsError::corrupt(format!("invalid key counter '{}'", key)))?;
    trail.put(Table::Meta, counter, next.into_bytes());
    Ok(key)
}

// Nodes

pub fn get_node_revision(trail: &Trail<'_>, id: &NodeRevId) -> Result<NodeRevision> {
    let skel = read_skel(trail, Table::Nodes, &id.to_key())?
        .ok_or_else(|| FsError::NotFound(format!("node-revision {}", id)))?;
    NodeRevision::from_skel(&skel)
}

pub fn put_node_revision(trail: &mut Trail<'_>, id: &NodeRevId, node_rev: &NodeRevision) {
    trail.put(Table::Nodes, &id.to_key(), node_rev.to_skel().unparse());
}

pub fn node_exists(trail: &Trail<'_>, id: &NodeRevId) -> Result<bool> {
    Ok(trail.contains(Table::Nodes, &id.to_key())?)
}

/// Store `node_rev` as the first revision of a brand-new node.
pub fn create_node(trail: &mut Trail<'_>, node_rev: &NodeRevision) -> Result<NodeRevId> {
    let node = read_u64(trail, NEXT_NODE_ID)?.unwrap_or(1);
    write_u64(trail, NEXT_NODE_ID, node + 1);

    let id = NodeRevId::new_node(node);
    if node_exists(trail, &id)? {
        return Err(FsError::corrupt(format!("node-revision {} already exists", id)));
    }
    put_node_revision(trail, &id, node_rev);
    Ok(id)
}

/// Store `node_rev` as a new revision of the node `old_id` belongs to.
///
/// The successor is the next revision on the same line when that id is free;
/// otherwise the first free branch `old_id.B.1`.
pub fn create_successor(
    trail: &mut Trail<'_>,
    old_id: &NodeRevId,
    node_rev: &NodeRevision,
) -> Result<NodeRevId> {
    let mut id = old_id.next_revision();
    let mut branch = 1;
    while node_exists(trail, &id)? {
        id = old_id.branch(branch);
        branch += 1;
    }
    put_node_revision(trail, &id, node_rev);
    Ok(id)
}

// Revisions

/// Revision property holding the commit time
pub const PROP_REVISION_DATE: &str = "svn:date";

/// Current time in the `svn:date` format
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// A committed revision record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub root_id: NodeRevId,
    pub proplist: PropList,
}

impl Revision {
    fn to_skel(&self) -> Skel {
        Skel::list(vec![
            Skel::str_atom("revision"),
            Skel::str_atom(&self.root_id.to_string()),
            self.proplist.to_skel(),
        ])
    }

    fn from_skel(skel: &Skel) -> Result<Self> {
        match skel.as_list() {
            Some([tag, root, props]) if tag.matches_atom("revision") => Ok(Self {
                root_id: root.atom_str()?.parse()?,
                proplist: PropList::from_skel(props)?,
            }),
            _ => Err(FsError::malformed("revision must be (revision ROOT-ID PROPLIST)")),
        }
    }
}

/// Youngest committed revision, `None` before the filesystem is initialized
pub fn youngest_rev(trail: &Trail<'_>) -> Result<Option<u64>> {
    read_u64(trail, YOUNGEST)
}

/// Record a new revision after the youngest one and return its number.
pub fn put_rev(trail: &mut Trail<'_>, revision: &Revision) -> Result<u64> {
    let rev = match youngest_rev(trail)? {
        Some(youngest) => youngest + 1,
        None => 0,
    };
    trail.put(Table::Revisions, rev.to_string().as_bytes(), revision.to_skel().unparse());
    write_u64(trail, YOUNGEST, rev);
    Ok(rev)
}

pub fn get_rev(trail: &Trail<'_>, rev: u64) -> Result<Revision> {
    let skel = read_skel(trail, Table::Revisions, rev.to_string().as_bytes())?
        .ok_or_else(|| FsError::NotFound(format!("revision {}", rev)))?;
    Revision::from_skel(&skel)
}

pub fn get_rev_root(trail: &Trail<'_>, rev: u64) -> Result<NodeRevId> {
    Ok(get_rev(trail, rev)?.root_id)
}

// Transactions

/// An open transaction record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub root_id: NodeRevId,
    pub base_root_id: NodeRevId,
    pub base_rev: u64,
}

impl Transaction {
    fn to_skel(&self) -> Skel {
        Skel::list(vec![
            Skel::str_atom("transaction"),
            Skel::str_atom(&self.root_id.to_string()),
            Skel::str_atom(&self.base_root_id.to_string()),
            Skel::str_atom(&self.base_rev.to_string()),
        ])
    }

    fn from_skel(skel: &Skel) -> Result<Self> {
        match skel.as_list() {
            Some([tag, root, base_root, base_rev]) if tag.matches_atom("transaction") => Ok(Self {
                root_id: root.atom_str()?.parse()?,
                base_root_id: base_root.atom_str()?.parse()?,
                base_rev: base_rev
                    .atom_str()?
                    .parse()
                    .map_err(|_| FsError::malformed("transaction base revision is not a number"))?,
            }),
            _ => Err(FsError::malformed(
                "transaction must be (transaction ROOT-ID BASE-ROOT-ID BASE-REV)",
            )),
        }
    }
}

/// Open a transaction on top of revision `base_rev` and return its name.
pub fn create_txn(trail: &mut Trail<'_>, base_rev: u64) -> Result<String> {
    let base_root_id = get_rev_root(trail, base_rev)?;
    let name = allocate_key(trail, NEXT_TXN_KEY)?;
    let txn = Transaction {
        root_id: base_root_id.clone(),
        base_root_id,
        base_rev,
    };
    trail.put(Table::Transactions, name.as_bytes(), txn.to_skel().unparse());
    Ok(name)
}

pub fn get_txn(trail: &Trail<'_>, name: &str) -> Result<Transaction> {
    let skel = read_skel(trail, Table::Transactions, name.as_bytes())?
        .ok_or_else(|| FsError::NotFound(format!("transaction '{}'", name)))?;
    Transaction::from_skel(&skel)
}

/// Current and base root ids of a transaction
pub fn get_txn_roots(trail: &Trail<'_>, name: &str) -> Result<(NodeRevId, NodeRevId)> {
    let txn = get_txn(trail, name)?;
    Ok((txn.root_id, txn.base_root_id))
}

pub fn set_txn_root(trail: &mut Trail<'_>, name: &str, root_id: &NodeRevId) -> Result<()> {
    let mut txn = get_txn(trail, name)?;
    txn.root_id = root_id.clone();
    trail.put(Table::Transactions, name.as_bytes(), txn.to_skel().unparse());
    Ok(())
}

pub fn delete_txn(trail: &mut Trail<'_>, name: &str) -> Result<()> {
    // Fail on unknown names rather than silently succeeding
    get_txn(trail, name)?;
    trail.delete(Table::Transactions, name.as_bytes());
    Ok(())
}
