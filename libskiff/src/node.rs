mod commit;
mod directory;
mod file;
mod ghost;

pub use commit::{Commit, MergeMarker};
pub use directory::Directory;
pub use file::File;
pub use ghost::Ghost;

use crate::error::{SkiffError, SkiffResult};
use crate::hash::{ContentHash, HASH_SIZE};
use crate::path::CatalogPath;
use crate::serialize::{Deserialize, RawField, Serialize};
use chrono::{DateTime, Utc};
use num_enum::TryFromPrimitive;
use std::fmt::{self, Display, Formatter};
use std::io::{BufRead, Write};

#[cfg(test)]
mod tests;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum NodeType {
    File      = 1,
    Directory = 2,
    Commit    = 3,
    Ghost     = 4,
}

impl Display for NodeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::File => write!(f, "file"),
            NodeType::Directory => write!(f, "directory"),
            NodeType::Commit => write!(f, "commit"),
            NodeType::Ghost => write!(f, "ghost"),
        }
    }
}

// field tags shared by every node schema; variant-specific tags start at 5
pub(crate) const TAG_PATH: u8 = 1;
pub(crate) const TAG_INODE: u8 = 2;
pub(crate) const TAG_MOD_TIME: u8 = 3;
pub(crate) const TAG_HASH: u8 = 4;

/// metadata common to all node variants
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBase {
    pub(crate) path: CatalogPath,
    pub(crate) name: String,
    pub(crate) inode: u64,
    pub(crate) hash: ContentHash,
    pub(crate) mod_time: DateTime<Utc>,
    /// fields from newer schema versions, preserved on round-trip
    pub(crate) extra: Vec<RawField>,
}

impl NodeBase {
    pub(crate) fn new(path: CatalogPath, inode: u64) -> Self {
        let name = path.name().to_owned();
        Self {
            path,
            name,
            inode,
            hash: ContentHash::UNKNOWN,
            mod_time: Utc::now(),
            extra: vec![],
        }
    }

    pub(crate) fn set_path(&mut self, path: CatalogPath) {
        self.name = path.name().to_owned();
        self.path = path;
    }
}

/// the sealed sum of all node shapes; everything the tree holds is one of these
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    File(File),
    Directory(Directory),
    Commit(Commit),
    Ghost(Ghost),
}

impl Node {
    pub fn node_type(&self) -> NodeType {
        match self {
            Node::File(..) => NodeType::File,
            Node::Directory(..) => NodeType::Directory,
            Node::Commit(..) => NodeType::Commit,
            Node::Ghost(..) => NodeType::Ghost,
        }
    }

    pub(crate) fn base(&self) -> &NodeBase {
        match self {
            Node::File(file) => &file.base,
            Node::Directory(dir) => &dir.base,
            Node::Commit(commit) => &commit.base,
            Node::Ghost(ghost) => &ghost.base,
        }
    }

    pub(crate) fn base_mut(&mut self) -> &mut NodeBase {
        match self {
            Node::File(file) => &mut file.base,
            Node::Directory(dir) => &mut dir.base,
            Node::Commit(commit) => &mut commit.base,
            Node::Ghost(ghost) => &mut ghost.base,
        }
    }

    pub fn path(&self) -> &CatalogPath {
        &self.base().path
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }

    pub fn inode(&self) -> u64 {
        self.base().inode
    }

    pub fn mod_time(&self) -> DateTime<Utc> {
        self.base().mod_time
    }

    /// the node's content address; a ghost reports the digest of the node it
    /// replaced
    pub fn content_hash(&self) -> ContentHash {
        match self {
            Node::Ghost(ghost) => ghost.wrapped().content_hash(),
            node => node.base().hash,
        }
    }

    /// path of the containing directory; `BadNode` for the detached variants
    pub fn parent_path(&self) -> SkiffResult<CatalogPath> {
        self.path().parent().ok_or_else(|| anyhow!(SkiffError::BadNode(self.path().clone())))
    }

    /// the containing directory in `lkr`'s staging tree
    pub fn parent<'a>(&self, lkr: &'a crate::linker::Linker) -> SkiffResult<&'a Directory> {
        lkr.lookup_directory(&self.parent_path()?)
    }

    pub fn is_ghost(&self) -> bool {
        matches!(self, Node::Ghost(..))
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Node::Directory(..))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Node::File(..))
    }

    pub fn as_file(&self) -> SkiffResult<&File> {
        match self {
            Node::File(file) => Ok(file),
            node => bail!(SkiffError::BadNode(node.path().clone())),
        }
    }

    pub fn as_directory(&self) -> SkiffResult<&Directory> {
        match self {
            Node::Directory(dir) => Ok(dir),
            node => bail!(SkiffError::BadNode(node.path().clone())),
        }
    }

    pub fn as_directory_mut(&mut self) -> SkiffResult<&mut Directory> {
        match self {
            Node::Directory(dir) => Ok(dir),
            node => bail!(SkiffError::BadNode(node.path().clone())),
        }
    }

    pub fn as_ghost(&self) -> SkiffResult<&Ghost> {
        match self {
            Node::Ghost(ghost) => Ok(ghost),
            node => bail!(SkiffError::BadNode(node.path().clone())),
        }
    }

    pub fn into_file(self) -> SkiffResult<File> {
        match self {
            Node::File(file) => Ok(file),
            node => bail!(SkiffError::BadNode(node.path().clone())),
        }
    }

    pub fn into_directory(self) -> SkiffResult<Directory> {
        match self {
            Node::Directory(dir) => Ok(dir),
            node => bail!(SkiffError::BadNode(node.path().clone())),
        }
    }

    /// re-roots the node (and every descendant) at `path`
    pub(crate) fn set_path(&mut self, path: CatalogPath) {
        if let Node::Directory(dir) = self {
            let names: Vec<String> = dir.child_names().map(str::to_owned).collect();
            for name in names {
                let child_path = path.join(&name);
                dir.child_mut(&name).expect("name came from the map").set_path(child_path);
            }
        }
        self.base_mut().set_path(path);
    }

    pub(crate) fn touch(&mut self) {
        self.base_mut().mod_time = Utc::now();
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.node_type(), self.path())
    }
}

impl Serialize for Node {
    fn serialize(&self, writer: &mut dyn Write) -> SkiffResult<()> {
        writer.write_all(&[self.node_type() as u8])?;
        match self {
            Node::File(file) => file.serialize_fields(writer),
            Node::Directory(dir) => dir.serialize_fields(writer),
            Node::Commit(commit) => commit.serialize_fields(writer),
            Node::Ghost(ghost) => ghost.serialize_fields(writer),
        }
    }
}

impl Deserialize for Node {
    fn deserialize(reader: &mut impl BufRead) -> SkiffResult<Self> {
        let mut discriminator = [0; 1];
        reader.read_exact(&mut discriminator)?;
        match NodeType::try_from(discriminator[0])? {
            NodeType::File => Ok(Node::File(File::deserialize_fields(reader)?)),
            NodeType::Directory => Ok(Node::Directory(Directory::deserialize_fields(reader)?)),
            NodeType::Commit => Ok(Node::Commit(Commit::deserialize_fields(reader)?)),
            NodeType::Ghost => Ok(Node::Ghost(Ghost::deserialize_fields(reader)?)),
        }
    }
}

// field payload decoding helpers shared by the variant schemas

pub(crate) fn parse_u64(bytes: &[u8]) -> SkiffResult<u64> {
    let bytes: [u8; 8] = bytes.try_into().map_err(|_| anyhow!("truncated integer field"))?;
    Ok(u64::from_le_bytes(bytes))
}

pub(crate) fn parse_hash(bytes: &[u8]) -> SkiffResult<ContentHash> {
    let bytes: [u8; HASH_SIZE] =
        bytes.try_into().map_err(|_| anyhow!("truncated hash field"))?;
    Ok(ContentHash::new(bytes))
}

pub(crate) fn parse_text(bytes: Vec<u8>) -> SkiffResult<String> {
    Ok(String::from_utf8(bytes)?)
}

pub(crate) fn parse_time(bytes: Vec<u8>) -> SkiffResult<DateTime<Utc>> {
    let text = parse_text(bytes)?;
    Ok(DateTime::parse_from_rfc3339(&text)?.with_timezone(&Utc))
}
