use super::{Node, NodeBase, TAG_HASH, TAG_INODE, TAG_MOD_TIME, TAG_PATH};
use crate::error::{SkiffError, SkiffResult};
use crate::hash::{hash_bytes, ContentHash};
use crate::io::ReadExt;
use crate::path::CatalogPath;
use crate::serialize::{read_fields, Deserialize, FieldWriter, RawField, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::io::{BufRead, Write};

const TAG_CHILDREN: u8 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Directory {
    pub(crate) base: NodeBase,
    // sorted by name so the merkle input is deterministic
    children: BTreeMap<String, Node>,
}

impl Directory {
    /// an empty directory; the caller attaches and stages it (constructors
    /// never touch the parent)
    pub fn new(path: CatalogPath, inode: u64) -> Self {
        let mut base = NodeBase::new(path, inode);
        base.hash = ContentHash::EMPTY_DIR;
        Self { base, children: BTreeMap::new() }
    }

    pub fn path(&self) -> &CatalogPath {
        &self.base.path
    }

    pub fn content_hash(&self) -> ContentHash {
        self.base.hash
    }

    pub fn lookup(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    pub(crate) fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.get_mut(name)
    }

    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.values()
    }

    pub(crate) fn child_names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    /// children that are not ghosts, in name order
    pub fn live_children(&self) -> impl Iterator<Item = &Node> {
        self.children.values().filter(|child| !child.is_ghost())
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// attaches `child` under this directory. A live node at the same name is
    /// rejected with `Exists`; a ghost at the name is displaced (resurrection).
    /// The caller re-hashes the ancestor chain through the linker.
    pub(crate) fn insert_child(&mut self, child: Node) -> SkiffResult<()> {
        ensure!(
            child.path().parent().as_ref() == Some(&self.base.path),
            SkiffError::BadNode(child.path().clone())
        );
        if let Some(existing) = self.children.get(child.name()) {
            if !existing.is_ghost() {
                bail!(SkiffError::Exists(child.path().clone()));
            }
        }
        self.children.insert(child.name().to_owned(), child);
        Ok(())
    }

    /// replaces whatever lives at the child's name; used for staging updates
    pub(crate) fn put_child(&mut self, child: Node) -> SkiffResult<()> {
        ensure!(
            child.path().parent().as_ref() == Some(&self.base.path),
            SkiffError::BadNode(child.path().clone())
        );
        self.children.insert(child.name().to_owned(), child);
        Ok(())
    }

    /// detaches the named child; `BadNode` if it does not belong to this
    /// directory
    pub(crate) fn take_child(&mut self, name: &str) -> SkiffResult<Node> {
        self.children
            .remove(name)
            .ok_or_else(|| anyhow!(SkiffError::BadNode(self.base.path.join(name))))
    }

    /// recomputes this directory's hash from its live children. Ghosts are
    /// left out so a removal is visible in the merkle root; the type tag
    /// distinguishes a file from a directory with a colliding digest.
    pub(crate) fn rehash(&mut self) {
        let mut input = vec![];
        for child in self.live_children() {
            input.push(child.node_type() as u8);
            input.extend_from_slice(child.name().as_bytes());
            input.push(0);
            input.extend_from_slice(child.content_hash().as_bytes());
        }
        self.base.hash = hash_bytes(&input);
    }

    /// resolves `path` to a node within this subtree; ghosts are returned
    pub(crate) fn node_at(&self, path: &CatalogPath) -> Option<&Node> {
        debug_assert!(path.starts_with(&self.base.path));
        let mut components = path.components().skip(self.base.path.depth());
        let first = components.next()?;
        let mut node = self.children.get(first)?;
        for name in components {
            node = match node {
                Node::Directory(dir) => dir.children.get(name)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// resolves `path` to a live node within this subtree
    pub(crate) fn live_node_at(&self, path: &CatalogPath) -> Option<&Node> {
        self.node_at(path).filter(|node| !node.is_ghost())
    }

    /// resolves `path` to a live directory within this subtree
    pub(crate) fn dir_at(&self, path: &CatalogPath) -> Option<&Directory> {
        if *path == self.base.path {
            return Some(self);
        }
        match self.live_node_at(path)? {
            Node::Directory(dir) => Some(dir),
            _ => None,
        }
    }

    pub(crate) fn dir_at_mut(&mut self, path: &CatalogPath) -> Option<&mut Directory> {
        debug_assert!(path.starts_with(&self.base.path));
        let depth = self.base.path.depth();
        let components: Vec<&str> = path.components().skip(depth).collect();
        let mut dir = self;
        for name in components {
            dir = match dir.children.get_mut(name) {
                Some(Node::Directory(child)) => child,
                _ => return None,
            };
        }
        Some(dir)
    }

    /// first live node with the given content hash, breadth-first in name
    /// order; the deterministic tie-break when several nodes share a digest
    pub(crate) fn find_by_hash(&self, hash: ContentHash) -> Option<&Node> {
        let mut queue: VecDeque<&Directory> = VecDeque::new();
        queue.push_back(self);
        while let Some(dir) = queue.pop_front() {
            for child in dir.live_children() {
                if child.content_hash() == hash {
                    return Some(child);
                }
                if let Node::Directory(subdir) = child {
                    queue.push_back(subdir);
                }
            }
        }
        None
    }

    pub(crate) fn serialize_fields(&self, writer: &mut dyn Write) -> SkiffResult<()> {
        let mut encoded_children = vec![];
        encoded_children.extend_from_slice(&(self.children.len() as u32).to_le_bytes());
        for child in self.children.values() {
            child.serialize(&mut encoded_children)?;
        }

        let mut w = FieldWriter::new();
        w.field(TAG_PATH, self.base.path.as_str().as_bytes().to_vec())
            .field(TAG_INODE, self.base.inode.to_le_bytes().to_vec())
            .field(TAG_MOD_TIME, self.base.mod_time.to_rfc3339().into_bytes())
            .field(TAG_HASH, self.base.hash.as_bytes().to_vec())
            .field(TAG_CHILDREN, encoded_children)
            .raw_fields(&self.base.extra);
        w.finish(writer)
    }

    pub(crate) fn deserialize_fields(reader: &mut impl BufRead) -> SkiffResult<Self> {
        let mut path = None;
        let mut inode = None;
        let mut mod_time = None;
        let mut hash = None;
        let mut children = BTreeMap::new();
        let mut extra = vec![];

        for (tag, bytes) in read_fields(reader)? {
            match tag {
                TAG_PATH => path = Some(CatalogPath::new(super::parse_text(bytes)?)),
                TAG_INODE => inode = Some(super::parse_u64(&bytes)?),
                TAG_MOD_TIME => mod_time = Some(super::parse_time(bytes)?),
                TAG_HASH => hash = Some(super::parse_hash(&bytes)?),
                TAG_CHILDREN => {
                    let mut slice = &bytes[..];
                    let count = slice.read_u32()?;
                    for _ in 0..count {
                        let child = Node::deserialize(&mut slice)?;
                        children.insert(child.name().to_owned(), child);
                    }
                }
                _ => extra.push(RawField { tag, bytes }),
            }
        }

        let path = path.ok_or_else(|| anyhow!("directory schema is missing its path"))?;
        let mut base = NodeBase::new(path, inode.unwrap_or(0));
        base.hash = hash.unwrap_or(ContentHash::EMPTY_DIR);
        if let Some(mod_time) = mod_time {
            base.mod_time = mod_time;
        }
        base.extra = extra;
        Ok(Self { base, children })
    }
}
