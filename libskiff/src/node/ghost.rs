use super::{Node, NodeBase, NodeType, TAG_INODE, TAG_MOD_TIME, TAG_PATH};
use crate::error::{SkiffError, SkiffResult};
use crate::path::CatalogPath;
use crate::serialize::{read_fields, Deserialize, FieldWriter, RawField, Serialize};
use std::io::{BufRead, Write};

const TAG_OLD_TYPE: u8 = 5;
const TAG_OLD_NODE: u8 = 6;

/// tombstone left at a vacated path. No metadata is lost: the previous node
/// is carried whole so it can be resurrected if the path comes back.
#[derive(Debug, Clone, PartialEq)]
pub struct Ghost {
    pub(crate) base: NodeBase,
    old_type: NodeType,
    wrapped: Box<Node>,
}

impl Ghost {
    /// converts a live node into its ghost form; only files and directories
    /// can be entombed
    pub fn entomb(node: Node) -> SkiffResult<Self> {
        match node.node_type() {
            NodeType::File | NodeType::Directory => {}
            ty => bail!(SkiffError::UnexpectedNodeType(ty)),
        }
        let mut base = NodeBase::new(node.path().clone(), node.inode());
        base.hash = node.content_hash();
        Ok(Self { base, old_type: node.node_type(), wrapped: Box::new(node) })
    }

    /// the inverse of [`Ghost::entomb`]
    pub fn exhume(self) -> Node {
        *self.wrapped
    }

    pub fn old_type(&self) -> NodeType {
        self.old_type
    }

    pub fn wrapped(&self) -> &Node {
        &self.wrapped
    }

    pub(crate) fn serialize_fields(&self, writer: &mut dyn Write) -> SkiffResult<()> {
        let old_node_bytes = self.wrapped.serialize_to_vec()?;
        let mut w = FieldWriter::new();
        w.field(TAG_PATH, self.base.path.as_str().as_bytes().to_vec())
            .field(TAG_INODE, self.base.inode.to_le_bytes().to_vec())
            .field(TAG_MOD_TIME, self.base.mod_time.to_rfc3339().into_bytes())
            .field(TAG_OLD_TYPE, vec![self.old_type as u8])
            .field(TAG_OLD_NODE, old_node_bytes)
            .raw_fields(&self.base.extra);
        w.finish(writer)
    }

    pub(crate) fn deserialize_fields(reader: &mut impl BufRead) -> SkiffResult<Self> {
        let mut path = None;
        let mut inode = None;
        let mut mod_time = None;
        let mut old_type = None;
        let mut wrapped = None;
        let mut extra = vec![];

        for (tag, bytes) in read_fields(reader)? {
            match tag {
                TAG_PATH => path = Some(CatalogPath::new(super::parse_text(bytes)?)),
                TAG_INODE => inode = Some(super::parse_u64(&bytes)?),
                TAG_MOD_TIME => mod_time = Some(super::parse_time(bytes)?),
                TAG_OLD_TYPE => {
                    ensure!(bytes.len() == 1, "truncated node type discriminator");
                    old_type = Some(NodeType::try_from(bytes[0])?);
                }
                TAG_OLD_NODE => wrapped = Some(Node::deserialize_from_slice(&bytes)?),
                _ => extra.push(RawField { tag, bytes }),
            }
        }

        let wrapped = wrapped.ok_or_else(|| anyhow!("ghost schema is missing its wrapped node"))?;
        let old_type = old_type.ok_or_else(|| anyhow!("ghost schema is missing its old type"))?;
        ensure!(
            wrapped.node_type() == old_type,
            "ghost discriminator `{}` does not match its wrapped node `{}`",
            old_type,
            wrapped.node_type()
        );

        let path = path.unwrap_or_else(|| wrapped.path().clone());
        let mut base = NodeBase::new(path, inode.unwrap_or_else(|| wrapped.inode()));
        base.hash = wrapped.content_hash();
        if let Some(mod_time) = mod_time {
            base.mod_time = mod_time;
        }
        base.extra = extra;
        Ok(Self { base, old_type, wrapped: Box::new(wrapped) })
    }
}
