use super::{NodeBase, TAG_INODE, TAG_MOD_TIME};
use crate::error::SkiffResult;
use crate::hash::{hash_bytes, ContentHash};
use crate::io::{ReadExt, WriteExt};
use crate::path::CatalogPath;
use crate::serialize::{read_fields, FieldWriter, RawField};
use std::fmt::{self, Display, Formatter};
use std::io::{BufRead, Write};

const TAG_PARENT_HASH: u8 = 5;
const TAG_ROOT_HASH: u8 = 6;
const TAG_AUTHOR: u8 = 7;
const TAG_MESSAGE: u8 = 8;
const TAG_MERGE_MARKER: u8 = 9;

/// records that a commit integrated a remote head; the key to sync
/// idempotence and the lower bound for ancestor search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeMarker {
    pub with_peer: String,
    pub with_hash: ContentHash,
}

impl Display for MergeMarker {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#}", self.with_peer, self.with_hash)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub(crate) base: NodeBase,
    parent_hash: ContentHash,
    root_hash: ContentHash,
    author: String,
    message: String,
    merge_marker: Option<MergeMarker>,
}

impl Commit {
    pub(crate) fn new(
        parent_hash: ContentHash,
        root_hash: ContentHash,
        author: impl Into<String>,
        message: impl Into<String>,
        merge_marker: Option<MergeMarker>,
        inode: u64,
    ) -> Self {
        let mut commit = Self {
            base: NodeBase::new(CatalogPath::root(), inode),
            parent_hash,
            root_hash,
            author: author.into(),
            message: message.into(),
            merge_marker,
        };
        commit.seal();
        commit
    }

    /// the commit's identity: the digest of its identity fields
    pub fn hash(&self) -> ContentHash {
        self.base.hash
    }

    pub fn parent_hash(&self) -> ContentHash {
        self.parent_hash
    }

    pub fn root_hash(&self) -> ContentHash {
        self.root_hash
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn merge_marker(&self) -> Option<&MergeMarker> {
        self.merge_marker.as_ref()
    }

    pub fn mod_time(&self) -> chrono::DateTime<chrono::Utc> {
        self.base.mod_time
    }

    pub fn is_root_commit(&self) -> bool {
        self.parent_hash.is_unknown()
    }

    fn identity_bytes(&self) -> Vec<u8> {
        // infallible: all writers below are Vec writers
        let mut buf = vec![];
        buf.write_hash(self.parent_hash).unwrap();
        buf.write_hash(self.root_hash).unwrap();
        buf.write_text(&self.author).unwrap();
        buf.write_text(&self.message).unwrap();
        if let Some(marker) = &self.merge_marker {
            buf.write_text(&marker.with_peer).unwrap();
            buf.write_hash(marker.with_hash).unwrap();
        }
        buf
    }

    pub(crate) fn seal(&mut self) {
        self.base.hash = hash_bytes(self.identity_bytes());
    }

    pub(crate) fn serialize_fields(&self, writer: &mut dyn Write) -> SkiffResult<()> {
        let mut w = FieldWriter::new();
        w.field(TAG_INODE, self.base.inode.to_le_bytes().to_vec())
            .field(TAG_MOD_TIME, self.base.mod_time.to_rfc3339().into_bytes())
            .field(TAG_PARENT_HASH, self.parent_hash.as_bytes().to_vec())
            .field(TAG_ROOT_HASH, self.root_hash.as_bytes().to_vec())
            .field(TAG_AUTHOR, self.author.clone().into_bytes())
            .field(TAG_MESSAGE, self.message.clone().into_bytes());
        if let Some(marker) = &self.merge_marker {
            let mut bytes = vec![];
            bytes.write_text(&marker.with_peer)?;
            bytes.write_hash(marker.with_hash)?;
            w.field(TAG_MERGE_MARKER, bytes);
        }
        w.raw_fields(&self.base.extra);
        w.finish(writer)
    }

    pub(crate) fn deserialize_fields(reader: &mut impl BufRead) -> SkiffResult<Self> {
        let mut inode = None;
        let mut mod_time = None;
        let mut parent_hash = None;
        let mut root_hash = None;
        let mut author = None;
        let mut message = None;
        let mut merge_marker = None;
        let mut extra = vec![];

        for (tag, bytes) in read_fields(reader)? {
            match tag {
                TAG_INODE => inode = Some(super::parse_u64(&bytes)?),
                TAG_MOD_TIME => mod_time = Some(super::parse_time(bytes)?),
                TAG_PARENT_HASH => parent_hash = Some(super::parse_hash(&bytes)?),
                TAG_ROOT_HASH => root_hash = Some(super::parse_hash(&bytes)?),
                TAG_AUTHOR => author = Some(super::parse_text(bytes)?),
                TAG_MESSAGE => message = Some(super::parse_text(bytes)?),
                TAG_MERGE_MARKER => {
                    let mut slice = &bytes[..];
                    let with_peer = slice.read_text()?;
                    let with_hash = slice.read_hash()?;
                    merge_marker = Some(MergeMarker { with_peer, with_hash });
                }
                _ => extra.push(RawField { tag, bytes }),
            }
        }

        let mut commit = Self::new(
            parent_hash.ok_or_else(|| anyhow!("commit schema is missing its parent hash"))?,
            root_hash.ok_or_else(|| anyhow!("commit schema is missing its root hash"))?,
            author.ok_or_else(|| anyhow!("commit schema is missing its author"))?,
            message.unwrap_or_default(),
            merge_marker,
            inode.unwrap_or(0),
        );
        if let Some(mod_time) = mod_time {
            commit.base.mod_time = mod_time;
        }
        commit.base.extra = extra;
        Ok(commit)
    }
}

impl Display for Commit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:#} {}", self.hash(), self.message)
    }
}
