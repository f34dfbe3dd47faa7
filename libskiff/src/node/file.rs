use super::{NodeBase, TAG_HASH, TAG_INODE, TAG_MOD_TIME, TAG_PATH};
use crate::error::SkiffResult;
use crate::hash::ContentHash;
use crate::path::CatalogPath;
use crate::serialize::{read_fields, FieldWriter, RawField};
use chrono::Utc;
use std::io::{BufRead, Write};

const TAG_SIZE: u8 = 5;
const TAG_KEY: u8 = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub(crate) base: NodeBase,
    size: u64,
    key: Vec<u8>,
}

impl File {
    /// an empty file; the caller attaches and stages it (constructors never
    /// touch the parent)
    pub fn new(path: CatalogPath, inode: u64) -> Self {
        Self { base: NodeBase::new(path, inode), size: 0, key: vec![] }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn content_hash(&self) -> ContentHash {
        self.base.hash
    }

    pub fn set_content(&mut self, hash: ContentHash) {
        self.base.hash = hash;
        self.base.mod_time = Utc::now();
    }

    pub fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    pub fn set_key(&mut self, key: Vec<u8>) {
        self.key = key;
    }

    pub(crate) fn serialize_fields(&self, writer: &mut dyn Write) -> SkiffResult<()> {
        let mut w = FieldWriter::new();
        w.field(TAG_PATH, self.base.path.as_str().as_bytes().to_vec())
            .field(TAG_INODE, self.base.inode.to_le_bytes().to_vec())
            .field(TAG_MOD_TIME, self.base.mod_time.to_rfc3339().into_bytes())
            .field(TAG_HASH, self.base.hash.as_bytes().to_vec())
            .field(TAG_SIZE, self.size.to_le_bytes().to_vec())
            .field(TAG_KEY, self.key.clone())
            .raw_fields(&self.base.extra);
        w.finish(writer)
    }

    pub(crate) fn deserialize_fields(reader: &mut impl BufRead) -> SkiffResult<Self> {
        let mut path = None;
        let mut inode = None;
        let mut mod_time = None;
        let mut hash = None;
        let mut size = None;
        let mut key = None;
        let mut extra = vec![];

        for (tag, bytes) in read_fields(reader)? {
            match tag {
                TAG_PATH => path = Some(CatalogPath::new(super::parse_text(bytes)?)),
                TAG_INODE => inode = Some(super::parse_u64(&bytes)?),
                TAG_MOD_TIME => mod_time = Some(super::parse_time(bytes)?),
                TAG_HASH => hash = Some(super::parse_hash(&bytes)?),
                TAG_SIZE => size = Some(super::parse_u64(&bytes)?),
                TAG_KEY => key = Some(bytes),
                _ => extra.push(RawField { tag, bytes }),
            }
        }

        let path = path.ok_or_else(|| anyhow!("file schema is missing its path"))?;
        let mut base = NodeBase::new(path, inode.unwrap_or(0));
        base.hash = hash.unwrap_or(ContentHash::UNKNOWN);
        if let Some(mod_time) = mod_time {
            base.mod_time = mod_time;
        }
        base.extra = extra;
        Ok(Self { base, size: size.unwrap_or(0), key: key.unwrap_or_default() })
    }
}
