use crate::error::SkiffResult;
use crate::io::{ReadExt, WriteExt};
use std::io::{prelude::*, BufReader};

/// bumped when the structural schema of any node type changes
pub const SCHEMA_VERSION: u8 = 1;

pub trait Serialize {
    fn serialize(&self, writer: &mut dyn Write) -> SkiffResult<()>;

    fn serialize_to_vec(&self) -> SkiffResult<Vec<u8>> {
        let mut buf = vec![];
        self.serialize(&mut buf)?;
        Ok(buf)
    }
}

pub trait Deserialize {
    fn deserialize(reader: &mut impl BufRead) -> SkiffResult<Self>
    where
        Self: Sized;

    fn deserialize_unbuffered(reader: impl Read) -> SkiffResult<Self>
    where
        Self: Sized,
    {
        Self::deserialize(&mut BufReader::new(reader))
    }

    fn deserialize_from_slice(slice: &[u8]) -> SkiffResult<Self>
    where
        Self: Sized,
    {
        Self::deserialize(&mut &slice[..])
    }
}

/// a field whose tag this schema version does not know about;
/// retained verbatim so round-tripping newer data is lossless
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawField {
    pub tag: u8,
    pub bytes: Vec<u8>,
}

/// writer for the numbered-field framing shared by all node types:
/// `[field count: u8]` then per field `[tag: u8][len: u32][payload]`
pub(crate) struct FieldWriter {
    fields: Vec<(u8, Vec<u8>)>,
}

impl FieldWriter {
    pub fn new() -> Self {
        Self { fields: vec![] }
    }

    pub fn field(&mut self, tag: u8, bytes: Vec<u8>) -> &mut Self {
        debug_assert!(self.fields.iter().all(|(t, _)| *t != tag), "duplicate field tag {}", tag);
        self.fields.push((tag, bytes));
        self
    }

    pub fn raw_fields(&mut self, extra: &[RawField]) -> &mut Self {
        for field in extra {
            self.field(field.tag, field.bytes.clone());
        }
        self
    }

    pub fn finish(self, writer: &mut dyn Write) -> SkiffResult<()> {
        writer.write_u8(self.fields.len() as u8)?;
        for (tag, bytes) in &self.fields {
            writer.write_u8(*tag)?;
            writer.write_data(bytes)?;
        }
        Ok(())
    }
}

/// reads the field framing back; deserializers match on the tag themselves
/// and stash anything unrecognized as a [`RawField`]
pub(crate) fn read_fields(reader: &mut impl BufRead) -> SkiffResult<Vec<(u8, Vec<u8>)>> {
    let count = reader.read_u8()?;
    let mut fields = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let tag = reader.read_u8()?;
        let bytes = reader.read_data()?;
        fields.push((tag, bytes));
    }
    Ok(fields)
}
