use crate::error::SkiffResult;
use crate::hash::{ContentHash, HASH_SIZE};
use std::io::{Read, Write};

// all integers in the wire format are little-endian

pub(crate) trait ReadExt: Read {
    fn read_u8(&mut self) -> SkiffResult<u8> {
        let mut buf = [0; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u32(&mut self) -> SkiffResult<u32> {
        let mut buf = [0; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&mut self) -> SkiffResult<u64> {
        let mut buf = [0; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_bytes(&mut self, len: usize) -> SkiffResult<Vec<u8>> {
        let mut buf = vec![0; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// length-prefixed byte string
    fn read_data(&mut self) -> SkiffResult<Vec<u8>> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }

    /// length-prefixed utf8 text
    fn read_text(&mut self) -> SkiffResult<String> {
        Ok(String::from_utf8(self.read_data()?)?)
    }

    fn read_hash(&mut self) -> SkiffResult<ContentHash> {
        let mut buf = [0; HASH_SIZE];
        self.read_exact(&mut buf)?;
        Ok(ContentHash::new(buf))
    }
}

impl<R: Read + ?Sized> ReadExt for R {
}

pub(crate) trait WriteExt: Write {
    fn write_u8(&mut self, n: u8) -> SkiffResult<()> {
        Ok(self.write_all(&[n])?)
    }

    fn write_u32(&mut self, n: u32) -> SkiffResult<()> {
        Ok(self.write_all(&n.to_le_bytes())?)
    }

    fn write_u64(&mut self, n: u64) -> SkiffResult<()> {
        Ok(self.write_all(&n.to_le_bytes())?)
    }

    fn write_data(&mut self, bytes: &[u8]) -> SkiffResult<()> {
        self.write_u32(bytes.len() as u32)?;
        Ok(self.write_all(bytes)?)
    }

    fn write_text(&mut self, s: &str) -> SkiffResult<()> {
        self.write_data(s.as_bytes())
    }

    fn write_hash(&mut self, hash: ContentHash) -> SkiffResult<()> {
        Ok(self.write_all(hash.as_bytes())?)
    }
}

impl<W: Write + ?Sized> WriteExt for W {
}
