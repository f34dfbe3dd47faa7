use crate::error::SkiffGenericError;
use rustc_hex::{FromHex, ToHex};
use sha1::{Digest, Sha1};
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

pub const HASH_SIZE: usize = 20;

/// content address of a node; merkle digest for directories,
/// backend-assigned digest for file blobs
#[derive(PartialEq, Eq, Hash, Clone, Ord, PartialOrd, Copy)]
#[repr(transparent)]
pub struct ContentHash([u8; HASH_SIZE]);

impl ContentHash {
    /// digest of a directory with no live children (sha1 of the empty string)
    // da39a3ee5e6b4b0d3255bfef95601890afd80709
    pub const EMPTY_DIR: Self = Self([
        0xda, 0x39, 0xa3, 0xee, 0x5e, 0x6b, 0x4b, 0x0d, 0x32, 0x55, 0xbf, 0xef, 0x95, 0x60, 0x18,
        0x90, 0xaf, 0xd8, 0x07, 0x09,
    ]);
    /// the all-zero value stands in for "no hash assigned yet";
    /// sha1 realistically never produces it
    pub const UNKNOWN: Self = Self([0; HASH_SIZE]);

    #[inline]
    pub fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    #[inline]
    pub fn is_unknown(self) -> bool {
        self == Self::UNKNOWN
    }

    #[inline]
    pub fn is_known(self) -> bool {
        self != Self::UNKNOWN
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    pub fn short(&self) -> String {
        self.to_hex()[0..7].to_owned()
    }
}

// purely for convenience
#[cfg(test)]
impl<'a> From<&'a str> for ContentHash {
    fn from(s: &'a str) -> Self {
        Self::from_str(s).unwrap()
    }
}

#[cfg(test)]
impl quickcheck::Arbitrary for ContentHash {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        use quickcheck::Arbitrary;
        Self((0..HASH_SIZE).map(|_| u8::arbitrary(g)).collect::<Vec<_>>().try_into().unwrap())
    }
}

impl FromStr for ContentHash {
    type Err = SkiffGenericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_end();
        ensure!(s.len() == 2 * HASH_SIZE, "creating hash from invalid hex string (incorrect length)");
        let bytes = s.from_hex::<Vec<u8>>()?;
        Ok(Self(bytes.try_into().expect("length checked above")))
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let hex = self.0.to_hex::<String>();
        if f.alternate() { write!(f, "{}", &hex[..7]) } else { write!(f, "{}", hex) }
    }
}

pub fn hash_bytes(bytes: impl AsRef<[u8]>) -> ContentHash {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    ContentHash::new(hasher.finalize().into())
}
