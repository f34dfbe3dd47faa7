use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

/// canonical absolute path within a catalog ("/a/b")
// always starts with `/`, never ends with one (except the root itself),
// no empty or `.` segments, `..` resolved at construction
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CatalogPath(String);

impl CatalogPath {
    pub fn root() -> Self {
        Self("/".to_owned())
    }

    pub fn new(s: impl AsRef<str>) -> Self {
        let mut segments: Vec<&str> = vec![];
        for segment in s.as_ref().split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    segments.pop();
                }
                segment => segments.push(segment),
            }
        }

        if segments.is_empty() {
            return Self::root();
        }

        let mut path = String::new();
        for segment in &segments {
            path.push('/');
            path.push_str(segment);
        }
        Self(path)
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// appends a single child segment
    pub fn join(&self, name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        debug_assert!(!name.is_empty() && !name.contains('/'));
        if self.is_root() {
            Self(format!("/{}", name))
        } else {
            Self(format!("{}/{}", self.0, name))
        }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_owned())),
            None => None,
        }
    }

    /// the last path segment, empty for the root
    pub fn name(&self) -> &str {
        if self.is_root() { "" } else { &self.0[self.0.rfind('/').map_or(0, |i| i + 1)..] }
    }

    /// the segments of the path
    /// /foo/bar/baz -> [foo, bar, baz]
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }

    pub fn depth(&self) -> usize {
        self.components().count()
    }

    pub fn starts_with(&self, prefix: &CatalogPath) -> bool {
        if prefix.is_root() {
            return true;
        }
        self.0 == prefix.0
            || (self.0.starts_with(&prefix.0) && self.0.as_bytes()[prefix.0.len()] == b'/')
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CatalogPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl Debug for CatalogPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Display for CatalogPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
