use crate::node::NodeType;
use crate::path::CatalogPath;
use owo_colors::OwoColorize;
use std::fmt::{self, Display, Formatter};

pub type SkiffResult<T> = Result<T, SkiffGenericError>;
pub type SkiffGenericError = anyhow::Error;

// anyhow is used for everything that only travels upwards, but the errors
// callers need to match on (lookup sentinels in particular) get a "rust"
// representation we can test against
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub enum SkiffError {
    /// no node lives at `{0}`; recoverable, used as a sentinel by lookup callers
    NoSuchFile(CatalogPath),
    NotADirectory(CatalogPath),
    /// node at `{0}` has the wrong shape for the requested operation
    BadNode(CatalogPath),
    /// a live node already occupies `{0}`
    Exists(CatalogPath),
    UnexpectedNodeType(NodeType),
    /// more than `{1}` conflict siblings exist next to `{0}`
    ConflictPathExhausted(CatalogPath, usize),
    BadConfig(String),
    NothingToCommit,
}

pub trait SkiffErrorExt {
    fn try_into_skiff_error(self) -> SkiffResult<SkiffError>;
    fn try_into_no_such_file_err(self) -> SkiffResult<CatalogPath>;
}

impl SkiffErrorExt for SkiffGenericError {
    fn try_into_skiff_error(self) -> SkiffResult<SkiffError> {
        self.downcast::<SkiffError>()
    }

    /// tries to convert the generic error into the lookup sentinel and just
    /// returns the previous error on failure
    fn try_into_no_such_file_err(self) -> SkiffResult<CatalogPath> {
        match self.try_into_skiff_error()? {
            SkiffError::NoSuchFile(path) => Ok(path),
            err => Err(anyhow!(err)),
        }
    }
}

pub trait SkiffResultExt {
    fn is_not_found_err(&self) -> bool;
    fn is_nothing_to_commit_err(&self) -> bool;
    fn is_fatal(&self) -> bool;
}

macro_rules! error_ext_is_method {
    ($method:ident) => {
        fn $method(&self) -> bool {
            match self {
                Ok(..) => false,
                Err(err) => err.$method(),
            }
        }
    };
}

impl<T> SkiffResultExt for SkiffResult<T> {
    error_ext_is_method!(is_not_found_err);

    error_ext_is_method!(is_nothing_to_commit_err);

    error_ext_is_method!(is_fatal);
}

impl SkiffResultExt for SkiffGenericError {
    fn is_not_found_err(&self) -> bool {
        matches!(self.downcast_ref::<SkiffError>(), Some(SkiffError::NoSuchFile(..)))
    }

    fn is_nothing_to_commit_err(&self) -> bool {
        matches!(self.downcast_ref::<SkiffError>(), Some(SkiffError::NothingToCommit))
    }

    fn is_fatal(&self) -> bool {
        match self.downcast_ref::<SkiffError>() {
            Some(err) =>
                !matches!(err, SkiffError::NoSuchFile(..) | SkiffError::NothingToCommit),
            None => true,
        }
    }
}

macro_rules! write_hint {
    ($f:expr, $($args:tt)*) => {{
        write!($f, "{}: ", "hint".yellow())?;
        writeln!($f, $($args)*)
    }};
}

impl Display for SkiffError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SkiffError::NoSuchFile(path) => write!(f, "no node at `{}`", path),
            SkiffError::NotADirectory(path) => write!(f, "`{}` is not a directory", path),
            SkiffError::BadNode(path) =>
                write!(f, "node at `{}` has the wrong type for this operation", path),
            SkiffError::Exists(path) => write!(f, "a node already exists at `{}`", path),
            SkiffError::UnexpectedNodeType(ty) => write!(f, "unexpected node type `{}`", ty),
            SkiffError::ConflictPathExhausted(path, tries) => {
                writeln!(f, "could not find a free conflict path next to `{}`", path)?;
                write_hint!(f, "{} conflict siblings already exist; clean some up", tries)
            }
            SkiffError::BadConfig(value) =>
                write!(f, "unknown sync configuration value `{}`", value),
            SkiffError::NothingToCommit => write!(f, "nothing to commit"),
        }
    }
}
