use crate::error::{SkiffError, SkiffResult, SkiffResultExt};
use crate::hash::ContentHash;
use crate::linker::Linker;
use crate::node::{Directory, File, Node};
use crate::path::CatalogPath;
use crate::resolve::{ChangeType, Pairing, Resolver};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;


/// how many `<name>.conflict.<n>` siblings are probed before giving up
const MAX_CONFLICT_SIBLINGS: usize = 100;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConflictStrategy {
    /// insert the source's version next to ours as `<name>.conflict.<n>`
    Marker,
    /// leave the destination untouched
    Ignore,
    Unknown,
}

impl Default for ConflictStrategy {
    fn default() -> Self {
        ConflictStrategy::Marker
    }
}

impl Display for ConflictStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConflictStrategy::Marker => write!(f, "marker"),
            ConflictStrategy::Ignore => write!(f, "ignore"),
            ConflictStrategy::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for ConflictStrategy {
    type Err = std::convert::Infallible;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        Ok(match spec {
            "marker" => ConflictStrategy::Marker,
            "ignore" => ConflictStrategy::Ignore,
            _ => ConflictStrategy::Unknown,
        })
    }
}

/// sync policy; the zero value (marker strategy, deletes honored) is the
/// default and is constructed at the call site
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncConfig {
    pub strategy: ConflictStrategy,
    pub ignore_deletes: bool,
}

impl SyncConfig {
    /// builds a config from its external string form, rejecting unknown
    /// strategy names with `BadConfig`
    pub fn from_spec(strategy: &str, ignore_deletes: bool) -> SkiffResult<Self> {
        match strategy.parse::<ConflictStrategy>().expect("parsing never fails") {
            ConflictStrategy::Unknown => bail!(SkiffError::BadConfig(strategy.to_owned())),
            strategy => Ok(Self { strategy, ignore_deletes }),
        }
    }
}

/// applies pairings to the destination linker under the configured policy
struct Syncer<'s> {
    cfg: &'s SyncConfig,
    lkr_dst: &'s mut Linker,
}

impl<'s> Syncer<'s> {
    fn apply(&mut self, pairing: &Pairing) -> SkiffResult<()> {
        debug!("Syncer::apply({})", pairing);
        match pairing {
            Pairing::Add { src } => self.add(src, &src.parent_path()?, src.name()),
            Pairing::Remove { dst } => self.remove(dst),
            Pairing::Merge { src, dst, src_mask, dst_mask } =>
                self.merge(src, dst, *src_mask, *dst_mask),
            Pairing::Conflict { src, dst, src_mask, dst_mask } =>
                self.conflict(src, dst, *src_mask, *dst_mask),
            Pairing::TypeConflict { src, dst } => self.type_conflict(src, dst),
        }
    }

    /// materializes `src` in the destination as `name` under `parent_path`
    fn add(&mut self, src: &Node, parent_path: &CatalogPath, name: &str) -> SkiffResult<()> {
        // the resolver emits parents before children, so the parent must
        // already be a directory over here
        self.lkr_dst.lookup_directory(parent_path)?;
        let path = parent_path.join(name);

        let node = match src {
            Node::Directory(..) => {
                let dir = Directory::new(path, self.lkr_dst.next_inode());
                Node::Directory(dir)
            }
            Node::File(src_file) => {
                let mut file = File::new(path, self.lkr_dst.next_inode());
                file.set_content(src_file.content_hash());
                file.set_size(src_file.size());
                file.set_key(src_file.key().to_vec());
                Node::File(file)
            }
            node => bail!(SkiffError::UnexpectedNodeType(node.node_type())),
        };
        self.lkr_dst.add_child(node)
    }

    fn remove(&mut self, dst: &Node) -> SkiffResult<()> {
        if self.cfg.ignore_deletes {
            trace!("Syncer::remove({}) :: deletes ignored", dst);
            return Ok(());
        }
        self.lkr_dst.remove_node(dst.path())?;
        Ok(())
    }

    fn conflict(
        &mut self,
        src: &Node,
        dst: &Node,
        src_mask: ChangeType,
        _dst_mask: ChangeType,
    ) -> SkiffResult<()> {
        if self.cfg.strategy == ConflictStrategy::Ignore {
            return Ok(());
        }
        if self.cfg.ignore_deletes && src_mask.contains(ChangeType::REMOVE) {
            // a removal we are told to ignore does not resurface as a
            // conflict either
            debug!("Syncer::conflict({}, {}) :: deletes ignored", src, dst);
            return Ok(());
        }

        let parent_path = dst.parent_path()?;
        let mut conflict_name = None;
        // fix the unlikely case that a node already sits at the conflict path
        for tries in 0..MAX_CONFLICT_SIBLINGS {
            let name = format!("{}.conflict.{}", dst.name(), tries);
            match self.lkr_dst.lookup_node(&parent_path.join(&name)) {
                Ok(..) => continue,
                Err(err) if err.is_not_found_err() => {
                    conflict_name = Some(name);
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        let conflict_name = conflict_name.ok_or_else(|| {
            anyhow!(SkiffError::ConflictPathExhausted(dst.path().clone(), MAX_CONFLICT_SIBLINGS))
        })?;

        info!("Syncer::conflict({}, {}) :: writing {}/{}", src, dst, parent_path, conflict_name);
        self.add(src, &parent_path, &conflict_name)
    }

    fn merge(
        &mut self,
        src: &Node,
        dst: &Node,
        src_mask: ChangeType,
        dst_mask: ChangeType,
    ) -> SkiffResult<()> {
        let mut dst_path = dst.path().clone();
        if src.path() != dst.path()
            && src_mask.contains(ChangeType::MOVE)
            && !dst_mask.contains(ChangeType::MOVE)
        {
            // only follow the rename if the destination kept the node put
            self.lkr_dst.move_node(&dst_path, src.path())?;
            dst_path = src.path().clone();
        }

        // without content changes on the source there is nothing to carry
        // over; a pure destination-side change never pairs as a merge
        if !src_mask.intersects(ChangeType::MODIFY | ChangeType::ADD) {
            return Ok(());
        }

        let src_file = src.as_file()?;
        let mut dst_file = self.lkr_dst.lookup_live(&dst_path)?.clone().into_file()?;
        dst_file.set_content(src_file.content_hash());
        dst_file.set_size(src_file.size());
        dst_file.set_key(src_file.key().to_vec());
        self.lkr_dst.stage_node(Node::File(dst_file))
    }

    fn type_conflict(&mut self, src: &Node, dst: &Node) -> SkiffResult<()> {
        // leave the destination untouched; promoting this to a real conflict
        // is a possible future extension
        info!("Syncer::type_conflict({}, {}) :: skipped", src, dst);
        Ok(())
    }
}

/// reconciles `lkr_dst` with `lkr_src`: resolves the pairings between the two
/// HEAD trees, applies them to the destination, and seals the result as a
/// merge commit with a marker so the next sync against the same head is a
/// no-op. Returns the merge commit's hash, or `None` when there was nothing
/// to integrate.
pub fn sync(
    lkr_src: &Linker,
    lkr_dst: &mut Linker,
    cfg: &SyncConfig,
) -> SkiffResult<Option<ContentHash>> {
    ensure!(
        cfg.strategy != ConflictStrategy::Unknown,
        SkiffError::BadConfig("unknown".to_owned())
    );
    info!("sync({} -> {})", lkr_src.owner(), lkr_dst.owner());

    let pairings = Resolver::new(lkr_src, lkr_dst).resolve()?;
    let mut syncer = Syncer { cfg, lkr_dst: &mut *lkr_dst };
    for pairing in &pairings {
        syncer.apply(pairing)?;
    }

    if !lkr_dst.have_staged_changes() {
        debug!("sync({} -> {}) :: nothing to integrate", lkr_src.owner(), lkr_dst.owner());
        return Ok(None);
    }

    // remember the merged head first so a replayed sync stays idempotent,
    // then seal; both steps must land before the merge is visible
    lkr_dst.set_merge_marker(lkr_src.owner(), lkr_src.head().hash());
    let message = format!("Merge with {}", lkr_src.owner());
    let commit = lkr_dst.make_commit(lkr_src.owner().to_owned(), message)?;
    Ok(Some(commit))
}
