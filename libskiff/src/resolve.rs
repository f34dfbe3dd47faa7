use crate::error::SkiffResult;
use crate::hash::ContentHash;
use crate::linker::Linker;
use crate::node::{Commit, Directory, Node};
use crate::path::CatalogPath;
use itertools::Itertools;
use rustc_hash::FxHashSet;
use std::collections::{BTreeSet, VecDeque};
use std::fmt::{self, Display, Formatter};

#[cfg(test)]
mod tests;

bitflags! {
    /// how a node evolved between the common ancestor and a tip
    #[derive(Default)]
    pub struct ChangeType: u8 {
        const ADD    = 1 << 0;
        const MODIFY = 1 << 1;
        const MOVE   = 1 << 2;
        const REMOVE = 1 << 3;
    }
}

impl Display for ChangeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let names = [
            (ChangeType::ADD, "added"),
            (ChangeType::MODIFY, "modified"),
            (ChangeType::MOVE, "moved"),
            (ChangeType::REMOVE, "removed"),
        ];
        let joined = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .join("|");
        write!(f, "{}", joined)
    }
}

/// one unit of reconciliation work, emitted by the resolver in deterministic
/// order (name order within a directory, parents before children) and applied
/// by the syncer. Nodes are snapshots; all mutation goes through the linker.
#[derive(Debug, Clone)]
pub enum Pairing {
    /// `src` exists, the destination never had it
    Add { src: Node },
    /// the source removed `dst` and the destination left it untouched
    Remove { dst: Node },
    /// only one side diverged from the ancestor; `src` may live at a new path
    /// when its mask contains [`ChangeType::MOVE`]
    Merge { src: Node, dst: Node, src_mask: ChangeType, dst_mask: ChangeType },
    /// both sides diverged from the ancestor
    Conflict { src: Node, dst: Node, src_mask: ChangeType, dst_mask: ChangeType },
    /// the two sides disagree about the node's variant
    TypeConflict { src: Node, dst: Node },
}

impl Display for Pairing {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Pairing::Add { src } => write!(f, "add {}", src),
            Pairing::Remove { dst } => write!(f, "remove {}", dst),
            Pairing::Merge { src, dst, src_mask, dst_mask } =>
                write!(f, "merge {} ({}) onto {} ({})", src, src_mask, dst, dst_mask),
            Pairing::Conflict { src, dst, src_mask, dst_mask } =>
                write!(f, "conflict {} ({}) vs {} ({})", src, src_mask, dst, dst_mask),
            Pairing::TypeConflict { src, dst } => write!(f, "type conflict {} vs {}", src, dst),
        }
    }
}

/// the latest commit present in both histories. Shared commits count, and so
/// do commits a merge marker on either side points at; the best candidate is
/// the most recent one in its own chain.
pub(crate) fn merge_base<'l>(lkr_src: &'l Linker, lkr_dst: &'l Linker) -> Option<&'l Commit> {
    let dst_hashes: FxHashSet<ContentHash> =
        lkr_dst.history().iter().map(|commit| commit.hash()).collect();

    let mut candidates: Vec<(usize, &'l Commit)> = lkr_src
        .history()
        .iter()
        .enumerate()
        .filter(|(_, commit)| dst_hashes.contains(&commit.hash()))
        .collect();

    if let Some(entry) = lkr_dst.merge_marker(lkr_src.owner()) {
        if let Some(idx) =
            lkr_src.history().iter().position(|commit| commit.hash() == entry.remote_head)
        {
            candidates.push((idx, &lkr_src.history()[idx]));
        }
    }
    if let Some(entry) = lkr_src.merge_marker(lkr_dst.owner()) {
        if let Some(idx) =
            lkr_dst.history().iter().position(|commit| commit.hash() == entry.remote_head)
        {
            candidates.push((idx, &lkr_dst.history()[idx]));
        }
    }

    candidates.into_iter().max_by_key(|(idx, _)| *idx).map(|(_, commit)| commit)
}

/// walks the source and destination HEAD trees against the common ancestor
/// and pairs up every path reachable from either side. Pure: nothing is
/// mutated, nodes in the emitted pairings are snapshots.
pub struct Resolver<'l> {
    lkr_src: &'l Linker,
    lkr_dst: &'l Linker,
    src_root: &'l Directory,
    dst_root: &'l Directory,
    ancestor_root: Option<&'l Directory>,
    pairings: Vec<Pairing>,
    // move targets already paired through their old path
    consumed_src: FxHashSet<CatalogPath>,
    consumed_dst: FxHashSet<CatalogPath>,
}

impl<'l> Resolver<'l> {
    pub fn new(lkr_src: &'l Linker, lkr_dst: &'l Linker) -> Self {
        let ancestor_root = merge_base(lkr_src, lkr_dst).and_then(|commit| {
            lkr_src
                .root_tree(commit.root_hash())
                .or_else(|| lkr_dst.root_tree(commit.root_hash()))
        });
        match ancestor_root {
            Some(root) => debug!("Resolver::new() :: ancestor root {:#}", root.content_hash()),
            None => debug!("Resolver::new() :: no shared history, empty ancestor"),
        }
        Self {
            lkr_src,
            lkr_dst,
            src_root: lkr_src.head_tree(),
            dst_root: lkr_dst.head_tree(),
            ancestor_root,
            pairings: vec![],
            consumed_src: Default::default(),
            consumed_dst: Default::default(),
        }
    }

    pub fn resolve(mut self) -> SkiffResult<Vec<Pairing>> {
        // this exact head was integrated before; re-pairing it would report
        // the same conflicts a second time
        if let Some(entry) = self.lkr_dst.merge_marker(self.lkr_src.owner()) {
            if entry.remote_head == self.lkr_src.head().hash() {
                debug!(
                    "Resolver::resolve() :: head {:#} already merged in {:#}",
                    entry.remote_head, entry.merged_in
                );
                return Ok(vec![]);
            }
        }

        let mut queue = VecDeque::new();
        queue.push_back(CatalogPath::root());
        while let Some(dir_path) = queue.pop_front() {
            self.resolve_directory(&dir_path, &mut queue)?;
        }
        Ok(self.pairings)
    }

    fn resolve_directory(
        &mut self,
        dir_path: &CatalogPath,
        queue: &mut VecDeque<CatalogPath>,
    ) -> SkiffResult<()> {
        trace!("Resolver::resolve_directory({})", dir_path);
        let src_dir = self.src_root.dir_at(dir_path);
        let dst_dir = self.dst_root.dir_at(dir_path);
        let anc_dir = self.ancestor_root.and_then(|root| root.dir_at(dir_path));

        let mut names = BTreeSet::new();
        for dir in [src_dir, dst_dir, anc_dir].into_iter().flatten() {
            names.extend(dir.live_children().map(|child| child.name().to_owned()));
        }

        for name in names {
            let path = dir_path.join(&name);
            let src = src_dir.and_then(|dir| dir.lookup(&name)).filter(|node| !node.is_ghost());
            let dst = dst_dir.and_then(|dir| dir.lookup(&name)).filter(|node| !node.is_ghost());
            let anc = anc_dir.and_then(|dir| dir.lookup(&name)).filter(|node| !node.is_ghost());
            self.pair(&path, src, dst, anc, queue)?;
        }
        Ok(())
    }

    /// per-side change mask against the ancestor. When the node vanished from
    /// this side but a live node elsewhere carries the identical content (and
    /// did not already exist there in the ancestor), it is a move and the
    /// relocated node is returned.
    fn side_state<'a>(
        &self,
        path: &CatalogPath,
        node: Option<&'a Node>,
        anc: Option<&Node>,
        root: &'a Directory,
        consumed: &FxHashSet<CatalogPath>,
    ) -> (ChangeType, Option<&'a Node>) {
        match (anc, node) {
            (None, None) => (ChangeType::empty(), None),
            (None, Some(node)) => (ChangeType::ADD, Some(node)),
            (Some(anc), None) => match root.find_by_hash(anc.content_hash()) {
                Some(moved)
                    if moved.path() != path
                        && !consumed.contains(moved.path())
                        && self.ancestor_live(moved.path()).map_or(true, |prior| {
                            prior.content_hash() != moved.content_hash()
                        }) =>
                    (ChangeType::MOVE, Some(moved)),
                _ => (ChangeType::REMOVE, None),
            },
            (Some(anc), Some(node)) => {
                if anc.node_type() != node.node_type()
                    || anc.content_hash() != node.content_hash()
                {
                    (ChangeType::MODIFY, Some(node))
                } else {
                    (ChangeType::empty(), Some(node))
                }
            }
        }
    }

    fn ancestor_live(&self, path: &CatalogPath) -> Option<&Node> {
        self.ancestor_root.and_then(|root| root.live_node_at(path))
    }

    fn pair(
        &mut self,
        path: &CatalogPath,
        src: Option<&'l Node>,
        dst: Option<&'l Node>,
        anc: Option<&'l Node>,
        queue: &mut VecDeque<CatalogPath>,
    ) -> SkiffResult<()> {
        // a move target paired through its old path needs no second pairing
        let src = src.filter(|_| !self.consumed_src.contains(path));
        let dst = dst.filter(|_| !self.consumed_dst.contains(path));
        if src.is_none() && dst.is_none() && anc.is_none() {
            return Ok(());
        }

        let (src_mask, src_node) =
            self.side_state(path, src, anc, self.src_root, &self.consumed_src);
        let (dst_mask, dst_node) =
            self.side_state(path, dst, anc, self.dst_root, &self.consumed_dst);
        trace!(
            "Resolver::pair({}) :: src {} ({:?}), dst {} ({:?})",
            path,
            src_mask,
            src_node.map(|n| n.path()),
            dst_mask,
            dst_node.map(|n| n.path())
        );

        if src_mask.contains(ChangeType::MOVE) || dst_mask.contains(ChangeType::MOVE) {
            return self.pair_moved(path, src_mask, src_node, dst_mask, dst_node, queue);
        }

        match (src_node, dst_node) {
            // both sides lost it, or it never existed on either
            (None, None) => Ok(()),

            (Some(src), None) => {
                if src_mask.contains(ChangeType::ADD) {
                    self.emit_add(src, queue);
                    return Ok(());
                }
                debug_assert!(dst_mask.contains(ChangeType::REMOVE));
                if src_mask.contains(ChangeType::MODIFY) {
                    // the destination deleted it but the source kept evolving
                    // it; resurrect exactly what the source touched
                    if src.is_directory() {
                        self.emit_add(src, queue);
                    } else {
                        let anc = anc.expect("REMOVE and MODIFY both require an ancestor");
                        self.emit(Pairing::Conflict {
                            src: src.clone(),
                            dst: anc.clone(),
                            src_mask,
                            dst_mask,
                        });
                    }
                }
                // an unchanged node deleted by the destination stays deleted
                Ok(())
            }

            (None, Some(dst)) => {
                if src_mask.contains(ChangeType::REMOVE) {
                    if dst_mask.is_empty() {
                        self.emit(Pairing::Remove { dst: dst.clone() });
                    } else {
                        // remove versus modify; the syncer resolves it via
                        // the masks and the delete policy
                        let anc = anc.expect("REMOVE requires an ancestor");
                        self.emit(Pairing::Conflict {
                            src: anc.clone(),
                            dst: dst.clone(),
                            src_mask,
                            dst_mask,
                        });
                    }
                }
                // otherwise a destination-local addition; nothing to do
                Ok(())
            }

            (Some(src), Some(dst)) => self.pair_present(path, src, dst, src_mask, dst_mask, queue),
        }
    }

    fn pair_present(
        &mut self,
        path: &CatalogPath,
        src: &Node,
        dst: &Node,
        src_mask: ChangeType,
        dst_mask: ChangeType,
        queue: &mut VecDeque<CatalogPath>,
    ) -> SkiffResult<()> {
        if src.is_directory() && dst.is_directory() {
            // identical subtrees need no walk at all
            if src.content_hash() != dst.content_hash() {
                queue.push_back(path.clone());
            }
            return Ok(());
        }

        if src.node_type() != dst.node_type() {
            self.emit(Pairing::TypeConflict { src: src.clone(), dst: dst.clone() });
            return Ok(());
        }

        // two files (or two nodes that both changed into files)
        if src.content_hash() == dst.content_hash() {
            // converged independently or never changed
            return Ok(());
        }
        match (src_mask.contains(ChangeType::MODIFY) || src_mask.contains(ChangeType::ADD),
               dst_mask.contains(ChangeType::MODIFY) || dst_mask.contains(ChangeType::ADD)) {
            (true, false) => self.emit(Pairing::Merge {
                src: src.clone(),
                dst: dst.clone(),
                src_mask,
                dst_mask,
            }),
            (false, true) => {} // destination-local change; no action
            (true, true) => self.emit(Pairing::Conflict {
                src: src.clone(),
                dst: dst.clone(),
                src_mask,
                dst_mask,
            }),
            (false, false) => bug!("equal hashes are handled above"),
        }
        Ok(())
    }

    fn pair_moved(
        &mut self,
        path: &CatalogPath,
        src_mask: ChangeType,
        src_node: Option<&Node>,
        dst_mask: ChangeType,
        dst_node: Option<&Node>,
        queue: &mut VecDeque<CatalogPath>,
    ) -> SkiffResult<()> {
        match (src_mask.contains(ChangeType::MOVE), dst_mask.contains(ChangeType::MOVE)) {
            (true, true) => {
                let src = src_node.expect("MOVE always carries the relocated node");
                let dst = dst_node.expect("MOVE always carries the relocated node");
                self.consumed_src.insert(src.path().clone());
                self.consumed_dst.insert(dst.path().clone());
                if src.path() != dst.path() {
                    // moved apart; surface it with the source's destination
                    // as the proposed path
                    self.emit(Pairing::Conflict {
                        src: src.clone(),
                        dst: dst.clone(),
                        src_mask,
                        dst_mask,
                    });
                }
                Ok(())
            }
            (true, false) => {
                let src = src_node.expect("MOVE always carries the relocated node");
                match dst_node {
                    Some(dst) => {
                        self.consumed_src.insert(src.path().clone());
                        self.emit(Pairing::Merge {
                            src: src.clone(),
                            dst: dst.clone(),
                            src_mask,
                            dst_mask,
                        });
                    }
                    // the destination removed it; the relocated node comes
                    // back as a fresh add at its new path
                    None => {
                        trace!("Resolver::pair_moved({}) :: removed on dst, add wins", path);
                        self.consumed_src.insert(src.path().clone());
                        self.emit_add(src, queue);
                    }
                }
                Ok(())
            }
            (false, true) => {
                let dst = dst_node.expect("MOVE always carries the relocated node");
                match src_node {
                    Some(src) if src_mask.contains(ChangeType::MODIFY) => {
                        self.consumed_dst.insert(dst.path().clone());
                        // the destination only moved it, so the source's
                        // content wins at the destination's new path
                        self.emit(Pairing::Merge {
                            src: src.clone(),
                            dst: dst.clone(),
                            src_mask,
                            dst_mask,
                        });
                    }
                    // source unchanged or gone; the local move stands
                    _ => trace!("Resolver::pair_moved({}) :: dst-local move", path),
                }
                Ok(())
            }
            (false, false) => bug!("pair_moved requires a MOVE mask"),
        }
    }

    fn emit_add(&mut self, src: &Node, queue: &mut VecDeque<CatalogPath>) {
        if src.is_directory() {
            queue.push_back(src.path().clone());
        }
        self.emit(Pairing::Add { src: src.clone() });
    }

    fn emit(&mut self, pairing: Pairing) {
        debug!("Resolver::emit({})", pairing);
        self.pairings.push(pairing);
    }
}
