mod cli_commit;
mod cli_init;
mod cli_list;
mod cli_log;
mod cli_mkdir;
mod cli_move;
mod cli_remove;
mod cli_stage;
mod cli_sync;

use clap::{Parser, Subcommand};
use cli_commit::SkiffCommitCliOpts;
use cli_init::SkiffInitCliOpts;
use cli_list::SkiffListCliOpts;
use cli_log::SkiffLogCliOpts;
use cli_mkdir::SkiffMkdirCliOpts;
use cli_move::SkiffMoveCliOpts;
use cli_remove::SkiffRemoveCliOpts;
use cli_stage::SkiffStageCliOpts;
use cli_sync::SkiffSyncCliOpts;
use libskiff::error::SkiffResult;
use libskiff::linker::Linker;
use libskiff::serialize::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

const CATALOG_DIR: &str = ".skiff";
const CATALOG_FILE: &str = "catalog";

pub trait Cmd {
    fn exec(self, lkr: &mut Linker) -> SkiffResult<()>;
}

pub fn run<T: Into<OsString> + Clone>(args: impl IntoIterator<Item = T>) -> SkiffResult<()> {
    let opts = SkiffCliOpts::parse_from(args);
    let SkiffCliOpts { subcmd, root_path } = opts;
    if let SkiffSubCmd::Init(subcmd) = &subcmd {
        return subcmd.init(&root_path);
    }

    let catalog_path = catalog_path(&root_path);
    let mut lkr = load_catalog(&catalog_path)?;
    match subcmd {
        SkiffSubCmd::Init(..) => unreachable!(),
        SkiffSubCmd::Commit(opts) => opts.exec(&mut lkr)?,
        SkiffSubCmd::List(opts) => opts.exec(&mut lkr)?,
        SkiffSubCmd::Log(opts) => opts.exec(&mut lkr)?,
        SkiffSubCmd::Mkdir(opts) => opts.exec(&mut lkr)?,
        SkiffSubCmd::Move(opts) => opts.exec(&mut lkr)?,
        SkiffSubCmd::Remove(opts) => opts.exec(&mut lkr)?,
        SkiffSubCmd::Stage(opts) => opts.exec(&mut lkr)?,
        SkiffSubCmd::Sync(opts) => opts.exec(&mut lkr)?,
    }
    save_catalog(&catalog_path, &lkr)
}

#[derive(Parser, Debug)]
#[command(name = "skiff", about = "content-addressed versioned catalogs that sync")]
pub struct SkiffCliOpts {
    #[command(subcommand)]
    pub subcmd: SkiffSubCmd,
    #[arg(short = 'C', default_value = ".")]
    pub root_path: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum SkiffSubCmd {
    /// create a fresh catalog owned by a peer
    Init(SkiffInitCliOpts),
    /// seal the staged changes into a commit
    Commit(SkiffCommitCliOpts),
    /// list the live nodes of the catalog
    List(SkiffListCliOpts),
    /// show the commit history
    Log(SkiffLogCliOpts),
    /// create a directory
    Mkdir(SkiffMkdirCliOpts),
    /// move a node, leaving a ghost at the old path
    Move(SkiffMoveCliOpts),
    /// remove a node, leaving a ghost in its place
    Remove(SkiffRemoveCliOpts),
    /// record a local file's content address in the catalog
    Stage(SkiffStageCliOpts),
    /// integrate another catalog's head into this one
    Sync(SkiffSyncCliOpts),
}

pub(crate) fn catalog_path(root_path: &Path) -> PathBuf {
    root_path.join(CATALOG_DIR).join(CATALOG_FILE)
}

pub(crate) fn load_catalog(path: &Path) -> SkiffResult<Linker> {
    let file = File::open(path)
        .map_err(|err| anyhow!("no catalog at `{}`: {}", path.display(), err))?;
    Linker::deserialize(&mut BufReader::new(file))
}

pub(crate) fn save_catalog(path: &Path, lkr: &Linker) -> SkiffResult<()> {
    let mut file = File::create(path)?;
    lkr.serialize(&mut file)
}
