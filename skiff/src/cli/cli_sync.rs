use super::Cmd;
use clap::Args;
use libskiff::error::SkiffResult;
use libskiff::linker::Linker;
use libskiff::sync::{sync, SyncConfig};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct SkiffSyncCliOpts {
    /// root of the peer catalog to pull from
    remote_path: PathBuf,
    #[arg(long, default_value = "marker")]
    strategy: String,
    #[arg(long)]
    ignore_deletes: bool,
}

impl Cmd for SkiffSyncCliOpts {
    fn exec(self, lkr: &mut Linker) -> SkiffResult<()> {
        let cfg = SyncConfig::from_spec(&self.strategy, self.ignore_deletes)?;
        let remote_catalog = if self.remote_path.is_dir() {
            super::catalog_path(&self.remote_path)
        } else {
            self.remote_path.clone()
        };
        let remote = super::load_catalog(&remote_catalog)?;
        match sync(&remote, lkr, &cfg)? {
            Some(commit) => println!("merged with {} in {:#}", remote.owner(), commit),
            None => println!("already in sync with {}", remote.owner()),
        }
        Ok(())
    }
}
