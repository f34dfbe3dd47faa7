use super::Cmd;
use clap::Args;
use libskiff::error::SkiffResult;
use libskiff::hash::hash_bytes;
use libskiff::linker::Linker;
use libskiff::path::CatalogPath;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct SkiffStageCliOpts {
    /// local file whose content address is recorded
    local_path: PathBuf,
    /// catalog path to stage it at
    repo_path: String,
}

impl Cmd for SkiffStageCliOpts {
    fn exec(self, lkr: &mut Linker) -> SkiffResult<()> {
        let bytes = std::fs::read(&self.local_path)?;
        let hash = hash_bytes(&bytes);
        let path = CatalogPath::new(&self.repo_path);
        lkr.stage_file(path.clone(), hash, bytes.len() as u64, vec![])?;
        println!("staged {} ({:#})", path, hash);
        Ok(())
    }
}
