use super::Cmd;
use clap::Args;
use libskiff::error::SkiffResult;
use libskiff::linker::Linker;
use libskiff::path::CatalogPath;

#[derive(Args, Debug)]
pub struct SkiffMkdirCliOpts {
    path: String,
    /// create missing parent directories as well
    #[arg(short, long)]
    parents: bool,
}

impl Cmd for SkiffMkdirCliOpts {
    fn exec(self, lkr: &mut Linker) -> SkiffResult<()> {
        lkr.mkdir(&CatalogPath::new(&self.path), self.parents)
    }
}
