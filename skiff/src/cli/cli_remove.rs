use super::Cmd;
use clap::Args;
use libskiff::error::SkiffResult;
use libskiff::linker::Linker;
use libskiff::path::CatalogPath;

#[derive(Args, Debug)]
pub struct SkiffRemoveCliOpts {
    path: String,
}

impl Cmd for SkiffRemoveCliOpts {
    fn exec(self, lkr: &mut Linker) -> SkiffResult<()> {
        lkr.remove_node(&CatalogPath::new(&self.path))?;
        Ok(())
    }
}
