use super::Cmd;
use clap::Args;
use libskiff::error::SkiffResult;
use libskiff::linker::Linker;
use libskiff::path::CatalogPath;

#[derive(Args, Debug)]
pub struct SkiffMoveCliOpts {
    src: String,
    dst: String,
}

impl Cmd for SkiffMoveCliOpts {
    fn exec(self, lkr: &mut Linker) -> SkiffResult<()> {
        lkr.move_node(&CatalogPath::new(&self.src), &CatalogPath::new(&self.dst))
    }
}
