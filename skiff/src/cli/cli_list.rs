use super::Cmd;
use clap::Args;
use libskiff::error::SkiffResult;
use libskiff::linker::Linker;
use libskiff::path::CatalogPath;

#[derive(Args, Debug)]
pub struct SkiffListCliOpts {
    #[arg(default_value = "/")]
    path: String,
    /// how many levels below `path` to descend
    #[arg(long)]
    max_depth: Option<usize>,
}

impl Cmd for SkiffListCliOpts {
    fn exec(self, lkr: &mut Linker) -> SkiffResult<()> {
        let prefix = CatalogPath::new(&self.path);
        for info in lkr.list(&prefix, self.max_depth)? {
            let kind = if info.is_dir { "d" } else { "f" };
            println!("{} {:#} {:>6} {:>8} {}", kind, info.hash, info.inode, info.size, info.path);
        }
        Ok(())
    }
}
