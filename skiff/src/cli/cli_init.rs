use clap::Args;
use libskiff::error::SkiffResult;
use libskiff::linker::Linker;
use std::path::Path;

#[derive(Args, Debug)]
pub struct SkiffInitCliOpts {
    /// peer identity that owns the new catalog
    pub owner: String,
}

impl SkiffInitCliOpts {
    pub fn init(&self, root_path: &Path) -> SkiffResult<()> {
        let catalog_path = super::catalog_path(root_path);
        ensure!(
            !catalog_path.exists(),
            "a catalog already exists at `{}`",
            catalog_path.display()
        );
        std::fs::create_dir_all(catalog_path.parent().expect("catalog path has a parent"))?;
        let lkr = Linker::new(&self.owner);
        super::save_catalog(&catalog_path, &lkr)?;
        println!("initialized empty catalog for `{}`", self.owner);
        Ok(())
    }
}
