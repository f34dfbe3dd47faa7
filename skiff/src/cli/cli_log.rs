use super::Cmd;
use clap::Args;
use libskiff::error::SkiffResult;
use libskiff::linker::Linker;
use owo_colors::OwoColorize;

#[derive(Args, Debug)]
pub struct SkiffLogCliOpts {}

impl Cmd for SkiffLogCliOpts {
    fn exec(self, lkr: &mut Linker) -> SkiffResult<()> {
        for commit in lkr.history().iter().rev() {
            println!("{} {}", "commit".yellow(), commit.hash().yellow());
            println!("Author: {}", commit.author());
            println!("Date: {}", commit.mod_time());
            if let Some(marker) = commit.merge_marker() {
                println!("Merged: {}", marker);
            }
            println!();
            println!("    {}", commit.message());
            println!();
        }
        Ok(())
    }
}
