use super::Cmd;
use clap::Args;
use libskiff::error::{SkiffResult, SkiffResultExt};
use libskiff::linker::Linker;

#[derive(Args, Debug)]
pub struct SkiffCommitCliOpts {
    #[arg(short = 'm', long = "message")]
    pub message: String,
}

impl Cmd for SkiffCommitCliOpts {
    fn exec(self, lkr: &mut Linker) -> SkiffResult<()> {
        let author = lkr.owner().to_owned();
        match lkr.make_commit(author, self.message.clone()) {
            Ok(hash) => {
                println!("committed {:#}", hash);
                Ok(())
            }
            Err(err) if err.is_nothing_to_commit_err() => {
                println!("nothing to commit");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
