//! Inspect and reset the session file

use clap::Subcommand;

use crate::config::PresurveyConfig;
use crate::error::CliResult;
use crate::store::FileSessionStore;

/// Session subcommands
#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// Print the stored session entries
    Show,

    /// Forget the stored participant
    Clear,
}

/// Execute `presurvey session ...`
pub fn execute(command: SessionCommands, config: &PresurveyConfig) -> CliResult<()> {
    let store = FileSessionStore::open(&config.session.path, &config.session.namespace)?;
    match command {
        SessionCommands::Show => {
            let entries = store.entries();
            if entries.is_empty() {
                println!("No session stored in {}", store.path().display());
            }
            for (key, value) in entries {
                println!("{key} = {value}");
            }
        }
        SessionCommands::Clear => {
            store.clear()?;
            println!("Cleared session in {}", store.path().display());
        }
    }
    Ok(())
}
