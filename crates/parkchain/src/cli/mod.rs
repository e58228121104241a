//! CLI argument parsing and command dispatch.
//!
//! # Commands
//!
//! - `init`: Initialize a new parkchain repository
//! - `block`: Record that one car blocks another
//! - `unblock`: Remove a blocking relation
//! - `relations`: Show a car's direct relations
//! - `mine`: Show the relations of every car a user owns
//! - `need-to-go`: Ask every upstream blocker to move
//! - `remove-car`: Drop every relation of a car
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//!
//! # Example
//!
//! ```bash
//! parkchain block 1 2 --as blocked
//! parkchain relations 2
//! parkchain need-to-go 3
//! ```

mod args;
mod execute;
mod types;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use args::{CarArgs, InitArgs, PairArgs, UserArgs};
pub use types::SituationArg;

/// Parkchain - who is blocking whom in a shared parking lot
///
/// Records blocking relations between cars and tells every upstream owner
/// to move when a blocked driver needs to leave.
#[derive(Parser, Debug)]
#[command(name = "parkchain")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new parkchain repository
    ///
    /// Creates `.parkchain/` with a configuration, an empty relations file
    /// and a sample car directory.
    Init(InitArgs),

    /// Record that BLOCKING blocks BLOCKED
    ///
    /// Rejected if the cars are the same, the relation already exists, or
    /// it would close a loop.
    Block(PairArgs),

    /// Remove the relation BLOCKING -> BLOCKED
    ///
    /// The blocked car's owners are told they are free to go.
    Unblock(PairArgs),

    /// Show which cars a car blocks and is blocked by
    Relations(CarArgs),

    /// Show the relations of every car a user owns
    Mine(UserArgs),

    /// Notify everyone who has to move so a car can leave
    ///
    /// Walks every car blocking it, directly or through a chain.
    #[command(name = "need-to-go")]
    NeedToGo(CarArgs),

    /// Drop every relation of a car
    ///
    /// Cars it was blocking are told they are free to go.
    #[command(name = "remove-car")]
    RemoveCar(CarArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        use crate::output::OutputMode;

        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        let Some(command) = &self.command else {
            println!("parkchain - run 'parkchain --help' for usage");
            return Ok(());
        };

        match command {
            Commands::Init(args) => execute::execute_init(args, output_mode).await,
            Commands::Block(args) => {
                let app = open_app().await?;
                execute::execute_block(&app, args, output_mode).await
            }
            Commands::Unblock(args) => {
                let app = open_app().await?;
                execute::execute_unblock(&app, args, output_mode).await
            }
            Commands::Relations(args) => {
                let app = open_app().await?;
                execute::execute_relations(&app, args, output_mode).await
            }
            Commands::Mine(args) => {
                let app = open_app().await?;
                execute::execute_mine(&app, args, output_mode).await
            }
            Commands::NeedToGo(args) => {
                let app = open_app().await?;
                execute::execute_need_to_go(&app, args, output_mode).await
            }
            Commands::RemoveCar(args) => {
                let app = open_app().await?;
                execute::execute_remove_car(&app, args, output_mode).await
            }
        }
    }
}

async fn open_app() -> Result<crate::app::App> {
    Ok(crate::app::App::from_directory(&std::env::current_dir()?).await?)
}
