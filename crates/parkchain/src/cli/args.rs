//! CLI argument structs for all commands.

use clap::Parser;

use super::types::SituationArg;

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Rewrite the configuration of an existing repository
    ///
    /// Relations and the car directory are kept.
    #[arg(short, long)]
    pub force: bool,

    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `block` and `unblock` commands
#[derive(Parser, Debug, Clone)]
pub struct PairArgs {
    /// Car standing in the way
    pub blocking: u64,

    /// Car that cannot leave
    pub blocked: u64,

    /// Which side is making the request
    ///
    /// The other side's owners are notified, and your car's relations are
    /// shown afterwards.
    #[arg(long = "as", value_enum, default_value = "blocked")]
    pub situation: SituationArg,
}

/// Arguments for commands taking a single car
#[derive(Parser, Debug, Clone)]
pub struct CarArgs {
    /// Car id
    pub car: u64,
}

/// Arguments for the `mine` command
#[derive(Parser, Debug, Clone)]
pub struct UserArgs {
    /// User id
    pub user: u64,
}
