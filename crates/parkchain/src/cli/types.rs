//! CLI value enums and domain type conversions.

use clap::ValueEnum;

use crate::domain::Situation;

/// Requesting side for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SituationArg {
    /// You own the car standing in the way
    Blocking,
    /// You own the car that cannot leave
    Blocked,
}

impl From<SituationArg> for Situation {
    fn from(arg: SituationArg) -> Self {
        match arg {
            SituationArg::Blocking => Situation::Blocking,
            SituationArg::Blocked => Situation::Blocked,
        }
    }
}
