//! Command execution logic.

use anyhow::Result;

use super::args::{CarArgs, InitArgs, PairArgs, UserArgs};
use crate::app::App;
use crate::domain::{CarId, UserId};
use crate::output::{self, OutputMode};

/// Execute the init command
pub async fn execute_init(args: &InitArgs, output_mode: OutputMode) -> Result<()> {
    use crate::commands::init;

    let current_dir = std::env::current_dir()?;
    let result = init::init(&current_dir, args.force).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "parkchain_dir": result.parkchain_dir.display().to_string(),
            "config_file": result.config_file.display().to_string(),
            "relations_file": result.relations_file.display().to_string(),
            "directory_file": result.directory_file.display().to_string(),
            "reinitialized": result.reinitialized,
        }))?,
        OutputMode::Text if !args.quiet => {
            let verb = if result.reinitialized {
                "Reinitialized"
            } else {
                "Initialized"
            };
            println!("{verb} parkchain in {}", result.parkchain_dir.display());
            println!("  Config:    {}", result.config_file.display());
            println!("  Relations: {}", result.relations_file.display());
            println!("  Cars:      {}", result.directory_file.display());
        }
        OutputMode::Text => {}
    }

    Ok(())
}

/// Execute the block command
pub async fn execute_block(app: &App, args: &PairArgs, output_mode: OutputMode) -> Result<()> {
    let view = app
        .service()
        .create_relation(CarId(args.blocking), CarId(args.blocked), args.situation.into())
        .await?;

    if output_mode == OutputMode::Text {
        output::print_message(&format!(
            "Recorded: {} blocks {}",
            CarId(args.blocking),
            CarId(args.blocked)
        ))?;
    }
    output::print_car_relations(&view, output_mode)?;
    Ok(())
}

/// Execute the unblock command
pub async fn execute_unblock(app: &App, args: &PairArgs, output_mode: OutputMode) -> Result<()> {
    let view = app
        .service()
        .delete_relation(CarId(args.blocking), CarId(args.blocked), args.situation.into())
        .await?;

    if output_mode == OutputMode::Text {
        output::print_message(&format!(
            "Removed: {} no longer blocks {}",
            CarId(args.blocking),
            CarId(args.blocked)
        ))?;
    }
    output::print_car_relations(&view, output_mode)?;
    Ok(())
}

/// Execute the relations command
pub async fn execute_relations(app: &App, args: &CarArgs, output_mode: OutputMode) -> Result<()> {
    let view = app.service().relations_of(CarId(args.car)).await?;
    output::print_car_relations(&view, output_mode)?;
    Ok(())
}

/// Execute the mine command
pub async fn execute_mine(app: &App, args: &UserArgs, output_mode: OutputMode) -> Result<()> {
    let view = app.service().relations_of_user(UserId(args.user)).await?;
    output::print_user_relations(&view, output_mode)?;
    Ok(())
}

/// Execute the need-to-go command
pub async fn execute_need_to_go(app: &App, args: &CarArgs, output_mode: OutputMode) -> Result<()> {
    let plan = app.service().send_need_to_go(CarId(args.car)).await?;
    output::print_plan(&plan, output_mode)?;
    Ok(())
}

/// Execute the remove-car command
pub async fn execute_remove_car(app: &App, args: &CarArgs, output_mode: OutputMode) -> Result<()> {
    let car = CarId(args.car);
    let freed = app.service().delete_all_relations_for_car(car).await?;
    output::print_freed(car, &freed, output_mode)?;
    Ok(())
}
