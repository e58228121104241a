//! Output formatting for CLI commands.
//!
//! Every printer comes in a text form (for people, optionally colored) and a
//! JSON form (for scripts). Text printers write to any `io::Write` so they
//! can be tested against a buffer.

pub mod color;

use crate::domain::{CarId, CarRelations, RelatedCar, UserRelations};
use crate::graph::PropagationPlan;
use color::{bold, dimmed, error, info, success, warning};
use serde::Serialize;
use std::env;
use std::io::{self, Write};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// Settings controlling text output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Read settings from the environment.
    ///
    /// Colors are disabled when `NO_COLOR` is set, or when `PARKCHAIN_COLOR`
    /// is "0" or "false".
    pub fn from_env() -> Self {
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("PARKCHAIN_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);
        Self { use_colors }
    }
}

/// Print a car's direct relations
pub fn print_car_relations(view: &CarRelations, mode: OutputMode) -> io::Result<()> {
    let mut handle = io::stdout().lock();
    match mode {
        OutputMode::Text => write_car_relations(&mut handle, view, &OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, view),
    }
}

/// Print the relations of every car a user owns
pub fn print_user_relations(view: &UserRelations, mode: OutputMode) -> io::Result<()> {
    let mut handle = io::stdout().lock();
    match mode {
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            writeln!(
                handle,
                "{} owns {} car(s)",
                info(&view.user.to_string(), &config),
                view.cars.len()
            )?;
            for car in &view.cars {
                writeln!(handle)?;
                write_car_relations(&mut handle, car, &config)?;
            }
            Ok(())
        }
        OutputMode::Json => write_json(&mut handle, view),
    }
}

/// Print the outcome of a need-to-go request
pub fn print_plan(plan: &PropagationPlan, mode: OutputMode) -> io::Result<()> {
    let mut handle = io::stdout().lock();
    match mode {
        OutputMode::Text => write_plan(&mut handle, plan, &OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, plan),
    }
}

/// Print the cars freed by removing a car's relations
pub fn print_freed(car: CarId, freed: &[CarId], mode: OutputMode) -> io::Result<()> {
    let mut handle = io::stdout().lock();
    match mode {
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            writeln!(
                handle,
                "{} Removed all relations of {}",
                success("✓", &config),
                info(&car.to_string(), &config)
            )?;
            if !freed.is_empty() {
                writeln!(handle, "  {} {}", dimmed("Freed:", &config), join(freed))?;
            }
            Ok(())
        }
        OutputMode::Json => write_json(
            &mut handle,
            &serde_json::json!({ "car": car, "freed": freed }),
        ),
    }
}

/// Print a simple message
pub fn print_message(msg: &str) -> io::Result<()> {
    writeln!(io::stdout().lock(), "{msg}")
}

/// Print a JSON-formatted result for any serializable value
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    write_json(&mut io::stdout().lock(), value)
}

fn write_json<W: Write, T: Serialize>(w: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(w, "{json}")
}

fn write_car_relations<W: Write>(
    w: &mut W,
    view: &CarRelations,
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(w, "{}", bold(&view.car.to_string(), config))?;
    writeln!(
        w,
        "  {} {}",
        dimmed("Blocking:  ", config),
        related_list(&view.is_blocking, config, false)
    )?;
    writeln!(
        w,
        "  {} {}",
        dimmed("Blocked by:", config),
        related_list(&view.is_blocked_by, config, true)
    )
}

fn related_list(cars: &[RelatedCar], config: &OutputConfig, blocked_side: bool) -> String {
    if cars.is_empty() {
        return dimmed("none", config);
    }
    cars.iter()
        .map(|related| {
            let id = related.car_id.to_string();
            let label = if related.has_owner {
                id
            } else {
                format!("{id} (no owner)")
            };
            if blocked_side {
                error(&label, config)
            } else {
                info(&label, config)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn write_plan<W: Write>(
    w: &mut W,
    plan: &PropagationPlan,
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "{} {} needs to go: {} blocker(s), {} owner(s) notified",
        warning("!", config),
        info(&plan.origin.to_string(), config),
        plan.blockers.len(),
        plan.notifications.len()
    )?;
    for notification in &plan.notifications {
        writeln!(
            w,
            "  {} -> {}",
            info(&notification.context.subject_car.to_string(), config),
            notification.recipient
        )?;
    }
    if !plan.ownerless.is_empty() {
        writeln!(
            w,
            "  {} {}",
            warning("No owner:", config),
            join(&plan.ownerless)
        )?;
    }
    for (blocking, blocked) in &plan.truncated_cycles {
        writeln!(
            w,
            "  {} {blocking} -> {blocked}",
            error("Cycle ignored:", config)
        )?;
    }
    Ok(())
}

fn join(cars: &[CarId]) -> String {
    cars.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
