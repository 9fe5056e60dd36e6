//! Courses command - unlocked course access.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::Style;

use super::Context;

/// Arguments for the courses command.
#[derive(Args, Debug)]
pub struct CoursesArgs {
    #[command(subcommand)]
    pub command: CoursesCommand,
}

#[derive(Subcommand, Debug)]
pub enum CoursesCommand {
    /// Unlock a course
    Unlock {
        /// Course ID
        id: String,
    },

    /// Check whether a course is unlocked
    Check {
        /// Course ID
        id: String,
    },

    /// List unlocked courses
    List,
}

/// Run the courses command.
pub async fn run(args: CoursesArgs, ctx: &Context) -> Result<()> {
    let attempts = ctx.attempts()?;
    let green = Style::new().green();
    let dim = Style::new().dim();

    match args.command {
        CoursesCommand::Unlock { id } => {
            let added = attempts.unlock_course_access(&id)?;
            if ctx.json_output {
                ctx.print_json(&serde_json::json!({ "course": id, "newly_unlocked": added }))?;
            } else if added {
                println!("{} Unlocked {}", green.apply_to("✓"), id);
            } else {
                println!("{} {} was already unlocked", dim.apply_to("•"), id);
            }
        }
        CoursesCommand::Check { id } => {
            let unlocked = attempts.has_course_access(&id);
            if ctx.json_output {
                ctx.print_json(&serde_json::json!({ "course": id, "unlocked": unlocked }))?;
            } else if unlocked {
                println!("{} {} is unlocked", green.apply_to("✓"), id);
            } else {
                println!("{} {} is locked", Style::new().red().apply_to("✗"), id);
            }
        }
        CoursesCommand::List => {
            let courses = attempts.unlocked_courses();
            if ctx.json_output {
                ctx.print_json(&courses)?;
            } else if courses.is_empty() {
                println!("{}", dim.apply_to("No unlocked courses"));
            } else {
                for course in &courses {
                    println!("{}", course);
                }
            }
        }
    }

    Ok(())
}
