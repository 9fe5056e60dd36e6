//! Attempts command - exam attempt lifecycle.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use console::{Style, style};
use examdesk_state::{ExamAttempt, TestCompletion};

use super::Context;

/// Arguments for the attempts command.
#[derive(Args, Debug)]
pub struct AttemptsArgs {
    #[command(subcommand)]
    pub command: AttemptsCommand,
}

#[derive(Subcommand, Debug)]
pub enum AttemptsCommand {
    /// List all attempts
    List,

    /// Show one attempt
    Show {
        /// Test ID
        test_id: String,
    },

    /// Start an attempt
    Start {
        /// Test ID
        test_id: String,
    },

    /// Record the results of a started attempt
    Complete {
        /// Test ID
        test_id: String,

        /// Score achieved
        #[arg(long, value_parser = parse_score)]
        score: f64,

        /// Time spent, in seconds
        #[arg(long = "time", default_value = "0")]
        time_spent: u64,

        /// Number of correct answers
        #[arg(long, default_value = "0")]
        correct: u32,

        /// Number of wrong answers
        #[arg(long, default_value = "0")]
        wrong: u32,
    },

    /// Reset an attempt to not-started for a retake
    Reset {
        /// Test ID
        test_id: String,
    },

    /// Delete an attempt
    Delete {
        /// Test ID
        test_id: String,
    },
}

/// Run the attempts command.
pub async fn run(args: AttemptsArgs, ctx: &Context) -> Result<()> {
    let attempts = ctx.attempts()?;
    let green = Style::new().green();
    let dim = Style::new().dim();

    match args.command {
        AttemptsCommand::List => {
            let all = attempts.attempts();
            if ctx.json_output {
                return ctx.print_json(&all);
            }
            if all.is_empty() {
                println!("{}", dim.apply_to("No attempts"));
                return Ok(());
            }
            for attempt in &all {
                print_row(attempt);
            }
        }

        AttemptsCommand::Show { test_id } => {
            let Some(attempt) = attempts.get_test_attempt(&test_id) else {
                bail!("No attempt for '{}'", test_id);
            };
            if ctx.json_output {
                return ctx.print_json(&attempt);
            }
            print_detail(&attempt);
        }

        AttemptsCommand::Start { test_id } => {
            if let Some(existing) = attempts.get_test_attempt(&test_id)
                && existing.is_completed()
            {
                bail!(
                    "'{}' is already completed; run 'examdesk attempts reset {}' to retake it",
                    test_id,
                    test_id
                );
            }
            attempts.save_test_attempt(ExamAttempt::in_progress(&test_id))?;
            if ctx.json_output {
                return ctx.print_json(&attempts.get_test_attempt(&test_id));
            }
            println!("{} Started {}", green.apply_to("✓"), test_id);
        }

        AttemptsCommand::Complete {
            test_id,
            score,
            time_spent,
            correct,
            wrong,
        } => {
            let results = TestCompletion {
                score,
                time_spent,
                questions: Vec::new(),
                correct_count: correct,
                wrong_count: wrong,
            };
            if !attempts.complete_test(&test_id, results)? {
                bail!(
                    "No attempt for '{}'; run 'examdesk attempts start {}' first",
                    test_id,
                    test_id
                );
            }
            if ctx.json_output {
                return ctx.print_json(&attempts.get_test_attempt(&test_id));
            }
            println!(
                "{} Completed {} with score {}",
                green.apply_to("✓"),
                test_id,
                score
            );
        }

        AttemptsCommand::Reset { test_id } => {
            let reset = attempts.reset_attempt(&test_id)?;
            report(ctx, "reset", &test_id, reset)?;
        }

        AttemptsCommand::Delete { test_id } => {
            let deleted = attempts.delete_test_attempt(&test_id)?;
            report(ctx, "deleted", &test_id, deleted)?;
        }
    }

    Ok(())
}

/// Scores are persisted as JSON numbers, which cannot hold NaN or infinity.
fn parse_score(value: &str) -> Result<f64, String> {
    let score: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if !score.is_finite() {
        return Err(format!("'{}' is not a finite number", value));
    }
    Ok(score)
}

fn report(ctx: &Context, action: &str, test_id: &str, changed: bool) -> Result<()> {
    if ctx.json_output {
        return ctx.print_json(&serde_json::json!({
            "test_id": test_id,
            "action": action,
            "changed": changed,
        }));
    }
    if changed {
        println!("{} {} {}", Style::new().green().apply_to("✓"), test_id, action);
    } else {
        println!(
            "{}",
            Style::new()
                .dim()
                .apply_to(format!("No attempt for '{}', nothing {}", test_id, action))
        );
    }
    Ok(())
}

fn print_row(attempt: &ExamAttempt) {
    let dim = Style::new().dim();
    let score = attempt
        .score
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:<24} {:<12} {}",
        attempt.test_id,
        attempt.status,
        dim.apply_to(format!("score {}", score))
    );
}

fn print_detail(attempt: &ExamAttempt) {
    let dim = Style::new().dim();
    println!();
    println!("{}", style(&attempt.test_id).bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {}", dim.apply_to("Status:"), attempt.status);
    if let Some(score) = attempt.score {
        println!("  {} {}", dim.apply_to("Score:"), score);
    }
    if let Some(seconds) = attempt.time_spent {
        println!("  {} {}s", dim.apply_to("Time:"), seconds);
    }
    if let (Some(correct), Some(wrong)) = (attempt.correct_count, attempt.wrong_count) {
        println!(
            "  {} {} correct, {} wrong",
            dim.apply_to("Answers:"),
            correct,
            wrong
        );
    }
    if let Some(at) = attempt.completed_at {
        println!("  {} {}", dim.apply_to("Completed:"), at.to_rfc3339());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("85"), Ok(85.0));
        assert_eq!(parse_score(" 72.5 "), Ok(72.5));
        assert!(parse_score("NaN").is_err());
        assert!(parse_score("inf").is_err());
        assert!(parse_score("-infinity").is_err());
        assert!(parse_score("eighty").is_err());
    }
}
