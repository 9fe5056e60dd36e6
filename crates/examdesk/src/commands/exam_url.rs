//! Exam URL command - canonical exam paths.

use anyhow::Result;
use clap::Args;
use examdesk_slug::{ExamRef, exam_path};

use super::Context;

/// Arguments for the exam-url command.
#[derive(Args, Debug)]
pub struct ExamUrlArgs {
    /// Provider name, e.g. "AWS"
    #[arg(long)]
    pub provider: Option<String>,

    /// Exam code, e.g. "SAA_C03"
    #[arg(long)]
    pub code: Option<String>,

    /// Stored exam slug, used when provider or code is missing
    #[arg(long)]
    pub slug: Option<String>,
}

/// Run the exam-url command.
///
/// Prints `#` when nothing routable was given.
pub fn run(args: ExamUrlArgs, ctx: &Context) -> Result<()> {
    let path = exam_path(ExamRef {
        provider: args.provider.as_deref(),
        code: args.code.as_deref(),
        slug: args.slug.as_deref(),
    });

    if ctx.json_output {
        return ctx.print_json(&serde_json::json!({
            "path": path.to_string(),
            "routable": path.is_routable(),
        }));
    }

    println!("{}", path);
    Ok(())
}
