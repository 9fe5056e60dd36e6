//! Slug command - URL slugs from free text.

use anyhow::{Result, bail};
use clap::Args;

use super::Context;

/// Arguments for the slug command.
#[derive(Args, Debug)]
pub struct SlugArgs {
    /// Text to slugify (multiple words are joined with spaces)
    #[arg(required = true)]
    pub text: Vec<String>,

    /// Print the search path for the text instead
    #[arg(long)]
    pub search: bool,
}

/// Run the slug command.
pub fn run(args: SlugArgs, ctx: &Context) -> Result<()> {
    let text = args.text.join(" ");

    let output = if args.search {
        match examdesk_slug::search_path(&text) {
            Some(path) => path,
            None => bail!("'{}' has nothing to search for", text),
        }
    } else {
        examdesk_slug::slugify(&text)
    };

    if ctx.json_output {
        let key = if args.search { "path" } else { "slug" };
        let mut map = serde_json::Map::new();
        map.insert("input".to_string(), text.into());
        map.insert(key.to_string(), output.into());
        return ctx.print_json(&map);
    }

    println!("{}", output);
    Ok(())
}
