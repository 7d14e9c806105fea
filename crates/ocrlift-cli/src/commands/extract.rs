//! Extract command - run the extraction rule over recognized text.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use tracing::debug;

use super::{RuleArgs, load_config};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Text file to read (default: stdin)
    input: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    rule: RuleArgs,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let rule = args.rule.resolve(&config).compile()?;

    let text = match &args.input {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    debug!("Extracting from {} chars", text.len());

    let extraction = rule.apply(&text);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&extraction)?);
    } else {
        println!("{}", extraction.display_text());
    }

    Ok(())
}
