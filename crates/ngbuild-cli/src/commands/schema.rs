//! Schema command: the JSON schema for `ngbuild.json`.

use crate::cli::SchemaArgs;
use crate::config::NgbuildConfig;
use crate::error::{Result, ResultExt};
use crate::ui;

/// Print the config schema, or write it to `--output`.
pub async fn execute(args: SchemaArgs) -> Result<()> {
    let schema = serde_json::to_string_pretty(&NgbuildConfig::json_schema())?;

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, format!("{schema}\n"))
                .await
                .with_path(&path)?;
            ui::success(&format!("Wrote schema to {}", path.display()));
        }
        None => println!("{schema}"),
    }
    Ok(())
}
