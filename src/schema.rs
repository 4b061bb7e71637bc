use schemars::schema_for;

use crate::model::OperatorConfig;

/// Generate and print the JSON Schema for `OperatorConfig`.
pub fn run() -> anyhow::Result<()> {
    let schema = schema_for!(OperatorConfig);
    let json = serde_json::to_string_pretty(&schema)?;
    println!("{json}");
    Ok(())
}
