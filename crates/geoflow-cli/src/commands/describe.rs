use anyhow::Result;
use geoflow_core::config::LayeredConfig;
use geoflow_core::ToolCatalog;

use crate::cli::DescribeArgs;
use crate::output::OutputWriter;
use crate::output_types::{ParameterRow, ToolOutput};

pub fn execute(args: DescribeArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let catalog = ToolCatalog::builtin();
    let tool = catalog.get(&args.tool)?;
    let available = catalog.authorize(tool, config.user_tier.value);

    if output.is_json() {
        return output.result(ToolOutput {
            tool: tool.clone(),
            available,
        });
    }

    output.section(&tool.name);
    output.kv("ID", &tool.id);
    output.kv("Category", &tool.category);
    output.kv("Description", &tool.description);
    output.kv(
        "Accepts",
        tool.accepted_kinds
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    );
    output.kv("Tier", tool.tier);
    if !available {
        output.warning(format!(
            "Requires a {} subscription (current tier: {})",
            tool.tier, config.user_tier.value
        ));
    }

    output.section("Parameters");
    output.table(tool.parameters.iter().map(ParameterRow::from).collect());
    Ok(())
}
