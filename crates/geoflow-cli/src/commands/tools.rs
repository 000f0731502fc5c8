use anyhow::Result;
use geoflow_core::config::LayeredConfig;
use geoflow_core::models::DatasetKind;
use geoflow_core::ToolCatalog;

use crate::cli::ToolsArgs;
use crate::output::OutputWriter;
use crate::output_types::{ToolOutput, ToolRow};

pub fn execute(args: ToolsArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let catalog = ToolCatalog::builtin();
    let tier = config.user_tier.value;
    let kind = args.kind.map(DatasetKind::from);

    let tools: Vec<ToolOutput> = catalog
        .tools()
        .iter()
        .filter(|t| kind.map_or(true, |k| t.accepts(k)))
        .map(|t| ToolOutput {
            available: catalog.authorize(t, tier),
            tool: t.clone(),
        })
        .collect();

    if output.is_json() {
        return output.result(tools);
    }

    output.section(format!("Analysis Tools ({} tier)", tier));
    output.table(tools.iter().map(ToolRow::from).collect());

    let locked = tools.iter().filter(|t| !t.available).count();
    if locked > 0 {
        output.info(format!(
            "{} tool(s) need a higher tier; pass --tier or set GEOFLOW_TIER",
            locked
        ));
    }
    Ok(())
}
