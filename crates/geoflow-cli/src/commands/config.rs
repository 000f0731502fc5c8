use anyhow::Result;
use geoflow_core::config::LayeredConfig;
use tabled::Tabled;

use crate::output::OutputWriter;
use crate::output_types::{ConfigEntry, ConfigOutput};

pub fn execute(config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let values = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| {
            let source = format!("{:?}", source);
            (key, ConfigEntry { value, source })
        })
        .collect::<std::collections::BTreeMap<_, _>>();

    if output.is_json() {
        return output.result(ConfigOutput { values });
    }

    output.section("Configuration Values");

    #[derive(Tabled)]
    struct ConfigRow {
        #[tabled(rename = "Key")]
        key: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Source")]
        source: String,
    }

    // BTreeMap keeps rows sorted by key
    let rows: Vec<ConfigRow> = values
        .into_iter()
        .map(|(key, entry)| ConfigRow {
            key,
            value: entry.value,
            source: entry.source,
        })
        .collect();
    output.table(rows);

    output.section("Configuration Precedence");
    output.info("CLI arguments > Environment variables > Config file > Defaults");

    Ok(())
}
