use crate::lib::allocation::ClusterMetrics;
use crate::{ConfigError, OutputFormat, Result};

/// Render the report as text in the requested format.
///
/// The table format is interactive and has no text rendering; see
/// [`crate::display_allocation_table`].
pub fn render(metrics: &ClusterMetrics, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(metrics)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(metrics)?),
        OutputFormat::Table => Err(ConfigError::InvalidValue(
            "table output cannot be rendered as text".to_string(),
        )
        .into()),
    }
}
