use crate::Cli;

/// Selector used when none is given: nodes carrying the worker role label
pub const DEFAULT_SELECTOR: &str = "node-role.kubernetes.io/worker=";

/// Immutable settings for one report run
#[derive(Clone, Debug)]
pub struct Config {
    pub label_selector: String,
    pub group_by_instance_type: bool,
    pub node_details: bool,
    pub context: Option<String>,
}

impl Config {
    pub fn new(
        label_selector: String,
        group_by_instance_type: bool,
        node_details: bool,
        context: Option<String>,
    ) -> Self {
        Self {
            label_selector,
            group_by_instance_type,
            node_details,
            context,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_SELECTOR.to_string(), false, false, None)
    }
}

impl From<&Cli> for Config {
    fn from(cli: &Cli) -> Self {
        Self::new(
            cli.selector.clone(),
            cli.group_by_instance_type,
            cli.node_details,
            cli.context.clone(),
        )
    }
}
