use clap::Parser;

use crate::lib::config::DEFAULT_SELECTOR;

/// Kubernetes Allocated Resources
///
/// Reports CPU, memory and pod allocation against node capacity, summed over
/// the selected nodes and optionally grouped by instance type.
#[derive(Parser, Debug)]
#[command(name = "kube-allocated-resources", author, version, about, styles=get_styles())]
pub struct Cli {
    /// Selector (label query) to filter nodes on, supports '=', '==', and '!='
    ///
    /// e.g. -l key1=value1,key2=value2
    #[arg(short = 'l', long, default_value = DEFAULT_SELECTOR)]
    pub selector: String,

    /// Return totals grouped by the instance type
    #[arg(short, long)]
    pub group_by_instance_type: bool,

    /// Return allocated resources of each node
    #[arg(short = 'd', long)]
    pub node_details: bool,

    /// Output format
    #[arg(short, long, value_name = "FORMAT", default_value = "json")]
    pub output: OutputFormat,

    /// Provide context name
    ///
    /// Use if you have multiple clusters in your kubeconfig
    #[arg(long)]
    pub context: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress log output to stderr (logs still written to file)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Output the report as JSON
    Json,
    /// Output the report as YAML
    Yaml,
    /// Browse the report in an interactive table
    Table,
}

/// Set color and variants for help description
///
/// Thanks to [Praveen Perera](https://stackoverflow.com/a/76916424)
fn get_styles() -> clap::builder::Styles {
    let heading = anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow)));
    let red = anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red)));

    clap::builder::Styles::styled()
        .usage(heading)
        .header(heading)
        .literal(
            anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
        )
        .invalid(red)
        .error(red)
        .valid(
            anstyle::Style::new()
                .bold()
                .underline()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
        )
        .placeholder(
            anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))),
        )
}
