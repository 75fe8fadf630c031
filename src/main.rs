use allocated_resources::{
    AllocatedResourcesClient, Cli, Config, KubernetesLoader, OutputFormat, Result,
    display_allocation_table, init_logger, render,
};
use clap::Parser;
use log::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger(cli.verbose, cli.quiet)?;

    let config = Config::from(&cli);
    info!("Collecting allocated resources");
    debug!("Label selector: {}", config.label_selector);
    debug!(
        "Group by instance type: {}, node details: {}",
        config.group_by_instance_type, config.node_details
    );

    let loader = KubernetesLoader::new(&config).await?;
    let client = AllocatedResourcesClient::new(loader, config);
    let cluster_metrics = client.get_allocated_resources().await?;

    match cli.output {
        OutputFormat::Table => display_allocation_table(&cluster_metrics)?,
        format => println!("{}", render(&cluster_metrics, format)?),
    }

    Ok(())
}
