use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = campus_harvest::HarvestConfig::load();
    let datasets: Vec<&str> = config.datasets.iter().map(|d| d.as_str()).collect();
    info!(?datasets, "starting campus-harvest run");

    match campus_harvest::run(&config).await {
        Ok(summary) => {
            for report in &summary.reports {
                info!(
                    dataset = report.dataset.as_str(),
                    stubs = report.stubs,
                    records = report.records,
                    nested_records = report.nested_records,
                    degraded = report.failed_records,
                    "dataset complete"
                );
            }
            for (dataset, reason) in &summary.failed_datasets {
                error!(dataset = dataset.as_str(), reason = %reason, "dataset aborted");
            }
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "run failed before any catalog was discovered");
            Err(e.into())
        }
    }
}
