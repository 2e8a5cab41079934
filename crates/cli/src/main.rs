use anyhow::Context;

use dispas_cli::Plan;
use dispas_reconciliation::EngineConfig;

fn main() -> anyhow::Result<()> {
    dispas_observability::init();

    let path = std::env::args()
        .nth(1)
        .context("usage: dispas <plan.json>")?;
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let plan = Plan::from_json(&raw)?;

    let config = EngineConfig::from_env();
    tracing::info!(asset = %config.asset, decimals = config.decimals(), plan = %path, "running payment plan");

    let report = dispas_cli::run(&plan, &config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
