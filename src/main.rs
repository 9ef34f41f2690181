use anyhow::{Context, Result};
use household_dispatch::config::{Config, NamedScenario};
use household_dispatch::optimizer::DispatchOptimizer;
use household_dispatch::report::{self, FailureReport, Report, ScenarioReport};
use household_dispatch::telemetry::init_tracing;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;
    let optimizer = Arc::new(DispatchOptimizer::from_formulation(
        cfg.optimizer.formulation,
        cfg.optimizer.options.clone(),
        cfg.optimizer.nlp.clone(),
    ));
    let start = cfg.output.start_time.unwrap_or_else(report::default_start);
    info!(
        strategy = optimizer.strategy_name(),
        scenarios = cfg.scenarios.len(),
        "starting household dispatch"
    );

    let mut scenarios: Vec<NamedScenario> = Vec::with_capacity(cfg.scenarios.len());
    let mut failures = Vec::new();
    for source in &cfg.scenarios {
        match source.resolve(&cfg.battery) {
            Ok(named) => scenarios.push(named),
            Err(e) => {
                let name = source.label();
                error!(scenario = %name, error = %format!("{e:#}"), "scenario source failed");
                failures.push(FailureReport::unresolved(&name, &e));
            }
        }
    }

    let mut tasks = JoinSet::new();
    for named in scenarios {
        let optimizer = Arc::clone(&optimizer);
        tasks.spawn_blocking(move || {
            let result = optimizer.optimize(&named.scenario, &named.battery);
            (named, result)
        });
    }

    let mut reports = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (named, result) = joined.context("optimizer task panicked")?;
        match result {
            Ok(dispatch) => {
                let report = ScenarioReport::new(
                    &named.name,
                    optimizer.strategy_name(),
                    &named.scenario,
                    &dispatch,
                    start,
                );
                info!(
                    scenario = %named.name,
                    energy_cost = report.energy_cost,
                    savings = report.savings,
                    "scenario optimized"
                );
                reports.push(report);
            }
            Err(e) => {
                error!(scenario = %named.name, kind = e.kind(), error = %e, "scenario failed");
                failures.push(FailureReport::new(&named.name, &e));
            }
        }
    }

    let failed = failures.len();
    let report = Report::new(reports, failures);
    let json = if cfg.output.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    match &cfg.output.path {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("writing report to {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{json}"),
    }

    if failed > 0 {
        warn!(failed, "some scenarios failed");
        anyhow::bail!("{failed} scenario(s) failed");
    }
    Ok(())
}
