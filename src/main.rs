//! Simulator entrypoint: wires configuration, the control loop, and the
//! workload source together, then runs until Ctrl-C or workload exhaustion.

use std::time::Instant;

use cadence_sim::client::{csv_source, Client};
use cadence_sim::collector::Collector;
use cadence_sim::config::SimConfig;
use cadence_sim::controller::Controller;
use cadence_sim::error::Error;
use cadence_sim::logging;
use cadence_sim::manager::Manager;
use cadence_sim::sampler::Sampler;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::init();

    let config = SimConfig::from_args()?;
    let sim_start = Instant::now();

    let collector = Collector::new(sim_start);
    let manager = Manager::new(config.manager_config(), collector.clone(), sim_start);

    // Bring the pool up to min_workers before any traffic starts, so the
    // first arrivals never queue behind workers that don't exist yet.
    for _ in 0..config.min_workers {
        manager.create_worker().await;
    }
    info!(min_workers = config.min_workers, max_workers = config.max_workers, "worker pool ready");

    let controller = Controller::new(config.controller_config());
    let sampler = Sampler::spawn(
        config.setpoint_s,
        config.sample_interval_s,
        manager.clone(),
        collector.clone(),
        controller,
        sim_start,
    );

    let client = if let Some(path) = &config.workload_csv_path {
        let schedule = csv_source::load_csv(path)?;
        info!(path, rows = schedule.len(), "replaying CSV workload");
        Client::start_csv(manager.clone(), sim_start, schedule)
    } else {
        Client::start(
            manager.clone(),
            sim_start,
            config.f_base_hz,
            config.base_processing_ms,
            config.baseline_variant(),
        )
    };

    tokio::signal::ctrl_c().await.ok();
    info!("shutdown signal received, draining");

    sampler.stop();
    client.stop().await;
    manager.shutdown().await;

    let compliance = collector
        .slo_compliance(config.slo_window_s, config.setpoint_s, config.slo_band_s)
        .await;
    info!(compliance, "final SLO compliance");

    Ok(())
}
