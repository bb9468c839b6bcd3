//! Full ring runs over turmoil's simulated network.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{
    config::SimConfig,
    coordinator::SharedCoordinator,
    error::SimError,
    report::{NodeReport, SimReport},
    sim_env::SimEnv,
    sim_node::run_node,
    sim_transport::host_name,
};

/// Run a ring of `config.num_nodes` turmoil hosts until every node halts.
///
/// Turmoil's RNG is seeded with `config.seed`, so one seed reproduces the
/// whole run.
///
/// # Errors
///
/// - `SimError::Config` if the configuration is invalid
/// - the first error any node returned
/// - `SimError::Simulation` if turmoil aborts the run, for example when
///   `simulation_duration` elapses
/// - `SimError::Incomplete` if the run ended without every node halting
pub fn run_simulation(config: &SimConfig) -> Result<SimReport, SimError> {
    config.validate()?;

    let mut sim = turmoil::Builder::new()
        .simulation_duration(config.simulation_duration)
        .min_message_latency(config.min_latency)
        .max_message_latency(config.max_latency)
        .rng_seed(config.seed)
        .build();

    let coordinator = SharedCoordinator::new();
    let reports: Arc<Mutex<BTreeMap<u32, NodeReport>>> = Arc::default();
    let failure: Arc<Mutex<Option<SimError>>> = Arc::default();

    for n in 0..config.num_nodes {
        let config = config.clone();
        let coordinator = coordinator.clone();
        let reports = Arc::clone(&reports);
        let failure = Arc::clone(&failure);

        sim.client(host_name(n), async move {
            match run_node(n, &config, coordinator, SimEnv::new()).await {
                Ok(report) => {
                    reports.lock().unwrap_or_else(PoisonError::into_inner).insert(n, report);
                    turmoil::Result::Ok(())
                },
                Err(error) => {
                    let message = error.to_string();
                    failure.lock().unwrap_or_else(PoisonError::into_inner).get_or_insert(error);
                    Err(message.into())
                },
            }
        });
    }

    let outcome = sim.run();

    if let Some(error) = failure.lock().unwrap_or_else(PoisonError::into_inner).take() {
        return Err(error);
    }
    outcome.map_err(|e| SimError::Simulation(e.to_string()))?;

    let nodes: Vec<NodeReport> =
        reports.lock().unwrap_or_else(PoisonError::into_inner).values().cloned().collect();
    let halted = nodes.iter().filter(|n| n.halted).count();
    if halted < config.num_nodes as usize {
        return Err(SimError::Incomplete { halted, num_nodes: config.num_nodes });
    }

    Ok(SimReport {
        num_nodes: config.num_nodes,
        counter_limit: config.counter_limit,
        nodes,
        verified: coordinator.verified_nodes().iter().map(|n| n.get()).collect(),
    })
}
