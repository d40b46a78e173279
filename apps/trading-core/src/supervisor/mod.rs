//! Advisors supervisor: starts, enumerates, and stops advisor actors.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::advisor::{Advisor, AdvisorDeps, AdvisorHandle, advisor_address, spawn_advisor};
use crate::groups::AdvisorSpec;

/// Errors surfaced when starting advisors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupervisorError {
    /// A spec names an advisor implementation nobody registered.
    #[error("unknown advisor module {module}")]
    UnknownAdvisor {
        /// The unresolved module name.
        module: String,
    },
}

/// Builds advisor instances from specs. Registered per module name.
pub trait AdvisorBuilder: Send + Sync {
    /// Build one advisor instance for a spec.
    fn build(&self, spec: &AdvisorSpec) -> Box<dyn Advisor>;
}

impl<F> AdvisorBuilder for F
where
    F: Fn(&AdvisorSpec) -> Box<dyn Advisor> + Send + Sync,
{
    fn build(&self, spec: &AdvisorSpec) -> Box<dyn Advisor> {
        self(spec)
    }
}

/// Outcome of a [`AdvisorsSupervisor::start`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartSummary {
    /// Advisors started by this call.
    pub new: usize,
    /// Advisors that were already running.
    pub already_running: usize,
}

/// Starts and stops advisor actors from specs, one per address.
pub struct AdvisorsSupervisor {
    builders: HashMap<String, Arc<dyn AdvisorBuilder>>,
    deps: AdvisorDeps,
    running: Mutex<HashMap<String, AdvisorHandle>>,
}

impl AdvisorsSupervisor {
    /// Create a supervisor with no registered builders.
    #[must_use]
    pub fn new(deps: AdvisorDeps) -> Self {
        Self {
            builders: HashMap::new(),
            deps,
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Register an advisor builder under a module name.
    #[must_use]
    pub fn with_builder(mut self, module: &str, builder: Arc<dyn AdvisorBuilder>) -> Self {
        self.builders.insert(module.to_string(), builder);
        self
    }

    /// Start an actor per spec unless its address is already live.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::UnknownAdvisor`] on the first spec
    /// whose module has no registered builder; actors started earlier
    /// in the call keep running.
    pub fn start(&self, specs: &[AdvisorSpec]) -> Result<StartSummary, SupervisorError> {
        let mut summary = StartSummary::default();

        for spec in specs {
            let builder = self
                .builders
                .get(&spec.module)
                .ok_or_else(|| SupervisorError::UnknownAdvisor {
                    module: spec.module.clone(),
                })?;

            let address = advisor_address(&spec.group_id, &spec.advisor_id);
            let mut running = self.running.lock();
            let live = running
                .get(&address)
                .is_some_and(|handle| !handle.is_finished());
            if live {
                summary.already_running += 1;
                continue;
            }

            let handle = spawn_advisor(spec, builder.build(spec), self.deps.clone());
            tracing::info!(address = %address, "advisor started");
            running.insert(address, handle);
            summary.new += 1;
        }

        Ok(summary)
    }

    /// Pair each spec with its actor address when one is running.
    #[must_use]
    pub fn info(&self, specs: &[AdvisorSpec]) -> Vec<(AdvisorSpec, Option<String>)> {
        let running = self.running.lock();
        specs
            .iter()
            .map(|spec| {
                let address = advisor_address(&spec.group_id, &spec.advisor_id);
                let live = running
                    .get(&address)
                    .is_some_and(|handle| !handle.is_finished());
                (spec.clone(), live.then_some(address))
            })
            .collect()
    }

    /// Stop the actor at an address. Idempotent: stopping a missing
    /// address returns `false`.
    pub async fn terminate(&self, address: &str) -> bool {
        let handle = self.running.lock().remove(address);
        match handle {
            Some(handle) => {
                handle.stop().await;
                tracing::info!(address = %address, "advisor stopped");
                true
            }
            None => false,
        }
    }

    /// Stop every actor matching the specs; returns how many stopped.
    pub async fn stop(&self, specs: &[AdvisorSpec]) -> usize {
        let mut stopped = 0;
        for spec in specs {
            let address = advisor_address(&spec.group_id, &spec.advisor_id);
            if self.terminate(&address).await {
                stopped += 1;
            }
        }
        stopped
    }

    /// Stop every running actor; returns how many stopped.
    pub async fn shutdown(&self) -> usize {
        let addresses: Vec<String> = self.running.lock().keys().cloned().collect();
        let mut stopped = 0;
        for address in addresses {
            if self.terminate(&address).await {
                stopped += 1;
            }
        }
        stopped
    }

    /// Number of live actors.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.running
            .lock()
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }
}
