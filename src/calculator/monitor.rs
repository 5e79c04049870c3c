use dashmap::DashMap;

use crate::container::ContainerID;

use super::{ContainerStatsEntry, ResourceCalculator, ResourceSnapshot};

/// Registry of the calculators of all monitored containers.
#[derive(Debug, Default)]
pub struct Monitor {
    calculators: DashMap<ContainerID, Box<dyn ResourceCalculator>>,
}

impl Monitor {
    /// Starts monitoring `container_id`, replacing any calculator already
    /// registered for it.
    pub fn register(&self, container_id: ContainerID, calculator: Box<dyn ResourceCalculator>) {
        if self.calculators.insert(container_id.clone(), calculator).is_some() {
            log::debug!("Replaced calculator of container {container_id}");
        }
    }

    pub fn remove(&self, container_id: &ContainerID) -> bool {
        self.calculators.remove(container_id).is_some()
    }

    /// Polls every registered calculator once.
    ///
    /// Containers whose calculator reports them as exited are removed before
    /// they are polled.
    ///
    /// # Arguments
    ///
    /// * `timestamp` - UNIX time attached to every entry.
    /// * `out` - Receives one entry per remaining container.
    pub fn collect_stats(&self, timestamp: u64, out: &mut Vec<ContainerStatsEntry>) {
        self.calculators.retain(|container_id, calculator| {
            if calculator.has_exited() {
                log::info!(
                    target: "container monitor",
                    "Container {container_id} exited, no longer monitoring it"
                );
                return false;
            }
            let snapshot = ResourceSnapshot::capture(&mut **calculator);
            log::trace!("Polled container {container_id}: {snapshot:?}");
            out.push(ContainerStatsEntry::new(
                timestamp,
                container_id.clone(),
                snapshot,
            ));
            true
        });
    }

    pub fn size(&self) -> usize {
        self.calculators.len()
    }
}
