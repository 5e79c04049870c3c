use serde::{Serialize, Serializer};

use crate::container::ContainerID;

use super::{ResourceCalculator, to_raw};

/// One poll of a [`ResourceCalculator`].
///
/// Memory figures cover all processes of the container. Unavailable readings
/// serialize as `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceSnapshot {
    cpu_percent: f32,
    #[serde(serialize_with = "serialize_reading")]
    cumulative_cpu_millis: Option<u64>,
    #[serde(serialize_with = "serialize_reading")]
    resident_bytes: Option<u64>,
    #[serde(serialize_with = "serialize_reading")]
    virtual_bytes: Option<u64>,
}

impl ResourceSnapshot {
    /// Refreshes `calculator` and reads all four figures.
    pub fn capture(calculator: &mut dyn ResourceCalculator) -> Self {
        calculator.update_process_tree();
        Self {
            cpu_percent: calculator.cpu_usage_percent(),
            cumulative_cpu_millis: calculator.cumulative_cpu_time(),
            resident_bytes: calculator.rss_memory(0),
            virtual_bytes: calculator.virtual_memory(0),
        }
    }

    pub fn cpu_percent(&self) -> f32 {
        self.cpu_percent
    }

    pub fn cumulative_cpu_millis(&self) -> Option<u64> {
        self.cumulative_cpu_millis
    }

    pub fn resident_bytes(&self) -> Option<u64> {
        self.resident_bytes
    }

    pub fn virtual_bytes(&self) -> Option<u64> {
        self.virtual_bytes
    }
}

fn serialize_reading<S>(reading: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_i64(to_raw(*reading))
}

/// A snapshot tagged with its container and the UNIX time of the poll.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerStatsEntry {
    timestamp: u64,
    container_id: ContainerID,
    #[serde(flatten)]
    snapshot: ResourceSnapshot,
}

impl ContainerStatsEntry {
    pub fn new(timestamp: u64, container_id: ContainerID, snapshot: ResourceSnapshot) -> Self {
        Self {
            timestamp,
            container_id,
            snapshot,
        }
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn container_id(&self) -> &ContainerID {
        &self.container_id
    }

    pub fn snapshot(&self) -> &ResourceSnapshot {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::{CgroupCalculatorBuilder, Fixture};

    #[test]
    fn test_capture() {
        let fixture = Fixture::new();
        fixture.add_process(42, "container_01");
        fixture.write_cpu("container_01", 20, 10);
        fixture.write_memory("container_01", 4096, 8192);
        let mut calculator = fixture.builder(42).build();
        calculator.bind_paths().unwrap();

        let snapshot = ResourceSnapshot::capture(&mut calculator);
        assert_eq!(snapshot.cpu_percent(), 0.0);
        assert_eq!(snapshot.cumulative_cpu_millis(), Some(300));
        assert_eq!(snapshot.resident_bytes(), Some(4096));
        assert_eq!(snapshot.virtual_bytes(), Some(8192));
    }

    #[test]
    fn test_entry_json() {
        let mut calculator = CgroupCalculatorBuilder::new().build();
        let snapshot = ResourceSnapshot::capture(&mut calculator);
        let entry = ContainerStatsEntry::new(
            1_700_000_000,
            ContainerID::new("container_01").unwrap(),
            snapshot,
        );

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "timestamp": 1_700_000_000u64,
                "container_id": "container_01",
                "cpu_percent": 0.0,
                "cumulative_cpu_millis": -1,
                "resident_bytes": -1,
                "virtual_bytes": -1,
            })
        );
    }
}
