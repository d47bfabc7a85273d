//! Per-stage pipeline timing.

use parking_lot::Mutex;
use std::time::Duration;

/// The pipeline stages a stats sink can observe. `Deserialize` is the
/// artifact-loading stage that replaces `Parse`/`Validate` on that path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Parse,
    Validate,
    Link,
    Compile,
    Execute,
    Deserialize,
}

/// Receives one wall-clock figure per executed stage.
pub trait StatsSink: Send + Sync {
    fn record(&self, stage: PipelineStage, duration: Duration);
}

/// A sink that accumulates figures in memory; useful for tests and simple
/// hosts.
#[derive(Default)]
pub struct MemoryStatsSink {
    records: Mutex<Vec<(PipelineStage, Duration)>>,
}

impl MemoryStatsSink {
    pub fn new() -> Self {
        MemoryStatsSink::default()
    }

    pub fn records(&self) -> Vec<(PipelineStage, Duration)> {
        self.records.lock().clone()
    }

    pub fn stages(&self) -> Vec<PipelineStage> {
        self.records.lock().iter().map(|(s, _)| *s).collect()
    }
}

impl StatsSink for MemoryStatsSink {
    fn record(&self, stage: PipelineStage, duration: Duration) {
        self.records.lock().push((stage, duration));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_accumulates_in_order() {
        let sink = MemoryStatsSink::new();
        sink.record(PipelineStage::Parse, Duration::from_millis(1));
        sink.record(PipelineStage::Execute, Duration::from_millis(2));
        assert_eq!(
            sink.stages(),
            vec![PipelineStage::Parse, PipelineStage::Execute]
        );
    }
}
