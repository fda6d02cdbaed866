/// Coarse position of a batch in its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStage {
    ValidatingConfig,
    StartingLevel,
    CircuitProduced,
    CircuitFailed,
    LevelCompleted,
    Completed,
}

#[derive(Debug, Clone)]
pub struct BatchProgressEvent {
    pub stage: BatchStage,
    pub level: u8,
    pub requested: usize,
    pub produced: usize,
    pub failed: usize,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
}
