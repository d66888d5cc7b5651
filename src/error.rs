use thiserror::Error;

/// Fatal pipeline conditions. Everything else is an isolated per-item
/// skip accumulated in the run report.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Two canonical records generated the same id. The only
    /// data-integrity condition that aborts an otherwise-successful run,
    /// always before anything is written.
    #[error("duplicate canonical ids generated: {}", ids.join(", "))]
    DuplicateIds { ids: Vec<String> },

    #[error("configuration error: {0}")]
    Config(String),
}
