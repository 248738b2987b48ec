use std::fmt;

/// Receives human-readable step names and optional 0-100 progress.
pub trait ProgressSink: Send + Sync {
    /// Report entering `step`, optionally with a completion percentage.
    fn report(&self, step: &str, percent: Option<f32>);
}

impl<F> ProgressSink for F
where
    F: Fn(&str, Option<f32>) + Send + Sync,
{
    fn report(&self, step: &str, percent: Option<f32>) {
        self(step, percent)
    }
}

/// Discards every report.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _step: &str, _percent: Option<f32>) {}
}

/// Forwards reports to `tracing` at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, step: &str, percent: Option<f32>) {
        match percent {
            Some(p) => tracing::info!(step, percent = p, "progress"),
            None => tracing::info!(step, "progress"),
        }
    }
}

/// States of the flow construction pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowStep {
    /// Fetching depth weights and creating the session.
    LoadingDepthModel,
    /// Decoding the input image.
    LoadingImage,
    /// Depth inference.
    RunningDepthModel,
    /// Normalizing, rescaling and dilating the raw depth.
    PostprocessingDepth,
    /// Histogram analysis and bound construction.
    SplittingByDepth,
    /// Fetching inpaint weights and creating the session.
    LoadingInpaintModel,
    /// Building layer `index` (0-based) of `total`.
    ProcessingLayer {
        /// Layer index, nearest first.
        index: usize,
        /// Layer count.
        total: usize,
    },
    /// Finished.
    Done,
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadingDepthModel => f.write_str("Loading depth model"),
            Self::LoadingImage => f.write_str("Loading image"),
            Self::RunningDepthModel => f.write_str("Running depth model"),
            Self::PostprocessingDepth => f.write_str("Post-processing depth map"),
            Self::SplittingByDepth => f.write_str("Splitting by depth"),
            Self::LoadingInpaintModel => f.write_str("Loading inpaint model"),
            Self::ProcessingLayer { index, total } => {
                write!(f, "Processing layer {}/{}", index + 1, total)
            }
            Self::Done => f.write_str("Done"),
        }
    }
}

impl FlowStep {
    /// Report this step (with percent for layer steps) and yield to the scheduler.
    pub fn report(self, sink: &dyn ProgressSink) {
        let percent = match self {
            Self::ProcessingLayer { index, total } if total > 0 => {
                Some(index as f32 * 100.0 / total as f32)
            }
            Self::Done => Some(100.0),
            _ => None,
        };
        sink.report(&self.to_string(), percent);
        std::thread::yield_now();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/flow/progress.rs"]
mod tests;
