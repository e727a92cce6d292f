//! Progress reporting
//!
//! Long-running primitives report `(stage, current, total)` after every
//! chunk of work. The counters live in the flash context; the sink that
//! receives the reports is installed by the caller.

use core::fmt;

/// Logical pass of a hardware transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgressStage {
    /// Reading from the chip (also used for verification)
    Read,
    /// Programming the chip
    Write,
    /// Erasing the chip
    Erase,
}

impl ProgressStage {
    const fn index(self) -> usize {
        match self {
            ProgressStage::Read => 0,
            ProgressStage::Write => 1,
            ProgressStage::Erase => 2,
        }
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressStage::Read => write!(f, "read"),
            ProgressStage::Write => write!(f, "write"),
            ProgressStage::Erase => write!(f, "erase"),
        }
    }
}

/// Receiver of progress reports
pub trait ProgressSink {
    /// Called with the new state of `stage`
    fn report(&mut self, stage: ProgressStage, current: usize, total: usize);
}

impl<F> ProgressSink for F
where
    F: FnMut(ProgressStage, usize, usize),
{
    fn report(&mut self, stage: ProgressStage, current: usize, total: usize) {
        self(stage, current, total)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct StageCounter {
    current: usize,
    total: usize,
}

/// Per-stage progress counters plus an optional sink
///
/// Within a stage `current` never decreases. If an implementation reports
/// more work than it announced, `total` is raised to match.
#[derive(Default)]
pub struct Progress {
    sink: Option<Box<dyn ProgressSink>>,
    counters: [StageCounter; 3],
}

impl Progress {
    /// Create counters without a sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a sink, returning the previous one
    pub fn set_sink(&mut self, sink: Box<dyn ProgressSink>) -> Option<Box<dyn ProgressSink>> {
        self.sink.replace(sink)
    }

    /// Remove the sink
    pub fn clear_sink(&mut self) -> Option<Box<dyn ProgressSink>> {
        self.sink.take()
    }

    /// Start a stage with `total` units of work
    pub fn init(&mut self, stage: ProgressStage, total: usize) {
        self.counters[stage.index()] = StageCounter { current: 0, total };
        self.emit(stage);
    }

    /// Record `increment` units of completed work
    pub fn update(&mut self, stage: ProgressStage, increment: usize) {
        let counter = &mut self.counters[stage.index()];
        counter.current += increment;
        if counter.current > counter.total {
            log::debug!("Fixing total value of stage {} progress on the fly.", stage);
            counter.total = counter.current;
        }
        self.emit(stage);
    }

    /// Current `(current, total)` of a stage
    pub fn get(&self, stage: ProgressStage) -> (usize, usize) {
        let counter = self.counters[stage.index()];
        (counter.current, counter.total)
    }

    fn emit(&mut self, stage: ProgressStage) {
        let counter = self.counters[stage.index()];
        if let Some(sink) = self.sink.as_mut() {
            sink.report(stage, counter.current, counter.total);
        }
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("has_sink", &self.sink.is_some())
            .field("counters", &self.counters)
            .finish()
    }
}
