//! Progress bars for long-running operations

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use romflash_core::flash::{ProgressSink, ProgressStage};

const TEMPLATE: &str = "{spinner:.green} {msg:>6} [{elapsed_precise}] [{bar:40.cyan/blue}] \
                        {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

fn bar_style() -> ProgressStyle {
    match ProgressStyle::default_bar().template(TEMPLATE) {
        Ok(style) => style.progress_chars("#>-"),
        Err(_) => ProgressStyle::default_bar(),
    }
}

/// One bar per stage, created when the stage first reports
pub struct ProgressBars {
    multi: MultiProgress,
    bars: [Option<ProgressBar>; 3],
}

impl ProgressBars {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: [None, None, None],
        }
    }
}

impl Default for ProgressBars {
    fn default() -> Self {
        Self::new()
    }
}

fn slot(stage: ProgressStage) -> usize {
    match stage {
        ProgressStage::Read => 0,
        ProgressStage::Write => 1,
        ProgressStage::Erase => 2,
    }
}

impl ProgressSink for ProgressBars {
    fn report(&mut self, stage: ProgressStage, current: usize, total: usize) {
        let multi = &self.multi;
        let bar = self.bars[slot(stage)].get_or_insert_with(|| {
            let bar = multi.add(ProgressBar::new(total as u64));
            bar.set_style(bar_style());
            bar.set_message(stage.to_string());
            bar
        });

        bar.set_length(total as u64);
        bar.set_position(current.min(total) as u64);
        if total > 0 && current >= total {
            bar.finish();
        }
    }
}

impl Drop for ProgressBars {
    fn drop(&mut self) {
        for bar in self.bars.iter().flatten() {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }
}
