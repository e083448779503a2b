//! Progress bar drawn incrementally with a fixed glyph

use std::io;

use crate::infrastructure::console::SharedOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressOptions {
    /// Value representing completion
    pub maximum: u64,
    /// Width of the full bar in glyphs
    pub size: usize,
    pub glyph: char,
    /// Initial progress
    pub start: u64,
}

impl Default for ProgressOptions {
    fn default() -> Self {
        Self {
            maximum: 100,
            size: 20,
            glyph: '#',
            start: 0,
        }
    }
}

/// Appends glyphs as progress grows; never redraws.
/// The line is terminated once the maximum is reached.
#[derive(Debug)]
pub struct ProgressBar {
    output: SharedOutput,
    options: ProgressOptions,
    progress: u64,
    drawn: usize,
    finished: bool,
}

impl ProgressBar {
    pub fn new(output: SharedOutput, options: ProgressOptions) -> io::Result<Self> {
        let mut bar = Self {
            output,
            options,
            progress: 0,
            drawn: 0,
            finished: false,
        };
        bar.advance(options.start)?;
        Ok(bar)
    }

    pub fn advance(&mut self, amount: u64) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.progress = self.progress.saturating_add(amount).min(self.options.maximum);

        let target = self.glyphs_for(self.progress);
        let mut chunk: String = std::iter::repeat(self.options.glyph)
            .take(target.saturating_sub(self.drawn))
            .collect();
        self.drawn = self.drawn.max(target);

        if self.progress >= self.options.maximum {
            self.finished = true;
            chunk.push('\n');
        }
        if !chunk.is_empty() {
            self.output.write_flushed(&chunk)?;
        }
        Ok(())
    }

    fn glyphs_for(&self, progress: u64) -> usize {
        if self.options.maximum == 0 {
            return self.options.size;
        }
        let ratio = progress as f64 / self.options.maximum as f64;
        (ratio * self.options.size as f64).floor() as usize
    }

    pub fn progress(&self) -> u64 {
        self.progress
    }

    pub fn is_complete(&self) -> bool {
        self.finished
    }
}
