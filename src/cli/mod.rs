//! Terminal helpers available to actions: prompts, progress bar, throbber

pub mod output;
pub mod progress;
pub mod prompt;
pub mod throbber;

pub use progress::{ProgressBar, ProgressOptions};
pub use prompt::{prompt, prompt_default};
pub use throbber::throbber;
