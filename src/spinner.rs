//! Progress spinner shown on stderr while a model is thinking.
//!
//! [`Spinner::stop`] joins the ticker thread and clears the line before it
//! returns. Dropping a running spinner does the same, so early returns never
//! leave a ticker behind.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const FRAMES: [&str; 9] = ["⠇", "⠋", "⠙", "⠸", "⢰", "⣠", "⣄", "⡆", ""];
const INTERVAL: Duration = Duration::from_millis(100);

pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    /// Start a spinner on stderr. indicatif hides it when stderr is not a
    /// terminal.
    pub fn start(message: &str) -> Self {
        Self::start_on(message, ProgressDrawTarget::stderr())
    }

    fn start_on(message: &str, target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(None, target);
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&FRAMES),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(INTERVAL);
        Self { bar }
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        !self.bar.is_finished()
    }

    /// Stop the spinner and clear its line.
    pub fn stop(self) {
        drop(self);
    }

    fn finish(&self) {
        if self.bar.is_finished() {
            return;
        }
        self.bar.disable_steady_tick();
        self.bar.finish_and_clear();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.finish();
    }
}
