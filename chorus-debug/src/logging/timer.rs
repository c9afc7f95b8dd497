use std::time::Instant;

use super::colors::Colorize;
use super::stack::{depth, innermost_messages, pop, push};
use super::symbols::ARROW;

/// Measures and reports a named step, for example loading one audio source.
/// Dropping a timer without calling [`Timer::stop`] reports the step as
/// failed.
pub struct Timer {
    name: String,
    start: Instant,
    finished: bool,
}

impl Timer {
    /// Starts a timer with a static name.
    pub fn new(name: &'static str) -> Self {
        Self::new_dynamic(name.to_string())
    }

    /// Starts a timer with a name built at runtime.
    pub fn new_dynamic(name: String) -> Self {
        if depth() == 0 {
            let timestamp = chrono::Local::now().format("%H:%M:%S").to_string();
            print_debug_prefix!("[{}] {}", timestamp.red(), name);
        } else {
            print_debug_prefix!("{}", name);
        }

        push(2);

        Self {
            name,
            start: Instant::now(),
            finished: false,
        }
    }

    /// Reports the step as completed.
    pub fn stop(mut self) {
        self.finish("completed".green().to_string());
        self.finished = true;
    }

    fn finish(&self, outcome: String) {
        let elapsed = format!("{}ms", self.start.elapsed().as_millis());
        let inline = innermost_messages() == 0;

        pop();

        if inline {
            println!(" ({})", elapsed.cyan());
        } else {
            crate::print_debug!("{} {} {} ({})", self.name, ARROW, outcome, elapsed.cyan());
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if !self.finished {
            self.finish("failed".red().to_string());
        }
    }
}
