//! Terminal output — colored status lines and the poll-wait spinner.
//!
//! Uses `console` for styling and `indicatif` for the spinner shown while
//! waiting between poll rounds.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::progress::StateCounts;

/// Shared handle for all user-facing output during a run.
#[derive(Clone)]
pub struct Ui {
    verbose: bool,
    green: Style,
    red: Style,
    yellow: Style,
    cyan: Style,
}

impl Ui {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            cyan: Style::new().cyan().bold(),
        }
    }

    /// Section header between orchestrator phases.
    pub fn phase(&self, message: &str) {
        println!("{}", self.cyan.apply_to(message));
    }

    pub fn submitted(&self, name: &str, category: &str, request_id: &str) {
        println!("[submitted] {name}  category={category}  id={request_id}");
    }

    pub fn completed(&self, name: &str) {
        println!("  {} [completed] {name}", self.green.apply_to("✓"));
    }

    pub fn failed(&self, name: &str, error: &str) {
        println!("  {} [failed] {name}: {error}", self.red.apply_to("✗"));
    }

    pub fn dry_run(&self, name: &str, category: &str) {
        println!("[dry-run] {name}  category={category}");
    }

    pub fn warn(&self, message: &str) {
        eprintln!("  {} {message}", self.yellow.apply_to("[warn]"));
    }

    pub fn info(&self, message: &str) {
        println!("{message}");
    }

    /// Only printed with `--verbose`.
    pub fn debug(&self, message: &str) {
        if self.verbose {
            println!("{message}");
        }
    }

    /// Backoff notice emitted before each retry sleep.
    pub fn retry(&self, name: &str, attempt: u32, max: u32, reason: &str, delay: Duration) {
        println!(
            "  {} Retry {attempt}/{max} for {name}: {reason} (waiting {}s)",
            self.yellow.apply_to("↻"),
            delay.as_secs_f64()
        );
    }

    pub fn counts(&self, counts: &StateCounts) {
        println!("{counts}");
    }

    /// Sleep `interval` with a spinner showing how many jobs are in flight.
    pub async fn wait_for_next_round(&self, interval: Duration, in_flight: usize) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(format!("{in_flight} in flight, next poll in {}s", interval.as_secs()));
        pb.enable_steady_tick(Duration::from_millis(100));
        tokio::time::sleep(interval).await;
        pb.finish_and_clear();
    }
}
