//! Progress reporting for deliberation rounds

use colored::Colorize;
use delib_application::{DeliberationProgress, ProgressError};
use delib_domain::{Consensus, Round};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::{Mutex, PoisonError};

/// Reports progress during a deliberation with one bar per round
pub struct ProgressReporter {
    multi: MultiProgress,
    round_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            round_bar: Mutex::new(None),
        }
    }

    fn round_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn participant_status(participant: &str, success: bool) -> String {
        if success {
            format!("{} {}", "v".green(), participant)
        } else {
            format!("{} {}", "x".red(), participant)
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliberationProgress for ProgressReporter {
    fn on_round_start(&self, _session_id: &str, round: usize, participants: usize) {
        let pb = self.multi.add(ProgressBar::new(participants as u64));
        pb.set_style(Self::round_style());
        pb.set_prefix(format!("Round {round}"));
        pb.set_message("Querying participants...");

        *self.round_bar.lock().unwrap_or_else(PoisonError::into_inner) = Some(pb);
    }

    fn on_participant_complete(&self, _session_id: &str, participant: &str, success: bool) {
        let guard = self.round_bar.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pb) = guard.as_ref() {
            pb.set_message(Self::participant_status(participant, success));
            pb.inc(1);
        }
    }

    fn on_round_complete(&self, _session_id: &str, round: &Round) -> Result<(), ProgressError> {
        let taken = self
            .round_bar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(pb) = taken {
            pb.finish_with_message(format!(
                "{} agreement {:.2}",
                "complete".green(),
                round.agreement_score
            ));
        }
        Ok(())
    }

    fn on_session_complete(&self, _session_id: &str, consensus: &Consensus) {
        let _ = self.multi.println(format!(
            "{} {} ({})",
            "->".cyan(),
            consensus.decision.as_str().bold(),
            consensus.strength
        ));
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl DeliberationProgress for SimpleProgress {
    fn on_round_start(&self, _session_id: &str, round: usize, participants: usize) {
        println!(
            "{} {} ({} participants)",
            "->".cyan(),
            format!("Round {round}").bold(),
            participants
        );
    }

    fn on_participant_complete(&self, _session_id: &str, participant: &str, success: bool) {
        if success {
            println!("  {}", ProgressReporter::participant_status(participant, true));
        } else {
            println!(
                "  {} (failed)",
                ProgressReporter::participant_status(participant, false)
            );
        }
    }

    fn on_round_complete(&self, _session_id: &str, round: &Round) -> Result<(), ProgressError> {
        println!("  agreement {:.2}\n", round.agreement_score);
        Ok(())
    }
}
