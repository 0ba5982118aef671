//! Console output formatter for deliberation results

use colored::{ColoredString, Colorize};
use delib_domain::core::string::truncate_chars;
use delib_domain::{
    Consensus, Decision, DelibProof, DeliberationSession, Round, VerificationReport,
};
use serde_json::json;

/// Characters of each response shown for rounds before the last
const EARLIER_ROUND_CHARS: usize = 300;

/// Formats deliberation results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the complete session: every round plus the verdict
    pub fn format(session: &DeliberationSession, consensus: &Consensus) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Deliberation Results"));
        output.push('\n');

        output.push_str(&format!(
            "{} {}\n\n",
            "Question:".cyan().bold(),
            session.question.content()
        ));
        output.push_str(&format!(
            "{} {}\n",
            "Participants:".cyan().bold(),
            session.participants.join(", ")
        ));

        let last = session.rounds().len();
        for round in session.rounds() {
            output.push_str(&Self::format_round(round, round.number == last));
        }

        output.push_str(&Self::format_verdict(consensus));
        output.push_str(&Self::footer());

        output
    }

    fn format_round(round: &Round, is_last: bool) -> String {
        let mut output = Self::section_header(&format!(
            "Round {}  agreement {:.2}  ({}/{} responded, {:.1}s)",
            round.number,
            round.agreement_score,
            round.metrics.responded,
            round.metrics.expected,
            round.duration_seconds()
        ));

        if round.is_empty() {
            output.push_str(&format!("\n{}\n", "No participant responded.".red()));
        }

        for response in &round.responses {
            let content = if is_last {
                response.content.clone()
            } else {
                truncate_chars(&response.content, EARLIER_ROUND_CHARS)
            };
            output.push_str(&format!(
                "\n{}\n{}\n",
                format!("── {} ({}) ──", response.participant_id, response.model)
                    .yellow()
                    .bold(),
                Self::indent(&content, "  ")
            ));
        }

        output
    }

    /// Format only the verdict (concise output)
    pub fn format_verdict(consensus: &Consensus) -> String {
        let mut output = Self::section_header("Verdict");

        output.push_str(&format!(
            "\n{} {}   {} {}   {} {:.2}\n",
            "Decision:".bold(),
            Self::decision_label(consensus.decision),
            "Strength:".bold(),
            consensus.strength,
            "Agreement:".bold(),
            consensus.agreement_score
        ));
        output.push_str(&format!(
            "{} {} approve, {} reject, {} abstain {}\n",
            "Votes:".bold(),
            consensus.voting.approve.len(),
            consensus.voting.reject.len(),
            consensus.voting.abstain.len(),
            consensus.voting.vote_summary().dimmed()
        ));
        output.push_str(&format!("\n{}\n", consensus.summary));

        if let Some(dissent) = &consensus.dissent {
            output.push_str(&format!("{} {}\n", "Dissent:".yellow().bold(), dissent));
        }
        if let Some(integrity) = &consensus.integrity {
            let score = format!("{:.3}", integrity.score);
            let score = if integrity.threshold_met {
                score.green()
            } else {
                score.red()
            };
            output.push_str(&format!("{} {}\n", "Integrity:".bold(), score));
        }

        output
    }

    /// Format as JSON
    pub fn format_json(session: &DeliberationSession, consensus: &Consensus) -> String {
        let value = json!({
            "session_id": session.id,
            "question": session.question.content(),
            "participants": session.participants,
            "state": session.state().as_str(),
            "termination": session.termination(),
            "rounds": session.rounds(),
            "consensus": consensus,
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    /// One line per proof written by `ask --proof`
    pub fn format_proof_written(proof: &DelibProof, path: &str) -> String {
        let mut output = format!("{} {}\n", "Proof written:".green().bold(), path);
        output.push_str(&format!(
            "  {} {}\n",
            "Signers:".dimmed(),
            proof.signer_ids().collect::<Vec<_>>().join(", ")
        ));
        if let Some(hash) = &proof.proof_hash {
            output.push_str(&format!("  {} {}\n", "Hash:".dimmed(), hash));
        }
        if let Some(tx) = &proof.ledger_tx_id {
            output.push_str(&format!("  {} {}\n", "Ledger tx:".dimmed(), tx));
        }
        output
    }

    /// Format a verification report
    pub fn format_verification(report: &VerificationReport) -> String {
        let mut output = Self::header("Proof Verification");
        output.push('\n');

        output.push_str(&format!(
            "{} {}\n",
            "Deliberation:".cyan().bold(),
            report.delib_id
        ));
        output.push_str(&format!(
            "{} {}/{} valid\n\n",
            "Participant signatures:".cyan().bold(),
            report.valid_signatures,
            report.total_signatures
        ));

        for check in &report.participant_verifications {
            output.push_str(&format!("  {} {}\n", Self::mark(check.valid), check.signer));
        }
        output.push_str(&format!(
            "  {} validator\n",
            Self::mark(report.validator_signature_valid)
        ));

        let hash = match report.hash_valid {
            Some(true) => "matches".green(),
            Some(false) => "MISMATCH".red().bold(),
            None => "not finalized".dimmed(),
        };
        output.push_str(&format!("\n{} {}\n", "Proof hash:".bold(), hash));

        let verdict = if report.is_intact() {
            "VALID".green().bold()
        } else {
            "INVALID".red().bold()
        };
        output.push_str(&format!("{} {}\n", "Result:".bold(), verdict));
        output.push_str(&Self::footer());

        output
    }

    /// Format a verification report as JSON
    pub fn format_verification_json(report: &VerificationReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }

    fn decision_label(decision: Decision) -> ColoredString {
        match decision {
            Decision::Approved => decision.as_str().green().bold(),
            Decision::Rejected => decision.as_str().red().bold(),
            Decision::Undecided => decision.as_str().yellow().bold(),
            Decision::Timeout => decision.as_str().magenta().bold(),
        }
    }

    fn mark(ok: bool) -> ColoredString {
        if ok { "v".green() } else { "x".red() }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
