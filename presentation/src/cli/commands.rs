//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for deliberation results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Rounds, votes and the final verdict
    Text,
    /// JSON output
    Json,
}

/// CLI arguments for delib-quorum
#[derive(Parser, Debug)]
#[command(name = "delib")]
#[command(author, version, about = "Multi-model deliberation with signed consensus proofs")]
#[command(long_about = r#"
delib puts one question to several independent models and lets them refine
their answers over bounded rounds until they converge or run out of rounds.

Each round:
1. Every participant answers in parallel under a shared constitution
2. Responses are scored for agreement
3. Participants see a digest of the others' answers in the next round

The verdict can be exported as a signed, hashed proof and sealed to a ledger.

Configuration files are loaded from (in priority order):
1. --config <path>     Explicit config file
2. ./delib.toml        Project-level config
3. ~/.config/delib-quorum/config.toml   Global config

Example:
  delib ask "Should we adopt the new retention policy?"
  delib ask -p claude -p gpt4 --proof proof.json "Ship feature X?"
  delib verify proof.json
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a deliberation on a question
    Ask(AskArgs),
    /// Verify an exported proof file
    Verify(VerifyArgs),
    /// Show configuration sources and validation issues
    Config,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question to deliberate
    pub question: String,

    /// Participants to include (defaults to every configured participant)
    #[arg(short, long, value_name = "ID")]
    pub participant: Vec<String>,

    /// Override the maximum number of rounds
    #[arg(long, value_name = "N")]
    pub max_rounds: Option<usize>,

    /// Override the session timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Background context as a JSON object
    #[arg(long, value_name = "JSON")]
    pub context: Option<String>,

    /// Write a signed proof of the verdict to this file
    #[arg(long, value_name = "PATH")]
    pub proof: Option<PathBuf>,

    /// Signer id used for the validator signature
    #[arg(long, value_name = "ID", default_value = "validator")]
    pub validator: String,

    /// Seal the proof to the configured ledger (requires --proof)
    #[arg(long, requires = "proof")]
    pub seal: bool,

    /// Append a JSONL transcript of round events to this file
    #[arg(long, value_name = "PATH")]
    pub transcript: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Proof file produced by `delib ask --proof`
    pub file: PathBuf,

    /// Trusted verifying key as SIGNER=HEX (repeatable). Without any, the
    /// keys embedded in the proof are trusted.
    #[arg(long, value_name = "SIGNER=HEX")]
    pub trust: Vec<String>,
}

impl VerifyArgs {
    /// Parse `--trust` values into (signer, key) pairs
    pub fn trusted_keys(&self) -> Result<Vec<(String, String)>, String> {
        self.trust
            .iter()
            .map(|entry| match entry.split_once('=') {
                Some((signer, key)) if !signer.trim().is_empty() && !key.trim().is_empty() => {
                    Ok((signer.trim().to_string(), key.trim().to_string()))
                }
                _ => Err(format!("expected SIGNER=HEX, got '{entry}'")),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask() {
        let cli = Cli::parse_from([
            "delib", "-vv", "ask", "-p", "claude", "-p", "gpt4", "--proof", "p.json", "--seal",
            "Ship it?",
        ]);
        assert_eq!(cli.verbose, 2);
        let Command::Ask(args) = cli.command else {
            panic!("expected ask");
        };
        assert_eq!(args.question, "Ship it?");
        assert_eq!(args.participant, vec!["claude", "gpt4"]);
        assert!(args.seal);
        assert_eq!(args.validator, "validator");
    }

    #[test]
    fn test_seal_requires_proof() {
        assert!(Cli::try_parse_from(["delib", "ask", "--seal", "Q"]).is_err());
    }

    #[test]
    fn test_global_output_after_subcommand() {
        let cli = Cli::parse_from(["delib", "verify", "p.json", "-o", "json"]);
        assert_eq!(cli.output, Some(OutputFormat::Json));
    }

    #[test]
    fn test_trusted_keys() {
        let args = VerifyArgs {
            file: PathBuf::from("p.json"),
            trust: vec!["claude=abcd".into(), " gpt4 = ef01 ".into()],
        };
        assert_eq!(
            args.trusted_keys().unwrap(),
            vec![
                ("claude".to_string(), "abcd".to_string()),
                ("gpt4".to_string(), "ef01".to_string())
            ]
        );

        let bad = VerifyArgs {
            file: PathBuf::from("p.json"),
            trust: vec!["nokey".into()],
        };
        assert!(bad.trusted_keys().is_err());
    }
}
