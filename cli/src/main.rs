//! CLI entrypoint for delib-quorum
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use delib_application::{
    CompositeProgress, DeliberationOrchestrator, DeliberationProgress, LedgerClient, ModelRouter,
    NoProgress, ProofGenerator,
};
use delib_domain::{
    ClauseChecks, Consensus, DeliberationContext, ModelConfig, ProofDraft, StanceClassifier,
};
use delib_infrastructure::{
    ConfigIssue, ConfigLoader, Ed25519KeyRing, FileConfig, FileOutputFormat, JsonlTranscriptLogger,
    Severity, default_registry, http_client,
};
use delib_presentation::{
    AskArgs, Cli, Command, ConsoleFormatter, OutputFormat, ProgressReporter, SimpleProgress,
    VerifyArgs,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Starting delib-quorum");

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())?
    };

    if cli.no_color || !config.output.color {
        colored::control::set_override(false);
    }

    let format = cli.output.unwrap_or(match config.output.format {
        Some(FileOutputFormat::Json) => OutputFormat::Json,
        Some(FileOutputFormat::Text) | None => OutputFormat::Text,
    });

    match &cli.command {
        Command::Ask(args) => ask(&cli, &config, args, format).await,
        Command::Verify(args) => verify(args, format).await,
        Command::Config => {
            show_config(&cli, &config);
            Ok(())
        }
    }
}

async fn ask(cli: &Cli, config: &FileConfig, args: &AskArgs, format: OutputFormat) -> Result<()> {
    let issues = config.validate();
    report_issues(&issues);
    if ConfigIssue::has_errors(&issues) {
        bail!("Configuration has errors; run `delib config` for details");
    }

    let configured_order: Vec<String> = config.participants.keys().cloned().collect();
    let selected = select_participants(
        config.participant_configs(),
        &configured_order,
        &args.participant,
    )?;
    let participant_ids: Vec<String> = selected.iter().map(|(id, _)| id.clone()).collect();
    let participants: HashMap<String, ModelConfig> = selected.into_iter().collect();
    let context = parse_context(args.context.as_deref())?;

    let mut params = config.deliberation.to_params();
    if let Some(max_rounds) = args.max_rounds {
        params = params.with_max_rounds(max_rounds);
    }
    if let Some(secs) = args.timeout {
        params = params.with_timeout(Duration::from_secs(secs));
    }

    // === Dependency Injection ===
    let client = http_client(config.router.request_timeout())?;
    let ledger: Option<Arc<dyn LedgerClient>> = config
        .ledger
        .to_client(client.clone())
        .map(|l| Arc::new(l) as Arc<dyn LedgerClient>);

    let router = ModelRouter::new(
        participants,
        default_registry(client),
        config.governance.to_preamble(),
    )
    .with_retry(config.router.to_retry_policy());

    let mut orchestrator = DeliberationOrchestrator::new(router, params);
    if let Some(ledger) = &ledger {
        orchestrator = orchestrator.with_ledger(Arc::clone(ledger));
    }

    if !cli.quiet && format == OutputFormat::Text {
        println!();
        println!("+============================================================+");
        println!("|                       delib-quorum                         |");
        println!("+============================================================+");
        println!();
        println!("Question: {}", args.question);
        println!("Participants: {}", participant_ids.join(", "));
        println!();
    }

    let session_id = orchestrator
        .create_session(&args.question, participant_ids.clone(), context)
        .await?;

    let transcript = match &args.transcript {
        Some(path) => Some(
            JsonlTranscriptLogger::new(path)
                .with_context(|| format!("cannot open transcript {}", path.display()))?,
        ),
        None => None,
    };

    let reporter = ProgressReporter::new();
    let display: &dyn DeliberationProgress = if cli.quiet {
        &NoProgress
    } else if format == OutputFormat::Json {
        &SimpleProgress
    } else {
        &reporter
    };
    let mut observers = vec![display];
    if let Some(logger) = &transcript {
        observers.push(logger);
    }
    let progress = CompositeProgress::new(observers);

    let consensus = orchestrator.run_session(&session_id, &progress).await?;
    let session = orchestrator.session(&session_id).await?;

    let output = match format {
        OutputFormat::Text => ConsoleFormatter::format(&session, &consensus),
        OutputFormat::Json => ConsoleFormatter::format_json(&session, &consensus),
    };
    println!("{}", output);

    let Some(path) = &args.proof else {
        return Ok(());
    };

    let key_ring = Arc::new(Ed25519KeyRing::new());
    for signer in participant_ids.iter().chain(std::iter::once(&args.validator)) {
        key_ring.generate_keypair(signer);
    }

    let mut generator = ProofGenerator::new(key_ring);
    if let Some(ledger) = ledger {
        generator = generator.with_ledger(ledger);
    }

    let draft = ProofDraft::from_session(&session, &consensus, &StanceClassifier::default());
    let (integrity_score, clause_checks) = integrity_of(&consensus);
    let proof = generator
        .generate(draft, integrity_score, clause_checks)
        .await?;
    generator
        .sign_by_participants(&proof.delib_id, &participant_ids)
        .await?;
    let mut proof = generator
        .sign_by_validator(&proof.delib_id, &args.validator)
        .await?;
    if args.seal {
        proof = generator.seal_with_ledger(&proof.delib_id).await?;
    }

    let document = generator.export(&proof.delib_id).await?;
    std::fs::write(path, serde_json::to_string_pretty(&document)?)
        .with_context(|| format!("cannot write proof {}", path.display()))?;
    info!(path = %path.display(), "Proof written");

    if format == OutputFormat::Text {
        print!(
            "{}",
            ConsoleFormatter::format_proof_written(&proof, &path.display().to_string())
        );
    }

    Ok(())
}

async fn verify(args: &VerifyArgs, format: OutputFormat) -> Result<()> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("cannot read proof {}", args.file.display()))?;
    let document: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", args.file.display()))?;

    let key_ring = Arc::new(Ed25519KeyRing::new());
    let trusted = args.trusted_keys().map_err(anyhow::Error::msg)?;
    if trusted.is_empty() {
        warn!("No --trust keys given; trusting the public keys embedded in the proof");
        for (signer, key) in embedded_keys(&document) {
            key_ring.register_verifying_key(&signer, &key)?;
        }
    } else {
        for (signer, key) in &trusted {
            key_ring.register_verifying_key(signer, key)?;
        }
    }

    let generator = ProofGenerator::new(key_ring);
    let proof = generator.import(document).await?;
    let report = generator.verify(&proof.delib_id).await?;

    let output = match format {
        OutputFormat::Text => ConsoleFormatter::format_verification(&report),
        OutputFormat::Json => ConsoleFormatter::format_verification_json(&report),
    };
    println!("{}", output);

    if !report.is_intact() {
        std::process::exit(1);
    }
    Ok(())
}

fn show_config(cli: &Cli, config: &FileConfig) {
    println!("Configuration sources:");
    if cli.no_config {
        println!("  (disabled by --no-config)");
    } else {
        for source in ConfigLoader::config_sources(cli.config.as_ref()) {
            let status = if source.found { "found" } else { "missing" };
            let path = source
                .path
                .as_ref()
                .map_or_else(|| "(built-in)".to_string(), |p| p.display().to_string());
            println!("  {:<8} {} ({})", source.kind.label(), path, status);
        }
    }

    println!();
    println!("Participants:");
    if config.participants.is_empty() {
        println!("  (none)");
    }
    for (id, participant) in &config.participants {
        println!("  {:<12} {} / {}", id, participant.provider, participant.model);
    }

    let issues = config.validate();
    println!();
    if issues.is_empty() {
        println!("No issues found.");
    } else {
        println!("Issues:");
        for issue in &issues {
            println!("  {}", issue);
        }
    }
}

fn report_issues(issues: &[ConfigIssue]) {
    for issue in issues {
        match issue.severity {
            Severity::Error => tracing::error!("{}", issue),
            Severity::Warning => warn!("{}", issue),
        }
    }
}

/// Pick participants in the order they were named with `-p`, or in
/// configuration order when none were named. Duplicates are dropped.
fn select_participants(
    mut configured: HashMap<String, ModelConfig>,
    configured_order: &[String],
    requested: &[String],
) -> Result<Vec<(String, ModelConfig)>> {
    let wanted = if requested.is_empty() {
        configured_order
    } else {
        requested
    };
    let mut selected: Vec<(String, ModelConfig)> = Vec::with_capacity(wanted.len());
    for id in wanted {
        match configured.remove(id) {
            Some(config) => selected.push((id.clone(), config)),
            None if selected.iter().any(|(chosen, _)| chosen == id) => {}
            None => bail!("Unknown participant '{}'", id),
        }
    }
    Ok(selected)
}

fn parse_context(raw: Option<&str>) -> Result<DeliberationContext> {
    match raw {
        Some(raw) => serde_json::from_str(raw).context("--context must be a JSON object"),
        None => Ok(DeliberationContext::new()),
    }
}

/// Integrity score and per-clause checks recorded in the proof.
///
/// Without an integrity scorer the proof records 0.0 and no clauses.
fn integrity_of(consensus: &Consensus) -> (f64, ClauseChecks) {
    match &consensus.integrity {
        Some(integrity) => {
            let checks = integrity
                .breakdown
                .iter()
                .map(|(clause, score)| (clause.clone(), serde_json::json!(score)))
                .collect();
            (integrity.score, checks)
        }
        None => (0.0, ClauseChecks::new()),
    }
}

/// Signer/key pairs carried inside an exported proof
fn embedded_keys(document: &serde_json::Value) -> Vec<(String, String)> {
    let participants = document["participant_signatures"]
        .as_array()
        .into_iter()
        .flatten();
    let validator = std::iter::once(&document["validator_signature"]);

    participants
        .chain(validator)
        .filter_map(|sig| {
            let signer = sig["signer"].as_str()?;
            let key = sig["public_key"].as_str()?;
            Some((signer.to_string(), key.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use delib_domain::{IntegrityScore, ProviderKind};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn configured() -> HashMap<String, ModelConfig> {
        HashMap::from([
            (
                "claude".to_string(),
                ModelConfig::new(ProviderKind::Anthropic, "claude-sonnet-4"),
            ),
            (
                "gpt4".to_string(),
                ModelConfig::new(ProviderKind::OpenAi, "gpt-4-turbo"),
            ),
        ])
    }

    fn ids(selected: &[(String, ModelConfig)]) -> Vec<&str> {
        selected.iter().map(|(id, _)| id.as_str()).collect()
    }

    fn order() -> Vec<String> {
        vec!["claude".to_string(), "gpt4".to_string()]
    }

    #[test]
    fn test_select_all_in_configured_order() {
        let selected = select_participants(configured(), &order(), &[]).unwrap();
        assert_eq!(ids(&selected), vec!["claude", "gpt4"]);
    }

    #[test]
    fn test_select_keeps_requested_order() {
        let requested = vec!["gpt4".to_string(), "claude".to_string()];
        let selected = select_participants(configured(), &order(), &requested).unwrap();
        assert_eq!(ids(&selected), vec!["gpt4", "claude"]);
    }

    #[test]
    fn test_select_drops_duplicates() {
        let requested = vec!["gpt4".to_string(), "gpt4".to_string()];
        let selected = select_participants(configured(), &order(), &requested).unwrap();
        assert_eq!(ids(&selected), vec!["gpt4"]);
    }

    #[test]
    fn test_select_unknown_participant_fails() {
        let requested = vec!["llama".to_string()];
        assert!(select_participants(configured(), &order(), &requested).is_err());
    }

    #[test]
    fn test_parse_context() {
        assert!(parse_context(None).unwrap().is_empty());
        let context = parse_context(Some(r#"{"team": "infra"}"#)).unwrap();
        assert_eq!(context["team"], "infra");
        assert!(parse_context(Some("[1, 2]")).is_err());
    }

    #[test]
    fn test_integrity_of_without_scorer() {
        let (score, checks) = integrity_of(&Consensus::no_rounds());
        assert_eq!(score, 0.0);
        assert!(checks.is_empty());
    }

    #[test]
    fn test_integrity_of_copies_breakdown() {
        let integrity = IntegrityScore::new(0.9, 0.8)
            .unwrap()
            .with_breakdown(BTreeMap::from([("honesty".to_string(), 0.95)]));
        let consensus = Consensus::no_rounds().with_integrity(integrity);

        let (score, checks) = integrity_of(&consensus);
        assert_eq!(score, 0.9);
        assert_eq!(checks["honesty"], json!(0.95));
    }

    #[test]
    fn test_embedded_keys() {
        let document = json!({
            "participant_signatures": [
                {"signer": "claude", "public_key": "aa"},
                {"signer": "gpt4", "public_key": "bb"}
            ],
            "validator_signature": {"signer": "validator", "public_key": "cc"}
        });
        assert_eq!(
            embedded_keys(&document),
            vec![
                ("claude".to_string(), "aa".to_string()),
                ("gpt4".to_string(), "bb".to_string()),
                ("validator".to_string(), "cc".to_string())
            ]
        );
        assert!(embedded_keys(&json!({"validator_signature": null})).is_empty());
    }
}
