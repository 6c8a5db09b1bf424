//! webagent binary: crawl, index, then drive the bounded agent loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{
    ContextRetriever, ExecutionReport, MockBrowser, MockLlmProvider, Orchestrator,
    OrchestratorConfig,
};
use webagent_cli::cli::CliArgs;
use webagent_cli::config::Settings;
use webagent_cli::crawler::{Crawler, CrawlerConfig};
use webagent_cli::knowledge::KnowledgeBase;
use webagent_cli::llm::{OllamaConfig, OllamaProvider};
use webagent_cli::report::save_report;
use webagent_cli::{HttpBrowser, HttpBrowserConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliArgs::parse();
    let _log_guard = init_logging(&cli.log_level, cli.debug)?;

    info!("Starting webagent v{}", env!("CARGO_PKG_VERSION"));
    let settings = Settings::load(cli.config.as_ref())?;

    let retriever = build_retriever(&cli, &settings).await?;
    let report = execute_task(&cli, &settings, retriever).await?;

    print_summary(&report);
    save_report(&report, &settings.artifacts_dir)?;
    Ok(())
}

fn init_logging(level: &str, debug: bool) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("invalid log level")?
    };

    let file_appender = tracing_appender::rolling::daily("logs", "webagent.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    Ok(guard)
}

/// Crawl the target domain and index it, unless the run skips context.
async fn build_retriever(cli: &CliArgs, settings: &Settings) -> Result<Arc<dyn ContextRetriever>> {
    if cli.offline || cli.skip_crawl {
        info!("skipping crawl; planning without retrieved context");
        return Ok(Arc::new(KnowledgeBase::new()));
    }

    info!(domain = %cli.domain, depth = settings.crawl_depth, "crawling target site");
    let crawler = Crawler::new(
        &cli.domain,
        CrawlerConfig {
            depth: settings.crawl_depth,
            ..CrawlerConfig::default()
        },
    )?;
    let pages = crawler.crawl().await;
    if pages.is_empty() {
        warn!("no pages crawled; continuing without context");
    }

    let kb = KnowledgeBase::build_from_pages(&pages);

    // Probe retrieval so a broken index is visible before the agent runs.
    match kb.search("login form", 3).await {
        Ok(results) => {
            for snippet in &results {
                info!(
                    source = snippet.metadata.get("source_url").map(String::as_str).unwrap_or("?"),
                    distance = snippet.distance,
                    "context candidate"
                );
            }
        }
        Err(err) => warn!(error = %err, "retrieval probe failed"),
    }

    Ok(Arc::new(kb))
}

async fn execute_task(
    cli: &CliArgs,
    settings: &Settings,
    retriever: Arc<dyn ContextRetriever>,
) -> Result<ExecutionReport> {
    let config = OrchestratorConfig {
        artifacts_dir: settings.artifacts_dir.clone(),
        context_k: settings.context_k,
        ..OrchestratorConfig::default()
    };

    let report = if cli.offline {
        // Deterministic dry run: heuristic planning against a scripted
        // browser, no model and no network.
        let llm = Arc::new(MockLlmProvider::failing());
        let mut orchestrator =
            Orchestrator::with_config(MockBrowser::new(), llm, retriever, config);
        orchestrator.run(&cli.task, &cli.domain).await
    } else {
        let llm = Arc::new(OllamaProvider::new(OllamaConfig {
            model: settings.chat_model.clone(),
            base_url: settings.ollama_base_url.clone(),
            temperature: settings.llm_temperature,
            timeout: Duration::from_millis(settings.llm_timeout_ms),
        })?);
        let driver = HttpBrowser::new(HttpBrowserConfig {
            timeout_ms: settings.browser_timeout_ms,
            ..HttpBrowserConfig::default()
        });
        let mut orchestrator = Orchestrator::with_config(driver, llm, retriever, config);
        orchestrator.run(&cli.task, &cli.domain).await
    };

    Ok(report)
}

fn print_summary(report: &ExecutionReport) {
    let separator = "=".repeat(60);
    println!("\n{separator}");
    println!("AUTOMATION COMPLETE");
    println!("{separator}");
    println!(
        "Status: {}",
        if report.success { "SUCCESS" } else { "FAILED" }
    );
    println!("Error: {}", report.error.as_deref().unwrap_or("None"));
    println!("Steps completed: {}", report.steps_completed.len());
    println!("Screenshots: {:?}", report.screenshots);
    if !report.agent_reasoning.is_empty() {
        let preview: String = report.agent_reasoning.chars().take(200).collect();
        println!("Last step outcome: {preview}");
    }
    println!("{separator}");
}
