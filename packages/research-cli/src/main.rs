mod config;
mod output;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use company_research::ai::OpenAI;
use company_research::{
    ProviderCredentials, ResearchConfig, Researcher, TavilyWebSearcher, WebSearcherExt,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Research companies by iterating web search and a language model.
#[derive(Debug, Parser)]
#[command(name = "company-research", version, about)]
struct Args {
    /// Company to research (omit when using --batch)
    company: Option<String>,

    /// Free-text hints passed to every prompt
    #[arg(long)]
    notes: Option<String>,

    /// Budget preset: quick, balanced or thorough
    #[arg(long)]
    preset: Option<String>,

    /// Total search queries per company
    #[arg(long)]
    max_queries: Option<usize>,

    /// Results requested per query
    #[arg(long)]
    max_results: Option<usize>,

    /// Reflection rounds per company
    #[arg(long)]
    max_reflections: Option<usize>,

    /// File with one company name per line
    #[arg(long)]
    batch: Option<PathBuf>,

    /// Write results to this file instead of printing a summary
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write one JSON object per line
    #[arg(long)]
    jsonl: bool,

    /// OpenAI API key (defaults to OPENAI_API_KEY)
    #[arg(long)]
    openai_api_key: Option<String>,

    /// Tavily API key (defaults to TAVILY_API_KEY)
    #[arg(long)]
    tavily_api_key: Option<String>,
}

impl Args {
    fn research_config(&self) -> Result<ResearchConfig> {
        let mut config = match &self.preset {
            Some(name) => ResearchConfig::preset(name)
                .with_context(|| format!("Unknown preset '{name}'"))?,
            None => ResearchConfig::default(),
        };
        if let Some(max) = self.max_queries {
            config = config.with_max_queries(max);
        }
        if let Some(max) = self.max_results {
            config = config.with_max_results_per_query(max);
        }
        if let Some(max) = self.max_reflections {
            config = config.with_max_reflections(max);
        }
        Ok(config)
    }

    fn companies(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.company.iter().cloned().collect();
        if let Some(path) = &self.batch {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read batch file {}", path.display()))?;
            names.extend(output::read_batch(&contents));
        }
        if names.is_empty() {
            bail!("Give a company name or --batch <file>");
        }
        Ok(names)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,company_research=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let research_config = args.research_config()?;
    let companies = args.companies()?;

    // Load configuration
    let config = Config::from_env(args.openai_api_key.clone(), args.tavily_api_key.clone())
        .context("Failed to load configuration")?;
    tracing::info!(model = %config.openai_model, "Configuration loaded");

    let ai = OpenAI::from_credentials(ProviderCredentials::new("OpenAI", &config.openai_api_key)?)
        .with_model(&config.openai_model);
    let searcher = TavilyWebSearcher::from_credentials(ProviderCredentials::new(
        "Tavily",
        &config.tavily_api_key,
    )?)
    .rate_limited(config.search_requests_per_second)?;
    let researcher = Researcher::new(ai, searcher, research_config)?;

    let mut outcomes = Vec::with_capacity(companies.len());
    for name in &companies {
        match researcher.research(name, args.notes.as_deref()).await {
            Ok(outcome) => {
                if args.output.is_none() {
                    println!("{}\n", output::summary(&outcome));
                }
                outcomes.push(outcome);
            }
            // A bad line in a batch file should not stop the batch.
            Err(e) if companies.len() > 1 => {
                tracing::warn!(company = %name, error = %e, "Skipping company");
            }
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(path) = &args.output {
        output::write_outcomes(path, &outcomes, args.jsonl)?;
        tracing::info!(path = %path.display(), count = outcomes.len(), "Results written");
    }

    Ok(())
}
