//! Command-line front end for the agents.

#[macro_use]
extern crate tracing;

mod cli;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use reflexion::Country;
use reflexion::core::ModelClient;
use reflexion::core::chain::StructuredChain;
use reflexion::core::react::ReactAgentBuilder;
use reflexion::core::reflection::ReflectionLoop;
use reflexion::core::reflexion::{ReflexionAgent, ReflexionEvent};
use reflexion::tools::{CurrentTimeTool, WebSearchTool};
use reflexion_openai_model::OpenAIProvider;
use reflexion_tavily::TavilyProvider;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // A missing `.env` is fine, flags and the environment still apply.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let model_provider = OpenAIProvider::new(cli.model.to_config());
    debug!(config = ?model_provider.config(), "model provider ready");

    match cli.command {
        Command::Ask {
            question,
            max_iterations,
            search,
        } => {
            let search_provider = TavilyProvider::new(search.to_config());
            let spinner = spinner("🤔 Drafting...");
            let agent = ReflexionAgent::builder(model_provider, search_provider)
                .max_iterations(max_iterations)
                .on_event({
                    let spinner = spinner.clone();
                    move |event| spinner.set_message(describe(event))
                })
                .build();

            let outcome = agent.invoke(question).await;
            spinner.finish_and_clear();
            let outcome = outcome.context("reflexion run failed")?;

            print_answer(&outcome.answer.answer);
            if !outcome.answer.references.is_empty() {
                println!("\n{}", "References".bold());
                for reference in &outcome.answer.references {
                    println!("{}{reference}", BAR_CHAR.bright_black());
                }
            }
            info!(tool_cycles = outcome.tool_cycles, "done");
        }
        Command::React {
            question,
            max_steps,
            search,
        } => {
            let search_provider = TavilyProvider::new(search.to_config());
            let agent = ReactAgentBuilder::with_model_provider(model_provider)
                .with_tool(WebSearchTool::new(search_provider))
                .with_tool(CurrentTimeTool::new())
                .max_steps(max_steps)
                .build();

            let spinner = spinner("🤔 Thinking...");
            let outcome = agent.invoke(&question).await;
            spinner.finish_and_clear();
            let outcome = outcome.context("agent run failed")?;

            print_answer(&outcome.answer);
            info!(
                steps = outcome.steps,
                tool_calls = outcome.tool_calls,
                "done"
            );
        }
        Command::Reflect {
            request,
            max_rounds,
        } => {
            let spinner = spinner("✍️  Writing...");
            let outcome = ReflectionLoop::with_model_provider(model_provider)
                .max_rounds(max_rounds)
                .run(&request)
                .await;
            spinner.finish_and_clear();
            let outcome = outcome.context("reflection failed")?;

            for (round, critique) in outcome.critiques.iter().enumerate() {
                println!("{}", format!("Draft {}", round + 1).bold());
                println!("{}\n", outcome.drafts[round]);
                println!("{}", "Critique".bold());
                println!("{}\n", critique.bright_black());
            }
            print_answer(outcome.final_draft());
        }
        Command::Extract { text } => {
            let chain =
                StructuredChain::<Country>::new(ModelClient::new(model_provider));
            let country = chain.extract(&text).await.context("extraction failed")?;
            println!("{}", serde_json::to_string_pretty(&country)?);
        }
    }

    Ok(())
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {wide_msg}") {
        spinner.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn describe(event: ReflexionEvent<'_>) -> String {
    match event {
        ReflexionEvent::Drafted(draft) => {
            format!("🔎 Searching {} queries...", draft.search_queries.len())
        }
        ReflexionEvent::ToolsExecuted { cycle, results } => {
            format!("📝 Revising with {} results (cycle {cycle})...", results.len())
        }
        ReflexionEvent::Revised { cycle, .. } => {
            format!("🔁 Revised after cycle {cycle}...")
        }
    }
}

fn print_answer(answer: &str) {
    for line in answer.lines() {
        println!("{}{}", BAR_CHAR.bright_cyan(), line.bright_white());
    }
}
