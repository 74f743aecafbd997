use clap::{Args, Parser, Subcommand};
use reflexion_core::reflection::DEFAULT_MAX_ROUNDS;
use reflexion_core::reflexion::DEFAULT_MAX_ITERATIONS;
use reflexion_openai_model::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE, OpenAIConfig,
    OpenAIConfigBuilder,
};
use reflexion_tavily::{
    DEFAULT_MAX_RESULTS, SearchDepth, TavilyConfig, TavilyConfigBuilder,
};

/// Research agents on top of an OpenAI-compatible model.
#[derive(Debug, Parser)]
#[command(name = "reflexion", version)]
pub struct Cli {
    #[command(flatten)]
    pub model: ModelArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Answer a question with the draft/search/revise loop.
    Ask {
        /// The question to answer.
        question: String,

        /// Extra search-and-revise cycles after the first one.
        #[arg(
            long,
            env = "REFLEXION_MAX_ITERATIONS",
            default_value_t = DEFAULT_MAX_ITERATIONS
        )]
        max_iterations: usize,

        #[command(flatten)]
        search: SearchArgs,
    },
    /// Answer a question with a tool-calling agent.
    React {
        /// The question to answer.
        question: String,

        /// Maximum number of model calls.
        #[arg(long, default_value_t = reflexion_core::react::DEFAULT_MAX_STEPS)]
        max_steps: usize,

        #[command(flatten)]
        search: SearchArgs,
    },
    /// Write a tweet, critique it and rewrite it.
    Reflect {
        /// What the tweet should be about.
        request: String,

        /// Number of drafts to write.
        #[arg(long, default_value_t = DEFAULT_MAX_ROUNDS)]
        max_rounds: usize,
    },
    /// Extract country information from a text as JSON.
    Extract {
        /// The text to extract from.
        text: String,
    },
}

#[derive(Debug, Args)]
pub struct ModelArgs {
    /// API key of the model provider.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Base URL of the OpenAI-compatible API.
    #[arg(long, env = "REFLEXION_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Model id.
    #[arg(long, env = "REFLEXION_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Sampling temperature.
    #[arg(
        long,
        env = "REFLEXION_TEMPERATURE",
        default_value_t = DEFAULT_TEMPERATURE
    )]
    pub temperature: f32,
}

impl ModelArgs {
    pub fn to_config(&self) -> OpenAIConfig {
        OpenAIConfigBuilder::with_api_key(&self.api_key)
            .with_base_url(&self.base_url)
            .with_model(&self.model)
            .with_temperature(self.temperature)
            .build()
    }
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// API key of Tavily.
    #[arg(long, env = "TAVILY_API_KEY", hide_env_values = true)]
    pub tavily_api_key: String,

    /// `basic` or `advanced`.
    #[arg(long, env = "TAVILY_SEARCH_DEPTH", default_value = "basic")]
    pub search_depth: SearchDepth,

    /// Results per search query.
    #[arg(
        long,
        env = "TAVILY_MAX_RESULTS",
        default_value_t = DEFAULT_MAX_RESULTS
    )]
    pub max_results: u32,
}

impl SearchArgs {
    pub fn to_config(&self) -> TavilyConfig {
        TavilyConfigBuilder::with_api_key(&self.tavily_api_key)
            .with_search_depth(self.search_depth)
            .with_max_results(self.max_results)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask() {
        let cli = Cli::try_parse_from([
            "reflexion",
            "--api-key",
            "gsk-test",
            "ask",
            "--tavily-api-key",
            "tvly-test",
            "--search-depth",
            "advanced",
            "Why is the sky blue?",
        ])
        .unwrap();

        let Command::Ask {
            question, search, ..
        } = &cli.command
        else {
            panic!("expected `ask`");
        };
        assert_eq!(question, "Why is the sky blue?");
        assert_eq!(search.search_depth, SearchDepth::Advanced);
        assert_eq!(cli.model.to_config().model(), cli.model.model);
    }

    #[test]
    fn test_extract_needs_no_search_key() {
        let cli = Cli::try_parse_from([
            "reflexion",
            "--api-key",
            "gsk-test",
            "extract",
            "Paris is lovely.",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Extract { .. }));
    }
}
