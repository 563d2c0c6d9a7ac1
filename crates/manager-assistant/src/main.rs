//! CLI entry point for the manager assistant.

use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use manager_assistant::llm::{ChatProvider, GroqConfig, GroqProvider};
use manager_assistant::{
    AssistantConfig, AssistantError, AssistantResult, ChatRouter, ChurnModel, ChurnRequest,
    Conversation, LlmContext, PredictionOutcome, PromptedInput, get_summary,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info};

/// CLI-compatible LLM context enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLlmContext {
    /// Send only the current message
    Current,
    /// Send the whole conversation
    History,
}

impl From<CliLlmContext> for LlmContext {
    fn from(cli: CliLlmContext) -> Self {
        match cli {
            CliLlmContext::Current => LlmContext::CurrentMessage,
            CliLlmContext::History => LlmContext::FullHistory,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat loop (default)
    Chat,

    /// Print descriptive statistics of the dataset as JSON
    Summary,

    /// Predict the churn probability of one customer
    Predict {
        /// Months as a customer
        #[arg(long, allow_negative_numbers = true)]
        tenure: f64,

        /// Contract type (Month-to-month / One year / Two year)
        #[arg(long)]
        contract: String,

        /// Internet service (DSL / Fiber optic)
        #[arg(long)]
        internet: String,

        /// Monthly charges
        #[arg(long, allow_negative_numbers = true)]
        monthly: f64,

        /// Print a sentence instead of the JSON payload
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "AI Manager Assistant: chat, dataset summary and churn prediction",
    long_about = "A command-line business assistant.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  GROQ_API_KEY    API key for the Groq chat API (required for chat)\n\n\
                  EXAMPLES:\n  \
                  # Start the chat loop\n  \
                  manager-assistant\n\n  \
                  # Print the dataset summary\n  \
                  manager-assistant summary --dataset data/dataset.csv\n\n  \
                  # One-off churn prediction\n  \
                  manager-assistant predict --tenure 12 --contract \"Two year\" \\\n    \
                  --internet \"Fiber optic\" --monthly 90"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the customer CSV
    #[arg(short, long, global = true, default_value = "dataset.csv")]
    dataset: PathBuf,

    /// Chat model to use
    #[arg(long, global = true)]
    model: Option<String>,

    /// Conversation context sent to the LLM
    #[arg(long, global = true, value_enum, default_value = "history")]
    context: CliLlmContext,

    /// LLM sampling temperature (0.0 - 2.0)
    #[arg(long, global = true)]
    temperature: Option<f32>,

    /// Maximum tokens in each LLM reply
    #[arg(long, global = true)]
    max_tokens: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr so the chat transcript on stdout stays readable.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet);

    // Load environment variables from .env file
    dotenv().ok();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

/// Log the failure and print its `{code, message}` payload to stderr.
fn report_error(err: &AssistantError) {
    if err.is_fatal() {
        error!("Startup failed: {}", err);
    } else {
        error!("{}", err);
    }
    eprintln!("{}", err.to_json());
}

fn run(args: Args) -> AssistantResult<()> {
    let mut config_builder = AssistantConfig::builder()
        .dataset_path(&args.dataset)
        .llm_context(args.context.into());
    if let Some(ref model) = args.model {
        config_builder = config_builder.model(model);
    }
    if let Some(temperature) = args.temperature {
        config_builder = config_builder.temperature(temperature);
    }
    if let Some(max_tokens) = args.max_tokens {
        config_builder = config_builder.max_tokens(max_tokens);
    }
    let config = config_builder.build()?;
    debug!("Configuration: {:?}", config);

    match args.command.unwrap_or(Command::Chat) {
        Command::Chat => run_chat(&config),
        Command::Summary => run_summary(&config),
        Command::Predict {
            tenure,
            contract,
            internet,
            monthly,
            pretty,
        } => run_predict(
            &config,
            ChurnRequest::new(tenure, contract, internet, monthly),
            pretty,
        ),
    }
}

/// Print the summary payload; failures are part of the payload.
fn run_summary(config: &AssistantConfig) -> AssistantResult<()> {
    let report = get_summary(&config.dataset_path);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Train the model, predict once and print the outcome.
fn run_predict(
    config: &AssistantConfig,
    request: ChurnRequest,
    pretty: bool,
) -> AssistantResult<()> {
    let model = ChurnModel::train(&config.dataset_path)?;
    let result = model.predict_churn(&request);

    if pretty {
        match result {
            Ok(probability) => println!("Churn probability: {:.2}%", probability * 100.0),
            Err(e) => println!("Error while predicting churn: {}", e),
        }
    } else {
        let outcome = PredictionOutcome::from(result);
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }
    Ok(())
}

fn is_exit_command(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

/// Run the interactive chat loop until `exit`, `quit` or end of input.
fn run_chat(config: &AssistantConfig) -> AssistantResult<()> {
    // Both are startup-fatal.
    let model = Arc::new(ChurnModel::train(&config.dataset_path)?);
    let api_key = config.resolve_api_key()?;

    let provider = GroqProvider::new(api_key, GroqConfig::from(config))?;
    let provider_name = provider.name().to_string();
    let router = ChatRouter::new(model, Arc::new(provider), config);
    info!("Chat ready (model: {}, context: {:?})", config.model, config.llm_context);

    let mut conversation = Conversation::with_greeting();
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();

    println!(
        "AI Manager Assistant using {} (type 'exit' to quit)",
        provider_name
    );
    if let Some(greeting) = conversation.last() {
        println!("Bot: {}", greeting.content);
    }

    loop {
        print!("You: ");
        stdout.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            println!();
            break;
        }

        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if is_exit_command(message) {
            println!("Bot: Goodbye!");
            break;
        }

        let mut prompts = PromptedInput::new(&mut input, io::stdout());
        let reply = router.respond(&mut conversation, message, &mut prompts);
        println!("Bot: {}", reply);
    }

    info!(
        "Chat ended after {} user turns",
        conversation.user_turns()
    );
    Ok(())
}
