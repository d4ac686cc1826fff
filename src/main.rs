mod api;
mod config;
mod error;
mod output;
mod prompt;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::builder::PossibleValuesParser;
use clap::Parser;

use api::{CompletionRequest, OpenAiBackend};
use config::{Config, Overrides};
use error::Error;

/// Models accepted by `--model`. The config file's default_model is not
/// constrained to this list.
const KNOWN_MODELS: [&str; 6] = [
    "gpt-3.5-turbo",
    "gpt-4",
    "gpt-4-turbo",
    "gpt-4o",
    "gpt-4o-mini",
    "o3-mini",
];

#[derive(Parser)]
#[command(name = "promptfile")]
#[command(version)]
#[command(about = "Send a prompt file to an OpenAI chat model and save the reply", long_about = None)]
struct Cli {
    /// Path to the file containing the prompt text
    #[arg(long = "prompt_file", value_name = "PATH")]
    prompt_file: PathBuf,

    /// Path to the file where the model response will be saved
    #[arg(long = "output_file", value_name = "PATH")]
    output_file: PathBuf,

    /// Model to use; defaults to default_model from config.toml
    #[arg(long, value_name = "MODEL", value_parser = PossibleValuesParser::new(KNOWN_MODELS))]
    model: Option<String>,

    /// Path to a file containing the system message
    #[arg(long = "system_message_file", value_name = "PATH")]
    system_message_file: Option<PathBuf>,

    /// API key; defaults to the key stored under [API] in config.toml
    #[arg(long = "openai_api_key", value_name = "KEY")]
    openai_api_key: Option<String>,

    /// Max tokens for the completion; defaults to max_tokens from config.toml
    #[arg(long = "max_tokens", value_name = "INT", value_parser = clap::value_parser!(u32).range(1..))]
    max_tokens: Option<u32>,

    /// Sampling temperature (default 0)
    #[arg(long, value_name = "NUM")]
    temperature: Option<f32>,

    /// Nucleus sampling probability (default 1)
    #[arg(long = "top_p", value_name = "NUM")]
    top_p: Option<f32>,

    /// Print diagnostic information to the console
    #[arg(long)]
    verbose: bool,

    /// Write the full first choice as JSON instead of plain text
    #[arg(long = "return_json")]
    return_json: bool,

    /// Path to a file whose text is prepended to the prompt
    #[arg(long = "prompt_prepend_file", value_name = "PATH")]
    prompt_prepend_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Input reads come first; an unreadable path halts before any API call
    // and before the output file exists.
    let system_message = match read_optional(cli.system_message_file.as_deref()) {
        Ok(s) => s,
        Err(e) => return input_failure(e),
    };
    let prepend = match read_optional(cli.prompt_prepend_file.as_deref()) {
        Ok(p) => p,
        Err(e) => return input_failure(e),
    };
    let prompt_text = match prompt::read_text_file(&cli.prompt_file) {
        Ok(p) => p,
        Err(e) => return input_failure(e),
    };
    let prompt_text = prompt::compose_prompt(prepend.as_deref(), &prompt_text);

    if cli.verbose {
        output::note("Verbose mode is enabled.");
        output::field("Prompt file", &cli.prompt_file.display().to_string());
        output::field("Output file", &cli.output_file.display().to_string());
        output::field("Prompt message", &prompt_text);
        if let Some(system) = &system_message {
            output::field("System message", system);
        }
    }

    let result = run_completion(&cli, prompt_text, system_message).await;

    // Once the prompt has been read the outcome is always persisted, so the
    // caller keeps a record of failures too.
    let (text, failed) = match result {
        Ok(text) => (text, false),
        Err(e) => {
            output::error(&e.to_string());
            (e.to_string(), true)
        }
    };

    if let Err(e) = write_output(&cli.output_file, &text) {
        output::error(&e.to_string());
        return ExitCode::FAILURE;
    }

    if cli.verbose && !failed {
        output::field("Response", &text);
        output::note(&format!(
            "Response successfully written to {}",
            cli.output_file.display()
        ));
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn input_failure(e: Error) -> ExitCode {
    output::error(&e.to_string());
    ExitCode::FAILURE
}

fn read_optional(path: Option<&Path>) -> Result<Option<String>, Error> {
    path.map(prompt::read_text_file).transpose()
}

async fn run_completion(
    cli: &Cli,
    prompt_text: String,
    system_message: Option<String>,
) -> Result<String, Error> {
    let overrides = Overrides {
        api_key: cli.openai_api_key.clone(),
        model: cli.model.clone(),
        max_tokens: cli.max_tokens,
        temperature: cli.temperature,
        top_p: cli.top_p,
    };
    let config = Config::resolve(overrides)?;

    if cli.verbose {
        output::field("Model", &config.model);
        output::field("Max tokens", &config.max_tokens.to_string());
    }

    let backend = OpenAiBackend::new();
    let request = CompletionRequest {
        prompt: prompt_text,
        system_message,
    };
    api::invoke(&backend, &config, &request, cli.return_json).await
}

fn write_output(path: &Path, text: &str) -> Result<(), Error> {
    fs::write(path, text).map_err(|e| Error::OutputWrite {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
