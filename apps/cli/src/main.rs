use std::{
    future::Future,
    process::ExitCode,
    time::{Duration, Instant},
};

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use insight_core::{
    ChatClient, Provider, SummaryParams, TiktokenCounter, TokenCounter, TranscriptSource,
    VideoRef, YoutubeSource, format_transcript_with_timestamps, format_video_info, get_transcript,
    get_video_info, summarize, summarize::DEFAULT_REDUCE_TOKEN_MAX,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Copy, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Ollama,
    Openai,
    Grok,
    Gemini,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Ollama => Provider::Ollama,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Grok => Provider::Grok,
            CliProvider::Gemini => Provider::Gemini,
        }
    }
}

#[derive(Parser)]
#[command(name = "insight")]
#[command(about = "Fetch YouTube video info and transcripts, and generate AI-powered synopses")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// AI provider for summarization
    #[arg(short, long, global = true, env = "INSIGHT_PROVIDER", default_value = "ollama")]
    provider: CliProvider,

    /// Model name, overriding the provider's default
    #[arg(short, long, global = true, env = "INSIGHT_MODEL")]
    model: Option<String>,

    /// Chat completions endpoint, overriding the provider's default
    #[arg(long, global = true, env = "INSIGHT_API_URL")]
    api_url: Option<String>,

    /// Token budget of a single combine request
    #[arg(
        long,
        global = true,
        env = "INSIGHT_REDUCE_TOKEN_MAX",
        default_value_t = DEFAULT_REDUCE_TOKEN_MAX
    )]
    reduce_token_max: usize,

    /// Preferred caption languages, most preferred first (e.g. "en,de")
    #[arg(
        short,
        long,
        global = true,
        env = "INSIGHT_LANG",
        value_delimiter = ',',
        default_value = "en"
    )]
    lang: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the video's title and description
    Info(UrlArg),

    /// Print the full transcript and its token count
    Transcript {
        #[command(flatten)]
        video: UrlArg,

        /// Prefix every caption line with its start time
        #[arg(short, long)]
        timestamps: bool,
    },

    /// Summarize the transcript with a language model
    Summarize {
        #[command(flatten)]
        video: UrlArg,

        /// Sampling temperature, between 0.0 and 1.0
        #[arg(short, long, default_value_t = 0.7)]
        temperature: f32,

        /// Maximum tokens per transcript chunk
        #[arg(short, long, default_value_t = 4000)]
        chunk_size: usize,

        /// Tokens repeated from the end of one chunk at the start of the next
        #[arg(short, long, default_value_t = 0)]
        overlap: usize,
    },
}

#[derive(Args)]
struct UrlArg {
    /// Video URL
    url: String,
}

fn create_spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")?,
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    Ok(pb)
}

/// Run `task` behind a spinner, reporting its wall time when it succeeds.
async fn step<T, E>(msg: &str, done: &str, task: impl Future<Output = Result<T, E>>) -> Result<T>
where
    anyhow::Error: From<E>,
{
    let spinner = create_spinner(msg)?;
    let started = Instant::now();

    match task.await {
        Ok(value) => {
            spinner.finish_with_message(format!(
                "{} {} {}",
                style("✓").green().bold(),
                done,
                style(format!("[{}]", format_duration(started.elapsed()))).dim()
            ));
            Ok(value)
        }
        Err(e) => {
            spinner.finish_and_clear();
            Err(e.into())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let source = YoutubeSource::new().with_languages(cli.lang.clone());

    match cli.command {
        Command::Info(video) => {
            let info = step(
                "Fetching video page...",
                "Video info",
                get_video_info(&source, &video.url),
            )
            .await?;

            println!("{}", style("─".repeat(60)).dim());
            println!("{}", format_video_info(&info));
        }

        Command::Transcript { video, timestamps } => {
            let counter = TiktokenCounter::new()?;

            if timestamps {
                let video = VideoRef::parse(&video.url)?;
                let transcript = step(
                    "Fetching transcript...",
                    "Transcript",
                    source.transcript(&video),
                )
                .await?;
                let token_count = counter.count(&transcript.text);

                println!(
                    "{} {} segments, {:.1} min, {} {}",
                    style("✓").green().bold(),
                    transcript.segments.len(),
                    transcript.duration_seconds() / 60.0,
                    style(&transcript.language).yellow(),
                    style(format!("{} tokens", token_count)).cyan()
                );
                println!("{}", style("─".repeat(60)).dim());
                println!("{}", format_transcript_with_timestamps(&transcript));
            } else {
                let report = step(
                    "Fetching transcript...",
                    "Transcript",
                    get_transcript(&source, &counter, &video.url),
                )
                .await?;

                println!("{}", style("─".repeat(60)).dim());
                println!("{}", report.transcript);
                println!("{}", style("─".repeat(60)).dim());
                println!(
                    "{} {}",
                    style("Token count:").dim(),
                    style(report.token_count).cyan().bold()
                );
            }
        }

        Command::Summarize {
            video,
            temperature,
            chunk_size,
            overlap,
        } => {
            let provider: Provider = cli.provider.into();
            let model = ChatClient::for_provider(&provider, cli.api_url, cli.model)?;
            debug!(url = model.api_url(), model = model.model(), "using chat endpoint");

            let counter = TiktokenCounter::new()?;
            let params = SummaryParams {
                reduce_token_max: cli.reduce_token_max,
                ..SummaryParams::new(temperature, chunk_size, overlap)
            };

            let total_start = Instant::now();
            let summary = step(
                &format!("Summarizing with {} ({})...", provider.name(), model.model()),
                &format!("Summarized with {}", provider.name()),
                summarize(&source, &model, &counter, &video.url, params),
            )
            .await?;

            println!(
                "\n{} {}\n",
                style("Total time:").dim(),
                style(format_duration(total_start.elapsed())).cyan().bold()
            );
            println!("{}", style("─".repeat(60)).dim());
            println!("{}", summary);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    println!(
        "\n{}  {}\n",
        style("insight").cyan().bold(),
        style("Video Synopsis").dim()
    );

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
