use anyhow::{Context, Result};
use chorus_common::ChorusError;
use chorus_common::observability::{LogConfig, LogFormat, init_logging};
use chorus_config::{ChorusConfig, ChorusConfigLoader, LoggingConfig};
use clap::{Args, Parser, Subcommand};
use pipeline::Timeline;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
mod pipeline;

const USERNAME_PROMPT: &str = "Enter the username whose tweets you want to analyze: @";

/// Fetch tweets, classify their sentiment and export the results.
#[derive(Parser)]
#[command(name = "chorus", version)]
struct Cli {
    /// YAML config file; skipped when it does not exist.
    #[arg(long, global = true, default_value = "chorus.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a user's own timeline.
    Analyze(AnalyzeArgs),
    /// List the accounts a user follows.
    Friends {
        #[arg(long)]
        username: String,
        #[arg(long)]
        count: Option<usize>,
    },
    /// Analyze a user's home timeline.
    Home {
        #[arg(long)]
        username: String,
        #[command(flatten)]
        opts: OutputArgs,
    },
    /// Record the filtered stream to a file until Ctrl-C.
    Stream {
        /// Term to track; repeat for several. Falls back to `stream.track`.
        #[arg(long)]
        track: Vec<String>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Prompted for on stdin when omitted.
    #[arg(long)]
    username: Option<String>,
    #[command(flatten)]
    opts: OutputArgs,
}

#[derive(Args)]
struct OutputArgs {
    #[arg(long)]
    count: Option<usize>,
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

fn log_config(cfg: &LoggingConfig) -> Result<LogConfig> {
    let format: LogFormat = cfg.format.parse().map_err(ChorusError::Config)?;
    Ok(LogConfig {
        app_name: "chorus",
        log_dir: cfg.dir.clone(),
        emit_stderr: cfg.stderr,
        format,
        default_filter: cfg.level.clone(),
    })
}

async fn prompt_username() -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(USERNAME_PROMPT.as_bytes()).await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("reading username from stdin")?;
    let username = line.trim().to_string();
    if username.is_empty() {
        return Err(ChorusError::Config("no username given".into()).into());
    }
    Ok(username)
}

async fn run_analysis(cfg: &ChorusConfig, timeline: Timeline, username: &str, opts: OutputArgs) -> Result<()> {
    let api = pipeline::connect(&cfg.twitter).await?;
    let count = opts.count.unwrap_or(cfg.analysis.count);
    let out_dir = opts.out_dir.unwrap_or_else(|| cfg.analysis.output_dir.clone());

    let report = pipeline::analyze(&api, timeline, username, count, &out_dir).await?;
    print!("{}", report.summary(cfg.analysis.head_rows));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins over the file)
    let cfg: ChorusConfig = ChorusConfigLoader::new()
        .with_optional_file(&cli.config)
        .load()
        .with_context(|| format!("loading {}", cli.config.display()))?;

    // 2) Logging from the same config
    let log_path = init_logging(log_config(&cfg.logging)?)?;
    tracing::info!(log = %log_path.display(), config = %cli.config.display(), "chorus.start");

    match cli.command {
        Command::Analyze(args) => {
            let username = match args.username {
                Some(name) => name,
                None => prompt_username().await?,
            };
            run_analysis(&cfg, Timeline::User, &username, args.opts).await
        }
        Command::Home { username, opts } => run_analysis(&cfg, Timeline::Home, &username, opts).await,
        Command::Friends { username, count } => {
            let api = pipeline::connect(&cfg.twitter).await?;
            let users = pipeline::friends(&api, &username, count.unwrap_or(cfg.analysis.count)).await?;
            for user in &users {
                match &user.name {
                    Some(name) => println!("@{}\t{}", user.username, name),
                    None => println!("@{}", user.username),
                }
            }
            tracing::info!(count = users.len(), "friends.listed");
            Ok(())
        }
        Command::Stream { track, output } => {
            let track = if track.is_empty() { cfg.stream.track.clone() } else { track };
            let output = output.unwrap_or_else(|| cfg.stream.output_file.clone());
            let api = pipeline::connect_stream(&cfg.twitter).await?;
            let outcome = pipeline::stream(api, &track, &output, cfg.stream.max_reconnects).await?;
            eprintln!("stream ended: {outcome:?}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn analyze_username_is_optional() {
        let cli = Cli::try_parse_from(["chorus", "analyze", "--count", "5"]).unwrap();
        match cli.command {
            Command::Analyze(args) => {
                assert!(args.username.is_none());
                assert_eq!(args.opts.count, Some(5));
            }
            _ => panic!("expected analyze"),
        }
        assert_eq!(cli.config, PathBuf::from("chorus.yaml"));
    }

    #[test]
    fn stream_accepts_repeated_terms() {
        let cli = Cli::try_parse_from([
            "chorus", "stream", "--track", "#rustlang", "--track", "ferris", "--config", "alt.yaml",
        ])
        .unwrap();
        match cli.command {
            Command::Stream { track, output } => {
                assert_eq!(track, vec!["#rustlang", "ferris"]);
                assert!(output.is_none());
            }
            _ => panic!("expected stream"),
        }
        assert_eq!(cli.config, PathBuf::from("alt.yaml"));
    }

    #[test]
    fn friends_requires_username() {
        assert!(Cli::try_parse_from(["chorus", "friends"]).is_err());
    }

    #[test]
    fn log_config_follows_logging_section() {
        let cfg = LoggingConfig {
            level: "debug".into(),
            format: "json".into(),
            dir: Some(PathBuf::from("/tmp/chorus-logs")),
            stderr: true,
        };
        let log = log_config(&cfg).unwrap();
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.default_filter, "debug");
        assert!(log.emit_stderr);

        let bad = LoggingConfig {
            format: "xml".into(),
            ..LoggingConfig::default()
        };
        let err = log_config(&bad).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ChorusError>(),
            Some(ChorusError::Config(msg)) if msg.contains("xml")
        ));
    }
}
