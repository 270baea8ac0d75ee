mod aws;
mod config;
mod destroy;
mod form;
mod output;
mod pipeline;
mod serve;
mod wizard;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use voicedeploy_connect::{AwsConnectApi, RemoteLookup};
use voicedeploy_logging::{init_tracing, LogEvent, LogFormat, Logger};
use voicedeploy_stack::{CloudFormationStatus, ToolKind};
use voicedeploy_store::clean;

use config::{Overrides, ProjectConfig, Settings};
use pipeline::Pipeline;

#[derive(Parser, Debug)]
#[command(
    name = "voicedeploy",
    about = "Deploy an Amazon Connect voice channel tenant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Working directory for the generated documents (default: current directory)
    #[arg(short = 'd', long, global = true)]
    working_dir: Option<PathBuf>,

    /// Directory holding the flow, language and hours templates
    #[arg(long, global = true)]
    templates_dir: Option<PathBuf>,

    /// Infrastructure tool that creates the stack
    #[arg(long, value_enum, global = true)]
    tool: Option<ToolChoice>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatChoice,

    /// Stop watching the stack after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// AWS region (default: from the AWS config chain)
    #[arg(long, global = true)]
    region: Option<String>,

    /// Named AWS profile
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Diagnostic log level (RUST_LOG overrides)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tear down a tenant's stack
    Destroy {
        /// Tenant to destroy (prompted for when omitted)
        #[arg(long)]
        tenant: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Remove the files a deployment generated in the working directory
    Clean,
    /// Serve the web form
    Serve {
        #[arg(short, long, default_value = "8501")]
        port: u16,

        /// Do not open a browser
        #[arg(long)]
        no_open: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ToolChoice {
    Cdk,
    Cloudformation,
}

impl From<ToolChoice> for ToolKind {
    fn from(choice: ToolChoice) -> Self {
        match choice {
            ToolChoice::Cdk => ToolKind::Cdk,
            ToolChoice::Cloudformation => ToolKind::CloudFormation,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_format: LogFormat = cli.log_format.into();
    init_tracing(&cli.log_level, log_format);

    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    std::fs::create_dir_all(&working_dir)
        .with_context(|| format!("Failed to create {}", working_dir.display()))?;

    if let Some(Commands::Clean) = cli.command {
        return handle_clean(&working_dir, log_format);
    }

    let project = ProjectConfig::load(&working_dir)?;
    let overrides = Overrides {
        templates_dir: cli.templates_dir.clone(),
        tool: cli.tool.map(Into::into),
        region: cli.region.clone(),
        profile: cli.profile.clone(),
        timeout_secs: cli.timeout,
    };
    let settings = Settings::resolve(&working_dir, overrides, project)?;

    let sdk = aws::load_sdk_config(settings.region.as_deref(), settings.profile.as_deref()).await;
    let status = Arc::new(CloudFormationStatus::new(&sdk));
    let pipeline = Pipeline::new(settings, status);
    let lookup = RemoteLookup::new(
        Arc::new(AwsConnectApi::new(&sdk)),
        pipeline.store().clone(),
    );

    let result = match cli.command {
        None => wizard::run_wizard(&pipeline, &lookup, log_format).await,
        Some(Commands::Destroy { tenant, yes }) => {
            destroy::handle_destroy(&pipeline, tenant, yes, log_format).await
        }
        Some(Commands::Serve { port, no_open }) => serve::handle_serve(pipeline, lookup, port, no_open)
            .await
            .map(|()| 0),
        Some(Commands::Clean) => Ok(0),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            Logger::new(log_format).log(&LogEvent::ErrorEncountered {
                error: format!("{:#}", e),
            });
            std::process::exit(1);
        }
    }
}

fn handle_clean(working_dir: &std::path::Path, log_format: LogFormat) -> Result<()> {
    let report = clean(working_dir)
        .with_context(|| format!("Failed to clean {}", working_dir.display()))?;

    Logger::new(log_format).log(&LogEvent::FilesRemoved {
        count: report.removed.len(),
    });
    if report.is_empty() {
        eprintln!("Nothing to clean in {}", working_dir.display());
    } else {
        for path in &report.removed {
            eprintln!("  removed {}", path.display());
        }
    }
    Ok(())
}
