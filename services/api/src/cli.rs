use crate::demo::{run_demo, run_models, run_predict, DemoArgs, PredictArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use student_insight::error::AppError;
use student_insight::prediction::ModelVersion;

#[derive(Parser, Debug)]
#[command(
    name = "Student Insight",
    about = "Score student performance risk and serve predictions over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a single student from command-line features
    Predict(PredictArgs),
    /// List the available scoring variants
    Models,
    /// Score the sample roster under every scoring variant
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Base URL of a remote scorer exposing POST /predict
    #[arg(long)]
    pub(crate) remote_url: Option<String>,
    /// Scoring variant used when a request does not pin one (e.g. v6.0)
    #[arg(long)]
    pub(crate) model_version: Option<ModelVersion>,
    /// Student roster CSV to load into the directory
    #[arg(long)]
    pub(crate) students: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Predict(args) => run_predict(args).await,
        Command::Models => {
            run_models();
            Ok(())
        }
        Command::Demo(args) => run_demo(args),
    }
}
