//! charts-build CLI - build tooling for Helm chart repositories

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod error;
mod exit_codes;

use error::Result;

#[derive(Parser)]
#[command(name = "charts-build")]
#[command(author = "charts-build Contributors")]
#[command(version)]
#[command(about = "Build tooling for Helm chart repositories", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Root of the charts repository
    #[arg(long, global = true, env = "CHARTS_BUILD_REPO", default_value = ".")]
    repo: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull a package's upstream chart and apply its generated changes
    Prepare {
        /// Package under packages/
        #[arg(env = "PACKAGE")]
        package: String,
    },

    /// Regenerate a package's generated-changes from its working directory
    Patch {
        /// Package under packages/
        #[arg(env = "PACKAGE")]
        package: String,
    },

    /// Archive charts/ into assets/ (chart or chart/version)
    Zip {
        #[arg(env = "CHART")]
        chart: Option<String>,
    },

    /// Dump assets/ back into charts/ (chart or chart/file.tgz)
    Unzip {
        #[arg(env = "ASSET")]
        asset: Option<String>,
    },

    /// Restructure an arbitrary Helm repository into charts/ and assets/
    Standardize,

    /// Create or update index.yaml from assets/
    Index,

    /// Report chart versions against the lifecycle of the branch line
    LifecycleStatus {
        /// Only report this chart
        #[arg(long, env = "CHART")]
        chart: Option<String>,

        /// Branch line to report on (default: branchVersion of the rules file)
        #[arg(long, env = "BRANCH_VERSION")]
        branch_version: Option<String>,

        /// Version rules file, relative to the repository
        #[arg(long, default_value = charts_build_core::layout::VERSION_RULES_FILE)]
        rules: PathBuf,

        /// Development branch (default: <devBranchPrefix><branchVersion>)
        #[arg(long, env = "DEV_BRANCH")]
        dev_branch: Option<String>,

        /// Production branch (default: <prodBranchPrefix><branchVersion>)
        #[arg(long, env = "PROD_BRANCH")]
        prod_branch: Option<String>,
    },

    /// Fail when images of charts listed in release.yaml use -rc tags
    CheckRc {
        /// Expected tag for a chart, as <chart>=<tag>
        #[arg(long = "ignore", value_name = "CHART=TAG")]
        ignore: Vec<String>,
    },
}

fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    // stdout carries the command output
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Runtime for the OCI pulls of prepare and patch
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| error::CliError::internal(format!("failed to start async runtime: {}", e)))
}

fn run(cli: Cli) -> Result<()> {
    let root = cli.repo.as_path();

    match cli.command {
        Commands::Prepare { package } => runtime()?.block_on(commands::prepare::run(root, &package)),

        Commands::Patch { package } => runtime()?.block_on(commands::patch::run(root, &package)),

        Commands::Zip { chart } => commands::zip::run(root, chart.as_deref()),

        Commands::Unzip { asset } => commands::unzip::run(root, asset.as_deref()),

        Commands::Standardize => commands::standardize::run(root),

        Commands::Index => commands::index::run(root),

        Commands::LifecycleStatus {
            chart,
            branch_version,
            rules,
            dev_branch,
            prod_branch,
        } => commands::lifecycle_status::run(
            root,
            &rules,
            chart,
            branch_version.as_deref(),
            dev_branch,
            prod_branch,
        ),

        Commands::CheckRc { ignore } => commands::check_rc::run(root, &ignore),
    }
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let code = match run(cli) {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}
