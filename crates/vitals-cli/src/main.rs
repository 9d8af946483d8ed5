use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use vitals_cli::commands::collect::CollectOptions;
use vitals_cli::{OutputFormat, commands, parse_window};
use vitals_core::ReportWindow;

#[derive(Parser)]
#[command(name = "app-vitals")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Collect crash, ANR, launch-time and release vitals for mobile apps",
    long_about = "app-vitals drives a logged-in Chrome session through the crash-reporting, \
                  Play and analytics consoles of each configured app, captures the data the \
                  consoles load, and saves one JSON document per run."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect vitals for every configured app and save the results
    Collect {
        /// Report window in days (7 or 30)
        #[arg(value_name = "DAYS", value_parser = parse_window, conflicts_with = "days")]
        window: Option<ReportWindow>,

        /// Report window in days (7 or 30)
        #[arg(long, value_parser = parse_window)]
        days: Option<ReportWindow>,

        /// Only collect these apps (comma separated keys)
        #[arg(long, value_delimiter = ',')]
        apps: Vec<String>,

        /// JSON file replacing the built-in app registry
        #[arg(long, value_name = "PATH")]
        apps_file: Option<PathBuf>,

        /// Directory the results file is written to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Path to the Chrome binary
        #[arg(long)]
        chrome_path: Option<PathBuf>,

        /// Named persistent browser profile (holds the console login)
        #[arg(long, conflicts_with = "temp")]
        profile: Option<String>,

        /// Use a throwaway browser profile
        #[arg(long)]
        temp: bool,

        /// Run Chrome headless (needs a profile that is already logged in)
        #[arg(long)]
        headless: bool,

        /// Chrome remote debugging port
        #[arg(long, default_value_t = 9222)]
        port: u16,

        /// Service account key for the Play Developer Reporting API
        #[arg(
            long,
            env = "GOOGLE_PLAY_SERVICE_ACCOUNT",
            default_value = "googleplaykey.json"
        )]
        service_account: PathBuf,

        /// Skip the Play Developer Reporting enrichment
        #[arg(long)]
        no_play_vitals: bool,

        /// Give up on the core Android pages after this many seconds (default: wait)
        #[arg(long, value_name = "SECS")]
        android_deadline: Option<u64>,

        /// Timeout for the launch-time, release, Play and iOS pages
        #[arg(long, value_name = "SECS", default_value_t = 120)]
        phase_deadline: u64,
    },

    /// Print the summary of a saved results file
    Summary {
        /// Path to the results file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "pretty")]
        format: OutputFormat,
    },

    /// Print the console pages visited for one app
    Urls {
        /// App key, e.g. customer
        #[arg(value_name = "APP")]
        app: String,

        /// Report window in days (7 or 30)
        #[arg(value_name = "DAYS", value_parser = parse_window, default_value = "7")]
        window: ReportWindow,

        /// JSON file replacing the built-in app registry
        #[arg(long, value_name = "PATH")]
        apps_file: Option<PathBuf>,
    },

    /// List the configured apps
    Apps {
        /// JSON file replacing the built-in app registry
        #[arg(long, value_name = "PATH")]
        apps_file: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "pretty")]
        format: OutputFormat,
    },

    /// Generate shell completion scripts
    #[command(long_about = "Generate shell completion scripts for app-vitals.

SUPPORTED SHELLS:
    bash, zsh, fish, powershell, elvish

INSTALLATION:
    bash:  app-vitals completion --shell bash >> ~/.bashrc
    zsh:   app-vitals completion --shell zsh > \"${fpath[1]}/_app-vitals\"
    fish:  app-vitals completion --shell fish > ~/.config/fish/completions/app-vitals.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(long, value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Collect {
            window,
            days,
            apps,
            apps_file,
            output_dir,
            chrome_path,
            profile,
            temp,
            headless,
            port,
            service_account,
            no_play_vitals,
            android_deadline,
            phase_deadline,
        } => commands::collect::execute(CollectOptions {
            window: window.or(days).unwrap_or_default(),
            apps,
            apps_file,
            output_dir,
            chrome_path,
            profile,
            temp_profile: temp,
            headless,
            port,
            service_account,
            no_play_vitals,
            android_deadline,
            phase_deadline,
        }),
        Commands::Summary { file, format } => commands::summary::execute(&file, format),
        Commands::Urls {
            app,
            window,
            apps_file,
        } => commands::urls::execute(&app, window, apps_file.as_deref()),
        Commands::Apps { apps_file, format } => {
            commands::apps::execute(apps_file.as_deref(), format)
        }
        Commands::Completion { shell } => {
            commands::completion::execute(shell, &mut Cli::command())
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new(
            "app_vitals=debug,vitals_cli=debug,vitals_core=debug,vitals_engine=debug,vitals_browser=debug,vitals_play=debug",
        )
    } else {
        EnvFilter::new("app_vitals=info,vitals_cli=info,vitals_core=info,vitals_engine=info,vitals_play=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
