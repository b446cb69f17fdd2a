//! # atko CLI
//!
//! Command-line interface for the users and groups of an Okta org, authenticated either
//! with an API token or with OAuth access tokens managed by `atko-auth`.
//!
//! ## Features
//!
//! - **Profiles**: org URL and credentials per profile in `~/.atko`, overridable through
//!   `ATKO__<PROFILE>__<KEY>` environment variables
//! - **Lookups**: by id or login, by several values at once, by attribute conditions, by
//!   Okta `q`/`filter`/`search` expressions, narrowed by client-side regex patterns
//! - **Bulk lifecycle**: create from CSV/JSON files or generated test data, activate,
//!   deactivate and delete with success/failure reports
//! - **OAuth**: every supported flow, manual code exchange, token seeding and cache editing
//! - **Output**: table, JSON, YAML, CSV, and comma-joined ids or logins
//!
//! ## Quick Start
//!
//! ```bash
//! # Configure the default profile
//! atko config init --base-url https://acme.okta.com --api-token 00abc...
//!
//! # Users whose login starts with jane or john
//! atko users get jane,john --multiple
//!
//! # Deactivate users listed in a CSV file, without confirmation
//! atko users deactivate targets.csv --file --field login --yes
//!
//! # OAuth profile: obtain a token for the groups API
//! atko -p ops auth login --resource groups
//! ```
//!
//! ## Architecture
//!
//! 1. **Command Layer** (`cli`): Clap-based argument parsing
//! 2. **Execution Layer** (`executor`): command execution using `atko-client`
//! 3. **Profile Layer** (`profile`): layered profile settings and client construction
//! 4. **Output Layer** (`formatter`, `reports`): rich multi-format output and bulk reports

pub mod cli;
pub mod error;
pub mod executor;
pub mod filters;
pub mod formatter;
pub mod payloads;
pub mod profile;
pub mod prompt;
pub mod reports;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use error::CliResult;
use executor::CommandExecutor;
use formatter::Formatter;
use profile::ProfileStore;
use reports::ReportWriter;

/// Run the CLI application
pub async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.debug);

    let colored = !cli.no_color && std::env::var_os("NO_COLOR").is_none();
    let formatter = Formatter::new(cli.format, colored);
    let store = match ProfileStore::default_location() {
        Ok(store) => store,
        Err(e) => {
            formatter.display_error(&e);
            std::process::exit(1);
        }
    };

    let executor = CommandExecutor::new(
        formatter,
        store,
        &cli.profile,
        cli.verbose,
        ReportWriter::new(".", cli.debug),
    );

    if let Err(e) = executor.execute(cli.command).await {
        executor.display_error(&e);
        std::process::exit(1);
    }

    Ok(())
}

/// Default log level; `RUST_LOG` takes precedence
fn log_level(verbose: u8, debug: bool) -> &'static str {
    if debug {
        "trace"
    } else if verbose > 0 {
        "debug"
    } else {
        "warn"
    }
}

fn init_tracing(verbose: u8, debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(verbose, debug)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();
}

// Re-export key types for library consumers
pub use cli::{Cli, Commands, OutputFormat};
pub use error::{CliError, ErrorCategory};
