//! # Roster - Student Records Server
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            apps/roster (THE BINARY)          │
//! │                                              │
//! │   ┌─────────────┐        ┌─────────────┐     │
//! │   │    CLI      │        │  HTTP API   │     │
//! │   │   (clap)    │        │   (axum)    │     │
//! │   └──────┬──────┘        └──────┬──────┘     │
//! │          └───────────┬──────────┘            │
//! │                      ▼                       │
//! │              ┌───────────────┐               │
//! │              │  roster-core  │               │
//! │              │  (THE LOGIC)  │               │
//! │              └───────────────┘               │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! roster server --host 0.0.0.0 --port 8080
//! roster seed -f campus.json
//! roster enroll --student 1 --section 10
//! ```

use clap::Parser;
use roster::cli;
use roster::config::{LogFormat, RosterConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let config = match RosterConfig::load(cli.config.as_deref(), &cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    init_tracing(config.logging.format, cli.verbose);

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli, &config).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise info, or debug with `--verbose`.
fn init_tracing(format: LogFormat, verbose: bool) {
    let default_filter = if verbose {
        "roster=debug,roster_core=debug,tower_http=debug"
    } else {
        "roster=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

fn print_banner() {
    println!(
        r#"
  ┬─┐┌─┐┌─┐┌┬┐┌─┐┬─┐
  ├┬┘│ │└─┐ │ ├┤ ├┬┘
  ┴└─└─┘└─┘ ┴ └─┘┴└─

  Student Records Server v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
