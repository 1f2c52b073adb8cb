//! # Manhaj - Content Platform Server
//!
//! The main binary for the Manhaj educational content graph.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for seeding and inspecting the catalog
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │             apps/manhaj (THE BINARY)           │
//! │                                                │
//! │   ┌─────────────┐          ┌─────────────┐     │
//! │   │    CLI      │          │  HTTP API   │     │
//! │   │   (clap)    │          │   (axum)    │     │
//! │   └──────┬──────┘          └──────┬──────┘     │
//! │          └──────────┬─────────────┘            │
//! │                     ▼                          │
//! │             ┌───────────────┐                  │
//! │             │  manhaj-core  │                  │
//! │             │  (THE LOGIC)  │                  │
//! │             └───────────────┘                  │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Create a database with the bundled curriculum and serve it
//! manhaj init
//! manhaj server --host 0.0.0.0 --port 8080
//!
//! # Inspect
//! manhaj tree --root topic-geometry
//! manhaj path art-pythagoras
//! ```

use clap::Parser;
use manhaj::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // MANHAJ_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("MANHAJ_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let cli = cli::Cli::parse();

    let default_filter = if cli.verbose {
        "manhaj=debug,manhaj_core=debug,tower_http=debug"
    } else {
        "manhaj=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Manhaj startup banner.
fn print_banner() {
    println!(
        r#"
  ███╗   ███╗ █████╗ ███╗   ██╗██╗  ██╗ █████╗      ██╗
  ████╗ ████║██╔══██╗████╗  ██║██║  ██║██╔══██╗     ██║
  ██╔████╔██║███████║██╔██╗ ██║███████║███████║     ██║
  ██║╚██╔╝██║██╔══██║██║╚██╗██║██╔══██║██╔══██║██   ██║
  ██║ ╚═╝ ██║██║  ██║██║ ╚████║██║  ██║██║  ██║╚█████╔╝
  ╚═╝     ╚═╝╚═╝  ╚═╝╚═╝  ╚═══╝╚═╝  ╚═╝╚═╝  ╚═╝ ╚════╝

  منهج · Content Platform v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
