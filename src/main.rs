use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ghosteye::api::create_router;
use ghosteye::cli::{Cli, Command};
use ghosteye::config::CONFIG;
use ghosteye::gemini::backend_from_config;
use ghosteye::report::{render_flag_help, render_response};
use ghosteye::session::{SearchOutcome, SearchSession};
use ghosteye::state::{StateStore, UiState};

fn build_session() -> Arc<SearchSession> {
    Arc::new(SearchSession::new(
        backend_from_config(),
        StateStore::new(&CONFIG.state_path),
    ))
}

fn print_state(state: &UiState) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(state)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = StateStore::new(&CONFIG.state_path);

    match cli.command {
        Command::Search(args) => {
            let (query, json) = args.query_and_json();
            let session = build_session();
            let outcome = if query.is_empty() {
                session.rerun().await
            } else {
                session.search(&query).await
            };
            match outcome {
                Ok(SearchOutcome::Completed {
                    query,
                    data_type,
                    response,
                }) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(response.as_ref())?);
                    } else {
                        println!("Query: {query} (type: {data_type})\n");
                        print!("{}", render_response(&response));
                    }
                }
                Ok(SearchOutcome::Skipped) => {
                    eprintln!("Nothing to search for. Type a query, optionally with a flag.");
                }
                Ok(SearchOutcome::Superseded) => {
                    eprintln!("Search was superseded by a newer one.");
                }
                Err(e) => {
                    tracing::error!("{e}");
                    anyhow::bail!(e.advisory());
                }
            }
        }
        Command::Filters { action } => {
            let mut state = store.load();
            if action.apply(&mut state) {
                store.save(&state)?;
            }
            print_state(&state)?;
        }
        Command::Flags => print!("{}", render_flag_help()),
        Command::Serve { addr } => {
            let session = build_session();
            let addr = addr.unwrap_or_else(|| CONFIG.bind_addr.clone());
            let app = create_router(session, &CONFIG.static_dir);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("binding {addr}"))?;
            tracing::info!("listening on http://{addr}");
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}
