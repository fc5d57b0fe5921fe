//! convoy gateway binary entry point.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use convoy::bus::ConversationBus;
use convoy::cli::{Cli, Commands, ServeArgs};
use convoy::config::ConvoyConfig;
use convoy::engine::{bus_sink, AgentIterationEngine};
use convoy::provider::StaticDecisionProvider;
use convoy::router::TurnRouter;
use convoy::server::{self, AppState};
use convoy::session::{LogArchiver, MemoryStore, SessionStore};
use convoy::tools::{builtin, ToolRegistry};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => serve(args).await,
    }
}

async fn serve(args: ServeArgs) {
    init_tracing(args.verbose);

    let mut config = match ConvoyConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let bus = Arc::new(ConversationBus::new(config.stream_buffer));
    let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
    let engine = AgentIterationEngine::new(
        Arc::new(StaticDecisionProvider),
        Arc::new(ToolRegistry::new(builtin::all_tools())),
        config.model.clone(),
        config.max_iterations,
    );
    let router = Arc::new(TurnRouter::new(
        engine,
        Arc::clone(&store),
        Arc::new(LogArchiver),
        config.memory_window,
        bus_sink(Arc::clone(&bus)),
    ));

    let state = AppState { bus, router, store };
    if let Err(err) = server::serve(&config, state).await {
        tracing::error!(error = %err, "server exited with error");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "convoy=debug,tower_http=debug"
    } else {
        "convoy=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
