mod cli;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::Cli;
use std::sync::Arc;
use survey_core::Llm;
use survey_data::CsvFileSource;
use survey_model::{GeminiModel, MockLlm};
use survey_server::{ServerConfig, create_app};
use survey_telemetry::{error, info, init_telemetry, shutdown_telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = init_telemetry(&cli.telemetry_config()) {
        eprintln!("Failed to initialize telemetry: {e}");
    }

    let llm: Arc<dyn Llm> = if cli.mock {
        info!("using scripted mock model");
        Arc::new(MockLlm::new("mock"))
    } else {
        let Some(api_key) = cli::api_key_from(|var| std::env::var(var).ok()) else {
            bail!("no API key: set one of {} or run with --mock", cli::API_KEY_VARS.join(", "));
        };
        Arc::new(GeminiModel::new(api_key, &cli.model)?)
    };

    let mut config = ServerConfig::new(llm, Arc::new(CsvFileSource::new(&cli.dataset)))
        .with_generation_timeout(cli.generation_timeout())
        .with_max_tool_rounds(cli.max_tool_rounds)
        .with_prompt_limits(cli.prompt_limits())
        .with_streaming(!cli.buffered)
        .with_security(cli.security());
    if let Some(generation) = cli.generation_config() {
        config = config.with_generation_config(generation);
    }

    let app = create_app(config);

    let listener = tokio::net::TcpListener::bind((cli.host.as_str(), cli.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", cli.host, cli.port))?;
    info!(
        address = %listener.local_addr()?,
        dataset = %cli.dataset.display(),
        model = %cli.model,
        "survey server listening"
    );

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("server stopped");
    shutdown_telemetry();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
