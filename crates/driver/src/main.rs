use driver::{runner_config, LoadTask};
use harness::{LogSink, RequestEvents, Runner, TaskSet};
use llm::{BedrockInvoker, RequestPayloadBuilder};
use loadtest_core::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

fn load_config() -> anyhow::Result<Config> {
    let explicit = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::resolve(explicit)?.unwrap_or_else(|| {
        warn!(
            "No config file at {}, using built-in defaults",
            Config::default_config_path()
        );
        Config::default()
    });

    let config = config.with_env_overrides()?;
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set default log level if not already set
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = load_config()?;
    info!(
        model = %config.model.id,
        provisioned = config.model.is_provisioned(),
        format = ?config.payload.format,
        "Starting Bedrock load test"
    );

    let request = RequestPayloadBuilder::new(&config.model, &config.payload).build()?;
    let invoker = BedrockInvoker::new(config.model.aws_region.as_deref()).await?;

    let mut tasks = TaskSet::new();
    tasks.register(Box::new(LoadTask::new(
        Arc::new(invoker),
        Arc::new(request),
    )))?;

    let events = RequestEvents::new().with_sink(Arc::new(LogSink));
    let runner = Runner::new(runner_config(&config.load));

    let stop = runner.stop_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, stopping virtual users");
                stop.stop();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    let summary = runner.run(Arc::new(tasks), Arc::new(events)).await?;
    info!(
        "Completed {} requests ({} failed) in {:.1}s",
        summary.iterations,
        summary.failures,
        summary.elapsed.as_secs_f64()
    );

    Ok(())
}
