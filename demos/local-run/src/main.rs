use std::{sync::Arc, time::Duration};

use anyhow::Context;
use serde_json::json;
use tracing::info;

use skiff_core::{
    Engine, EngineConfig,
    service::memory::{InMemoryService, TaskScript},
};
use skiff_model::{JobVariables, Network, Subnet};
use skiff_observe::{Journal, LoggerConfig, logger_init};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Logger
    logger_init(&LoggerConfig::from_env()?)?;
    info!("logger initialized");

    // 2) Service with a default network and a scripted run
    let service = Arc::new(InMemoryService::new("us-east-1").with_network(
        Network {
            id: "vpc-local".into(),
            is_default: true,
        },
        vec![Subnet {
            id: "subnet-local".into(),
            network_id: "vpc-local".into(),
        }],
    ));
    service.push_script(TaskScript::default().with_log_lines(["hello from skiff"]));

    // 3) Engine
    let engine = Engine::new(
        service.clone(),
        EngineConfig {
            default_poll_interval: Duration::from_secs(1),
            ..Default::default()
        },
    )
    .with_subscriber(Arc::new(Journal::new()));

    // 4) Job
    let vars: JobVariables = serde_json::from_value(json!({
        "name": "hello",
        "image": "alpine:3.20",
        "command": "echo 'hello from skiff'",
        "env": {"GREETING": "hi"},
        "stream_output": true,
        "execution_role_arn": "arn:aws:iam::000000000000:role/skiff-execution",
        "cache_key": "hello",
    }))
    .context("job variables")?;
    let job = engine.configure(vars)?;
    println!("{}", engine.preview(&job)?);

    // 5) Submit and wait
    let mut handle = engine.submit(job);
    if let Some(record) = handle.started().await {
        info!(task_arn = %record.task_arn, "task started");
    }
    let result = handle.wait().await?;
    info!(
        identifier = %result.identifier,
        status_code = result.status_code,
        "run finished"
    );

    Ok(())
}
