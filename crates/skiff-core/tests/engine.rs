use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::json;
use skiff_core::{
    Engine, EngineConfig, EngineError, StatusEvent, Subscribe,
    service::memory::{InMemoryService, TaskScript},
};
use skiff_model::{
    Arn, COMPATIBILITY_FARGATE, JobVariables, LogEvent, LaunchMode, Network, NetworkMode, Subnet, TaskStatus,
};

fn service() -> Arc<InMemoryService> {
    Arc::new(InMemoryService::new("us-east-1").with_network(
        Network {
            id: "vpc-default".into(),
            is_default: true,
        },
        vec![
            Subnet {
                id: "subnet-a".into(),
                network_id: "vpc-default".into(),
            },
            Subnet {
                id: "subnet-b".into(),
                network_id: "vpc-default".into(),
            },
        ],
    ))
}

fn engine(service: &Arc<InMemoryService>) -> Engine {
    Engine::new(
        service.clone(),
        EngineConfig {
            default_poll_interval: Duration::from_secs(1),
            ..EngineConfig::default()
        },
    )
}

fn vars(value: serde_json::Value) -> JobVariables {
    serde_json::from_value(value).unwrap()
}

#[derive(Default)]
struct Transitions(Mutex<Vec<TaskStatus>>);

#[async_trait]
impl Subscribe for Transitions {
    async fn on_status(&self, event: &StatusEvent) {
        self.0.lock().unwrap().push(event.to);
    }

    fn name(&self) -> &'static str {
        "transitions"
    }
}

#[derive(Default)]
struct Output(Mutex<Vec<(Arn, String)>>);

#[async_trait]
impl Subscribe for Output {
    async fn on_status(&self, _event: &StatusEvent) {}

    async fn on_output(&self, task_arn: &Arn, event: &LogEvent) {
        self.0.lock().unwrap().push((task_arn.clone(), event.message.clone()));
    }

    fn name(&self) -> &'static str {
        "output"
    }
}

#[tokio::test(start_paused = true)]
async fn serverless_echo_runs_to_completion() {
    let service = service();
    let transitions = Arc::new(Transitions::default());
    let engine = engine(&service).with_subscriber(transitions.clone());

    let config = engine
        .configure(vars(json!({"image": "alpine", "command": "echo hi"})))
        .unwrap();
    let result = engine.run(config).await.unwrap();

    assert_eq!(result.status_code, 0);
    assert!(result.identifier.starts_with("default::arn:aws:ecs:us-east-1:"));

    let requests = service.run_requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.launch_type, Some(LaunchMode::Fargate));
    assert_eq!(request.container_override("skiff").unwrap().command, vec!["echo", "hi"]);
    let network = request.network_configuration.as_ref().unwrap();
    assert_eq!(network.awsvpc_configuration.subnets, vec!["subnet-a", "subnet-b"]);
    assert_eq!(network.awsvpc_configuration.assign_public_ip.as_deref(), Some("ENABLED"));

    let definition = service.definition(&request.task_definition).unwrap();
    assert_eq!(definition.cpu.as_deref(), Some("1024"));
    assert_eq!(definition.memory.as_deref(), Some("2048"));
    assert!(definition.requires_compatibility(COMPATIBILITY_FARGATE));
    assert_eq!(definition.network_mode, Some(NetworkMode::Awsvpc));
    assert_eq!(
        definition.container("skiff").unwrap().image.as_deref(),
        Some("alpine")
    );
    assert!(definition.container("skiff").unwrap().extra.get("command").is_none());

    assert_eq!(
        *transitions.0.lock().unwrap(),
        vec![
            TaskStatus::Provisioning,
            TaskStatus::Pending,
            TaskStatus::Running,
            TaskStatus::Stopped
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn streamed_output_is_read_from_the_task_stream() {
    let service = service();
    service.push_script(TaskScript::default().with_log_lines(["starting", "done"]));
    let output = Arc::new(Output::default());
    let engine = engine(&service).with_subscriber(output.clone());

    let config = engine
        .configure(vars(json!({
            "name": "nightly",
            "image": "alpine",
            "stream_output": true,
            "execution_role_arn": "arn:aws:iam::000000000000:role/exec"
        })))
        .unwrap();
    let prepared = engine.prepare(&config).await.unwrap();
    let log = prepared
        .definition
        .container("skiff")
        .unwrap()
        .log_configuration
        .clone()
        .unwrap();
    assert_eq!(log.option("awslogs-stream-prefix"), Some("nightly"));

    let result = engine.run(config).await.unwrap();
    assert!(result.is_success());

    let relayed = output.0.lock().unwrap().clone();
    assert_eq!(
        relayed.iter().map(|(_, line)| line.as_str()).collect::<Vec<_>>(),
        vec!["starting", "done"]
    );
    assert!(result.identifier.ends_with(relayed[0].0.as_str()));
}

#[tokio::test(start_paused = true)]
async fn spot_runs_use_capacity_provider() {
    let service = service();
    let engine = engine(&service);

    let config = engine
        .configure(vars(json!({"launch_type": "FARGATE_SPOT"})))
        .unwrap();
    engine.run(config).await.unwrap();

    let value = service.run_requests()[0].to_value().unwrap();
    assert!(value.get("launchType").is_none());
    assert_eq!(
        value["capacityProviderStrategy"],
        json!([{"capacityProvider": "FARGATE_SPOT", "weight": 1}])
    );
}

#[tokio::test(start_paused = true)]
async fn stopped_task_surfaces_cause() {
    let service = service();
    service.push_script(TaskScript::stopped_early("OutOfMemoryError", "killed"));
    let engine = engine(&service);

    let err = engine
        .run(engine.configure(vars(json!({}))).unwrap())
        .await
        .unwrap_err();
    match err {
        EngineError::TaskStoppedBeforeRunning { code, reason, .. } => {
            assert_eq!(code.as_deref(), Some("OutOfMemoryError"));
            assert_eq!(reason.as_deref(), Some("killed"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn start_timeout_is_enforced() {
    let service = service();
    service.push_script(TaskScript::stuck_pending());
    let engine = engine(&service);

    let err = engine
        .run(
            engine
                .configure(vars(json!({"start_timeout_secs": 30})))
                .unwrap(),
        )
        .await
        .unwrap_err();
    match err {
        EngineError::TaskStartTimeout { timeout, .. } => {
            assert_eq!(timeout, Duration::from_secs(30))
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn changed_image_registers_one_new_revision() {
    let service = service();
    let engine = engine(&service);

    for image in ["alpine:3.19", "alpine:3.19", "alpine:3.20"] {
        let config = engine
            .configure(vars(json!({"image": image, "cache_key": "etl"})))
            .unwrap();
        engine.run(config).await.unwrap();
    }

    assert_eq!(service.registrations(), 2);
    assert_eq!(engine.cache().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn worker_pool_runs_many_jobs() {
    let service = service();
    let engine = Engine::new(
        service.clone(),
        EngineConfig {
            workers: 2,
            default_poll_interval: Duration::from_secs(1),
            ..EngineConfig::default()
        },
    );

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let config = engine
                .configure(vars(json!({"image": "alpine", "cache_key": format!("job-{i}")})))
                .unwrap();
            engine.submit(config)
        })
        .collect();

    for handle in handles {
        assert!(handle.wait().await.unwrap().is_success());
    }
    assert_eq!(service.run_requests().len(), 5);
}
