//! Integration tests for the check pipeline with in-memory fakes.

use atlas_doctor_core::fakes::{ScriptedClientFactory, StaticToolCatalog};
use atlas_doctor_core::{
    ClientError, EntitySummary, ErrorKind, ServiceKind, ServiceProbe, ServiceSettings,
    SettingsSnapshot, ToolCatalog,
};
use atlas_doctor_pipeline::{
    CheckOptions, CheckPlan, ComponentStatus, NoopObserver, Pipeline, Stage, StageObserver,
    StageOutcome, StageResult, StageStatus,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn statuses(results: &[StageResult]) -> Vec<StageStatus> {
    results.iter().map(|r| r.status).collect()
}

fn both_services() -> SettingsSnapshot {
    SettingsSnapshot {
        jira: ServiceSettings::empty(ServiceKind::Jira)
            .with_base_url("https://jira.example.com")
            .with_api_token("u", "t"),
        confluence: ServiceSettings::empty(ServiceKind::Confluence)
            .with_base_url("https://wiki.example.com")
            .with_personal_token("p"),
    }
}

fn plan(
    snapshot: SettingsSnapshot,
    components: Vec<ComponentStatus>,
    factory: ScriptedClientFactory,
    catalog: StaticToolCatalog,
) -> CheckPlan {
    let catalog: Arc<dyn ToolCatalog> = Arc::new(catalog);
    CheckPlan {
        snapshot,
        components,
        probe: Ok(ServiceProbe::new(Arc::new(factory))),
        catalog: Ok(catalog),
        options: CheckOptions::default(),
    }
}

#[derive(Default)]
struct RecordingObserver {
    started: Mutex<Vec<String>>,
    recorded: Mutex<Vec<(String, StageStatus)>>,
}

impl StageObserver for RecordingObserver {
    fn on_stage_start(&self, stage_name: &str) {
        self.started.lock().unwrap().push(stage_name.to_string());
    }

    fn on_stage_result(&self, result: &StageResult) {
        self.recorded
            .lock()
            .unwrap()
            .push((result.stage_name.clone(), result.status));
    }
}

/// Test: a failing fatal first stage skips everything after it
#[tokio::test]
async fn test_fatal_abort_records_every_stage() {
    let ran = Arc::new(AtomicUsize::new(0));
    let counter = |ran: Arc<AtomicUsize>| {
        move || {
            let ran = ran.clone();
            async move {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(StageOutcome::pass("ran"))
            }
        }
    };

    let stages = vec![
        Stage::from_fn("load", true, || async { Ok(StageOutcome::fail("missing module")) }),
        Stage::from_fn("config", false, counter(ran.clone())),
        Stage::from_fn("connectivity", false, counter(ran.clone())),
        Stage::from_fn("capability", false, counter(ran.clone())),
    ];

    let verdict = Pipeline::run(stages, &NoopObserver).await;

    assert_eq!(
        statuses(&verdict.results),
        vec![
            StageStatus::Failed,
            StageStatus::Skipped,
            StageStatus::Skipped,
            StageStatus::Skipped
        ]
    );
    assert_eq!(ran.load(Ordering::SeqCst), 0, "no stage may run after abort");
    assert!(!verdict.all_passed);
    assert_eq!(verdict.aborted_by.as_deref(), Some("load"));
    assert_eq!(
        verdict.skipped_by_abort(),
        vec!["config", "connectivity", "capability"]
    );
    assert!(verdict.results.iter().filter(|r| r.skipped()).all(|r| !r.is_fatal));
}

/// Test: a non-fatal failure does not hide later results
#[tokio::test]
async fn test_non_fatal_failure_continues() {
    let factory = ScriptedClientFactory::new()
        .with_error(
            ServiceKind::Jira,
            ClientError::Transport("connection refused".to_string()),
        )
        .with_entities(
            ServiceKind::Confluence,
            vec![EntitySummary::new("ENG", "Engineering")],
        );
    let stages = plan(
        both_services(),
        vec![ComponentStatus::loaded("http client", "ok")],
        factory,
        StaticToolCatalog::with_names(&["jira_search", "confluence_search"]),
    )
    .stages();

    let verdict = Pipeline::run(stages, &NoopObserver).await;

    let names: Vec<_> = verdict.results.iter().map(|r| r.stage_name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "load",
            "configuration",
            "connectivity:jira",
            "connectivity:confluence",
            "capabilities"
        ]
    );
    assert_eq!(
        statuses(&verdict.results),
        vec![
            StageStatus::Passed,
            StageStatus::Passed,
            StageStatus::Failed,
            StageStatus::Passed,
            StageStatus::Passed
        ]
    );
    assert!(!verdict.all_passed);
    assert!(verdict.aborted_by.is_none());
    assert!(matches!(
        verdict.results[2].error,
        Some(ErrorKind::Connectivity(_))
    ));
}

/// Test: load failure in the canonical plan skips the rest
#[tokio::test]
async fn test_canonical_load_failure() {
    let stages = plan(
        both_services(),
        vec![ComponentStatus::failed(
            "tool catalog",
            ErrorKind::Load("manifest unreadable".to_string()),
        )],
        ScriptedClientFactory::new(),
        StaticToolCatalog::with_names(&[]),
    )
    .stages();

    let verdict = Pipeline::run(stages, &NoopObserver).await;
    assert_eq!(verdict.results.len(), 5);
    assert_eq!(verdict.failed_count(), 1);
    assert_eq!(verdict.skipped_count(), 4);
    assert!(matches!(verdict.results[0].error, Some(ErrorKind::Load(_))));
}

/// Test: optional deeper checks run after their service and fail on their own
#[tokio::test]
async fn test_deeper_checks_are_non_fatal() {
    let factory = ScriptedClientFactory::new()
        .with_entities(ServiceKind::Jira, vec![EntitySummary::new("OPS", "Operations")])
        .with_pages(Err(ClientError::Unauthorized {
            service: ServiceKind::Confluence,
            status: 403,
        }));
    let mut plan = plan(
        both_services(),
        vec![ComponentStatus::loaded("tool server", "mcp-atlassian 0.11.0")],
        factory,
        StaticToolCatalog::with_names(&["jira_get_issue"]),
    );
    plan.options.issue_key = Some("OPS-7".to_string());
    plan.options.page_search = true;

    let verdict = Pipeline::run(plan.stages(), &NoopObserver).await;

    let summary: Vec<_> = verdict
        .results
        .iter()
        .map(|r| (r.stage_name.as_str(), r.status))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("load", StageStatus::Passed),
            ("configuration", StageStatus::Passed),
            ("connectivity:jira", StageStatus::Passed),
            ("issue:jira", StageStatus::Failed),
            ("connectivity:confluence", StageStatus::Passed),
            ("search:confluence", StageStatus::Failed),
            ("capabilities", StageStatus::Passed),
        ]
    );
    assert!(verdict.aborted_by.is_none());
    assert!(matches!(
        verdict.results[5].error,
        Some(ErrorKind::AuthRejected(_))
    ));
}

/// Test: identical inputs give identical results
#[tokio::test]
async fn test_pipeline_is_idempotent() {
    let build = || {
        plan(
            both_services(),
            vec![ComponentStatus::loaded("http client", "ok")],
            ScriptedClientFactory::new()
                .with_entities(ServiceKind::Jira, vec![EntitySummary::new("OPS", "Ops")])
                .with_error(
                    ServiceKind::Confluence,
                    ClientError::Unauthorized {
                        service: ServiceKind::Confluence,
                        status: 403,
                    },
                ),
            StaticToolCatalog::with_names(&["a", "b"]),
        )
        .stages()
    };

    let first = Pipeline::run(build(), &NoopObserver).await;
    let second = Pipeline::run(build(), &NoopObserver).await;

    assert_eq!(first.results, second.results);
    assert_ne!(first.run_id, second.run_id);
}

/// Test: observer sees results in declaration order, starts only for executed stages
#[tokio::test]
async fn test_observer_sees_declaration_order() {
    let observer = RecordingObserver::default();
    let stages = vec![
        Stage::from_fn("first", false, || async { Ok(StageOutcome::fail("nope")) }),
        Stage::from_fn("second", false, || async { Ok(StageOutcome::pass("ok")) }).disabled(),
        Stage::from_fn("third", false, || async { Ok(StageOutcome::pass("ok")) }),
    ];

    let verdict = Pipeline::run(stages, &observer).await;

    assert_eq!(*observer.started.lock().unwrap(), vec!["first", "third"]);
    assert_eq!(
        *observer.recorded.lock().unwrap(),
        vec![
            ("first".to_string(), StageStatus::Failed),
            ("second".to_string(), StageStatus::Skipped),
            ("third".to_string(), StageStatus::Passed),
        ]
    );
    assert_eq!(verdict.results[1].detail, "disabled");
}

/// Test: skipping API and tools stages still passes when config is fine
#[tokio::test]
async fn test_skip_flags_disable_stages() {
    let mut plan = plan(
        both_services(),
        vec![ComponentStatus::loaded("http client", "ok")],
        ScriptedClientFactory::new(),
        StaticToolCatalog::failing("would fail"),
    );
    plan.options = CheckOptions {
        skip_api: true,
        skip_tools: true,
        ..CheckOptions::default()
    };

    let verdict = Pipeline::run(plan.stages(), &NoopObserver).await;

    assert!(verdict.all_passed);
    assert_eq!(verdict.passed_count(), 2);
    assert_eq!(verdict.skipped_count(), 3);
}

/// Test: a stage returning an error is a failure, not a crash
#[tokio::test]
async fn test_stage_error_is_recorded() {
    let stages = vec![
        Stage::from_fn("explodes", false, || async {
            Err::<StageOutcome, _>(anyhow::anyhow!("tool layer crashed"))
        }),
        Stage::from_fn("after", false, || async { Ok(StageOutcome::pass("ok")) }),
    ];

    let verdict = Pipeline::run(stages, &NoopObserver).await;
    assert_eq!(
        statuses(&verdict.results),
        vec![StageStatus::Failed, StageStatus::Passed]
    );
    assert_eq!(verdict.results[0].detail, "tool layer crashed");
}
