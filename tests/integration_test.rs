mod common;

use common::{test_config, text_for, FakeRemote, Reply};
use std::sync::atomic::Ordering;
use tokio_test::{assert_err, assert_ok};

use exam_analogue::error::{RemoteError, SetupError};
use exam_analogue::models::{ArtifactState, RunPhase, RunState, WorkItem};
use exam_analogue::orchestrator::SessionSetup;
use exam_analogue::utils::logging;
use exam_analogue::{
    execute_run, App, AppError, BatchDriver, Config, GenerationContext, ItemCtx, ItemFlow,
    ProcessResult, RunMode,
};

fn labels(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| text_for(id)).collect()
}

fn work_list(ids: &[&str]) -> Vec<WorkItem> {
    ids.iter().map(|id| WorkItem::new(*id, *id)).collect()
}

#[tokio::test]
async fn test_skip_sentinel_advances_without_result() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 2, 4, &["1", "2", "3"]);
    let remote = FakeRemote::new().reply("2", Reply::Skip);

    let mut state = RunState::default();
    let summary = assert_ok!(execute_run(&config, &remote, &mut state, RunMode::Start).await);

    assert_eq!(state.results, labels(&["1", "3"]));
    assert_eq!(state.cursor, 3);
    assert_eq!(state.phase, RunPhase::Completed);
    assert_eq!(summary.appended, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn test_exhausted_retries_are_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 2, 4, &["4", "5", "6"]);
    let remote = FakeRemote::new()
        .reply("5", Reply::Error)
        .reply("5", Reply::Empty)
        .reply("5", Reply::Error);

    let mut state = RunState::default();
    let summary = assert_ok!(execute_run(&config, &remote, &mut state, RunMode::Start).await);

    assert_eq!(state.results, labels(&["4", "6"]));
    assert_eq!(state.failed_items, vec!["5".to_string()]);
    assert_eq!(state.phase, RunPhase::Completed);
    assert_eq!(summary.failed, 1);
    assert_eq!(remote.prompts_for("5").len(), config.max_attempts);

    let warn = std::fs::read_to_string(&config.warn_file).unwrap();
    assert!(warn.contains("题目 5"));
    assert!(!warn.contains("题目 4"));
}

#[tokio::test]
async fn test_blocked_response_retries_with_next_variant() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 1, 1, &["7"]);
    let remote = FakeRemote::new().reply("7", Reply::Blocked("SAFETY".to_string()));

    let mut state = RunState::default();
    execute_run(&config, &remote, &mut state, RunMode::Start)
        .await
        .unwrap();

    let prompts = remote.prompts_for("7");
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("Copyright note"));
    assert!(prompts[1].contains("Copyright note"));
    assert_eq!(state.results, labels(&["7"]));
}

#[tokio::test]
async fn test_failed_artifact_aborts_before_generation() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 2, 4, &["1", "2"]);
    let remote = FakeRemote::new()
        .with_poll_script(vec![ArtifactState::Pending])
        .with_final_state(ArtifactState::Failed);

    let mut state = RunState::default();
    let err = assert_err!(execute_run(&config, &remote, &mut state, RunMode::Start).await);

    assert!(matches!(
        err,
        AppError::Setup(SetupError::ArtifactFailed { .. })
    ));
    assert!(err.is_fatal());
    assert_eq!(state.phase, RunPhase::Aborted);
    assert!(state.abort_reason.is_some());
    assert!(state.results.is_empty());
    assert_eq!(remote.generate_calls(), 0);

    let saved = RunState::load(&config.state_file).unwrap().unwrap();
    assert_eq!(saved.phase, RunPhase::Aborted);
}

#[tokio::test]
async fn test_readiness_timeout_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), 1, 1, &["1"]);
    config.readiness_timeout_secs = 0;
    let remote = FakeRemote::new().with_final_state(ArtifactState::Pending);

    let mut state = RunState::default();
    let err = assert_err!(execute_run(&config, &remote, &mut state, RunMode::Start).await);

    assert!(matches!(
        err,
        AppError::Setup(SetupError::ReadinessTimeout { .. })
    ));
    assert_eq!(state.phase, RunPhase::Aborted);
    assert_eq!(remote.generate_calls(), 0);
}

#[tokio::test]
async fn test_chunk_upload_failure_aborts_remaining_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), 2, 7, &["1"]);
    config.max_chunk_pages = 3;
    let remote = FakeRemote::new().with_upload_failure(2);

    let mut state = RunState::default();
    let err = assert_err!(execute_run(&config, &remote, &mut state, RunMode::Start).await);

    match &err {
        AppError::Setup(SetupError::UploadFailed { name, .. }) => {
            assert_eq!(name, "book.pdf (p1-3)")
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(remote.upload_names(), vec!["exam.pdf".to_string()]);
    assert_eq!(remote.upload_attempts.load(Ordering::SeqCst), 2);
    assert_eq!(remote.polls.load(Ordering::SeqCst), 0);
    assert_eq!(state.phase, RunPhase::Aborted);
    assert!(state.artifacts.is_empty());
    assert_eq!(remote.generate_calls(), 0);
}

#[tokio::test]
async fn test_state_query_failure_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 1, 1, &["1"]);
    let remote = FakeRemote::new().with_poll_failure();

    let mut state = RunState::default();
    let err = assert_err!(execute_run(&config, &remote, &mut state, RunMode::Start).await);

    assert!(matches!(
        err,
        AppError::Setup(SetupError::PollFailed { .. })
    ));
    assert_eq!(remote.polls.load(Ordering::SeqCst), 1);
    assert_eq!(state.phase, RunPhase::Aborted);
    assert_eq!(remote.caches_created.load(Ordering::SeqCst), 0);
    assert_eq!(remote.generate_calls(), 0);
}

#[tokio::test]
async fn test_cache_creation_failure_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 1, 1, &["1"]);
    let remote = FakeRemote::new().with_cache_failure();

    let mut state = RunState::default();
    let err = assert_err!(execute_run(&config, &remote, &mut state, RunMode::Start).await);

    assert!(matches!(
        err,
        AppError::Setup(SetupError::CacheFailed { .. })
    ));
    assert_eq!(state.phase, RunPhase::Aborted);
    assert!(state.cache.is_none());
    assert_eq!(remote.generate_calls(), 0);

    let saved = RunState::load(&config.state_file).unwrap().unwrap();
    assert_eq!(saved.phase, RunPhase::Aborted);
}

#[tokio::test]
async fn test_failed_item_keeps_last_remote_error() {
    let context = GenerationContext::Inline {
        artifacts: Vec::new(),
        system_instruction: String::new(),
    };
    let flow = ItemFlow::new(2, std::time::Duration::ZERO);
    let remote = FakeRemote::new()
        .reply("8", Reply::Blocked("SAFETY".to_string()))
        .reply("8", Reply::Empty)
        .reply("9", Reply::Error)
        .reply("9", Reply::Blocked("RECITATION".to_string()));

    let ctx = ItemCtx::new(0, 2, WorkItem::new("8", "8"));
    match flow.run(&remote, &context, &ctx).await {
        ProcessResult::Failed {
            attempts,
            error: RemoteError::EmptyContent { item },
        } => {
            assert_eq!(attempts, 2);
            assert_eq!(item, "8");
        }
        other => panic!("unexpected result: {:?}", other),
    }

    let ctx = ItemCtx::new(1, 2, WorkItem::new("9", "9"));
    match flow.run(&remote, &context, &ctx).await {
        ProcessResult::Failed {
            error: RemoteError::Blocked { reason },
            ..
        } => assert_eq!(reason, "RECITATION"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_large_documents_are_uploaded_in_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), 2, 7, &["1"]);
    config.max_chunk_pages = 3;
    let remote = FakeRemote::new();

    let mut state = RunState::default();
    execute_run(&config, &remote, &mut state, RunMode::Start)
        .await
        .unwrap();

    assert_eq!(
        remote.upload_names(),
        vec![
            "exam.pdf".to_string(),
            "book.pdf (p1-3)".to_string(),
            "book.pdf (p4-6)".to_string(),
            "book.pdf (p7-7)".to_string(),
        ]
    );
    assert_eq!(state.artifacts.len(), 4);
    assert!(state
        .artifacts
        .iter()
        .all(|a| a.state == ArtifactState::Ready));
    assert_eq!(remote.caches_created.load(Ordering::SeqCst), 1);
    assert!(state.cache.is_some());
}

#[tokio::test]
async fn test_inline_context_when_cache_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), 1, 1, &["1", "2"]);
    config.use_context_cache = false;
    let remote = FakeRemote::new();

    let mut state = RunState::default();
    execute_run(&config, &remote, &mut state, RunMode::Start)
        .await
        .unwrap();

    assert_eq!(remote.caches_created.load(Ordering::SeqCst), 0);
    assert!(state.cache.is_none());
    assert_eq!(state.results, labels(&["1", "2"]));
}

#[tokio::test]
async fn test_cursor_equals_processed_count() {
    let ids = ["1", "2", "3", "4", "5"];
    let remote = FakeRemote::new().reply("2", Reply::Skip);
    let context = GenerationContext::Inline {
        artifacts: Vec::new(),
        system_instruction: String::new(),
    };
    let driver = BatchDriver::new(ItemFlow::new(1, std::time::Duration::ZERO));

    let mut state = RunState::default();
    state.start(work_list(&ids));

    for k in 1..=ids.len() {
        driver
            .run_items(&remote, &context, &mut state, Some(1))
            .await
            .unwrap();
        assert_eq!(state.cursor, k);
    }
    assert_eq!(state.phase, RunPhase::Completed);
    assert_eq!(state.results, labels(&["1", "3", "4", "5"]));
}

#[tokio::test]
async fn test_interrupted_run_matches_uninterrupted() {
    let ids = ["1", "2", "3", "4", "5", "6"];
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("state.json");
    let context = GenerationContext::Inline {
        artifacts: Vec::new(),
        system_instruction: String::new(),
    };
    let scripted = || FakeRemote::new().reply("3", Reply::Skip);

    let mut full = RunState::default();
    full.start(work_list(&ids));
    BatchDriver::new(ItemFlow::new(1, std::time::Duration::ZERO))
        .run(&scripted(), &context, &mut full)
        .await
        .unwrap();

    let remote = scripted();
    let driver = BatchDriver::new(ItemFlow::new(1, std::time::Duration::ZERO))
        .with_state_file(&state_file);
    let mut first = RunState::default();
    first.start(work_list(&ids));
    driver
        .run_items(&remote, &context, &mut first, Some(4))
        .await
        .unwrap();
    assert_eq!(first.phase, RunPhase::Running);
    drop(first);

    let mut resumed = RunState::load(&state_file).unwrap().unwrap();
    assert!(resumed.can_resume());
    assert_eq!(resumed.cursor, 4);
    resumed.resume().unwrap();
    driver.run(&remote, &context, &mut resumed).await.unwrap();

    assert_eq!(resumed.results, full.results);
    assert_eq!(resumed.cursor, full.cursor);
    assert_eq!(resumed.phase, RunPhase::Completed);
}

#[tokio::test]
async fn test_resume_reuses_live_cache() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 1, 1, &[]);
    let ids = ["1", "2", "3", "4"];
    let remote = FakeRemote::new();

    let mut state = RunState::default();
    state.start(work_list(&ids));
    let context = SessionSetup::new(&config)
        .prepare_fresh(&remote, &mut state)
        .await
        .unwrap();
    BatchDriver::from_config(&config)
        .run_items(&remote, &context, &mut state, Some(2))
        .await
        .unwrap();
    let uploads_before = remote.upload_names().len();

    let mut loaded = RunState::load(&config.state_file).unwrap().unwrap();
    execute_run(&config, &remote, &mut loaded, RunMode::Resume)
        .await
        .unwrap();

    assert_eq!(remote.upload_names().len(), uploads_before);
    assert_eq!(remote.caches_created.load(Ordering::SeqCst), 1);
    assert_eq!(remote.cache_lookups.load(Ordering::SeqCst), 1);
    assert_eq!(loaded.results, labels(&ids));
    assert_eq!(loaded.phase, RunPhase::Completed);
}

#[tokio::test]
async fn test_resume_with_expired_cache_uploads_again() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 1, 1, &[]);
    let ids = ["1", "2", "3"];
    let remote = FakeRemote::new().with_cache_alive(false);

    let mut state = RunState::default();
    state.start(work_list(&ids));
    let context = SessionSetup::new(&config)
        .prepare_fresh(&remote, &mut state)
        .await
        .unwrap();
    BatchDriver::from_config(&config)
        .run_items(&remote, &context, &mut state, Some(1))
        .await
        .unwrap();

    let mut loaded = RunState::load(&config.state_file).unwrap().unwrap();
    execute_run(&config, &remote, &mut loaded, RunMode::Resume)
        .await
        .unwrap();

    assert_eq!(remote.upload_names().len(), 4);
    assert_eq!(remote.caches_created.load(Ordering::SeqCst), 2);
    assert_eq!(loaded.cursor, 3);
    assert_eq!(loaded.results, labels(&ids));
}

#[tokio::test]
async fn test_derived_work_list() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), 1, 1, &[]);
    config.derive_work_list = true;
    let remote = FakeRemote::new();

    let mut state = RunState::default();
    execute_run(&config, &remote, &mut state, RunMode::Start)
        .await
        .unwrap();

    assert_eq!(
        state.work_list,
        vec![WorkItem::new("1", "q1"), WorkItem::new("2", "q2")]
    );
    assert_eq!(state.results, vec![text_for("q1"), text_for("q2")]);
}

#[tokio::test]
async fn test_default_work_list_when_nothing_configured() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 1, 1, &[]);
    let remote = FakeRemote::new();

    let mut state = RunState::default();
    let summary = assert_ok!(execute_run(&config, &remote, &mut state, RunMode::Start).await);

    assert_eq!(state.work_list.len(), 31);
    assert_eq!(summary.total, 31);
    assert_eq!(state.results.len(), 31);
}

#[tokio::test]
async fn test_missing_exam_file_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), 1, 1, &["1"]);
    config.exam_pdf = dir.path().join("missing.pdf").display().to_string();
    let remote = FakeRemote::new();

    let mut state = RunState::default();
    let err = assert_err!(execute_run(&config, &remote, &mut state, RunMode::Start).await);

    assert!(matches!(err, AppError::File(_)));
    assert_eq!(state.phase, RunPhase::Aborted);
    assert!(remote.upload_names().is_empty());
}

#[tokio::test]
#[ignore] // 需要真实 API：cargo test -- --ignored
async fn test_real_api_run() {
    let config = Config::from_env();
    logging::init(config.verbose_logging);

    let app = App::initialize(config).await.expect("初始化失败");
    app.run().await.expect("运行失败");
}
