//! 会话集成测试：脚本化 LLM + 静态检索，零延迟

use std::sync::{Arc, Mutex};
use std::time::Duration;

use spark::agent::{MockRetriever, Retriever, StaticRetriever};
use spark::config::{AppConfig, ReflectionFailurePolicy, TimingSection};
use spark::core::{
    spawn_session, AgentError, AgentStatus, Command, LogEntry, LogLevel, ResetReceiver, RunId,
    RunOutcome, Session, SessionBuilder, SessionSnapshot, VectorPoint,
};
use spark::llm::{LlmClient, LlmError, Message, ScriptedLlmClient};
use tokio::sync::watch;

const REFLECTION_OK: &str = r#"{"was_productive": true, "key_insight": "sysctl already tuned", "should_continue": true, "next_action": "check swappiness", "confidence": 0.8}"#;
const REFLECTION_SETTLED: &str = r#"{"was_productive": true, "key_insight": "done", "should_continue": false, "next_action": "none", "confidence": 0.95}"#;

fn test_config() -> AppConfig {
    AppConfig {
        timing: TimingSection::instant(),
        ..AppConfig::default()
    }
}

fn build(cfg: AppConfig, llm: Arc<ScriptedLlmClient>) -> (Session, ResetReceiver) {
    SessionBuilder::new(cfg)
        .with_llm(llm)
        .with_retriever(Arc::new(StaticRetriever::new(MockRetriever::fixture())))
        .build()
}

/// 日志按时间顺序（缓冲内部最新在前）
fn chronological(session: &Session) -> Vec<LogEntry> {
    let mut logs = session.logs().to_vec();
    logs.reverse();
    logs
}

#[tokio::test]
async fn test_trigger_path_end_to_end() {
    let llm = Arc::new(ScriptedLlmClient::new([
        Ok(">>> MAESTRO_TRIGGER: optimize kernel normalized".to_string()),
        Ok(REFLECTION_OK.to_string()),
        Ok(REFLECTION_OK.to_string()),
    ]));
    let (mut session, _resets) = build(test_config(), llm.clone());

    let outcome = session.run_task("optimize kernel").await;
    assert_eq!(outcome, RunOutcome::Succeeded(RunId(1)));

    let state = session.state();
    assert_eq!(state.status, AgentStatus::Success);
    assert_eq!(state.current_task.as_deref(), Some("optimize kernel"));
    assert_eq!(state.qdrant_hits.len(), 2);
    assert_eq!(state.reflections.len(), 2);
    assert_eq!(state.iterations, 2);
    assert_eq!(state.max_iterations, 5);
    let iterations: Vec<usize> = state.reflections.iter().map(|r| r.iteration).collect();
    assert_eq!(iterations, vec![1, 2]);

    let logs = chronological(&session);
    let levels: Vec<LogLevel> = logs.iter().map(|e| e.level).collect();
    assert_eq!(
        levels,
        vec![
            LogLevel::Spark,
            LogLevel::Maestro,
            LogLevel::Info,
            LogLevel::Info,
            LogLevel::Spark
        ]
    );
    assert!(logs[0].message.contains("optimize kernel"));
    assert!(logs[1].message.contains("optimize kernel normalized"));
    assert!(logs[2].message.contains("iteration 1"));
    assert!(logs[3].message.contains("iteration 2"));
    assert!(logs[4].message.contains("completed"));

    // 反思收到任务文本与检索结果
    let prompt = &llm.call(1).unwrap()[0].content;
    assert!(prompt.contains("optimize kernel"));
    assert!(prompt.contains("Kernel tuning"));
    assert_eq!(llm.call_count(), 3);
}

#[tokio::test]
async fn test_direct_path_skips_search_and_reflect() {
    let llm = Arc::new(ScriptedLlmClient::new([Ok(
        "A kernel is the core of an operating system.".to_string(),
    )]));
    let (mut session, _resets) = build(test_config(), llm.clone());

    let outcome = session.run_task("what is a kernel?").await;
    assert!(matches!(outcome, RunOutcome::Succeeded(_)));

    let state = session.state();
    assert_eq!(state.status, AgentStatus::Success);
    assert!(state.qdrant_hits.is_empty());
    assert!(state.reflections.is_empty());
    assert_eq!(state.iterations, 0);

    let logs = chronological(&session);
    assert_eq!(logs.len(), 3);
    assert!(logs[1].message.contains("core of an operating system"));
    assert!(logs.iter().all(|e| e.level != LogLevel::Maestro));
    assert!(logs.iter().all(|e| !e.message.contains("Reflection")));
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_dispatch_failure_sets_error() {
    let llm = Arc::new(ScriptedLlmClient::new([Err(LlmError::Network(
        "connection refused".into(),
    ))]));
    let (mut session, _resets) = build(test_config(), llm.clone());

    let outcome = session.run_task("optimize kernel").await;
    assert!(matches!(outcome, RunOutcome::Failed(_)));
    assert_eq!(session.state().status, AgentStatus::Error);
    assert!(session.state().reflections.is_empty());

    let errors: Vec<&LogEntry> = session
        .logs()
        .iter()
        .filter(|e| e.level == LogLevel::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("connection refused"));
    assert_eq!(session.logs().get(0).unwrap().level, LogLevel::Error);
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_reflection_failure_degrades_and_continues() {
    let llm = Arc::new(ScriptedLlmClient::new([
        Ok(">>> MAESTRO_TRIGGER: tune".to_string()),
        Err(LlmError::Api("quota exceeded".into())),
        Ok(REFLECTION_OK.to_string()),
    ]));
    let (mut session, _resets) = build(test_config(), llm.clone());

    session.run_task("tune the box").await;
    let state = session.state();
    assert_eq!(state.status, AgentStatus::Success);
    assert_eq!(state.reflections.len(), 2);
    assert!(state.reflections[0].is_degraded());
    assert_eq!(state.reflections[0].iteration, 1);
    assert!(state.reflections[1].was_productive);

    let warn = session
        .logs()
        .iter()
        .find(|e| e.level == LogLevel::Warn)
        .expect("degraded iteration is logged");
    assert!(warn.details.as_deref().unwrap_or("").contains("quota exceeded"));
    assert!(session.logs().iter().all(|e| e.level != LogLevel::Error));
    assert_eq!(llm.call_count(), 3);
}

#[tokio::test]
async fn test_unparseable_reflection_degrades() {
    let llm = Arc::new(ScriptedLlmClient::new([
        Ok(">>> MAESTRO_TRIGGER: tune".to_string()),
        Ok("no idea".to_string()),
        Ok(REFLECTION_OK.to_string()),
    ]));
    let (mut session, _resets) = build(test_config(), llm);

    session.run_task("tune").await;
    assert_eq!(session.state().status, AgentStatus::Success);
    assert!(session.state().reflections[0].is_degraded());
}

#[tokio::test]
async fn test_reflection_failure_abort_policy() {
    let mut cfg = test_config();
    cfg.agent.reflection_failure = ReflectionFailurePolicy::Abort;
    let llm = Arc::new(ScriptedLlmClient::new([
        Ok(">>> MAESTRO_TRIGGER: tune".to_string()),
        Err(LlmError::Api("quota exceeded".into())),
    ]));
    let (mut session, _resets) = build(cfg, llm.clone());

    let outcome = session.run_task("tune").await;
    assert!(matches!(outcome, RunOutcome::Failed(_)));
    assert_eq!(session.state().status, AgentStatus::Error);
    assert!(session.state().reflections.is_empty());
    assert_eq!(session.state().qdrant_hits.len(), 2);
    assert!(session.logs().get(0).unwrap().message.contains("quota exceeded"));
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn test_blank_input_is_noop() {
    let llm = Arc::new(ScriptedLlmClient::default());
    let (mut session, _resets) = build(test_config(), llm.clone());
    let before = session.snapshot();

    assert_eq!(session.run_task("").await, RunOutcome::Ignored);
    assert_eq!(session.run_task("  \t\n ").await, RunOutcome::Ignored);

    assert_eq!(session.state(), &before.agent);
    assert!(session.logs().is_empty());
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_submit_while_not_idle_is_noop() {
    let llm = Arc::new(ScriptedLlmClient::new([Ok("direct".to_string())]));
    let (mut session, _resets) = build(test_config(), llm.clone());
    session.run_task("first").await;
    assert_eq!(session.state().status, AgentStatus::Success);

    let before = session.snapshot();
    assert_eq!(session.run_task("second").await, RunOutcome::Ignored);
    assert_eq!(session.state(), &before.agent);
    assert_eq!(session.logs().to_vec(), before.logs);
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_resubmit_after_reset_starts_fresh() {
    let llm = Arc::new(ScriptedLlmClient::new([
        Ok(">>> MAESTRO_TRIGGER: a".to_string()),
        Ok(REFLECTION_OK.to_string()),
        Ok(REFLECTION_OK.to_string()),
        Ok(">>> MAESTRO_TRIGGER: a".to_string()),
        Ok(REFLECTION_OK.to_string()),
        Ok(REFLECTION_OK.to_string()),
    ]));
    let (mut session, mut resets) = build(test_config(), llm);

    session.run_task("optimize kernel").await;
    let run_id = resets.recv().await.unwrap();
    assert_eq!(run_id, RunId(1));
    assert!(session.apply_reset(run_id));
    assert_eq!(session.state().status, AgentStatus::Idle);
    // 复位只改状态，结果保留到下一次提交
    assert_eq!(session.state().reflections.len(), 2);

    session.run_task("optimize kernel").await;
    let state = session.state();
    assert_eq!(state.status, AgentStatus::Success);
    assert_eq!(state.reflections.len(), 2);
    assert_eq!(state.qdrant_hits.len(), 2);
    assert_eq!(state.iterations, 2);
    assert_eq!(session.current_run(), Some(RunId(2)));
}

#[tokio::test]
async fn test_stale_reset_does_not_clobber_new_run() {
    let llm = Arc::new(ScriptedLlmClient::new([
        Ok("first answer".to_string()),
        Ok("second answer".to_string()),
    ]));
    let (mut session, _resets) = build(test_config(), llm);

    session.run_task("one").await;
    assert_eq!(session.pending_reset(), Some(RunId(1)));
    assert!(session.apply_reset(RunId(1)));

    session.run_task("two").await;
    assert_eq!(session.pending_reset(), Some(RunId(2)));

    // 第一次运行的计时器重复到达：忽略
    assert!(!session.apply_reset(RunId(1)));
    assert_eq!(session.state().status, AgentStatus::Success);
    assert!(session.apply_reset(RunId(2)));
    assert!(!session.apply_reset(RunId(2)));
}

#[tokio::test]
async fn test_iterations_bounded_by_max_iterations() {
    let mut cfg = test_config();
    cfg.agent.max_iterations = 3;
    cfg.agent.reflection_passes = 9;
    let mut replies = vec![Ok(">>> MAESTRO_TRIGGER: x".to_string())];
    replies.extend((0..9).map(|_| Ok(REFLECTION_OK.to_string())));
    let llm = Arc::new(ScriptedLlmClient::new(replies));
    let (mut session, _resets) = build(cfg, llm.clone());

    session.run_task("x").await;
    assert_eq!(session.state().iterations, 3);
    assert_eq!(session.state().reflections.len(), 3);
    assert_eq!(llm.call_count(), 4);
}

#[tokio::test]
async fn test_stop_when_settled() {
    let mut cfg = test_config();
    cfg.agent.reflection_passes = 4;
    cfg.agent.stop_when_settled = true;
    let llm = Arc::new(ScriptedLlmClient::new([
        Ok(">>> MAESTRO_TRIGGER: x".to_string()),
        Ok(REFLECTION_OK.to_string()),
        Ok(REFLECTION_SETTLED.to_string()),
        Ok(REFLECTION_OK.to_string()),
    ]));
    let (mut session, _resets) = build(cfg, llm.clone());

    session.run_task("x").await;
    assert_eq!(session.state().reflections.len(), 2);
    assert_eq!(session.state().status, AgentStatus::Success);
    assert_eq!(llm.call_count(), 3);
}

#[tokio::test]
async fn test_log_capacity_holds_across_runs() {
    let mut cfg = test_config();
    cfg.app.log_capacity = 4;
    let llm = Arc::new(ScriptedLlmClient::new([
        Ok(">>> MAESTRO_TRIGGER: x".to_string()),
        Ok(REFLECTION_OK.to_string()),
        Ok(REFLECTION_OK.to_string()),
    ]));
    let (mut session, _resets) = build(cfg, llm);

    session.run_task("x").await;
    assert_eq!(session.logs().len(), 4);
    assert!(session.logs().iter().all(|e| !e.message.starts_with("Starting")));
    assert!(session.logs().get(0).unwrap().message.contains("completed"));
}

#[tokio::test]
async fn test_custom_retriever_feeds_reflection() {
    let hits = vec![VectorPoint::new("42", "learning", 0.61, "prefer tuned profiles")];
    let llm = Arc::new(ScriptedLlmClient::new([
        Ok(">>> MAESTRO_TRIGGER: x".to_string()),
        Ok(REFLECTION_OK.to_string()),
        Ok(REFLECTION_OK.to_string()),
    ]));
    let (mut session, _resets) = SessionBuilder::new(test_config())
        .with_llm(llm.clone())
        .with_retriever(Arc::new(StaticRetriever::new(hits.clone())))
        .build();

    session.run_task("x").await;
    assert_eq!(session.state().qdrant_hits, hits);
    assert!(llm.call(2).unwrap()[0].content.contains("prefer tuned profiles"));
}

#[tokio::test(start_paused = true)]
async fn test_orchestrator_resets_to_idle_after_delay() {
    let cfg = AppConfig::default();
    let llm = Arc::new(ScriptedLlmClient::new([
        Ok(">>> MAESTRO_TRIGGER: optimize kernel normalized".to_string()),
        Ok(REFLECTION_OK.to_string()),
        Ok(REFLECTION_OK.to_string()),
    ]));
    let (session, resets) = SessionBuilder::new(cfg)
        .with_llm(llm.clone())
        .with_retriever(Arc::new(MockRetriever::new(Duration::from_millis(1500))))
        .build();
    let (cmd_tx, mut state_rx, handle) = spawn_session(session, resets);

    cmd_tx.send(Command::Submit("optimize kernel".into())).unwrap();
    // 运行中再次提交：取出时状态非 IDLE，被忽略
    cmd_tx.send(Command::Submit("optimize kernel".into())).unwrap();

    let done = state_rx
        .wait_for(|s| s.agent.status == AgentStatus::Success)
        .await
        .unwrap()
        .clone();
    assert_eq!(done.agent.reflections.len(), 2);
    assert!(done.input_locked());

    let start = tokio::time::Instant::now();
    let idle = state_rx
        .wait_for(|s| s.agent.status == AgentStatus::Idle)
        .await
        .unwrap()
        .clone();
    assert!(start.elapsed() >= Duration::from_secs(5));
    assert!(!idle.input_locked());

    let submits = idle
        .logs
        .iter()
        .filter(|e| e.message.starts_with("Starting"))
        .count();
    assert_eq!(submits, 1);
    assert_eq!(llm.call_count(), 3);

    cmd_tx.send(Command::Quit).unwrap();
    handle.await.unwrap();
}

struct FailingRetriever;

#[async_trait::async_trait]
impl Retriever for FailingRetriever {
    async fn search(&self, _task: &str) -> Result<Vec<VectorPoint>, AgentError> {
        Err(AgentError::Retrieval("collection kb offline".into()))
    }
}

#[tokio::test]
async fn test_retrieval_failure_sets_error() {
    let llm = Arc::new(ScriptedLlmClient::new([Ok(
        ">>> MAESTRO_TRIGGER: tune".to_string(),
    )]));
    let (mut session, _resets) = SessionBuilder::new(test_config())
        .with_llm(llm.clone())
        .with_retriever(Arc::new(FailingRetriever))
        .build();

    let outcome = session.run_task("tune").await;
    assert!(matches!(outcome, RunOutcome::Failed(_)));
    assert_eq!(session.state().status, AgentStatus::Error);
    assert!(session.state().qdrant_hits.is_empty());
    assert!(session.logs().get(0).unwrap().message.contains("kb offline"));
    assert_eq!(llm.call_count(), 1);
}

/// 每次协作方被调用时记下会话当时的状态
#[derive(Default)]
struct StatusTrail {
    rx: Mutex<Option<watch::Receiver<SessionSnapshot>>>,
    seen: Mutex<Vec<AgentStatus>>,
}

impl StatusTrail {
    fn attach(&self, rx: watch::Receiver<SessionSnapshot>) {
        *self.rx.lock().unwrap() = Some(rx);
    }

    fn record(&self) {
        let status = self
            .rx
            .lock()
            .unwrap()
            .as_ref()
            .map(|rx| rx.borrow().agent.status);
        if let Some(status) = status {
            self.seen.lock().unwrap().push(status);
        }
    }

    fn seen(&self) -> Vec<AgentStatus> {
        self.seen.lock().unwrap().clone()
    }
}

struct TrailLlm {
    inner: ScriptedLlmClient,
    trail: Arc<StatusTrail>,
}

#[async_trait::async_trait]
impl LlmClient for TrailLlm {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.trail.record();
        self.inner.complete(messages).await
    }
}

struct TrailRetriever {
    inner: StaticRetriever,
    trail: Arc<StatusTrail>,
}

#[async_trait::async_trait]
impl Retriever for TrailRetriever {
    async fn search(&self, task: &str) -> Result<Vec<VectorPoint>, AgentError> {
        self.trail.record();
        self.inner.search(task).await
    }
}

fn build_with_trail(
    replies: Vec<Result<String, LlmError>>,
) -> (Session, ResetReceiver, Arc<StatusTrail>) {
    let trail = Arc::new(StatusTrail::default());
    let (session, resets) = SessionBuilder::new(test_config())
        .with_llm(Arc::new(TrailLlm {
            inner: ScriptedLlmClient::new(replies),
            trail: trail.clone(),
        }))
        .with_retriever(Arc::new(TrailRetriever {
            inner: StaticRetriever::new(MockRetriever::fixture()),
            trail: trail.clone(),
        }))
        .build();
    trail.attach(session.subscribe());
    (session, resets, trail)
}

#[tokio::test]
async fn test_trigger_path_walks_thinking_searching_reflecting() {
    let (mut session, _resets, trail) = build_with_trail(vec![
        Ok(">>> MAESTRO_TRIGGER: tune".to_string()),
        Ok(REFLECTION_OK.to_string()),
        Ok(REFLECTION_OK.to_string()),
    ]);

    session.run_task("tune").await;
    assert_eq!(
        trail.seen(),
        vec![
            AgentStatus::Thinking,
            AgentStatus::Searching,
            AgentStatus::Reflecting,
            AgentStatus::Reflecting
        ]
    );
    assert_eq!(session.state().status, AgentStatus::Success);
}

#[tokio::test]
async fn test_direct_path_never_searches_or_reflects() {
    let (mut session, _resets, trail) =
        build_with_trail(vec![Ok("Swappiness controls paging.".to_string())]);

    session.run_task("what is swappiness?").await;
    assert_eq!(trail.seen(), vec![AgentStatus::Thinking]);
    assert_eq!(session.state().status, AgentStatus::Success);
}

#[tokio::test]
async fn test_orchestrator_ignores_queued_submit_with_zero_reset_delay() {
    let llm = Arc::new(ScriptedLlmClient::new([
        Ok(">>> MAESTRO_TRIGGER: tune".to_string()),
        Ok(REFLECTION_OK.to_string()),
        Ok(REFLECTION_OK.to_string()),
    ]));
    let (session, resets) = build(test_config(), llm.clone());
    let (cmd_tx, mut state_rx, handle) = spawn_session(session, resets);

    // 两条提交在主循环开始前已排队；第二条必须先于复位被取出
    cmd_tx.send(Command::Submit("tune".into())).unwrap();
    cmd_tx.send(Command::Submit("tune again".into())).unwrap();

    state_rx
        .wait_for(|s| s.agent.status == AgentStatus::Idle && !s.logs.is_empty())
        .await
        .unwrap();
    cmd_tx.send(Command::Quit).unwrap();
    handle.await.unwrap();

    let last = state_rx.borrow().clone();
    assert_eq!(last.agent.status, AgentStatus::Idle);
    assert_eq!(last.agent.current_task.as_deref(), Some("tune"));
    let submits = last
        .logs
        .iter()
        .filter(|e| e.message.starts_with("Starting"))
        .count();
    assert_eq!(submits, 1);
    assert_eq!(llm.call_count(), 3);
}
