//! 编排主循环
//!
//! Submit -> Dispatch -> (Trigger: Search -> Reflect x N | Direct) -> SUCCESS / ERROR，
//! 结束后由复位计时器把状态带回 IDLE。
//!
//! 失败策略：
//! - Dispatch / 检索失败：终止本次运行，进入 ERROR，记一条 error 日志
//! - Reflection 失败：按 [agent].reflection_failure，degrade 时追加降级记录并以 warn 记录后继续；
//!   abort 时与 Dispatch 失败同样处理

use std::sync::Arc;

use crate::agent::DispatchOutcome;
use crate::config::ReflectionFailurePolicy;
use crate::core::{
    AgentError, AgentStatus, Collaborators, LogEntry, LogLevel, Reflection, RunOutcome, Session,
};

/// 提交一次任务；空白输入或已有任务在途时不做任何事
pub async fn run_task(session: &mut Session, input: &str) -> RunOutcome {
    let task = input.trim();
    if task.is_empty() {
        tracing::debug!("empty task ignored");
        return RunOutcome::Ignored;
    }
    if !session.state().status.accepts_input() {
        tracing::debug!(status = %session.state().status, "task ignored, session busy");
        return RunOutcome::Ignored;
    }

    let run_id = session.begin_run(
        task,
        LogEntry::new(LogLevel::Spark, format!("Starting Spark processing: \"{}\"", task)),
    );
    let collaborators = session.collaborators();

    match drive(session, &collaborators, task).await {
        Ok(()) => {
            session.finish_run(
                run_id,
                AgentStatus::Success,
                LogEntry::new(
                    LogLevel::Spark,
                    "Operation completed successfully. Flight plan generated.",
                ),
            );
            RunOutcome::Succeeded(run_id)
        }
        Err(e) => {
            session.finish_run(
                run_id,
                AgentStatus::Error,
                LogEntry::new(LogLevel::Error, format!("Critical error: {}", e)),
            );
            RunOutcome::Failed(run_id)
        }
    }
}

async fn drive(
    session: &mut Session,
    collaborators: &Arc<Collaborators>,
    task: &str,
) -> Result<(), AgentError> {
    let outcome = collaborators.dispatcher.dispatch(task).await?;

    let order = match outcome {
        DispatchOutcome::Direct(answer) => {
            session.log(LogEntry::new(
                LogLevel::Spark,
                format!("Direct answer: {}", answer),
            ));
            return Ok(());
        }
        DispatchOutcome::Trigger(order) => order,
    };

    session.log(LogEntry::new(
        LogLevel::Maestro,
        format!("Maestro trigger detected: {}", order),
    ));
    session.set_status(AgentStatus::Searching);

    let collections = collaborators.retriever.collections();
    tracing::info!("Querying collections ({})...", collections.join(", "));
    let hits = collaborators.retriever.search(task).await?;
    tracing::info!(hits = hits.len(), "retrieval complete");
    session.complete_search(hits);

    reflect(session, collaborators, task).await
}

async fn reflect(
    session: &mut Session,
    collaborators: &Arc<Collaborators>,
    task: &str,
) -> Result<(), AgentError> {
    let planned = session.agent_config().planned_iterations();
    let policy = session.agent_config().reflection_failure;
    let stop_when_settled = session.agent_config().stop_when_settled;
    let delay = session.timing().iteration_delay();

    for iteration in 1..=planned {
        tracing::info!(iteration, planned, "Reflection iteration {}...", iteration);
        let hits = session.state().qdrant_hits.clone();

        let settled = match collaborators.reflector.reflect(task, &hits, iteration).await {
            Ok(reflection) => {
                let settled = !reflection.should_continue;
                let entry = LogEntry::new(
                    LogLevel::Info,
                    format!("Reflection iteration {} complete", iteration),
                )
                .with_details(format!(
                    "{} (confidence {:.0}%)",
                    reflection.key_insight,
                    reflection.confidence * 100.0
                ));
                session.record_reflection(reflection, entry);
                settled
            }
            Err(e) => match policy {
                ReflectionFailurePolicy::Abort => return Err(e),
                ReflectionFailurePolicy::Degrade => {
                    let entry = LogEntry::new(
                        LogLevel::Warn,
                        format!("Reflection iteration {} complete (degraded)", iteration),
                    )
                    .with_details(e.to_string());
                    session.record_reflection(Reflection::degraded(iteration), entry);
                    false
                }
            },
        };

        if stop_when_settled && settled {
            tracing::info!(iteration, "reflection settled, stopping early");
            break;
        }
        if iteration < planned && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    Ok(())
}
