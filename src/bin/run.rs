//! spark-run：无界面单次运行
//!
//! 用法：spark-run "<指令>" [config.toml]
//! 执行一次 Dispatch -> Search -> Reflect，按时间顺序打印日志，并以 JSON 输出最终状态。
//! 运行失败时退出码为 1。

use anyhow::{bail, Context};
use spark::core::{create_session_builder, RunOutcome};
use spark::observability;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let mut args = std::env::args().skip(1);
    let Some(task) = args.next() else {
        bail!("usage: spark-run \"<task>\" [config.toml]");
    };
    let config_path = args.next().map(std::path::PathBuf::from);

    let (mut session, _resets) = create_session_builder(config_path).build();
    let outcome = session.run_task(&task).await;

    // 日志缓冲最新在前，打印时反转为时间顺序
    let entries: Vec<_> = session.logs().iter().collect();
    for entry in entries.into_iter().rev() {
        println!(
            "[{}] {:<8} {}",
            entry.timestamp,
            entry.level.as_str().to_uppercase(),
            entry.message
        );
        if let Some(details) = &entry.details {
            println!("           │ {}", details);
        }
    }

    let state = serde_json::to_string_pretty(session.state()).context("serialize state")?;
    println!("{}", state);

    match outcome {
        RunOutcome::Succeeded(_) => Ok(()),
        RunOutcome::Failed(run_id) => bail!("{} failed", run_id),
        RunOutcome::Ignored => bail!("empty task"),
    }
}
