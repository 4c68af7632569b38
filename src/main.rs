//! Spark - 终端仪表盘
//!
//! 入口：初始化日志（写入 spark.log）、创建会话编排器与 TUI，并运行主循环。

use anyhow::Context;
use spark::{core::create_agent, observability, ui::run_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // TUI 占用终端，诊断日志写文件；RUST_LOG 可覆盖级别
    observability::init_with_file("spark.log").context("Failed to open spark.log")?;

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);

    // 创建 Agent：返回命令发送端、状态接收端
    let (cmd_tx, state_rx) = create_agent(config_path)
        .await
        .context("Failed to create agent")?;

    run_app(state_rx, cmd_tx).await.context("App run failed")?;

    Ok(())
}
