//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SPARK__*` 覆盖（双下划线表示嵌套，如 `SPARK__LLM__PROVIDER=mock`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub timing: TimingSection,
    #[serde(default)]
    pub llm: LlmSection,
}

/// [app] 段：日志缓冲容量
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    /// 日志面板最多保留的条数（最新在前，超出截尾）
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            log_capacity: default_log_capacity(),
        }
    }
}

fn default_log_capacity() -> usize {
    50
}

/// Reflection 调用失败时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionFailurePolicy {
    /// 追加一条降级 Reflection（was_productive=false）并以 warn 级别记录，循环继续
    #[default]
    Degrade,
    /// 与 Dispatch 失败一致：终止本次运行，进入 ERROR
    Abort,
}

/// [agent] 段：反思迭代上限与失败策略
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    /// 迭代硬上限（iterations 永不超过此值）
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// 每次运行计划的反思轮数，实际轮数为 min(reflection_passes, max_iterations)
    #[serde(default = "default_reflection_passes")]
    pub reflection_passes: usize,
    #[serde(default)]
    pub reflection_failure: ReflectionFailurePolicy,
    /// 为 true 时，某轮 Reflection 给出 should_continue=false 即提前结束
    #[serde(default)]
    pub stop_when_settled: bool,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            reflection_passes: default_reflection_passes(),
            reflection_failure: ReflectionFailurePolicy::default(),
            stop_when_settled: false,
        }
    }
}

impl AgentSection {
    /// 本次运行实际执行的反思轮数
    pub fn planned_iterations(&self) -> usize {
        self.reflection_passes.min(self.max_iterations)
    }
}

fn default_max_iterations() -> usize {
    5
}

fn default_reflection_passes() -> usize {
    2
}

/// [timing] 段：人为延迟（毫秒）
#[derive(Debug, Clone, Deserialize)]
pub struct TimingSection {
    /// 模拟检索的等待时间
    #[serde(default = "default_search_delay_ms")]
    pub search_delay_ms: u64,
    /// 两轮反思之间的间隔
    #[serde(default = "default_iteration_delay_ms")]
    pub iteration_delay_ms: u64,
    /// SUCCESS / ERROR 之后自动回到 IDLE 的延迟
    #[serde(default = "default_reset_delay_ms")]
    pub reset_delay_ms: u64,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            search_delay_ms: default_search_delay_ms(),
            iteration_delay_ms: default_iteration_delay_ms(),
            reset_delay_ms: default_reset_delay_ms(),
        }
    }
}

impl TimingSection {
    /// 所有延迟为零（测试与脚本场景）
    pub fn instant() -> Self {
        Self {
            search_delay_ms: 0,
            iteration_delay_ms: 0,
            reset_delay_ms: 0,
        }
    }

    pub fn search_delay(&self) -> Duration {
        Duration::from_millis(self.search_delay_ms)
    }

    pub fn iteration_delay(&self) -> Duration {
        Duration::from_millis(self.iteration_delay_ms)
    }

    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }
}

fn default_search_delay_ms() -> u64 {
    1500
}

fn default_iteration_delay_ms() -> u64 {
    1000
}

fn default_reset_delay_ms() -> u64 {
    5000
}

/// [llm] 段：后端选择
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：gemini / openai / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_model() -> String {
    "gemini-3-pro-preview".to_string()
}

/// 从 config 目录加载配置，环境变量 SPARK__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SPARK__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SPARK")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

/// 加载失败时回退到默认配置（记录 warn，不中断启动）
pub fn load_config_or_default(config_path: Option<PathBuf>) -> AppConfig {
    load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    })
}
