use crate::errors::LoggingError;
use crate::services::log_level::{self, LevelVar};
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use std::sync::Arc;
use tracing::subscriber::Interest;
use tracing::{Level, Metadata};
use tracing_subscriber::layer::{Context, Filter, Layer};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 覆盖日志级别的环境变量
pub const LOG_LEVEL_ENV: &str = "TYPEBIND_LOG";
/// 覆盖日志格式的环境变量
pub const LOG_FORMAT_ENV: &str = "TYPEBIND_LOG_FORMAT";

/// 日志环境配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingEnvironment {
    /// 开发环境
    Development,
    /// 测试环境
    Testing,
    /// 生产环境
    Production,
}

/// 日志格式配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 人类可读格式
    Pretty,
    /// JSON 格式
    Json,
    /// 紧凑格式
    Compact,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// 日志配置
///
/// 可以嵌入到应用自己的配置文件中反序列化，缺省字段取开发环境默认值。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 环境
    pub environment: LoggingEnvironment,
    /// 日志级别
    #[serde(deserialize_with = "deserialize_level")]
    pub level: Level,
    /// 输出格式
    pub format: LogFormat,
    /// 是否显示目标模块
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            environment: LoggingEnvironment::Development,
            level: Level::INFO,
            format: LogFormat::Pretty,
            show_target: true,
            show_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            environment: LoggingEnvironment::Development,
            level: Level::DEBUG,
            format: LogFormat::Pretty,
            show_target: true,
            show_thread_ids: true,
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        Self {
            environment: LoggingEnvironment::Production,
            level: Level::INFO,
            format: LogFormat::Json,
            show_target: false,
            show_thread_ids: false,
        }
    }

    /// 创建测试环境配置
    pub fn testing() -> Self {
        Self {
            environment: LoggingEnvironment::Testing,
            level: Level::ERROR,
            format: LogFormat::Compact,
            show_target: false,
            show_thread_ids: false,
        }
    }

    /// 以开发环境配置为基础，应用环境变量覆盖
    pub fn from_env() -> Result<Self, LoggingError> {
        Self::development().with_overrides(
            std::env::var(LOG_LEVEL_ENV).ok().as_deref(),
            std::env::var(LOG_FORMAT_ENV).ok().as_deref(),
        )
    }

    fn with_overrides(
        mut self,
        level: Option<&str>,
        format: Option<&str>,
    ) -> Result<Self, LoggingError> {
        if let Some(level) = level {
            self.level = parse_level(level)?;
        }
        if let Some(format) = format {
            self.format = format.parse()?;
        }
        Ok(self)
    }
}

fn parse_level(value: &str) -> Result<Level, LoggingError> {
    Level::from_str(value.trim()).map_err(|_| LoggingError::InvalidLevel(value.to_string()))
}

fn deserialize_level<'de, D>(deserializer: D) -> Result<Level, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_level(&value).map_err(serde::de::Error::custom)
}

/// 按 [`LevelVar`] 的当前值逐个事件过滤
///
/// 返回 `Interest::sometimes` 使级别变化对已注册的调用点同样生效。
struct LevelVarFilter {
    level: Arc<LevelVar>,
}

impl<S> Filter<S> for LevelVarFilter {
    fn enabled(&self, metadata: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        self.level.enabled(metadata.level())
    }

    fn callsite_enabled(&self, _metadata: &'static Metadata<'static>) -> Interest {
        Interest::sometimes()
    }
}

/// 初始化日志系统
///
/// 配置中的级别写入全局 `LogLevelService`，之后可通过
/// [`log_level::level_var`] 在运行时调整。
pub fn init_logging(config: LoggingConfig) -> Result<(), LoggingError> {
    let level = log_level::level_var();
    level.set(config.level);
    let filter = || LevelVarFilter {
        level: Arc::clone(&level),
    };
    let ansi = config.environment != LoggingEnvironment::Production;

    match config.format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_target(config.show_target)
                .with_thread_ids(config.show_thread_ids)
                .with_ansi(ansi)
                .with_filter(filter());

            tracing_subscriber::registry().with(fmt_layer).try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_target(config.show_target)
                .with_thread_ids(config.show_thread_ids)
                .with_filter(filter());

            tracing_subscriber::registry().with(fmt_layer).try_init()?;
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_target(config.show_target)
                .with_thread_ids(config.show_thread_ids)
                .with_ansi(ansi)
                .with_filter(filter());

            tracing_subscriber::registry().with(fmt_layer).try_init()?;
        }
    }

    tracing::info!(
        environment = ?config.environment,
        level = ?config.level,
        format = ?config.format,
        "Logging system initialized"
    );

    Ok(())
}
