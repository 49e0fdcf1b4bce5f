use crate::service::{bind_service, lookup_service};
use crate::typed::{DeclaredType, Typed};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing::{debug, Level};

/// 运行时可调整的日志级别
#[derive(Debug)]
pub struct LevelVar {
    level: RwLock<LevelFilter>,
}

impl LevelVar {
    pub fn new(level: LevelFilter) -> Self {
        Self {
            level: RwLock::new(level),
        }
    }

    /// 当前级别
    pub fn level(&self) -> LevelFilter {
        *self.level.read()
    }

    pub fn set(&self, level: impl Into<LevelFilter>) {
        *self.level.write() = level.into();
    }

    /// 给定级别的事件在当前设置下是否启用
    pub fn enabled(&self, level: &Level) -> bool {
        *level <= self.level()
    }
}

impl Default for LevelVar {
    fn default() -> Self {
        Self::new(LevelFilter::INFO)
    }
}

/// 访问控制当前日志级别的唯一 [`LevelVar`]
pub trait LogLevelService: Typed {
    fn level_var(&self) -> Arc<LevelVar>;
}

#[derive(Debug, Default)]
struct DefaultLogLevelService {
    level: Arc<LevelVar>,
}

impl Typed for DefaultLogLevelService {
    fn declared_type(&self) -> DeclaredType {
        DeclaredType::of::<dyn LogLevelService>()
    }
}

impl LogLevelService for DefaultLogLevelService {
    fn level_var(&self) -> Arc<LevelVar> {
        Arc::clone(&self.level)
    }
}

/// 绑定默认的 [`LogLevelService`]
///
/// 已有其他绑定时保留原绑定，返回当前生效的服务。
pub fn install() -> Arc<dyn LogLevelService> {
    let candidate: Arc<dyn LogLevelService> = Arc::new(DefaultLogLevelService::default());
    if let Err(err) = bind_service(candidate.clone()) {
        debug!(error = %err, "Log level service already bound, using existing binding");
    }
    lookup_service::<dyn LogLevelService>().unwrap_or(candidate)
}

/// 获取当前生效的 [`LogLevelService`]，必要时先绑定默认实现
pub fn service() -> Arc<dyn LogLevelService> {
    match lookup_service::<dyn LogLevelService>() {
        Some(service) => service,
        None => install(),
    }
}

/// [`LogLevelService::level_var`] 的简写
pub fn level_var() -> Arc<LevelVar> {
    service().level_var()
}
