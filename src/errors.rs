use crate::typed::DeclaredType;
use thiserror::Error;

/// 注册表的可恢复错误
///
/// 类型不匹配属于编程错误，直接 panic，不在此列。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("service already bound: {0}")]
    AlreadyBound(DeclaredType),
}

impl RegistryError {
    /// 是否为重复绑定服务
    pub fn is_already_bound(&self) -> bool {
        matches!(self, RegistryError::AlreadyBound(_))
    }

    /// 冲突的声明类型
    pub fn declared_type(&self) -> DeclaredType {
        match self {
            RegistryError::AlreadyBound(declared_type) => *declared_type,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to install global tracing subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
    #[error("Invalid log level '{0}'")]
    InvalidLevel(String),
    #[error("Invalid log format '{0}'")]
    InvalidFormat(String),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, RegistryError>;
