//! 进程级、按类型索引的绑定注册表
//!
//! 两种绑定方式：
//! - 配置：可重复绑定，最后一次生效，并通知已注册的回调
//! - 服务：只能绑定一次，重复绑定返回 [`RegistryError::AlreadyBound`]

pub mod configuration;
pub mod errors;
pub mod logging;
pub mod service;
pub mod services;
pub mod typed;

// Re-export commonly used items for convenience
pub use configuration::{
    bind_configuration, bind_to_configuration, is_configuration_bound, lookup_configuration,
    lookup_configuration_or_default, observe_configuration, Configuration, ConfigurationRegistry,
};
pub use errors::{LoggingError, RegistryError};
pub use service::{
    bind_service, is_service_bound, lookup_service, lookup_service_or_default, ServiceRegistry,
};
pub use typed::{resolve, DeclaredType, Instance, Typed};
