use crate::service::lookup_service_or_default;
use crate::typed::{DeclaredType, Typed};
use lazy_static::lazy_static;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

/// 以 `print!` 风格向类标准输出 / 标准错误回显消息
pub trait EchoService: Typed {
    /// 输出到类标准输出
    fn out(&self, args: fmt::Arguments<'_>);
    /// 输出到类标准错误
    fn err(&self, args: fmt::Arguments<'_>);
}

/// 直接写入进程 stdout / stderr 的默认实现
#[derive(Debug, Default)]
struct StdioEchoService;

impl Typed for StdioEchoService {
    fn declared_type(&self) -> DeclaredType {
        DeclaredType::of::<dyn EchoService>()
    }
}

impl EchoService for StdioEchoService {
    fn out(&self, args: fmt::Arguments<'_>) {
        let _ = io::stdout().lock().write_fmt(args);
    }

    fn err(&self, args: fmt::Arguments<'_>) {
        let _ = io::stderr().lock().write_fmt(args);
    }
}

lazy_static! {
    static ref DEFAULT_ECHO_SERVICE: Arc<dyn EchoService> = Arc::new(StdioEchoService);
}

/// 获取默认的 [`EchoService`]
pub fn default_echo_service() -> Arc<dyn EchoService> {
    Arc::clone(&DEFAULT_ECHO_SERVICE)
}

/// 通过当前绑定的 [`EchoService`] 输出，未绑定时使用默认实现
pub fn out(args: fmt::Arguments<'_>) {
    lookup_service_or_default(default_echo_service()).out(args);
}

/// 见 [`out`]
pub fn err(args: fmt::Arguments<'_>) {
    lookup_service_or_default(default_echo_service()).err(args);
}

/// `print!` 风格的 [`out`] 简写
#[macro_export]
macro_rules! echo_out {
    ($($arg:tt)*) => {
        $crate::services::echo::out(format_args!($($arg)*))
    };
}

/// `eprint!` 风格的 [`err`] 简写
#[macro_export]
macro_rules! echo_err {
    ($($arg:tt)*) => {
        $crate::services::echo::err(format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceRegistry;

    #[test]
    fn test_default_echo_service() {
        // 单元测试进程里没有绑定 EchoService
        let default = default_echo_service();
        let service = lookup_service_or_default(default.clone());
        assert!(Arc::ptr_eq(&default, &service));
        assert_eq!(service.declared_type(), DeclaredType::of::<dyn EchoService>());
    }

    #[test]
    fn test_default_binds_as_trait_object() {
        let registry = ServiceRegistry::new();
        registry.bind(default_echo_service()).unwrap();
        assert!(registry.is_bound::<dyn EchoService>());
    }

    #[test]
    fn test_echoing() {
        out(format_args!("out message\n"));
        err(format_args!("err message\n"));
        crate::echo_out!("formatted {}\n", 1);
        crate::echo_err!("formatted {}\n", 2);
    }
}
