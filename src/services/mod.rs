//! 内置服务
//!
//! 通过全局服务注册表绑定和查找的示例服务：
//! - `echo`: 类 `print!` 的标准输出 / 标准错误回显
//! - `log_level`: 运行时可调整的日志级别

pub mod echo;
pub mod log_level;

pub use echo::{default_echo_service, EchoService};
pub use log_level::{LevelVar, LogLevelService};
