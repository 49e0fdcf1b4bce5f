//! 配置注册表
//!
//! 每个声明类型保存最近一次绑定的配置实例，以及按注册顺序排列的回调列表。
//! 重新绑定会替换实例并同步通知全部回调；回调在写锁内执行，
//! 因此回调中不能再访问配置注册表，否则会死锁。

use crate::typed::{resolve, DeclaredType, Instance, Typed};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 配置变更回调
pub type ConfigurationCallback = Box<dyn Fn(&Instance) + Send + Sync>;

#[derive(Default)]
struct ConfigurationEntry {
    /// 只注册了回调、尚未绑定时为 `None`
    configuration: Option<Instance>,
    callbacks: Vec<ConfigurationCallback>,
}

/// 可重复绑定的配置
///
/// 对应的实现可以直接调用 [`Configuration::bind`] 把自己绑定到全局注册表。
pub trait Configuration: Typed {
    /// 通过 [`bind_configuration`] 绑定到当前声明类型
    fn bind(self: Arc<Self>)
    where
        Self: Sized,
    {
        bind_configuration(self);
    }
}

/// 配置注册表 - 最后一次绑定生效
#[derive(Default)]
pub struct ConfigurationRegistry {
    table: RwLock<HashMap<DeclaredType, ConfigurationEntry>>,
}

impl ConfigurationRegistry {
    /// 创建空的配置注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 绑定配置实例
    ///
    /// 类型已经绑定过时替换原实例，并在返回前按注册顺序调用全部回调。
    ///
    /// # Panics
    ///
    /// 实例报告的声明类型不是 `C` 时 panic。
    pub fn bind<C: ?Sized + Typed>(&self, configuration: Arc<C>) {
        let instance = Instance::new(configuration);
        let declared_type = instance.declared_type();

        let mut table = self.table.write();
        match table.entry(declared_type) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.configuration = Some(instance.clone());
                debug!(
                    declared_type = %declared_type,
                    observers = entry.callbacks.len(),
                    "Configuration rebound"
                );
                for callback in &entry.callbacks {
                    callback(&instance);
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(ConfigurationEntry {
                    configuration: Some(instance),
                    callbacks: Vec::new(),
                });
                debug!(declared_type = %declared_type, "Configuration bound");
            }
        }
    }

    /// 为声明类型注册回调
    ///
    /// 类型已经绑定时，回调会在返回前立即以当前实例调用一次。
    /// 回调无法注销。
    pub fn bind_to<F>(&self, declared_type: DeclaredType, callback: F)
    where
        F: Fn(&Instance) + Send + Sync + 'static,
    {
        let mut table = self.table.write();
        let entry = table.entry(declared_type).or_default();
        if let Some(current) = &entry.configuration {
            callback(current);
        }
        entry.callbacks.push(Box::new(callback));
        debug!(
            declared_type = %declared_type,
            observers = entry.callbacks.len(),
            "Configuration observer registered"
        );
    }

    /// 以具体类型注册回调，回调参数已收窄为 `C`
    pub fn observe<C, F>(&self, callback: F)
    where
        C: ?Sized + 'static,
        F: Fn(Arc<C>) + Send + Sync + 'static,
    {
        self.bind_to(DeclaredType::of::<C>(), move |instance| {
            callback(resolve::<C>(instance))
        });
    }

    /// 查找当前绑定的配置
    pub fn lookup<C: ?Sized + 'static>(&self) -> Option<Arc<C>> {
        let table = self.table.read();
        table
            .get(&DeclaredType::of::<C>())
            .and_then(|entry| entry.configuration.as_ref())
            .map(resolve::<C>)
    }

    /// 查找当前绑定的配置，未绑定时返回 `default`
    pub fn lookup_or_default<C: ?Sized + 'static>(&self, default: Arc<C>) -> Arc<C> {
        self.lookup::<C>().unwrap_or(default)
    }

    pub fn is_bound<C: ?Sized + 'static>(&self) -> bool {
        self.table
            .read()
            .get(&DeclaredType::of::<C>())
            .is_some_and(|entry| entry.configuration.is_some())
    }

    /// 已绑定的配置类型数量
    pub fn len(&self) -> usize {
        self.table
            .read()
            .values()
            .filter(|entry| entry.configuration.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ConfigurationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 回调内格式化时写锁仍被持有
        match self.table.try_read() {
            Some(table) => {
                let mut bound: Vec<&str> = table
                    .iter()
                    .filter(|(_, entry)| entry.configuration.is_some())
                    .map(|(declared_type, _)| declared_type.name())
                    .collect();
                bound.sort_unstable();
                f.debug_struct("ConfigurationRegistry")
                    .field("bound", &bound)
                    .finish()
            }
            None => f
                .debug_struct("ConfigurationRegistry")
                .field("bound", &"<locked>")
                .finish(),
        }
    }
}

lazy_static! {
    static ref GLOBAL_CONFIGURATIONS: ConfigurationRegistry = ConfigurationRegistry::new();
}

/// 获取全局配置注册表
pub fn global() -> &'static ConfigurationRegistry {
    &GLOBAL_CONFIGURATIONS
}

/// 在全局注册表中绑定配置，见 [`ConfigurationRegistry::bind`]
pub fn bind_configuration<C: ?Sized + Typed>(configuration: Arc<C>) {
    global().bind(configuration);
}

/// 在全局注册表中注册回调，见 [`ConfigurationRegistry::bind_to`]
pub fn bind_to_configuration<F>(declared_type: DeclaredType, callback: F)
where
    F: Fn(&Instance) + Send + Sync + 'static,
{
    global().bind_to(declared_type, callback);
}

pub fn observe_configuration<C, F>(callback: F)
where
    C: ?Sized + 'static,
    F: Fn(Arc<C>) + Send + Sync + 'static,
{
    global().observe::<C, F>(callback);
}

pub fn lookup_configuration<C: ?Sized + 'static>() -> Option<Arc<C>> {
    global().lookup::<C>()
}

pub fn lookup_configuration_or_default<C: ?Sized + 'static>(default: Arc<C>) -> Arc<C> {
    global().lookup_or_default(default)
}

pub fn is_configuration_bound<C: ?Sized + 'static>() -> bool {
    global().is_bound::<C>()
}
