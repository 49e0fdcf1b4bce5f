//! 服务注册表
//!
//! 每个声明类型最多绑定一次，之后不可修改。重复绑定返回
//! [`RegistryError::AlreadyBound`]，原有绑定保持不变。

use crate::errors::RegistryError;
use crate::typed::{resolve, DeclaredType, Instance, Typed};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// 服务注册表 - 第一次绑定生效
#[derive(Default)]
pub struct ServiceRegistry {
    table: RwLock<HashMap<DeclaredType, Instance>>,
}

impl ServiceRegistry {
    /// 创建空的服务注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 绑定服务实例
    ///
    /// 声明类型已有绑定时返回 [`RegistryError::AlreadyBound`]，不做任何修改。
    ///
    /// # Panics
    ///
    /// 实例报告的声明类型不是 `S` 时 panic。
    pub fn bind<S: ?Sized + Typed>(&self, service: Arc<S>) -> Result<(), RegistryError> {
        let instance = Instance::new(service);
        let declared_type = instance.declared_type();

        let mut table = self.table.write();
        match table.entry(declared_type) {
            Entry::Occupied(_) => {
                warn!(declared_type = %declared_type, "Service already bound, keeping existing binding");
                Err(RegistryError::AlreadyBound(declared_type))
            }
            Entry::Vacant(vacant) => {
                vacant.insert(instance);
                debug!(declared_type = %declared_type, "Service bound");
                Ok(())
            }
        }
    }

    /// 查找已绑定的服务
    pub fn lookup<S: ?Sized + 'static>(&self) -> Option<Arc<S>> {
        self.table
            .read()
            .get(&DeclaredType::of::<S>())
            .map(resolve::<S>)
    }

    /// 查找已绑定的服务，未绑定时返回 `default`
    pub fn lookup_or_default<S: ?Sized + 'static>(&self, default: Arc<S>) -> Arc<S> {
        self.lookup::<S>().unwrap_or(default)
    }

    pub fn is_bound<S: ?Sized + 'static>(&self) -> bool {
        self.table.read().contains_key(&DeclaredType::of::<S>())
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bound: Vec<&str> = self.table.read().keys().map(DeclaredType::name).collect();
        bound.sort_unstable();
        f.debug_struct("ServiceRegistry")
            .field("bound", &bound)
            .finish()
    }
}

lazy_static! {
    static ref GLOBAL_SERVICES: ServiceRegistry = ServiceRegistry::new();
}

/// 获取全局服务注册表
pub fn global() -> &'static ServiceRegistry {
    &GLOBAL_SERVICES
}

/// 在全局注册表中绑定服务，见 [`ServiceRegistry::bind`]
pub fn bind_service<S: ?Sized + Typed>(service: Arc<S>) -> Result<(), RegistryError> {
    global().bind(service)
}

pub fn lookup_service<S: ?Sized + 'static>() -> Option<Arc<S>> {
    global().lookup::<S>()
}

pub fn lookup_service_or_default<S: ?Sized + 'static>(default: Arc<S>) -> Arc<S> {
    global().lookup_or_default(default)
}

pub fn is_service_bound<S: ?Sized + 'static>() -> bool {
    global().is_bound::<S>()
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Counter: Typed {
        fn count(&self) -> u32;
    }

    struct FixedCounter(u32);

    impl Typed for FixedCounter {
        fn declared_type(&self) -> DeclaredType {
            DeclaredType::of::<dyn Counter>()
        }
    }

    impl Counter for FixedCounter {
        fn count(&self) -> u32 {
            self.0
        }
    }

    fn counter(value: u32) -> Arc<dyn Counter> {
        Arc::new(FixedCounter(value))
    }

    #[test]
    fn test_lookup_unbound() {
        let registry = ServiceRegistry::new();

        assert!(registry.lookup::<dyn Counter>().is_none());
        assert!(!registry.is_bound::<dyn Counter>());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_bind_and_lookup() {
        let registry = ServiceRegistry::new();

        registry.bind(counter(5)).unwrap();

        let service = registry.lookup::<dyn Counter>().unwrap();
        assert_eq!(service.count(), 5);
        assert!(registry.is_bound::<dyn Counter>());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_double_bind_keeps_first() {
        let registry = ServiceRegistry::new();

        assert!(registry.bind(counter(1)).is_ok());
        let err = registry.bind(counter(2)).unwrap_err();

        assert!(err.is_already_bound());
        assert_eq!(err.declared_type(), DeclaredType::of::<dyn Counter>());
        assert_eq!(registry.lookup::<dyn Counter>().unwrap().count(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_or_default() {
        let registry = ServiceRegistry::new();
        let default = counter(0);

        let service = registry.lookup_or_default(default.clone());
        assert!(Arc::ptr_eq(&default, &service));

        registry.bind(counter(42)).unwrap();
        assert_eq!(registry.lookup_or_default(default).count(), 42);
    }

    #[test]
    #[should_panic(expected = "type mismatch")]
    fn test_bind_as_concrete_type_panics() {
        let registry = ServiceRegistry::new();
        // FixedCounter 声明的是 dyn Counter
        let _ = registry.bind(Arc::new(FixedCounter(3)));
    }

    #[test]
    fn test_registries_are_isolated() {
        let first = ServiceRegistry::new();
        let second = ServiceRegistry::new();

        first.bind(counter(1)).unwrap();

        assert!(first.is_bound::<dyn Counter>());
        assert!(second.lookup::<dyn Counter>().is_none());
        assert!(second.bind(counter(2)).is_ok());
    }

    #[test]
    fn test_debug_lists_bound_types() {
        let registry = ServiceRegistry::new();
        registry.bind(counter(1)).unwrap();

        assert!(format!("{:?}", registry).contains("Counter"));
    }
}
