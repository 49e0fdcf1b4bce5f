//! 类型标识与类型解析
//!
//! 每个可绑定的实例都通过 [`Typed`] 报告自己的声明类型。注册表以声明类型为键
//! 保存类型擦除后的 [`Instance`]，查找时再通过 [`resolve`] 收窄回调用方请求的类型。
//!
//! 声明类型可以是实例的具体类型，也可以是它实现的 trait 对象类型
//! （例如 `dyn EchoService`），两者不必相同。

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 声明类型标识
///
/// 只按 [`TypeId`] 比较和哈希，类型名仅用于日志与错误信息。
#[derive(Clone, Copy)]
pub struct DeclaredType {
    id: TypeId,
    name: &'static str,
}

impl DeclaredType {
    /// 获取类型 `T` 的声明类型标识，`T` 可以是 trait 对象
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 检查当前类型能否赋值给 `target`
    ///
    /// Rust 没有运行时子类型关系，可赋值即为同一类型。
    pub fn is_assignable_to(&self, target: &DeclaredType) -> bool {
        self.id == target.id
    }
}

impl PartialEq for DeclaredType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DeclaredType {}

impl Hash for DeclaredType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeclaredType({})", self.name)
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 可动态绑定的实例
///
/// 默认实现返回实现者自身的类型。以 trait 对象类型绑定的实现必须覆盖
/// `declared_type`，返回对应的 `dyn Trait` 类型。
pub trait Typed: Send + Sync + 'static {
    /// 获取该实例所代表的类型
    fn declared_type(&self) -> DeclaredType {
        DeclaredType::of::<Self>()
    }
}

/// 类型擦除后的已绑定实例
///
/// 内部保存 `Arc<T>`，`T` 即声明类型。克隆只增加引用计数。
#[derive(Clone)]
pub struct Instance {
    declared_type: DeclaredType,
    value: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    /// 以静态类型 `T` 擦除实例
    ///
    /// # Panics
    ///
    /// 实例报告的声明类型不是 `T` 时 panic，这属于调用方的编程错误。
    pub fn new<T: ?Sized + Typed>(value: Arc<T>) -> Self {
        let declared_type = value.declared_type();
        ensure_assignable(DeclaredType::of::<T>(), declared_type);
        Self {
            declared_type,
            value: Arc::new(value),
        }
    }

    pub fn declared_type(&self) -> DeclaredType {
        self.declared_type
    }

    /// 尝试收窄为 `T`，类型不匹配时返回 `None`
    pub fn try_resolve<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
        if !self.declared_type.is_assignable_to(&DeclaredType::of::<T>()) {
            return None;
        }
        self.value.downcast_ref::<Arc<T>>().cloned()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("declared_type", &self.declared_type)
            .finish_non_exhaustive()
    }
}

/// 将已绑定实例收窄为其声明类型 `T`
///
/// # Panics
///
/// 声明类型不能赋值给 `T` 时 panic。正确使用注册表时不会发生。
pub fn resolve<T: ?Sized + 'static>(instance: &Instance) -> Arc<T> {
    let requested = DeclaredType::of::<T>();
    ensure_assignable(instance.declared_type, requested);
    match instance.value.downcast_ref::<Arc<T>>() {
        Some(value) => Arc::clone(value),
        None => type_mismatch(instance.declared_type, requested),
    }
}

pub(crate) fn ensure_assignable(from: DeclaredType, to: DeclaredType) {
    if !from.is_assignable_to(&to) {
        type_mismatch(from, to);
    }
}

#[cold]
fn type_mismatch(from: DeclaredType, to: DeclaredType) -> ! {
    tracing::error!(from = %from, to = %to, "Type mismatch in registry resolution");
    panic!("type mismatch {} not assignable to {}", from, to);
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Typed {
        fn greet(&self) -> String;
    }

    #[derive(Debug, PartialEq)]
    struct PlainValue {
        value: u32,
    }

    impl Typed for PlainValue {}

    struct EnglishGreeter;

    impl Typed for EnglishGreeter {
        fn declared_type(&self) -> DeclaredType {
            DeclaredType::of::<dyn Greeter>()
        }
    }

    impl Greeter for EnglishGreeter {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    /// 声明了与自身不符的类型
    struct Liar;

    impl Typed for Liar {
        fn declared_type(&self) -> DeclaredType {
            DeclaredType::of::<PlainValue>()
        }
    }

    #[test]
    fn test_declared_type_identity() {
        assert_eq!(DeclaredType::of::<PlainValue>(), DeclaredType::of::<PlainValue>());
        assert_ne!(DeclaredType::of::<PlainValue>(), DeclaredType::of::<dyn Greeter>());
        assert!(DeclaredType::of::<PlainValue>().name().ends_with("PlainValue"));
        assert_eq!(
            PlainValue { value: 1 }.declared_type(),
            DeclaredType::of::<PlainValue>()
        );
    }

    #[test]
    fn test_resolve_concrete_type() {
        let value = Arc::new(PlainValue { value: 7 });
        let instance = Instance::new(value.clone());

        let resolved = resolve::<PlainValue>(&instance);
        assert!(Arc::ptr_eq(&value, &resolved));
    }

    #[test]
    fn test_resolve_trait_object() {
        let greeter: Arc<dyn Greeter> = Arc::new(EnglishGreeter);
        let instance = Instance::new(greeter);

        assert_eq!(instance.declared_type(), DeclaredType::of::<dyn Greeter>());
        assert_eq!(resolve::<dyn Greeter>(&instance).greet(), "hello");
    }

    #[test]
    fn test_try_resolve_mismatch() {
        let instance = Instance::new(Arc::new(PlainValue { value: 3 }));

        assert!(instance.try_resolve::<dyn Greeter>().is_none());
        assert!(instance.try_resolve::<String>().is_none());
        assert_eq!(
            instance.try_resolve::<PlainValue>().map(|v| v.value),
            Some(3)
        );
    }

    #[test]
    #[should_panic(expected = "not assignable to")]
    fn test_resolve_unrelated_type_panics() {
        let instance = Instance::new(Arc::new(PlainValue { value: 1 }));
        let _ = resolve::<dyn Greeter>(&instance);
    }

    #[test]
    #[should_panic(expected = "type mismatch")]
    fn test_concrete_greeter_bound_as_itself_panics() {
        // EnglishGreeter 声明的是 dyn Greeter，不能以具体类型擦除
        let _ = Instance::new(Arc::new(EnglishGreeter));
    }

    #[test]
    #[should_panic(expected = "type mismatch")]
    fn test_lying_declared_type_panics() {
        let _ = Instance::new(Arc::new(Liar));
    }
}
