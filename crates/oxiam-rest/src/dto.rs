use crate::error::RestError;
use std::any::Any;
use std::collections::HashMap;

/// A REST data-transfer object: the bind target of form processing.
///
/// Implementations are plain data structs registered in a [`DtoRegistry`].
/// Registration is what the helper's DTO capability check tests; an override
/// map pointing at an unregistered name is a configuration error, not a
/// silent fallback.
pub trait RestDto: Any + Send + Sync {
    /// Registered name of this DTO type.
    fn dto_class(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Constructors for registered DTO types, keyed by class name.
///
/// # Examples
///
/// ```rust
/// use oxiam_rest::dto::{DtoRegistry, RestDto};
/// use std::any::Any;
///
/// #[derive(Default)]
/// struct Ping;
///
/// impl RestDto for Ping {
///     fn dto_class(&self) -> &'static str {
///         "ping"
///     }
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
///     fn as_any_mut(&mut self) -> &mut dyn Any {
///         self
///     }
///     fn into_any(self: Box<Self>) -> Box<dyn Any> {
///         self
///     }
/// }
///
/// let mut dtos = DtoRegistry::new();
/// dtos.register::<Ping>();
/// assert!(dtos.contains("ping"));
/// assert!(!dtos.contains("pong"));
/// ```
pub struct DtoRegistry {
    classes: HashMap<&'static str, fn() -> Box<dyn RestDto>>,
}

impl DtoRegistry {
    pub fn new() -> Self {
        Self {
            classes: HashMap::new(),
        }
    }

    /// Register a DTO type under the name reported by its `dto_class()`.
    pub fn register<T: RestDto + Default>(&mut self) {
        fn construct<T: RestDto + Default>() -> Box<dyn RestDto> {
            Box::new(T::default())
        }
        let name = construct::<T>().dto_class();
        self.classes.insert(name, construct::<T>);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Fresh instance of a registered DTO type.
    pub fn new_instance(&self, name: &str) -> Option<Box<dyn RestDto>> {
        self.classes.get(name).map(|construct| construct())
    }

    pub fn class_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.classes.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DtoRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Recover the concrete DTO type after form processing.
pub fn downcast_dto<T: RestDto>(data: Box<dyn RestDto>) -> Result<T, RestError> {
    let class = data.dto_class();
    data.into_any().downcast::<T>().map(|boxed| *boxed).map_err(|_| {
        RestError::Configuration(format!(
            "DTO class '{class}' does not match the requested concrete type"
        ))
    })
}
