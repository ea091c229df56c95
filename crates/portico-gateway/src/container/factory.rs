//! Factory registry: type code → parse/validate/build function.
//!
//! Every plugin kind registers a closure that binds the descriptor's flat
//! parameter map onto its own typed configuration struct.  Binding and
//! validation failures surface as [`BuildError`] at this single boundary;
//! callers that know the owning descriptor wrap them into a
//! `GatewayError::Configuration` tagged with (tenant, code, kind).

use portico_kernel::gateway::PluginParams;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use thiserror::Error;

/// Construction failure for one plugin instance.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The type code is not registered.
    #[error("unknown plugin kind '{0}'")]
    UnknownKind(String),

    /// The parameter map did not bind onto the kind's configuration, or a
    /// validation rule rejected it.
    #[error("{0}")]
    InvalidParams(String),
}

impl BuildError {
    pub fn invalid(message: impl Into<String>) -> Self {
        BuildError::InvalidParams(message.into())
    }
}

/// Deserialize a flat parameter map into a typed configuration struct.
pub fn bind_params<C: DeserializeOwned>(params: &PluginParams) -> Result<C, BuildError> {
    serde_json::from_value(serde_json::Value::Object(params.clone()))
        .map_err(|e| BuildError::InvalidParams(e.to_string()))
}

type Builder<T> = Box<dyn Fn(&PluginParams) -> Result<Box<T>, BuildError> + Send + Sync>;

/// Registry mapping type codes to builder functions for one plugin family
/// (filters, predicates, …).
pub struct FactoryRegistry<T: ?Sized> {
    builders: HashMap<&'static str, Builder<T>>,
}

impl<T: ?Sized> FactoryRegistry<T> {
    pub fn new() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Register a builder for `kind`.  Later registrations replace earlier
    /// ones, which lets deployments override a built-in kind.
    pub fn register(
        &mut self,
        kind: &'static str,
        builder: impl Fn(&PluginParams) -> Result<Box<T>, BuildError> + Send + Sync + 'static,
    ) {
        self.builders.insert(kind, Box::new(builder));
    }

    /// Build an instance of `kind` from `params`.
    pub fn build(&self, kind: &str, params: &PluginParams) -> Result<Box<T>, BuildError> {
        let builder = self
            .builders
            .get(kind)
            .ok_or_else(|| BuildError::UnknownKind(kind.to_string()))?;
        builder(params)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.builders.keys().copied()
    }
}

impl<T: ?Sized> Default for FactoryRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    trait Greeter: Send + Sync + std::fmt::Debug {
        fn greet(&self) -> String;
    }

    #[derive(Deserialize, Debug)]
    struct HelloConfig {
        name: String,
    }

    #[derive(Debug)]
    struct Hello(HelloConfig);

    impl Greeter for Hello {
        fn greet(&self) -> String {
            format!("hello {}", self.0.name)
        }
    }

    fn params(value: serde_json::Value) -> PluginParams {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn builds_registered_kinds() {
        let mut registry: FactoryRegistry<dyn Greeter> = FactoryRegistry::new();
        registry.register("hello", |p| {
            let config: HelloConfig = bind_params(p)?;
            Ok(Box::new(Hello(config)))
        });

        let greeter = registry
            .build("hello", &params(serde_json::json!({ "name": "world" })))
            .unwrap();
        assert_eq!(greeter.greet(), "hello world");
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let registry: FactoryRegistry<dyn Greeter> = FactoryRegistry::new();
        assert!(matches!(
            registry.build("ghost", &PluginParams::new()),
            Err(BuildError::UnknownKind(_))
        ));
    }

    #[test]
    fn binding_failure_reports_the_field() {
        let mut registry: FactoryRegistry<dyn Greeter> = FactoryRegistry::new();
        registry.register("hello", |p| {
            let config: HelloConfig = bind_params(p)?;
            Ok(Box::new(Hello(config)))
        });

        let err = registry.build("hello", &PluginParams::new()).unwrap_err();
        assert!(err.to_string().contains("name"));
    }
}
