//! The two-stage mapper contract and control registration.
//!
//! A control is one detail mapper plus one display mapper. The host invokes
//! them in order: `detail(occurrence, context)`, then splices the result into
//! the occurrence's `detail`, then `display(occurrence, attestation, context)`.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::MapperResult;
use crate::shape::Shape;

/// Positional parameters of a detail mapper, in order.
pub const DETAIL_PARAMETERS: [&str; 2] = ["occurrence", "context"];

/// Positional parameters of a display mapper, in order.
pub const DISPLAY_PARAMETERS: [&str; 3] = ["occurrence", "attestation", "context"];

/// First stage: normalize raw occurrence data into a structured detail
/// mapping.
///
/// Implementations must be pure and deterministic. Null or malformed inputs
/// should degrade to defaults; only a wholly-null occurrence may return a
/// narrow [`MapperError`](crate::MapperError).
pub trait DetailMapper: Send + Sync {
    /// Declared parameter names, in positional order.
    fn parameters(&self) -> &[&'static str] {
        &DETAIL_PARAMETERS
    }

    fn map(&self, occurrence: &Value, context: &Value) -> MapperResult<Value>;
}

/// Second stage: render mapped detail plus the attestation outcome.
///
/// The output must be a mapping with non-empty `description` and `tag`.
pub trait DisplayMapper: Send + Sync {
    /// Declared parameter names, in positional order.
    fn parameters(&self) -> &[&'static str] {
        &DISPLAY_PARAMETERS
    }

    fn map(&self, occurrence: &Value, attestation: &Value, context: &Value) -> MapperResult<Value>;
}

type DetailFn = dyn Fn(&Value, &Value) -> MapperResult<Value> + Send + Sync;
type DisplayFn = dyn Fn(&Value, &Value, &Value) -> MapperResult<Value> + Send + Sync;

/// Detail mapper backed by a closure.
pub struct FnDetailMapper {
    parameters: Vec<&'static str>,
    func: Box<DetailFn>,
}

impl FnDetailMapper {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Value, &Value) -> MapperResult<Value> + Send + Sync + 'static,
    {
        Self::with_parameters(DETAIL_PARAMETERS.to_vec(), func)
    }

    /// Closure mapper with an explicitly declared parameter list.
    pub fn with_parameters<F>(parameters: Vec<&'static str>, func: F) -> Self
    where
        F: Fn(&Value, &Value) -> MapperResult<Value> + Send + Sync + 'static,
    {
        Self {
            parameters,
            func: Box::new(func),
        }
    }
}

impl DetailMapper for FnDetailMapper {
    fn parameters(&self) -> &[&'static str] {
        &self.parameters
    }

    fn map(&self, occurrence: &Value, context: &Value) -> MapperResult<Value> {
        (self.func)(occurrence, context)
    }
}

/// Display mapper backed by a closure.
pub struct FnDisplayMapper {
    parameters: Vec<&'static str>,
    func: Box<DisplayFn>,
}

impl FnDisplayMapper {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Value, &Value, &Value) -> MapperResult<Value> + Send + Sync + 'static,
    {
        Self::with_parameters(DISPLAY_PARAMETERS.to_vec(), func)
    }

    pub fn with_parameters<F>(parameters: Vec<&'static str>, func: F) -> Self
    where
        F: Fn(&Value, &Value, &Value) -> MapperResult<Value> + Send + Sync + 'static,
    {
        Self {
            parameters,
            func: Box::new(func),
        }
    }
}

impl DisplayMapper for FnDisplayMapper {
    fn parameters(&self) -> &[&'static str] {
        &self.parameters
    }

    fn map(&self, occurrence: &Value, attestation: &Value, context: &Value) -> MapperResult<Value> {
        (self.func)(occurrence, attestation, context)
    }
}

/// A registered control: a name, its mappers, and the detail shape it
/// declares.
///
/// Either mapper may be absent while a control is being authored; the harness
/// skips every check that depends on a missing stage.
#[derive(Clone)]
pub struct Control {
    name: String,
    detail: Option<Arc<dyn DetailMapper>>,
    display: Option<Arc<dyn DisplayMapper>>,
    detail_shape: Shape,
}

impl Control {
    pub fn builder(name: impl Into<String>) -> ControlBuilder {
        ControlBuilder {
            name: name.into(),
            detail: None,
            display: None,
            detail_shape: Shape::Mapping(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn detail(&self) -> Option<&Arc<dyn DetailMapper>> {
        self.detail.as_ref()
    }

    pub fn display(&self) -> Option<&Arc<dyn DisplayMapper>> {
        self.display.as_ref()
    }

    /// Shape the detail mapper's output must satisfy. Defaults to "any
    /// mapping".
    pub fn detail_shape(&self) -> &Shape {
        &self.detail_shape
    }
}

impl fmt::Debug for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Control")
            .field("name", &self.name)
            .field("detail", &self.detail.is_some())
            .field("display", &self.display.is_some())
            .field("detail_shape", &self.detail_shape)
            .finish()
    }
}

/// Builder returned by [`Control::builder`].
pub struct ControlBuilder {
    name: String,
    detail: Option<Arc<dyn DetailMapper>>,
    display: Option<Arc<dyn DisplayMapper>>,
    detail_shape: Shape,
}

impl ControlBuilder {
    pub fn detail(mut self, mapper: impl DetailMapper + 'static) -> Self {
        self.detail = Some(Arc::new(mapper));
        self
    }

    pub fn display(mut self, mapper: impl DisplayMapper + 'static) -> Self {
        self.display = Some(Arc::new(mapper));
        self
    }

    pub fn detail_shape(mut self, shape: Shape) -> Self {
        self.detail_shape = shape;
        self
    }

    pub fn build(self) -> Control {
        Control {
            name: self.name,
            detail: self.detail,
            display: self.display,
            detail_shape: self.detail_shape,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn closure_mappers_default_to_contract_parameters() {
        let detail = FnDetailMapper::new(|_, _| Ok(json!({})));
        assert_eq!(detail.parameters(), &["occurrence", "context"]);
        let display = FnDisplayMapper::new(|_, _, _| Ok(json!({})));
        assert_eq!(
            display.parameters(),
            &["occurrence", "attestation", "context"]
        );
    }

    #[test]
    fn builder_wires_mappers() {
        let control = Control::builder("demo")
            .detail(FnDetailMapper::new(|occ, _| Ok(occ.clone())))
            .build();
        assert_eq!(control.name(), "demo");
        assert!(control.display().is_none());
        let detail = control.detail().unwrap();
        let out = detail.map(&json!({"a": 1}), &json!(null)).unwrap();
        assert_eq!(out, json!({"a": 1}));
        assert!(format!("{control:?}").contains("display: false"));
    }
}
