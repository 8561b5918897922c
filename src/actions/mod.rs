//! Agent-invocable actions.
//!
//! An action is a named capability with a declared parameter schema and an
//! async handler. Hosts register actions as they become available, publish
//! their declarations to the agent, and execute them by name when the agent
//! asks.

mod declaration;
mod registry;

pub use declaration::{
    FunctionDeclaration, ItemsDeclaration, ParametersSchema, PropertyMap, PropertySchema,
    SchemaType,
};
pub use registry::ActionRegistry;

use crate::error::HandlerError;
use crate::tool_calls::ToolCallState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Parameter schema
// ---------------------------------------------------------------------------

/// Declared type of an action parameter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParameterType {
    /// Lower-case JSON-schema spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

/// Item schema for `array` parameters: a primitive type, or an object shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemsSchema {
    #[serde(rename = "type")]
    pub item_type: ParameterType,
    /// Fields of each item when `item_type` is `object`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<ActionParameter>,
}

impl ItemsSchema {
    pub fn of(item_type: ParameterType) -> Self {
        Self {
            item_type,
            properties: Vec::new(),
        }
    }

    pub fn object(properties: Vec<ActionParameter>) -> Self {
        Self {
            item_type: ParameterType::Object,
            properties,
        }
    }
}

/// One declared parameter of an action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Only meaningful for `array` parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<ItemsSchema>,
}

impl ActionParameter {
    /// An optional parameter. Chain [`required`](Self::required) to require it.
    pub fn new(
        name: impl Into<String>,
        param_type: ParameterType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: false,
            enum_values: None,
            items: None,
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParameterType::String, description)
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Number, description)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Boolean, description)
    }

    pub fn object(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Object, description)
    }

    pub fn array(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Array, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_items(mut self, items: ItemsSchema) -> Self {
        self.items = Some(items);
        self
    }
}

/// The data half of an action: everything except its behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionSchema {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ActionParameter>,
}

// ---------------------------------------------------------------------------
// Behavior
// ---------------------------------------------------------------------------

/// Executes an action with the agent-supplied arguments.
///
/// Errors are handed back to the caller of `execute_action` untouched.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn call(&self, args: Value) -> Result<Value, HandlerError>;
}

/// Adapter turning an async closure into an [`ActionHandler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> ActionHandler for FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    async fn call(&self, args: Value) -> Result<Value, HandlerError> {
        (self.0)(args).await
    }
}

/// Produces a text summary of a tool call made against an action.
pub trait ActionRenderer: Send + Sync {
    fn render(&self, call: &ToolCallState) -> String;
}

impl<F> ActionRenderer for F
where
    F: Fn(&ToolCallState) -> String + Send + Sync,
{
    fn render(&self, call: &ToolCallState) -> String {
        self(call)
    }
}

/// A registrable action: schema, handler, and optional renderer.
#[derive(Clone)]
pub struct ActionDefinition {
    pub schema: ActionSchema,
    handler: Arc<dyn ActionHandler>,
    render: Option<Arc<dyn ActionRenderer>>,
}

impl ActionDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl ActionHandler + 'static,
    ) -> Self {
        Self {
            schema: ActionSchema {
                name: name.into(),
                description: description.into(),
                parameters: Vec::new(),
            },
            handler: Arc::new(handler),
            render: None,
        }
    }

    /// Build an action whose handler is an async closure.
    pub fn from_fn<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        Self::new(name, description, FnHandler(handler))
    }

    pub fn with_parameter(mut self, parameter: ActionParameter) -> Self {
        self.schema.parameters.push(parameter);
        self
    }

    pub fn with_render(mut self, render: impl ActionRenderer + 'static) -> Self {
        self.render = Some(Arc::new(render));
        self
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn handler(&self) -> Arc<dyn ActionHandler> {
        Arc::clone(&self.handler)
    }

    pub fn render(&self, call: &ToolCallState) -> Option<String> {
        self.render.as_ref().map(|render| render.render(call))
    }
}

impl fmt::Debug for ActionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDefinition")
            .field("schema", &self.schema)
            .field("has_render", &self.render.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool_calls::ToolCallStatus;
    use serde_json::json;

    #[test]
    fn parameter_builders_set_flags() {
        let p = ActionParameter::string("unit", "temperature unit")
            .required()
            .with_enum(["c", "f"]);
        assert_eq!(p.param_type, ParameterType::String);
        assert!(p.required);
        assert_eq!(p.enum_values, Some(vec!["c".to_string(), "f".to_string()]));
        assert!(!ActionParameter::number("n", "").required);
    }

    #[test]
    fn schema_deserializes_from_author_json() {
        let schema: ActionSchema = serde_json::from_value(json!({
            "name": "tag",
            "parameters": [
                {"name": "labels", "type": "array", "items": {"type": "string"}},
                {"name": "id", "type": "number", "required": true, "description": "row"}
            ]
        }))
        .unwrap();
        assert_eq!(schema.description, "");
        assert_eq!(schema.parameters.len(), 2);
        assert_eq!(
            schema.parameters[0].items,
            Some(ItemsSchema::of(ParameterType::String))
        );
        assert!(schema.parameters[1].required);
    }

    #[tokio::test]
    async fn closure_handler_receives_arguments() {
        let action = ActionDefinition::from_fn("double", "doubles n", |args: Value| async move {
            let n = args.get("n").and_then(Value::as_i64).ok_or("missing n")?;
            Ok::<_, HandlerError>(json!(n * 2))
        });
        let out = action.handler().call(json!({"n": 21})).await.unwrap();
        assert_eq!(out, json!(42));
        let err = action.handler().call(json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "missing n");
    }

    #[test]
    fn renderer_summarizes_a_call() {
        let action = ActionDefinition::from_fn("search", "", |_args: Value| async {
            Ok::<_, HandlerError>(Value::Null)
        })
            .with_render(|call: &ToolCallState| format!("searching for {}", call.args["q"]));
        let call = ToolCallState {
            id: "1".into(),
            name: "search".into(),
            status: ToolCallStatus::Running,
            args_buffer: r#"{"q":"rust"}"#.into(),
            args: json!({"q": "rust"}),
            result: None,
            error: None,
        };
        assert_eq!(action.render(&call).as_deref(), Some("searching for \"rust\""));
        assert!(format!("{action:?}").contains("has_render: true"));
    }
}
