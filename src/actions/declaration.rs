//! Function-declaration schema published to the function-calling consumer.
//!
//! The shape is a wire contract:
//!
//! ```text
//! { name, description,
//!   parameters: { type: "OBJECT",
//!     properties: { <param>: { type: <UPPERCASE>, description, enum?, items? } },
//!     required: [ <required param names, declaration order> ] } }
//! ```
//!
//! `items` appears only on array parameters and defaults to
//! `{ "type": "STRING" }`. Properties serialize in declaration order.

use super::{ActionParameter, ActionSchema, ItemsSchema, ParameterType};
use crate::types::{FunctionDefinition, ToolDefinition};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

/// Upper-case type names used by the declaration schema.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl From<ParameterType> for SchemaType {
    fn from(value: ParameterType) -> Self {
        match value {
            ParameterType::String => Self::String,
            ParameterType::Number => Self::Number,
            ParameterType::Boolean => Self::Boolean,
            ParameterType::Object => Self::Object,
            ParameterType::Array => Self::Array,
        }
    }
}

/// Declaration of one action.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: ParametersSchema,
}

/// The `parameters` object of a declaration. Always `type: "OBJECT"`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ParametersSchema {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    pub properties: PropertyMap,
    pub required: Vec<String>,
}

/// One parameter inside `properties`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    pub description: String,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<ItemsDeclaration>,
}

/// Item schema of an array parameter.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItemsDeclaration {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertyMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

/// Property schemas keyed by parameter name, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap(pub Vec<(String, PropertySchema)>);

impl PropertyMap {
    pub fn get(&self, name: &str) -> Option<&PropertySchema> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, schema)| schema)
    }
}

impl Serialize for PropertyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, schema) in &self.0 {
            map.serialize_entry(name, schema)?;
        }
        map.end()
    }
}

impl FunctionDeclaration {
    pub fn from_schema(schema: &ActionSchema) -> Self {
        Self {
            name: schema.name.clone(),
            description: schema.description.clone(),
            parameters: ParametersSchema {
                schema_type: SchemaType::Object,
                properties: property_map(&schema.parameters),
                required: required_names(&schema.parameters),
            },
        }
    }
}

fn property_map(parameters: &[ActionParameter]) -> PropertyMap {
    PropertyMap(
        parameters
            .iter()
            .map(|p| (p.name.clone(), property_schema(p)))
            .collect(),
    )
}

fn required_names(parameters: &[ActionParameter]) -> Vec<String> {
    parameters
        .iter()
        .filter(|p| p.required)
        .map(|p| p.name.clone())
        .collect()
}

fn property_schema(parameter: &ActionParameter) -> PropertySchema {
    let items = (parameter.param_type == ParameterType::Array).then(|| {
        parameter
            .items
            .as_ref()
            .map(items_declaration)
            .unwrap_or(ItemsDeclaration {
                schema_type: SchemaType::String,
                properties: None,
                required: None,
            })
    });
    PropertySchema {
        schema_type: parameter.param_type.into(),
        description: parameter.description.clone(),
        enum_values: parameter.enum_values.clone(),
        items,
    }
}

fn items_declaration(items: &ItemsSchema) -> ItemsDeclaration {
    let shaped = items.item_type == ParameterType::Object && !items.properties.is_empty();
    ItemsDeclaration {
        schema_type: items.item_type.into(),
        properties: shaped.then(|| property_map(&items.properties)),
        required: shaped.then(|| required_names(&items.properties)),
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible tool definitions
// ---------------------------------------------------------------------------

/// Render an action as an OpenAI-compatible tool definition (lower-case
/// JSON-schema types).
pub(super) fn tool_definition(schema: &ActionSchema) -> ToolDefinition {
    ToolDefinition {
        tool_type: "function".into(),
        function: FunctionDefinition {
            name: schema.name.clone(),
            description: schema.description.clone(),
            parameters: json_schema_object(&schema.parameters),
        },
    }
}

fn json_schema_object(parameters: &[ActionParameter]) -> Value {
    let mut properties = Map::new();
    for parameter in parameters {
        properties.insert(parameter.name.clone(), json_schema_property(parameter));
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required_names(parameters),
    })
}

fn json_schema_property(parameter: &ActionParameter) -> Value {
    let mut property = Map::new();
    property.insert("type".into(), json!(parameter.param_type.as_str()));
    property.insert("description".into(), json!(parameter.description));
    if let Some(values) = &parameter.enum_values {
        property.insert("enum".into(), json!(values));
    }
    if parameter.param_type == ParameterType::Array {
        let items = match &parameter.items {
            Some(items) if items.item_type == ParameterType::Object && !items.properties.is_empty() => {
                json_schema_object(&items.properties)
            }
            Some(items) => json!({"type": items.item_type.as_str()}),
            None => json!({"type": "string"}),
        };
        property.insert("items".into(), items);
    }
    Value::Object(property)
}
