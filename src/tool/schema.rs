// ABOUTME: Typed input schemas for tools - parameter declarations, JSON Schema
// ABOUTME: rendering for the model, and argument validation for the executor.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::Arguments;
use crate::error::ToolError;

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    /// Check whether a JSON value has this type. Whole-valued floats count
    /// as integers since models frequently emit `1980.0`.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => match value {
                Value::Number(n) => {
                    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
                }
                _ => false,
            },
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of a single tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Allowed values. Empty means unrestricted.
    #[serde(default, rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

impl ParamSpec {
    /// Create an optional parameter of the given type.
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: String::new(),
            required: false,
            default: None,
            allowed: Vec::new(),
            minimum: None,
            maximum: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Integer)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Boolean)
    }

    /// Set the description shown to the model.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value used when the caller omits the parameter.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Restrict the parameter to a fixed set of values.
    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }

    /// Inclusive numeric bounds.
    pub fn range(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    fn check_value(&self, value: &Value) -> Result<(), String> {
        if !self.param_type.accepts(value) {
            return Err(format!(
                "parameter '{}' must be of type {}, got {}",
                self.name, self.param_type, value
            ));
        }
        if !self.allowed.is_empty() && !self.allowed.contains(value) {
            let allowed: Vec<String> = self.allowed.iter().map(|v| v.to_string()).collect();
            return Err(format!(
                "parameter '{}' must be one of [{}], got {}",
                self.name,
                allowed.join(", "),
                value
            ));
        }
        if let Some(n) = value.as_f64() {
            if let Some(min) = self.minimum.filter(|min| n < *min) {
                return Err(format!("parameter '{}' must be >= {}", self.name, min));
            }
            if let Some(max) = self.maximum.filter(|max| n > *max) {
                return Err(format!("parameter '{}' must be <= {}", self.name, max));
            }
        }
        Ok(())
    }

    fn to_json_schema(&self) -> Value {
        let mut prop = serde_json::Map::new();
        prop.insert("type".into(), json!(self.param_type.as_str()));
        if !self.description.is_empty() {
            prop.insert("description".into(), json!(self.description));
        }
        if let Some(default) = &self.default {
            prop.insert("default".into(), default.clone());
        }
        if !self.allowed.is_empty() {
            prop.insert("enum".into(), Value::Array(self.allowed.clone()));
        }
        if let Some(min) = self.minimum {
            prop.insert("minimum".into(), json!(min));
        }
        if let Some(max) = self.maximum {
            prop.insert("maximum".into(), json!(max));
        }
        Value::Object(prop)
    }
}

/// Ordered set of parameters a tool accepts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputSchema {
    params: Vec<ParamSpec>,
}

impl InputSchema {
    /// Create a schema with no parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter.
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// All declared parameters, in declaration order.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Names of all declared parameters.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }

    /// Check the schema is internally consistent: unique names, and
    /// defaults that satisfy their own constraints.
    pub fn check(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for param in &self.params {
            if param.name.is_empty() {
                return Err("parameter with empty name".to_string());
            }
            if !seen.insert(param.name.as_str()) {
                return Err(format!("parameter '{}' declared twice", param.name));
            }
            if let Some(default) = &param.default {
                param
                    .check_value(default)
                    .map_err(|e| format!("invalid default: {}", e))?;
            }
        }
        Ok(())
    }

    /// Render as a JSON Schema object for the tool catalog.
    pub fn to_json_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.to_json_schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Validate raw arguments against the schema.
    ///
    /// Declared parameters are type and constraint checked. Missing ones get
    /// their default, or fail if required. Undeclared keys are passed through
    /// untouched. `null` is accepted for optional parameters.
    pub fn validate(&self, raw: &Value) -> Result<Arguments, ToolError> {
        let mut args = match raw {
            Value::Object(map) => map.clone(),
            Value::Null => Arguments::new(),
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "expected an object of named arguments, got {}",
                    other
                )));
            }
        };

        for param in &self.params {
            match args.get(&param.name) {
                Some(Value::Null) if !param.required => {}
                Some(value) => param
                    .check_value(value)
                    .map_err(ToolError::InvalidArguments)?,
                None => match &param.default {
                    Some(default) => {
                        args.insert(param.name.clone(), default.clone());
                    }
                    None if param.required => {
                        return Err(ToolError::InvalidArguments(format!(
                            "missing required parameter '{}'",
                            param.name
                        )));
                    }
                    None => {}
                },
            }
        }

        Ok(args)
    }
}
