use serde_json::{json, Map, Value};

use super::CompletionError;

/// Type of a single schema field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    StringList { max_items: Option<usize> },
    ObjectList { fields: Vec<Field>, max_items: Option<usize> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub description: String,
    pub ty: FieldType,
}

impl Field {
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ty: FieldType::String,
        }
    }

    pub fn string_list(
        name: impl Into<String>,
        description: impl Into<String>,
        max_items: Option<usize>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ty: FieldType::StringList { max_items },
        }
    }

    pub fn object_list(
        name: impl Into<String>,
        description: impl Into<String>,
        fields: Vec<Field>,
        max_items: Option<usize>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ty: FieldType::ObjectList { fields, max_items },
        }
    }
}

/// A closed object shape: every field is required and no others are allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    pub name: String,
    pub fields: Vec<Field>,
}

impl ObjectSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Renders the shape as JSON Schema for providers that enforce it.
    pub fn to_json_schema(&self) -> Value {
        object_schema(&self.fields)
    }

    /// Checks `value` against the shape. Nothing is coerced.
    pub fn validate(&self, value: &Value) -> Result<(), CompletionError> {
        validate_object(&self.fields, value, "$")
    }
}

fn object_schema(fields: &[Field]) -> Value {
    let mut properties = Map::new();
    for field in fields {
        properties.insert(field.name.clone(), field_schema(field));
    }
    let required: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn field_schema(field: &Field) -> Value {
    let mut schema = match &field.ty {
        FieldType::String => json!({ "type": "string" }),
        FieldType::StringList { max_items } => with_max_items(
            json!({ "type": "array", "items": { "type": "string" } }),
            *max_items,
        ),
        FieldType::ObjectList { fields, max_items } => with_max_items(
            json!({ "type": "array", "items": object_schema(fields) }),
            *max_items,
        ),
    };
    if !field.description.is_empty() {
        schema["description"] = Value::String(field.description.clone());
    }
    schema
}

fn with_max_items(mut schema: Value, max_items: Option<usize>) -> Value {
    if let Some(max) = max_items {
        schema["maxItems"] = json!(max);
    }
    schema
}

fn violation(path: &str, message: impl std::fmt::Display) -> CompletionError {
    CompletionError::SchemaViolation(format!("{}: {}", path, message))
}

fn validate_object(fields: &[Field], value: &Value, path: &str) -> Result<(), CompletionError> {
    let object = value
        .as_object()
        .ok_or_else(|| violation(path, "expected object"))?;

    if let Some(extra) = object.keys().find(|k| !fields.iter().any(|f| &f.name == *k)) {
        return Err(violation(path, format!("unexpected field '{}'", extra)));
    }

    for field in fields {
        let field_path = format!("{}.{}", path, field.name);
        let field_value = object
            .get(&field.name)
            .ok_or_else(|| violation(path, format!("missing field '{}'", field.name)))?;
        validate_field(&field.ty, field_value, &field_path)?;
    }

    Ok(())
}

fn validate_field(ty: &FieldType, value: &Value, path: &str) -> Result<(), CompletionError> {
    match ty {
        FieldType::String => {
            if !value.is_string() {
                return Err(violation(path, "expected string"));
            }
        }
        FieldType::StringList { max_items } => {
            let items = validate_array(value, *max_items, path)?;
            for (i, item) in items.iter().enumerate() {
                if !item.is_string() {
                    return Err(violation(&format!("{}[{}]", path, i), "expected string"));
                }
            }
        }
        FieldType::ObjectList { fields, max_items } => {
            let items = validate_array(value, *max_items, path)?;
            for (i, item) in items.iter().enumerate() {
                validate_object(fields, item, &format!("{}[{}]", path, i))?;
            }
        }
    }
    Ok(())
}

fn validate_array<'a>(
    value: &'a Value,
    max_items: Option<usize>,
    path: &str,
) -> Result<&'a Vec<Value>, CompletionError> {
    let items = value
        .as_array()
        .ok_or_else(|| violation(path, "expected array"))?;
    if let Some(max) = max_items {
        if items.len() > max {
            return Err(violation(
                path,
                format!("{} items exceeds maximum of {}", items.len(), max),
            ));
        }
    }
    Ok(items)
}
