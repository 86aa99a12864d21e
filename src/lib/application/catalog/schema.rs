use serde_json::{Map, Value, json};

/// Parameter schema reduced to the fields function-calling models accept.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSchema {
    pub schema_type: String,
    pub properties: Map<String, Value>,
    pub required: Vec<String>,
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: Map::new(),
            required: Vec::new(),
        }
    }
}

impl ParameterSchema {
    pub fn to_value(&self) -> Value {
        json!({
            "type": self.schema_type,
            "properties": self.properties,
            "required": self.required,
        })
    }
}

/// Keep `type`, `properties` and `required`; drop everything else.
///
/// A missing schema yields the default object schema. Anything that is not a
/// JSON object yields `None` and the tool is left out of the catalog.
pub fn normalize_schema(raw: Option<&Value>) -> Option<ParameterSchema> {
    let object = match raw {
        None | Some(Value::Null) => return Some(ParameterSchema::default()),
        Some(Value::Object(object)) => object,
        Some(_) => return None,
    };

    let schema_type = object
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("object")
        .to_string();
    let properties = object
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let required = object
        .get("required")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(ParameterSchema {
        schema_type,
        properties,
        required,
    })
}
