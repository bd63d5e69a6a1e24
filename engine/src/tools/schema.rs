//! Argument schemas for the map tools.
//!
//! Each schema is rendered to JSON Schema for the completion provider and is
//! also what the registry checks incoming arguments against.

use sdk::errors::EngineError;
use sdk::types::{LATITUDE_RANGE, LONGITUDE_RANGE};
use serde_json::{json, Map, Value};

/// Expected type of one parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    /// Any finite number within `[min, max]`
    Number { min: f64, max: f64 },

    /// Whole number; range is left to the tool
    Integer,

    /// Non-blank string
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,

    /// All parameters are required
    pub params: &'static [ParamSpec],
}

pub const NAVIGATE: ToolSchema = ToolSchema {
    name: "navigate",
    description: "Move the map center to the given latitude and longitude.",
    params: &[
        ParamSpec {
            name: "latitude",
            kind: ParamKind::Number {
                min: *LATITUDE_RANGE.start(),
                max: *LATITUDE_RANGE.end(),
            },
            description: "Latitude in decimal degrees, -90 to 90",
        },
        ParamSpec {
            name: "longitude",
            kind: ParamKind::Number {
                min: *LONGITUDE_RANGE.start(),
                max: *LONGITUDE_RANGE.end(),
            },
            description: "Longitude in decimal degrees, -180 to 180",
        },
    ],
};

pub const ZOOM: ToolSchema = ToolSchema {
    name: "zoom",
    description: "Set the map zoom level. Out-of-range levels are clamped to the supported range.",
    params: &[ParamSpec {
        name: "level",
        kind: ParamKind::Integer,
        description: "Zoom level; 0 shows the whole world, higher values zoom in",
    }],
};

pub const GEOCODE_AND_NAVIGATE: ToolSchema = ToolSchema {
    name: "geocode_and_navigate",
    description: "Look up a place name or address and move the map to it.",
    params: &[ParamSpec {
        name: "query",
        kind: ParamKind::Text,
        description: "Place name or address, e.g. \"Eiffel Tower, Paris\"",
    }],
};

impl ToolSchema {
    /// JSON Schema of the arguments object
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in self.params {
            let mut property = match param.kind {
                ParamKind::Number { min, max } => {
                    json!({"type": "number", "minimum": min, "maximum": max})
                }
                ParamKind::Integer => json!({"type": "integer"}),
                ParamKind::Text => json!({"type": "string"}),
            };
            property["description"] = json!(param.description);
            properties.insert(param.name.to_string(), property);
        }

        let required: Vec<&str> = self.params.iter().map(|p| p.name).collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Check `args` against this schema.
    ///
    /// Returns the argument object on success; every violation is reported as
    /// [`EngineError::Validation`] naming the offending parameter.
    pub fn validate<'a>(&self, args: &'a Value) -> Result<&'a Map<String, Value>, EngineError> {
        let object = args.as_object().ok_or_else(|| {
            EngineError::Validation(format!("{}: arguments must be a JSON object", self.name))
        })?;

        if let Some(unknown) = object
            .keys()
            .find(|key| !self.params.iter().any(|p| p.name == key.as_str()))
        {
            return Err(EngineError::Validation(format!(
                "{}: unknown parameter '{}'. Expected: {}",
                self.name,
                unknown,
                self.param_names()
            )));
        }

        for param in self.params {
            let value = object.get(param.name).filter(|v| !v.is_null()).ok_or_else(|| {
                EngineError::Validation(format!(
                    "{}: missing required parameter '{}'",
                    self.name, param.name
                ))
            })?;
            self.check_param(param, value)?;
        }

        Ok(object)
    }

    fn check_param(&self, param: &ParamSpec, value: &Value) -> Result<(), EngineError> {
        match param.kind {
            ParamKind::Number { min, max } => {
                let number = value.as_f64().ok_or_else(|| self.type_error(param, "a number"))?;
                if !number.is_finite() || number < min || number > max {
                    return Err(EngineError::Validation(format!(
                        "{}: '{}' must be between {} and {}, got {}",
                        self.name, param.name, min, max, number
                    )));
                }
            }
            ParamKind::Integer => {
                integer_value(value).ok_or_else(|| self.type_error(param, "an integer"))?;
            }
            ParamKind::Text => {
                let text = value.as_str().ok_or_else(|| self.type_error(param, "a string"))?;
                if text.trim().is_empty() {
                    return Err(EngineError::Validation(format!(
                        "{}: '{}' must not be empty",
                        self.name, param.name
                    )));
                }
            }
        }
        Ok(())
    }

    fn type_error(&self, param: &ParamSpec, expected: &str) -> EngineError {
        EngineError::Validation(format!(
            "{}: '{}' must be {}",
            self.name, param.name, expected
        ))
    }

    fn param_names(&self) -> String {
        self.params
            .iter()
            .map(|p| p.name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Read a whole number, accepting integral floats such as `12.0`
pub fn integer_value(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    let f = value.as_f64()?;
    // Saturating cast; the zoom tool clamps anyway
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}
