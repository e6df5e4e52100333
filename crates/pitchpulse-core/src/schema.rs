//! Per-feature output schemas and payload validation.
//!
//! A [`FeatureSchema`] is the contract between the gateway and the mobile
//! clients: the JSON keys and primitive types every accepted payload must
//! carry. Validation covers flat objects of primitive fields; keys the
//! schema does not declare are ignored.

use crate::feature::FeatureName;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Primitive type of a schema field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    /// Any JSON string
    String,
    /// Any JSON number, optionally bounded (inclusive)
    Number {
        /// Inclusive lower bound
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        /// Inclusive upper bound
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// A string drawn from a closed set
    Enum {
        /// Allowed values
        values: Vec<String>,
    },
    /// An array whose elements are all strings
    StringList {
        /// Minimum number of items
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_items: Option<usize>,
        /// Maximum number of items
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_items: Option<usize>,
    },
    /// An object whose values are all strings
    StringMap,
}

impl FieldType {
    /// Unbounded number
    #[must_use]
    pub fn number() -> Self {
        Self::Number {
            min: None,
            max: None,
        }
    }

    /// Number within an inclusive range
    #[must_use]
    pub fn number_in(min: f64, max: f64) -> Self {
        Self::Number {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Closed set of strings
    #[must_use]
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Unbounded list of strings
    #[must_use]
    pub fn string_list() -> Self {
        Self::StringList {
            min_items: None,
            max_items: None,
        }
    }

    /// List of strings with at most `max` items
    #[must_use]
    pub fn string_list_max(max: usize) -> Self {
        Self::StringList {
            min_items: None,
            max_items: Some(max),
        }
    }

    /// Human-readable type name used in violation messages
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number { .. } => "number",
            Self::Enum { .. } => "enum<string>",
            Self::StringList { .. } => "list<string>",
            Self::StringMap => "map<string,string>",
        }
    }

    fn check(&self, value: &Value) -> Option<ViolationKind> {
        match self {
            Self::String => (!value.is_string()).then(|| wrong_type(self, value)),
            Self::Number { min, max } => {
                let Some(number) = value.as_f64() else {
                    return Some(wrong_type(self, value));
                };
                let below = min.is_some_and(|min| number < min);
                let above = max.is_some_and(|max| number > max);
                (below || above).then_some(ViolationKind::OutOfRange {
                    value: number,
                    min: *min,
                    max: *max,
                })
            }
            Self::Enum { values } => {
                let Some(text) = value.as_str() else {
                    return Some(wrong_type(self, value));
                };
                (!values.iter().any(|allowed| allowed == text)).then(|| {
                    ViolationKind::NotInEnum {
                        value: text.to_string(),
                        allowed: values.clone(),
                    }
                })
            }
            Self::StringList {
                min_items,
                max_items,
            } => {
                let Some(items) = value.as_array() else {
                    return Some(wrong_type(self, value));
                };
                if let Some((index, item)) = items.iter().enumerate().find(|(_, v)| !v.is_string())
                {
                    return Some(ViolationKind::ElementWrongType {
                        at: format!("[{index}]"),
                        found: json_type_name(item),
                    });
                }
                if let Some(min) = min_items.filter(|min| items.len() < *min) {
                    return Some(ViolationKind::TooFewItems {
                        min,
                        found: items.len(),
                    });
                }
                max_items
                    .filter(|max| items.len() > *max)
                    .map(|max| ViolationKind::TooManyItems {
                        max,
                        found: items.len(),
                    })
            }
            Self::StringMap => {
                let Some(entries) = value.as_object() else {
                    return Some(wrong_type(self, value));
                };
                entries
                    .iter()
                    .find(|(_, v)| !v.is_string())
                    .map(|(key, v)| ViolationKind::ElementWrongType {
                        at: format!(".{key}"),
                        found: json_type_name(v),
                    })
            }
        }
    }

    fn response_schema(&self) -> Option<Value> {
        let schema = match self {
            Self::String => json!({ "type": "STRING" }),
            Self::Number { min, max } => {
                let mut schema = json!({ "type": "NUMBER" });
                if let Some(min) = min {
                    schema["minimum"] = json!(min);
                }
                if let Some(max) = max {
                    schema["maximum"] = json!(max);
                }
                schema
            }
            Self::Enum { values } => json!({ "type": "STRING", "enum": values }),
            Self::StringList {
                min_items,
                max_items,
            } => {
                let mut schema = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
                if let Some(min) = min_items {
                    schema["minItems"] = json!(min);
                }
                if let Some(max) = max_items {
                    schema["maxItems"] = json!(max);
                }
                schema
            }
            // Gemini response schemas cannot describe free-form maps
            Self::StringMap => return None,
        };
        Some(schema)
    }
}

fn wrong_type(expected: &FieldType, found: &Value) -> ViolationKind {
    ViolationKind::WrongType {
        expected: expected.type_name(),
        found: json_type_name(found),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One declared field of a feature schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// JSON key
    pub name: String,
    /// Declared type
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether the key must be present and non-null
    pub required: bool,
    /// Hint forwarded to the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSpec {
    /// Create a required field
    #[must_use]
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
            description: None,
        }
    }

    /// Create an optional field
    #[must_use]
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            description: None,
        }
    }

    /// Attach a description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Constraint checked on model output only; fallback payloads are exempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum OutputRule {
    /// The list field must hold exactly `count` items
    ItemCount {
        /// JSON key of the list
        field: String,
        /// Required length
        count: usize,
    },
}

impl OutputRule {
    /// Exact list length
    #[must_use]
    pub fn item_count(field: impl Into<String>, count: usize) -> Self {
        Self::ItemCount {
            field: field.into(),
            count,
        }
    }

    fn field(&self) -> &str {
        match self {
            Self::ItemCount { field, .. } => field,
        }
    }

    fn check(&self, object: &Map<String, Value>) -> Option<SchemaViolation> {
        match self {
            Self::ItemCount { field, count } => {
                let items = object.get(field)?.as_array()?;
                (items.len() != *count).then(|| SchemaViolation {
                    field: field.clone(),
                    kind: ViolationKind::WrongItemCount {
                        expected: *count,
                        found: items.len(),
                    },
                })
            }
        }
    }

    fn narrow_hint(&self, hint: &mut Value) {
        match self {
            Self::ItemCount { count, .. } => {
                hint["minItems"] = json!(count);
                hint["maxItems"] = json!(count);
            }
        }
    }
}

/// Declared output contract of one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    feature: FeatureName,
    fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    output_rules: Vec<OutputRule>,
}

impl FeatureSchema {
    /// Create an empty schema for a feature
    #[must_use]
    pub fn new(feature: impl Into<FeatureName>) -> Self {
        Self {
            feature: feature.into(),
            fields: Vec::new(),
            output_rules: Vec::new(),
        }
    }

    /// Append a field (declaration order is preserved)
    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a rule that live model output must also satisfy
    #[must_use]
    pub fn output_rule(mut self, rule: OutputRule) -> Self {
        self.output_rules.push(rule);
        self
    }

    /// Rules applied to model output on top of the field checks
    #[must_use]
    pub fn output_rules(&self) -> &[OutputRule] {
        &self.output_rules
    }

    /// Feature this schema belongs to
    #[must_use]
    pub fn feature(&self) -> &FeatureName {
        &self.feature
    }

    /// All declared fields in order
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Names of required fields in declaration order
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
    }

    /// Field names declared more than once
    #[must_use]
    pub fn duplicate_fields(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        let mut duplicates = Vec::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) && !duplicates.contains(&field.name.as_str()) {
                duplicates.push(field.name.as_str());
            }
        }
        duplicates
    }

    /// Validate a parsed payload against the schema.
    ///
    /// Every violation is reported, not only the first. Keys the schema does
    /// not declare are ignored, and optional fields that are absent or `null`
    /// are accepted.
    ///
    /// # Errors
    /// Returns the list of violations when the payload is not conformant
    pub fn validate(&self, value: &Value) -> Result<(), Vec<SchemaViolation>> {
        let Some(object) = value.as_object() else {
            return Err(vec![SchemaViolation {
                field: "$".to_string(),
                kind: ViolationKind::NotAnObject {
                    found: json_type_name(value),
                },
            }]);
        };

        let violations: Vec<SchemaViolation> = self
            .fields
            .iter()
            .filter_map(|field| Self::check_field(field, object))
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Validate a payload returned by the model: the field checks plus every
    /// [`OutputRule`]. A rule is skipped for a field that already failed its
    /// field check.
    ///
    /// # Errors
    /// Returns the list of violations when the payload is not conformant
    pub fn validate_output(&self, value: &Value) -> Result<(), Vec<SchemaViolation>> {
        let mut violations = self.validate(value).err().unwrap_or_default();
        if let Some(object) = value.as_object() {
            for rule in &self.output_rules {
                if violations.iter().any(|v| v.field == rule.field()) {
                    continue;
                }
                violations.extend(rule.check(object));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Whether a payload is conformant
    #[must_use]
    pub fn is_conformant(&self, value: &Value) -> bool {
        self.validate(value).is_ok()
    }

    fn check_field(field: &FieldSpec, object: &Map<String, Value>) -> Option<SchemaViolation> {
        let kind = match object.get(&field.name) {
            None | Some(Value::Null) if field.required => Some(ViolationKind::MissingField),
            None | Some(Value::Null) => None,
            Some(value) => field.field_type.check(value),
        };
        kind.map(|kind| SchemaViolation {
            field: field.name.clone(),
            kind,
        })
    }

    /// Render the schema as a Gemini `responseSchema` hint.
    ///
    /// Fields the upstream schema dialect cannot express (string maps) are
    /// left out of the hint and still validated locally. Returns `None` when
    /// no field can be expressed.
    #[must_use]
    pub fn to_response_schema(&self) -> Option<Value> {
        let mut properties = Map::new();
        let mut ordering = Vec::new();
        let mut required = Vec::new();
        for field in &self.fields {
            let Some(mut schema) = field.field_type.response_schema() else {
                continue;
            };
            if let Some(description) = &field.description {
                schema["description"] = json!(description);
            }
            for rule in self.output_rules.iter().filter(|r| r.field() == field.name) {
                rule.narrow_hint(&mut schema);
            }
            properties.insert(field.name.clone(), schema);
            ordering.push(field.name.as_str());
            if field.required {
                required.push(field.name.as_str());
            }
        }

        if properties.is_empty() {
            return None;
        }

        Some(json!({
            "type": "OBJECT",
            "properties": properties,
            "required": required,
            "propertyOrdering": ordering,
        }))
    }
}

/// One failed check of a payload against a schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaViolation {
    /// Offending key (`$` for the payload root)
    pub field: String,
    /// What went wrong
    pub kind: ViolationKind,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.kind)
    }
}

/// Kind of schema violation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// The payload root is not a JSON object
    NotAnObject {
        /// JSON type actually found
        found: &'static str,
    },
    /// A required key is absent or null
    MissingField,
    /// The value has the wrong JSON type
    WrongType {
        /// Declared type
        expected: &'static str,
        /// JSON type actually found
        found: &'static str,
    },
    /// A list element or map value is not a string
    ElementWrongType {
        /// Index or key of the offending element
        at: String,
        /// JSON type actually found
        found: &'static str,
    },
    /// The string is not one of the allowed values
    NotInEnum {
        /// The rejected value
        value: String,
        /// The allowed values
        allowed: Vec<String>,
    },
    /// The number lies outside the declared range
    OutOfRange {
        /// The rejected value
        value: f64,
        /// Inclusive lower bound
        min: Option<f64>,
        /// Inclusive upper bound
        max: Option<f64>,
    },
    /// The list is shorter than allowed
    TooFewItems {
        /// Minimum length
        min: usize,
        /// Actual length
        found: usize,
    },
    /// The list is longer than allowed
    TooManyItems {
        /// Maximum length
        max: usize,
        /// Actual length
        found: usize,
    },
    /// The list does not hold the exact number of items model output needs
    WrongItemCount {
        /// Required length
        expected: usize,
        /// Actual length
        found: usize,
    },
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject { found } => write!(f, "expected an object, found {found}"),
            Self::MissingField => write!(f, "required field is missing"),
            Self::WrongType { expected, found } => write!(f, "expected {expected}, found {found}"),
            Self::ElementWrongType { at, found } => {
                write!(f, "element {at} must be a string, found {found}")
            }
            Self::NotInEnum { value, allowed } => {
                write!(f, "'{value}' is not one of [{}]", allowed.join(", "))
            }
            Self::OutOfRange { value, min, max } => {
                let min = min.map_or_else(|| "-inf".to_string(), |m| m.to_string());
                let max = max.map_or_else(|| "inf".to_string(), |m| m.to_string());
                write!(f, "{value} is outside [{min}, {max}]")
            }
            Self::TooFewItems { min, found } => write!(f, "expected at least {min} items, found {found}"),
            Self::TooManyItems { max, found } => write!(f, "expected at most {max} items, found {found}"),
            Self::WrongItemCount { expected, found } => {
                write!(f, "expected exactly {expected} items, found {found}")
            }
        }
    }
}

/// Join violations into one line for logs and error messages
#[must_use]
pub fn render_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
