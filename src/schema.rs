//! Archive taxonomy data model and JSON ingest.
//!
//! Categories and documents arrive as already-deserialized JSON records whose
//! shape is not trusted. Ingest turns them into typed values, dropping only
//! records without a usable integral `id`.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::diagnostics::{Diagnostic, RecordKind};

pub type CategoryId = i64;
pub type DocumentId = i64;

/// A taxonomy node as delivered by the category source.
///
/// Built only through [`Category::from_value`] or the constructors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<CategoryId>,
    /// Sibling sort key. Defaults to `id` when the source omits it.
    pub order: f64,
}

impl Category {
    pub fn new(id: CategoryId, name: impl Into<String>, parent: Option<CategoryId>) -> Self {
        Self {
            id,
            name: name.into(),
            parent,
            order: id as f64,
        }
    }

    pub fn with_order(mut self, order: f64) -> Self {
        self.order = order;
        self
    }

    /// Parse one raw record. Returns the reason on invalid shape.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| format!("expected object, got {}", json_type(value)))?;
        let id = record_id(obj)?;

        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let parent = obj.get("parent").and_then(as_integral);
        let order = obj
            .get("order")
            .and_then(Value::as_f64)
            .filter(|o| o.is_finite())
            .unwrap_or(id as f64);

        Ok(Self {
            id,
            name,
            parent,
            order,
        })
    }
}

/// The category reference carried by a document's `category` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum CategoryRef {
    /// `category: { "id": 3, ... }`
    Embedded { id: CategoryId },
    /// `category: 3`
    BareId { id: CategoryId },
    /// Non-null but unusable: an object without an integral `id`, a
    /// string, a fractional number. Resolves to nothing, yet still counts
    /// as a reference when looking for field-name mismatches.
    Unrecognized,
    /// Missing or null.
    Absent,
}

impl CategoryRef {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Object(obj)) => obj
                .get("id")
                .and_then(as_integral)
                .map(|id| Self::Embedded { id })
                .unwrap_or(Self::Unrecognized),
            Some(v @ Value::Number(_)) => as_integral(v)
                .map(|id| Self::BareId { id })
                .unwrap_or(Self::Unrecognized),
            None | Some(Value::Null) => Self::Absent,
            Some(_) => Self::Unrecognized,
        }
    }
}

/// An archive document with its category reference still in source shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub category: CategoryRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    /// Remaining source fields (file url, dates, ...) passed through to the renderer.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Document {
    pub fn new(id: DocumentId, title: impl Into<String>, category: CategoryRef) -> Self {
        Self {
            id,
            title: title.into(),
            category,
            category_id: None,
            extra: Map::new(),
        }
    }

    pub fn with_category_id(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Parse one raw record. Returns the reason on invalid shape.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| format!("expected object, got {}", json_type(value)))?;
        let id = record_id(obj)?;

        let title = obj
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let category = CategoryRef::from_value(obj.get("category"));
        let category_id = obj
            .get("category_id")
            .or_else(|| obj.get("categoryId"))
            .and_then(as_integral);

        let extra = obj
            .iter()
            .filter(|(k, _)| {
                !matches!(
                    k.as_str(),
                    "id" | "title" | "category" | "category_id" | "categoryId"
                )
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            id,
            title,
            category,
            category_id,
            extra,
        })
    }

    /// Canonical category id, first match wins:
    /// embedded object id, then `category_id`, then a bare numeric `category`.
    pub fn canonical_category(&self) -> Option<CategoryId> {
        match self.category {
            CategoryRef::Embedded { id } => Some(id),
            _ => self.category_id.or(match self.category {
                CategoryRef::BareId { id } => Some(id),
                _ => None,
            }),
        }
    }

    /// True when the document carries any non-null category reference.
    pub fn has_category_reference(&self) -> bool {
        self.category != CategoryRef::Absent || self.category_id.is_some()
    }
}

/// A category placed in the forest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryNode {
    pub id: CategoryId,
    pub name: String,
    pub order: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CategoryNode>,
}

// Deep chains would otherwise drop recursively, one frame per level.
impl Drop for CategoryNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Convert raw category records, dropping and reporting invalid shapes.
pub fn ingest_categories(values: &[Value]) -> (Vec<Category>, Vec<Diagnostic>) {
    ingest(values, RecordKind::Category, Category::from_value)
}

/// Convert raw document records, dropping and reporting invalid shapes.
pub fn ingest_documents(values: &[Value]) -> (Vec<Document>, Vec<Diagnostic>) {
    ingest(values, RecordKind::Document, Document::from_value)
}

fn ingest<T>(
    values: &[Value],
    kind: RecordKind,
    parse: impl Fn(&Value) -> Result<T, String>,
) -> (Vec<T>, Vec<Diagnostic>) {
    let mut records = Vec::with_capacity(values.len());
    let mut diagnostics = Vec::new();

    for (position, value) in values.iter().enumerate() {
        match parse(value) {
            Ok(record) => records.push(record),
            Err(reason) => diagnostics.push(Diagnostic::InvalidShape {
                kind,
                position,
                reason,
            }),
        }
    }

    (records, diagnostics)
}

fn record_id(obj: &Map<String, Value>) -> Result<i64, String> {
    match obj.get("id") {
        None | Some(Value::Null) => Err("missing id".to_string()),
        Some(v) => as_integral(v).ok_or_else(|| format!("non-numeric id: {}", v)),
    }
}

/// Integral JSON number as i64. `3.0` is accepted, `3.5` and `"3"` are not.
fn as_integral(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
