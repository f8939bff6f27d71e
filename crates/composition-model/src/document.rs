//! Typed read access over a parsed composition document.
//!
//! A [`Node`] points at one JSON value and carries its dotted path so that
//! errors can say exactly which field was wrong. Readers never mutate shared
//! cursor state: every accessor borrows from the parsed document, and array
//! views are snapshots of the underlying slice.

use serde_json::Value;

/// Errors raised while reading typed fields from a document.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DocumentError {
    #[error("missing field `{field}` in {path}")]
    MissingField { path: String, field: String },

    #[error("field `{field}` in {path} must be {expected}")]
    TypeMismatch {
        path: String,
        field: String,
        expected: &'static str,
    },

    #[error("field `{field}` in {path} is out of range: {value}")]
    OutOfRange {
        path: String,
        field: String,
        value: String,
    },

    #[error("index {index} out of range for {path} ({len} elements)")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },
}

/// A scalar that can be extracted from a JSON value.
pub trait FieldValue<'a>: Sized {
    /// Human-readable type name used in mismatch errors.
    const EXPECTED: &'static str;

    fn from_value(value: &'a Value) -> Option<Self>;

    /// Whether `value` has the right kind but cannot be represented.
    fn out_of_range(_value: &Value) -> bool {
        false
    }
}

impl<'a> FieldValue<'a> for &'a str {
    const EXPECTED: &'static str = "a string";

    fn from_value(value: &'a Value) -> Option<Self> {
        value.as_str()
    }
}

impl<'a> FieldValue<'a> for i64 {
    const EXPECTED: &'static str = "an integer";

    fn from_value(value: &'a Value) -> Option<Self> {
        value.as_i64().or_else(|| {
            // Accept `2.0` but never silently truncate `2.5`.
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        })
    }

    fn out_of_range(value: &Value) -> bool {
        (value.is_u64() && value.as_i64().is_none())
            || value
                .as_f64()
                .is_some_and(|f| f.fract() == 0.0 && f.abs() >= i64::MAX as f64)
    }
}

impl<'a> FieldValue<'a> for f64 {
    const EXPECTED: &'static str = "a number";

    fn from_value(value: &'a Value) -> Option<Self> {
        value.as_f64()
    }
}

impl<'a> FieldValue<'a> for bool {
    const EXPECTED: &'static str = "a boolean";

    fn from_value(value: &'a Value) -> Option<Self> {
        value.as_bool()
    }
}

/// A position inside a parsed document.
#[derive(Debug, Clone)]
pub struct Node<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> Node<'a> {
    /// Wrap the document root.
    pub fn root(value: &'a Value) -> Self {
        Self {
            value,
            path: "$".to_string(),
        }
    }

    /// Dotted path of this node, for diagnostics.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw JSON value.
    pub fn value(&self) -> &'a Value {
        self.value
    }

    /// Whether the current object has a member named exactly `field`.
    ///
    /// Non-object nodes have no members.
    pub fn has_field(&self, field: &str) -> bool {
        self.value
            .as_object()
            .is_some_and(|members| members.contains_key(field))
    }

    /// Descend into a required member.
    pub fn member(&self, field: &str) -> Result<Node<'a>, DocumentError> {
        self.try_member(field)
            .ok_or_else(|| DocumentError::MissingField {
                path: self.path.clone(),
                field: field.to_string(),
            })
    }

    /// Descend into an optional member.
    pub fn try_member(&self, field: &str) -> Option<Node<'a>> {
        self.value.get(field).map(|value| Node {
            value,
            path: format!("{}.{field}", self.path),
        })
    }

    /// Read an optional typed field. Absence yields `None`; a present field
    /// of the wrong type is an error.
    pub fn try_get<T: FieldValue<'a>>(&self, field: &str) -> Result<Option<T>, DocumentError> {
        match self.value.get(field) {
            None => Ok(None),
            Some(value) => T::from_value(value)
                .map(Some)
                .ok_or_else(|| self.scalar_error(field, value, T::EXPECTED, T::out_of_range(value))),
        }
    }

    /// Read a required typed field.
    pub fn get<T: FieldValue<'a>>(&self, field: &str) -> Result<T, DocumentError> {
        self.try_get(field)?
            .ok_or_else(|| DocumentError::MissingField {
                path: self.path.clone(),
                field: field.to_string(),
            })
    }

    pub fn read_string(&self, field: &str) -> Result<&'a str, DocumentError> {
        self.get(field)
    }

    pub fn read_int(&self, field: &str) -> Result<i64, DocumentError> {
        self.get(field)
    }

    pub fn read_double(&self, field: &str) -> Result<f64, DocumentError> {
        self.get(field)
    }

    pub fn read_bool(&self, field: &str) -> Result<bool, DocumentError> {
        self.get(field)
    }

    /// Interpret this node itself as a typed scalar (array elements).
    pub fn as_scalar<T: FieldValue<'a>>(&self) -> Result<T, DocumentError> {
        T::from_value(self.value).ok_or_else(|| {
            self.scalar_error("", self.value, T::EXPECTED, T::out_of_range(self.value))
        })
    }

    fn scalar_error(
        &self,
        field: &str,
        value: &Value,
        expected: &'static str,
        out_of_range: bool,
    ) -> DocumentError {
        if out_of_range {
            DocumentError::OutOfRange {
                path: self.path.clone(),
                field: field.to_string(),
                value: value.to_string(),
            }
        } else {
            DocumentError::TypeMismatch {
                path: self.path.clone(),
                field: field.to_string(),
                expected,
            }
        }
    }

    /// View a required array member.
    pub fn elements(&self, field: &str) -> Result<Elements<'a>, DocumentError> {
        let node = self.member(field)?;
        let items = node
            .value
            .as_array()
            .ok_or_else(|| DocumentError::TypeMismatch {
                path: self.path.clone(),
                field: field.to_string(),
                expected: "an array",
            })?;
        Ok(Elements {
            items: items.as_slice(),
            path: node.path,
        })
    }
}

/// A snapshot view over a JSON array.
///
/// The element count is fixed at construction; reads of sibling fields can
/// never change it.
#[derive(Debug, Clone)]
pub struct Elements<'a> {
    items: &'a [Value],
    path: String,
}

impl<'a> Elements<'a> {
    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn element_at(&self, index: usize) -> Result<Node<'a>, DocumentError> {
        self.items
            .get(index)
            .map(|value| Node {
                value,
                path: format!("{}[{index}]", self.path),
            })
            .ok_or_else(|| DocumentError::IndexOutOfRange {
                path: self.path.clone(),
                index,
                len: self.items.len(),
            })
    }

    /// Iterate elements in array order. Restartable: each call starts over.
    pub fn iter(&self) -> impl Iterator<Item = Node<'a>> + '_ {
        self.items.iter().enumerate().map(|(index, value)| Node {
            value,
            path: format!("{}[{index}]", self.path),
        })
    }
}
