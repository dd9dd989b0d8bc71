//! Elements and their attributes.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::error::ModelError;
use crate::model::{Id, Value, ValueKind};

/// Handle to an element inside a [`DataModel`](crate::model::DataModel).
///
/// Handles are slot indices into the model's element arena. They are plain
/// copyable values and never own the element they point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementHandle(pub(crate) usize);

impl ElementHandle {
    /// Returns the arena slot of this handle.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named, typed value owned by exactly one element.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: String,
    value: Value,
}

impl Attribute {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }
}

/// A named, typed graph node with an ordered set of attributes.
#[derive(Debug, Clone)]
pub struct Element {
    id: Id,
    name: String,
    element_type: String,
    attributes: Vec<Attribute>,
    attribute_indices: FxHashMap<String, usize>,
}

impl Element {
    pub(crate) fn new(id: Id, name: String, element_type: String) -> Self {
        Self {
            id,
            name,
            element_type,
            attributes: Vec::new(),
            attribute_indices: FxHashMap::default(),
        }
    }

    /// The element's identity.
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// The element's name (not unique, carries no identity).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The element's class name, e.g. `DmElement`.
    pub fn element_type(&self) -> &str {
        &self.element_type
    }

    /// Attributes in insertion order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Looks up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attribute_indices
            .get(name)
            .map(|&index| &self.attributes[index])
    }

    /// Looks up an attribute's value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attribute(name).map(Attribute::value)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns true if the element has no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub(crate) fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Appends an attribute, rejecting duplicate and reserved names.
    pub(crate) fn insert(&mut self, name: String, value: Value) -> Result<(), ModelError> {
        validate_attribute_name(&name)?;
        value.validate()?;
        if self.attribute_indices.contains_key(&name) {
            return Err(ModelError::DuplicateAttribute {
                element: self.name.clone(),
                attribute: name,
            });
        }
        self.attribute_indices.insert(name.clone(), self.attributes.len());
        self.attributes.push(Attribute { name, value });
        Ok(())
    }

    pub(crate) fn value_mut(&mut self, name: &str) -> Option<&mut Value> {
        let index = *self.attribute_indices.get(name)?;
        Some(&mut self.attributes[index].value)
    }
}

/// Attribute names that collide with the element header lines of the text encoding.
pub const RESERVED_ATTRIBUTE_NAMES: [&str; 2] = ["id", "name"];

fn validate_attribute_name(name: &str) -> Result<(), ModelError> {
    if name.is_empty() {
        return Err(ModelError::EmptyName {
            field: "attribute name",
        });
    }
    if name.contains('\0') {
        return Err(ModelError::ContainsNul {
            field: "attribute name",
        });
    }
    if RESERVED_ATTRIBUTE_NAMES.contains(&name) {
        return Err(ModelError::ReservedAttributeName {
            name: name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NIL_ID;

    fn element() -> Element {
        Element::new(NIL_ID, "e1".to_string(), "DmElement".to_string())
    }

    #[test]
    fn test_insert_preserves_order() {
        let mut e = element();
        e.insert("z".to_string(), Value::Int(1)).unwrap();
        e.insert("a".to_string(), Value::Int(2)).unwrap();
        e.insert("m".to_string(), Value::Int(3)).unwrap();

        let names: Vec<_> = e.attributes().iter().map(Attribute::name).collect();
        assert_eq!(names, ["z", "a", "m"]);
        assert_eq!(e.get("a"), Some(&Value::Int(2)));
        assert_eq!(e.len(), 3);
    }

    #[test]
    fn test_duplicate_attribute_rejected() {
        let mut e = element();
        e.insert("x".to_string(), Value::Int(1)).unwrap();
        let result = e.insert("x".to_string(), Value::Float(2.0));
        assert!(matches!(result, Err(ModelError::DuplicateAttribute { .. })));
        assert_eq!(e.get("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_bad_attribute_names_rejected() {
        let mut e = element();
        assert!(matches!(
            e.insert(String::new(), Value::Int(1)),
            Err(ModelError::EmptyName { .. })
        ));
        assert!(matches!(
            e.insert("a\0".to_string(), Value::Int(1)),
            Err(ModelError::ContainsNul { .. })
        ));
        assert!(matches!(
            e.insert("name".to_string(), Value::from("x")),
            Err(ModelError::ReservedAttributeName { .. })
        ));
        assert!(e.is_empty());
    }

    #[test]
    fn test_value_mut() {
        let mut e = element();
        e.insert("child".to_string(), Value::Element(None)).unwrap();
        *e.value_mut("child").unwrap() = Value::Element(Some(ElementHandle(3)));
        assert_eq!(e.get("child").and_then(Value::as_element), Some(ElementHandle(3)));
        assert!(e.value_mut("missing").is_none());
    }
}
