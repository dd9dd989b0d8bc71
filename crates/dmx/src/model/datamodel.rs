//! The root container owning every element.

use std::ops::Index;
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::codec::{self, Encoding, ReadOptions};
use crate::error::{DecodeError, DmxError, EncodeError, ModelError};
use crate::model::{new_id, Attribute, Element, ElementHandle, Id, Value};

/// An element graph with a format name and version.
///
/// The model is an arena: it exclusively owns every element, and elements
/// refer to each other only through [`ElementHandle`]s. The first element
/// ever added is the root. Elements are never removed.
#[derive(Debug, Clone)]
pub struct DataModel {
    format: String,
    format_version: i32,
    elements: Vec<Element>,
    id_index: FxHashMap<Id, ElementHandle>,
    unresolved: Vec<ElementHandle>,
}

impl DataModel {
    /// Creates an empty model.
    ///
    /// The format name appears as a token in the file header, so it must be
    /// non-empty and free of whitespace.
    pub fn new(format: impl Into<String>, format_version: i32) -> Result<Self, ModelError> {
        let format = format.into();
        if format.is_empty() {
            return Err(ModelError::EmptyName { field: "format" });
        }
        if format.chars().any(char::is_whitespace) || format.contains('\0') {
            return Err(ModelError::InvalidFormatName { name: format });
        }
        Ok(Self {
            format,
            format_version,
            elements: Vec::new(),
            id_index: FxHashMap::default(),
            unresolved: Vec::new(),
        })
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn format_version(&self) -> i32 {
        self.format_version
    }

    /// The root element: the first element ever added.
    pub fn root(&self) -> Option<ElementHandle> {
        (!self.elements.is_empty()).then_some(ElementHandle(0))
    }

    /// Adds an element with a freshly generated id.
    pub fn add_element(
        &mut self,
        name: impl Into<String>,
        element_type: impl Into<String>,
    ) -> Result<ElementHandle, ModelError> {
        self.add_element_with_id(name, element_type, new_id())
    }

    /// Adds an element with a caller-chosen id.
    pub fn add_element_with_id(
        &mut self,
        name: impl Into<String>,
        element_type: impl Into<String>,
        id: Id,
    ) -> Result<ElementHandle, ModelError> {
        let name = name.into();
        let element_type = element_type.into();
        if name.contains('\0') {
            return Err(ModelError::ContainsNul {
                field: "element name",
            });
        }
        if element_type.is_empty() {
            return Err(ModelError::EmptyName {
                field: "element type",
            });
        }
        if element_type.contains('\0') {
            return Err(ModelError::ContainsNul {
                field: "element type",
            });
        }
        if self.id_index.contains_key(&id) {
            return Err(ModelError::DuplicateElementId { id });
        }

        let handle = ElementHandle(self.elements.len());
        self.elements.push(Element::new(id, name, element_type));
        self.id_index.insert(id, handle);
        Ok(handle)
    }

    /// Returns the element behind a handle, or `None` for a foreign handle.
    pub fn get(&self, element: ElementHandle) -> Option<&Element> {
        self.elements.get(element.0)
    }

    /// Looks up an element by id.
    pub fn element_by_id(&self, id: &Id) -> Option<ElementHandle> {
        self.id_index.get(id).copied()
    }

    /// Returns the first element with the given name.
    pub fn find_element(&self, name: &str) -> Option<ElementHandle> {
        self.elements
            .iter()
            .position(|e| e.name() == name)
            .map(ElementHandle)
    }

    /// Handles of every element in creation order, reachable or not.
    pub fn handles(&self) -> impl Iterator<Item = ElementHandle> + use<> {
        (0..self.elements.len()).map(ElementHandle)
    }

    /// Number of elements in the registry.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Adds an attribute to an element.
    ///
    /// Rejects duplicate or reserved names and element references that do
    /// not point into this model.
    pub fn add_attribute(
        &mut self,
        element: ElementHandle,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), ModelError> {
        let value = value.into();
        self.check_handle(element)?;
        match &value {
            Value::Element(Some(target)) => self.check_handle(*target)?,
            Value::ElementArray(items) => {
                for target in items.iter().flatten() {
                    self.check_handle(*target)?;
                }
            }
            _ => {}
        }
        self.elements[element.0].insert(name.into(), value)
    }

    /// Looks up an attribute of an element.
    pub fn attribute(&self, element: ElementHandle, name: &str) -> Option<&Attribute> {
        self.get(element)?.attribute(name)
    }

    /// Placeholder elements created for ids that a text parse referenced but
    /// never defined. Empty unless the parse was restricted by an element path.
    pub fn unresolved(&self) -> &[ElementHandle] {
        &self.unresolved
    }

    /// Serializes the model to an in-memory buffer.
    pub fn encode(&self, encoding: Encoding, version: i32) -> Result<Vec<u8>, EncodeError> {
        codec::encode(self, encoding, version)
    }

    /// Serializes the model to a file.
    pub fn save(
        &self,
        path: impl AsRef<Path>,
        encoding: Encoding,
        version: i32,
    ) -> Result<(), DmxError> {
        codec::save(self, path, encoding, version)
    }

    /// Parses a model from an in-memory buffer in either encoding.
    pub fn decode(input: &[u8]) -> Result<Self, DecodeError> {
        codec::decode(input)
    }

    /// Parses a model from a file in either encoding.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DmxError> {
        codec::load(path, &ReadOptions::default())
    }

    fn check_handle(&self, element: ElementHandle) -> Result<(), ModelError> {
        if element.0 < self.elements.len() {
            Ok(())
        } else {
            Err(ModelError::UnknownElement { index: element.0 })
        }
    }

    pub(crate) fn reassign_id(&mut self, element: ElementHandle, id: Id) -> Result<(), ModelError> {
        let current = *self.elements[element.0].id();
        if current == id {
            return Ok(());
        }
        if self.id_index.contains_key(&id) {
            return Err(ModelError::DuplicateElementId { id });
        }
        self.id_index.remove(&current);
        self.id_index.insert(id, element);
        self.elements[element.0].set_id(id);
        Ok(())
    }

    pub(crate) fn set_name(&mut self, element: ElementHandle, name: String) -> Result<(), ModelError> {
        if name.contains('\0') {
            return Err(ModelError::ContainsNul {
                field: "element name",
            });
        }
        self.elements[element.0].set_name(name);
        Ok(())
    }

    pub(crate) fn value_mut(&mut self, element: ElementHandle, name: &str) -> Option<&mut Value> {
        self.elements.get_mut(element.0)?.value_mut(name)
    }

    pub(crate) fn mark_unresolved(&mut self, element: ElementHandle) {
        self.unresolved.push(element);
    }
}

impl Index<ElementHandle> for DataModel {
    type Output = Element;

    /// # Panics
    ///
    /// Panics if the handle was not issued by this model.
    fn index(&self, element: ElementHandle) -> &Element {
        &self.elements[element.0]
    }
}
