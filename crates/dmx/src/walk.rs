//! Cycle-safe traversal of the element graph.
//!
//! There is one depth-first walk, starting at the root. It visits each
//! reachable element exactly once (guarded by a seen set keyed by handle) and
//! reports every reference slot it crosses, including slots pointing at
//! elements it has already visited. What the walk is *for* is decided by the
//! [`Visitor`]:
//!
//! - [`StringDictionary`]: the binary encoding's interned string table
//! - [`DiscoveryOrder`]: the preorder used for reference-by-index
//! - [`UserCounts`]: how many slots reference each element
//!
//! The walk uses an explicit stack, so long reference chains do not grow the
//! call stack.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::model::{DataModel, Element, ElementHandle, Value};

/// Receives events from [`walk`].
pub trait Visitor {
    /// Called once per reachable element, in discovery preorder.
    fn enter(&mut self, _handle: ElementHandle, _element: &Element) {}

    /// Called for every attribute slot in `from` that references `target`.
    fn reference(&mut self, _from: ElementHandle, _target: ElementHandle) {}
}

impl<A: Visitor, B: Visitor> Visitor for (A, B) {
    fn enter(&mut self, handle: ElementHandle, element: &Element) {
        self.0.enter(handle, element);
        self.1.enter(handle, element);
    }

    fn reference(&mut self, from: ElementHandle, target: ElementHandle) {
        self.0.reference(from, target);
        self.1.reference(from, target);
    }
}

/// Position inside one element's reference slots.
struct Frame {
    handle: ElementHandle,
    attribute: usize,
    item: usize,
}

impl Frame {
    fn new(handle: ElementHandle) -> Self {
        Self {
            handle,
            attribute: 0,
            item: 0,
        }
    }

    /// Returns the next non-null reference target, in declaration order.
    fn advance(&mut self, element: &Element) -> Option<ElementHandle> {
        let attributes = element.attributes();
        while let Some(attribute) = attributes.get(self.attribute) {
            match attribute.value() {
                Value::Element(target) => {
                    if self.item == 0 {
                        self.item = 1;
                        if let Some(target) = target {
                            return Some(*target);
                        }
                    }
                }
                Value::ElementArray(items) => {
                    while let Some(item) = items.get(self.item) {
                        self.item += 1;
                        if let Some(target) = item {
                            return Some(*target);
                        }
                    }
                }
                _ => {}
            }
            self.attribute += 1;
            self.item = 0;
        }
        None
    }
}

/// Walks every element reachable from the root.
///
/// Each element's references are followed in attribute declaration order, and
/// an unseen target is fully explored before the next slot is considered.
pub fn walk<V: Visitor>(model: &DataModel, visitor: &mut V) {
    let Some(root) = model.root() else {
        return;
    };

    let mut seen = FxHashSet::default();
    seen.insert(root);
    visitor.enter(root, &model[root]);
    let mut stack = vec![Frame::new(root)];

    loop {
        let Some(frame) = stack.last_mut() else {
            break;
        };
        let from = frame.handle;
        match frame.advance(&model[from]) {
            Some(target) => {
                visitor.reference(from, target);
                if seen.insert(target) {
                    visitor.enter(target, &model[target]);
                    stack.push(Frame::new(target));
                }
            }
            None => {
                stack.pop();
            }
        }
    }
}

/// Collects reachable elements in discovery preorder.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOrder {
    order: Vec<ElementHandle>,
}

impl DiscoveryOrder {
    pub fn into_vec(self) -> Vec<ElementHandle> {
        self.order
    }
}

impl Visitor for DiscoveryOrder {
    fn enter(&mut self, handle: ElementHandle, _element: &Element) {
        self.order.push(handle);
    }
}

/// Counts how many attribute slots reference each element.
///
/// The root has no implicit self-reference: its count is only the number of
/// slots elsewhere in the graph that point back at it.
#[derive(Debug, Clone, Default)]
pub struct UserCounts {
    counts: FxHashMap<ElementHandle, usize>,
}

impl UserCounts {
    /// Returns the number of slots referencing `element`.
    pub fn get(&self, element: ElementHandle) -> usize {
        self.counts.get(&element).copied().unwrap_or(0)
    }
}

impl Visitor for UserCounts {
    fn reference(&mut self, _from: ElementHandle, target: ElementHandle) {
        *self.counts.entry(target).or_insert(0) += 1;
    }
}

/// Deduplicated, order-stable string table for the binary encoding.
///
/// Records element names, element types, attribute names and scalar string
/// values. Members of string arrays are never interned; the binary encoding
/// always writes them literally.
#[derive(Debug, Clone, Default)]
pub struct StringDictionary {
    strings: Vec<String>,
    indices: FxHashMap<String, usize>,
}

impl StringDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or gets the index for a string.
    pub fn add(&mut self, s: &str) -> usize {
        if let Some(&idx) = self.indices.get(s) {
            idx
        } else {
            let idx = self.strings.len();
            self.strings.push(s.to_string());
            self.indices.insert(s.to_string(), idx);
            idx
        }
    }

    /// Returns the index of a string already in the table.
    pub fn index_of(&self, s: &str) -> Option<usize> {
        self.indices.get(s).copied()
    }

    /// Entries in index order.
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Visitor for StringDictionary {
    fn enter(&mut self, _handle: ElementHandle, element: &Element) {
        self.add(element.name());
        self.add(element.element_type());
        for attribute in element.attributes() {
            self.add(attribute.name());
            if let Value::String(s) = attribute.value() {
                self.add(s);
            }
        }
    }
}

/// Returns reachable elements in discovery preorder, root first.
pub fn discovery_order(model: &DataModel) -> Vec<ElementHandle> {
    let mut order = DiscoveryOrder::default();
    walk(model, &mut order);
    order.into_vec()
}

/// Counts the users of every reachable element.
pub fn user_counts(model: &DataModel) -> UserCounts {
    let mut counts = UserCounts::default();
    walk(model, &mut counts);
    counts
}

/// Builds the binary string dictionary for the reachable graph.
pub fn string_dictionary(model: &DataModel) -> StringDictionary {
    let mut dictionary = StringDictionary::new();
    walk(model, &mut dictionary);
    dictionary
}
