use crate::element::Element;
use crate::error::ConfigError;
use crate::options::Options;
use crate::tree::{Arena, NodeId, ROOT, Value};
use crate::value::{Coerce, Key, Scalar};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// A handle to one position in a configuration tree.
///
/// Handles are cheap to clone and share the tree they were obtained from:
/// writing through any handle is visible through every other handle to the
/// same position. A handle to a path that does not exist yet is *virtual*;
/// the first write through it materializes the path.
#[derive(Clone)]
pub struct Node {
    pub(crate) arena: Rc<RefCell<Arena>>,
    pub(crate) base: NodeId,
    pub(crate) path: Vec<Key>,
}

enum Prepared {
    Alias(NodeId),
    Graft(Rc<RefCell<Arena>>, NodeId),
    Fresh(Value),
}

impl Node {
    /// An empty detached root with default options.
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        Self {
            arena: Rc::new(RefCell::new(Arena::new(options))),
            base: ROOT,
            path: Vec::new(),
        }
    }

    fn bound(&self, id: NodeId) -> Node {
        Node {
            arena: Rc::clone(&self.arena),
            base: id,
            path: Vec::new(),
        }
    }

    pub(crate) fn id(&self) -> Option<NodeId> {
        self.arena.borrow().resolve(self.base, &self.path)
    }

    pub(crate) fn ensure(&self) -> NodeId {
        self.arena.borrow_mut().materialize(self.base, &self.path)
    }

    fn read<R>(&self, f: impl FnOnce(&Value) -> R) -> Option<R> {
        let id = self.id()?;
        let arena = self.arena.borrow();
        Some(f(arena.value(id)))
    }

    pub fn options(&self) -> Options {
        self.arena.borrow().options
    }

    /// The child at `key`. Virtual if it does not exist yet.
    pub fn child(&self, key: impl Into<Key>) -> Node {
        let key = key.into();
        match self.id() {
            Some(id) => {
                let found = self.arena.borrow().lookup(id, &key);
                match found {
                    Some(child) => self.bound(child),
                    None => Node {
                        arena: Rc::clone(&self.arena),
                        base: id,
                        path: vec![key],
                    },
                }
            }
            None => {
                let mut path = self.path.clone();
                path.push(key);
                Node {
                    arena: Rc::clone(&self.arena),
                    base: self.base,
                    path,
                }
            }
        }
    }

    /// Walks several segments at once.
    pub fn at<I, K>(&self, path: I) -> Node
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        path.into_iter().fold(self.clone(), |node, key| node.child(key))
    }

    pub fn is_virtual(&self) -> bool {
        self.id().is_none()
    }

    /// No value, or a list/map with no children.
    pub fn is_empty(&self) -> bool {
        self.read(|v| match v {
            Value::Absent => true,
            Value::Scalar(_) => false,
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
        })
        .unwrap_or(true)
    }

    pub fn is_list(&self) -> bool {
        self.read(|v| matches!(v, Value::List(_))).unwrap_or(false)
    }

    pub fn is_map(&self) -> bool {
        self.read(|v| matches!(v, Value::Map(_))).unwrap_or(false)
    }

    pub fn is_scalar(&self) -> bool {
        self.read(|v| matches!(v, Value::Scalar(_))).unwrap_or(false)
    }

    pub(crate) fn has_value(&self) -> bool {
        self.read(|v| *v != Value::Absent).unwrap_or(false)
    }

    pub fn scalar(&self) -> Option<Scalar> {
        self.read(|v| match v {
            Value::Scalar(s) => Some(s.clone()),
            _ => None,
        })
        .flatten()
    }

    /// The stored scalar coerced to `T`, without touching the tree.
    pub fn try_get<T: Coerce>(&self) -> Option<T> {
        self.scalar().as_ref().and_then(T::coerce)
    }

    /// The stored scalar coerced to `T`, or `default`.
    ///
    /// When the node holds no value and the tree copies defaults, `default`
    /// is written into the node.
    pub fn get<T: Coerce>(&self, default: T) -> T {
        if let Some(value) = self.try_get() {
            return value;
        }
        if !self.has_value() && self.options().copy_defaults {
            self.set(Element::Scalar(default.clone().into()));
        }
        default
    }

    pub fn get_at<T: Coerce>(&self, key: impl Into<Key>, default: T) -> T {
        self.child(key).get(default)
    }

    pub fn require_at<T: Coerce>(&self, key: impl Into<Key>) -> Result<T, ConfigError> {
        let key = key.into();
        self.child(&key)
            .try_get()
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    pub fn get_with<T>(&self, mapper: impl FnOnce(&Node) -> T) -> T {
        mapper(self)
    }

    pub fn get_with_at<T>(&self, key: impl Into<Key>, mapper: impl FnOnce(&Node) -> T) -> T {
        mapper(&self.child(key))
    }

    pub fn get_list<T>(&self, mapper: impl FnMut(&Node) -> T) -> Vec<T> {
        self.child_list().iter().map(mapper).collect()
    }

    pub fn get_list_at<T>(&self, key: impl Into<Key>, mapper: impl FnMut(&Node) -> T) -> Vec<T> {
        self.child(key).get_list(mapper)
    }

    pub fn get_map<T>(&self, mut mapper: impl FnMut(&Node) -> T) -> IndexMap<Key, T> {
        self.child_map()
            .into_iter()
            .map(|(key, node)| (key, mapper(&node)))
            .collect()
    }

    pub fn get_map_at<T>(
        &self,
        key: impl Into<Key>,
        mapper: impl FnMut(&Node) -> T,
    ) -> IndexMap<Key, T> {
        self.child(key).get_map(mapper)
    }

    /// Replaces the whole value of this node. A node payload is copied, not aliased.
    pub fn set(&self, element: impl Into<Element>) -> &Self {
        match element.into() {
            Element::Empty => self.clear(),
            Element::Scalar(s) => {
                let id = self.ensure();
                self.arena.borrow_mut().set_value(id, Value::Scalar(s));
            }
            Element::Node(other) => self.replace_with(&other),
            Element::Rejected(e) => {
                debug!(error = %e, "Ignored rejected value");
            }
        }
        self
    }

    pub fn set_at(&self, key: impl Into<Key>, element: impl Into<Element>) -> &Self {
        self.child(key).set(element);
        self
    }

    fn replace_with(&self, other: &Node) {
        let Some(src) = other.id() else {
            self.clear();
            return;
        };
        let id = self.ensure();
        if Rc::ptr_eq(&self.arena, &other.arena) {
            if src == id {
                return;
            }
            let mut arena = self.arena.borrow_mut();
            let value = arena.clone_value(src);
            arena.set_value(id, value);
        } else {
            let source = other.arena.borrow();
            let mut arena = self.arena.borrow_mut();
            let value = arena.graft_value(&source, src);
            arena.set_value(id, value);
        }
    }

    /// Replaces this node's value with a list. Elements that fail to normalize are dropped.
    pub fn set_list<I>(&self, elements: I) -> &Self
    where
        I: IntoIterator,
        I::Item: Into<Element>,
    {
        if let Err(e) = self.write_list(elements, false, false) {
            debug!(error = %e, "List write failed");
        }
        self
    }

    /// Like [`Node::set_list`], but writes nothing if any element is rejected.
    pub fn try_set_list<I>(&self, elements: I) -> Result<&Self, ConfigError>
    where
        I: IntoIterator,
        I::Item: Into<Element>,
    {
        self.write_list(elements, false, true)?;
        Ok(self)
    }

    /// Appends to the current list children. Returns how many elements were dropped.
    pub fn add_all<I>(&self, elements: I) -> usize
    where
        I: IntoIterator,
        I::Item: Into<Element>,
    {
        self.write_list(elements, true, false).unwrap_or_default()
    }

    pub fn try_add_all<I>(&self, elements: I) -> Result<&Self, ConfigError>
    where
        I: IntoIterator,
        I::Item: Into<Element>,
    {
        self.write_list(elements, true, true)?;
        Ok(self)
    }

    /// Replaces this node's value with a map. Entries that fail to normalize are dropped.
    pub fn set_map<I, K, E>(&self, entries: I) -> &Self
    where
        I: IntoIterator<Item = (K, E)>,
        K: Into<Key>,
        E: Into<Element>,
    {
        if let Err(e) = self.write_map(entries, false, false) {
            debug!(error = %e, "Map write failed");
        }
        self
    }

    pub fn try_set_map<I, K, E>(&self, entries: I) -> Result<&Self, ConfigError>
    where
        I: IntoIterator<Item = (K, E)>,
        K: Into<Key>,
        E: Into<Element>,
    {
        self.write_map(entries, false, true)?;
        Ok(self)
    }

    /// Merges into the current map children. Returns how many entries were dropped.
    pub fn put_all<I, K, E>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = (K, E)>,
        K: Into<Key>,
        E: Into<Element>,
    {
        self.write_map(entries, true, false).unwrap_or_default()
    }

    pub fn try_put_all<I, K, E>(&self, entries: I) -> Result<&Self, ConfigError>
    where
        I: IntoIterator<Item = (K, E)>,
        K: Into<Key>,
        E: Into<Element>,
    {
        self.write_map(entries, true, true)?;
        Ok(self)
    }

    fn prepare(&self, element: Element) -> Result<Prepared, String> {
        match element {
            Element::Empty => Ok(Prepared::Fresh(Value::Absent)),
            Element::Scalar(s) => Ok(Prepared::Fresh(Value::Scalar(s))),
            Element::Rejected(e) => Err(e),
            Element::Node(node) => Ok(match node.id() {
                None => Prepared::Fresh(Value::Absent),
                Some(id) if Rc::ptr_eq(&node.arena, &self.arena) => Prepared::Alias(id),
                Some(id) => Prepared::Graft(Rc::clone(&node.arena), id),
            }),
        }
    }

    fn prepare_all<K>(
        &self,
        entries: impl IntoIterator<Item = (K, Element)>,
        strict: bool,
    ) -> Result<(Vec<(K, Prepared)>, usize), ConfigError> {
        let mut prepared = Vec::new();
        let mut rejected = Vec::new();
        for (key, element) in entries {
            match self.prepare(element) {
                Ok(p) => prepared.push((key, p)),
                Err(e) => rejected.push(e),
            }
        }

        if let Some(first) = rejected.first() {
            if strict {
                return Err(ConfigError::RejectedElements {
                    count: rejected.len(),
                    first: first.clone(),
                });
            }
            debug!(dropped = rejected.len(), first = %first, "Dropped elements that could not be normalized");
        }
        Ok((prepared, rejected.len()))
    }

    fn place(arena: &mut Arena, target: NodeId, prepared: Prepared) -> NodeId {
        match prepared {
            // aliasing an ancestor would make the tree cyclic
            Prepared::Alias(id) if arena.reaches(id, target) => arena.deep_copy(id),
            Prepared::Alias(id) => id,
            Prepared::Graft(source, id) => arena.graft(&source.borrow(), id),
            Prepared::Fresh(value) => arena.alloc(value),
        }
    }

    fn write_list<I>(&self, elements: I, append: bool, strict: bool) -> Result<usize, ConfigError>
    where
        I: IntoIterator,
        I::Item: Into<Element>,
    {
        let (prepared, dropped) =
            self.prepare_all(elements.into_iter().map(|e| ((), e.into())), strict)?;

        let target = self.ensure();
        let mut arena = self.arena.borrow_mut();
        let mut items = match (append, arena.value(target)) {
            (true, Value::List(items)) => items.clone(),
            _ => Vec::new(),
        };
        for ((), p) in prepared {
            items.push(Self::place(&mut arena, target, p));
        }
        arena.set_value(target, Value::List(items));
        Ok(dropped)
    }

    fn write_map<I, K, E>(&self, entries: I, merge: bool, strict: bool) -> Result<usize, ConfigError>
    where
        I: IntoIterator<Item = (K, E)>,
        K: Into<Key>,
        E: Into<Element>,
    {
        let (prepared, dropped) = self.prepare_all(
            entries.into_iter().map(|(k, e)| (k.into(), e.into())),
            strict,
        )?;

        let target = self.ensure();
        let mut arena = self.arena.borrow_mut();
        let mut map = match (merge, arena.value(target)) {
            (true, Value::Map(map)) => map.clone(),
            _ => IndexMap::new(),
        };
        for (key, p) in prepared {
            let id = Self::place(&mut arena, target, p);
            map.insert(key.named(), id);
        }
        arena.set_value(target, Value::Map(map));
        Ok(dropped)
    }

    pub fn comment(&self) -> String {
        self.id()
            .and_then(|id| self.arena.borrow().slot(id).comment.clone())
            .unwrap_or_default()
    }

    pub fn set_comment(&self, comment: impl Into<String>) -> &Self {
        let id = self.ensure();
        self.arena.borrow_mut().slot_mut(id).comment = Some(comment.into());
        self
    }

    /// Drops the value and all children. A virtual node stays virtual.
    pub fn clear(&self) {
        if let Some(id) = self.id() {
            self.arena.borrow_mut().set_value(id, Value::Absent);
        }
    }

    pub fn child_list(&self) -> Vec<Node> {
        let items = self
            .read(|v| match v {
                Value::List(items) => items.clone(),
                _ => Vec::new(),
            })
            .unwrap_or_default();
        items.into_iter().map(|id| self.bound(id)).collect()
    }

    pub fn child_map(&self) -> IndexMap<Key, Node> {
        let entries: Vec<(Key, NodeId)> = self
            .read(|v| match v {
                Value::Map(map) => map.iter().map(|(k, id)| (k.clone(), *id)).collect(),
                _ => Vec::new(),
            })
            .unwrap_or_default();
        entries
            .into_iter()
            .map(|(key, id)| (key, self.bound(id)))
            .collect()
    }

    /// Visits list children in order, then map children in insertion order.
    pub fn iterate(&self, mut visitor: impl FnMut(&Node)) {
        for node in self.child_list() {
            visitor(&node);
        }
        for node in self.child_map().values() {
            visitor(node);
        }
    }

    /// Visits map children only.
    pub fn iterate_entries(&self, mut visitor: impl FnMut(&Key, &Node)) {
        for (key, node) in &self.child_map() {
            visitor(key, node);
        }
    }

    pub fn fingerprint(&self) -> [u8; 32] {
        match self.id() {
            Some(id) => self.arena.borrow().fingerprint(id),
            None => Arena::new(Options::default()).fingerprint(ROOT),
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("base", &self.base)
            .field("path", &self.path)
            .finish()
    }
}

fn render(arena: &Arena, id: NodeId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match arena.value(id) {
        Value::Absent => f.write_str("empty"),
        Value::Scalar(s) => write!(f, "{}", s),
        Value::List(items) => {
            f.write_str("[")?;
            for (i, child) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                render(arena, *child, f)?;
            }
            f.write_str("]")
        }
        Value::Map(map) => {
            f.write_str("{")?;
            for (i, (key, child)) in map.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}=", key)?;
                render(arena, *child, f)?;
            }
            f.write_str("}")
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Some(id) => render(&self.arena.borrow(), id, f),
            None => f.write_str("empty"),
        }
    }
}
