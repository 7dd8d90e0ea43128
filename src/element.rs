use crate::mapper::Serializable;
use crate::node::Node;
use crate::value::Scalar;
use serde::Serialize;

/// A payload accepted by the write operations of [`Node`].
#[derive(Debug, Clone)]
pub enum Element {
    Empty,
    Scalar(Scalar),
    /// An existing node. Inside a list or map from the same tree it is aliased;
    /// anywhere else its content is copied.
    Node(Node),
    /// An element that could not be turned into a node. Dropped by lenient writes.
    Rejected(String),
}

impl Element {
    /// Lets a [`Serializable`] value write itself into a fresh detached node.
    pub fn value<S: Serializable + ?Sized>(value: &S) -> Self {
        let node = Node::new();
        value.to_node(&node);
        Element::Node(node)
    }

    /// Maps any serde value through the JSON bridge.
    pub fn serde<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => {
                let node = Node::new();
                node.set_json(&json);
                Element::Node(node)
            }
            Err(e) => Element::Rejected(e.to_string()),
        }
    }
}

macro_rules! scalar_element {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Element {
                fn from(v: $ty) -> Self {
                    Element::Scalar(Scalar::from(v))
                }
            }
        )*
    };
}

scalar_element!(bool, i32, i64, f32, f64, &str, String);

impl From<&String> for Element {
    fn from(v: &String) -> Self {
        Element::Scalar(Scalar::Str(v.clone()))
    }
}

impl From<Scalar> for Element {
    fn from(v: Scalar) -> Self {
        Element::Scalar(v)
    }
}

impl From<Node> for Element {
    fn from(node: Node) -> Self {
        Element::Node(node)
    }
}

impl From<&Node> for Element {
    fn from(node: &Node) -> Self {
        Element::Node(node.clone())
    }
}

impl<E: Into<Element>> From<Option<E>> for Element {
    fn from(v: Option<E>) -> Self {
        v.map_or(Element::Empty, Into::into)
    }
}
