use confnode::{ConfigError, Deserializable, Element, Node, Options, Serializable};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
struct Server {
    host: String,
    port: i32,
    tls: bool,
}

impl Server {
    fn fallback() -> Self {
        Server {
            host: "localhost".to_string(),
            port: 8080,
            tls: false,
        }
    }
}

impl Serializable for Server {
    fn to_node(&self, node: &Node) {
        node.set_at("host", self.host.as_str());
        node.set_at("port", self.port);
        node.set_at("tls", self.tls);
    }
}

impl Deserializable for Server {
    fn from_node(&self, node: &Node) -> Result<Self, ConfigError> {
        Ok(Server {
            host: node.get_at("host", self.host.clone()),
            port: node.get_at("port", self.port),
            tls: node.get_at("tls", self.tls),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Endpoint {
    url: String,
}

impl Serializable for Endpoint {
    fn to_node(&self, node: &Node) {
        node.set_at("url", self.url.as_str());
    }
}

impl Deserializable for Endpoint {
    fn from_node(&self, node: &Node) -> Result<Self, ConfigError> {
        if !node.child("url").is_scalar() {
            return Err(ConfigError::Missing("url".to_string()));
        }
        Ok(Endpoint {
            url: node.require_at("url")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Person {
    name: String,
    age: i64,
}

fn default_retries() -> i64 {
    3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Limits {
    #[serde(default = "default_retries")]
    retries: i64,
    timeout: f64,
}

#[test]
fn value_type_round_trip() {
    let node = Node::new();
    let server = Server {
        host: "example.org".to_string(),
        port: 443,
        tls: true,
    };
    node.set_value(&server);

    assert_eq!(node.to_json(), json!({ "host": "example.org", "port": 443, "tls": true }));
    assert_eq!(node.get_value(Server::fallback()), server);
}

#[test]
fn empty_node_yields_and_stores_default() {
    let root = Node::new();
    let value = root.get_value_at("server", Server::fallback());

    assert_eq!(value, Server::fallback());
    assert_eq!(root.child("server").get_at("port", 0i32), 8080);
}

#[test]
fn partial_subtree_fills_from_template() {
    let root = Node::new();
    root.child("server").set_at("host", "example.org");

    let value = root.get_value_at("server", Server::fallback());
    assert_eq!(value.host, "example.org");
    assert_eq!(value.port, 8080);
    assert_eq!(root.at(["server", "port"]).try_get::<i32>(), Some(8080));
}

#[test]
fn malformed_subtree_is_healed() {
    let root = Node::new();
    root.child("endpoint").child("url").set_list([1, 2]);
    let fallback = Endpoint {
        url: "https://example.org".to_string(),
    };

    assert_eq!(root.get_value_at("endpoint", fallback.clone()), fallback);
    assert_eq!(
        root.at(["endpoint", "url"]).try_get::<String>(),
        Some(fallback.url.clone())
    );
}

#[test]
fn pure_tree_is_not_healed() {
    let root = Node::with_options(Options::pure());
    assert_eq!(root.get_value_at("server", Server::fallback()), Server::fallback());
    assert!(root.child("server").is_virtual());

    assert_eq!(
        root.bind_with(|| Person {
            name: "Sally".to_string(),
            age: 40,
        })
        .name,
        "Sally"
    );
    assert!(root.is_empty());
}

#[test]
fn value_elements_in_collections() {
    let root = Node::new();
    root.child("servers")
        .set_list([Element::value(&Server::fallback()), Element::value(&Server::fallback())]);
    root.child("servers").child(1).set_at("port", 9090);

    let ports = root.get_list_at("servers", |n| n.get_value(Server::fallback()).port);
    assert_eq!(ports, [8080, 9090]);
}

#[test]
fn bind_copies_default_into_empty_tree() {
    let root = Node::new();
    let harry = Person {
        name: "Harry".to_string(),
        age: 25,
    };

    assert_eq!(root.bind(harry.clone()), harry);
    assert_eq!(root.to_json(), json!({ "name": "Harry", "age": 25 }));
    assert_eq!(
        root.bind(Person {
            name: "Sally".to_string(),
            age: 40,
        }),
        harry
    );
}

#[test]
fn bind_fills_keys_from_serde_defaults() {
    let root = Node::new();
    root.set_at("timeout", 2.5);

    let limits = root.bind(Limits {
        retries: 0,
        timeout: 0.0,
    });
    assert_eq!(limits.retries, 3);
    assert_eq!(limits.timeout, 2.5);
    assert_eq!(root.child("retries").try_get::<i64>(), Some(3));
}

#[test]
fn typed_reads_never_write() {
    let root = Node::new();
    root.child("people").set_list([Element::serde(&Person {
        name: "Ann".to_string(),
        age: 31,
    })]);

    let people: Vec<Person> = root.get_typed_at("people", Vec::new());
    assert_eq!(people.len(), 1);
    assert_eq!(people[0].name, "Ann");

    let missing: Vec<Person> = root.get_typed_at("others", Vec::new());
    assert!(missing.is_empty());
    assert!(root.child("others").is_virtual());
    assert!(root.try_bind::<Person>().is_none());
}

#[test]
fn copy_reports_unserializable_values() {
    let root = Node::new();
    let unencodable: HashMap<(i32, i32), i32> = HashMap::from([((1, 2), 3)]);

    assert!(!root.child("bad").copy(&unencodable));
    assert!(root.child("bad").is_virtual());
    assert!(root.child("good").copy(&vec!["a", "b"]));
    assert_eq!(root.child("good").child_list().len(), 2);
}

#[test]
fn options_bind_from_a_tree() {
    let root = Node::new();
    root.set_at("copy_defaults", false);
    assert_eq!(root.bind(Options::default()), Options::pure());

    let empty = Node::new();
    assert_eq!(empty.child("opts").bind(Options::pure()), Options::pure());
}
