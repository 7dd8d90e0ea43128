//! Document syntaxes. An adapter owns everything textual; the tree never sees text.

use crate::element::Element;
use crate::error::ConfigError;
use crate::node::Node;
use crate::options::Options;
use crate::value::{Key, Scalar};
use serde_json::{Map, Value as JsonValue};
use std::fmt::Debug;
use std::path::Path;
use toml_edit::{Array, ArrayOfTables, Decor, DocumentMut, InlineTable, Item, Table, Value as TomlValue};

pub trait Format: Debug {
    fn name(&self) -> &'static str;

    fn read(&self, text: &str, options: Options) -> Result<Node, ConfigError>;

    fn write(&self, node: &Node) -> Result<String, ConfigError>;
}

#[derive(Debug, Clone, Copy)]
pub struct Json {
    pub pretty: bool,
}

impl Default for Json {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl Format for Json {
    fn name(&self) -> &'static str {
        "json"
    }

    fn read(&self, text: &str, options: Options) -> Result<Node, ConfigError> {
        let json: JsonValue = serde_json::from_str(text)?;
        let node = Node::with_options(options);
        node.set_json(&json);
        Ok(node)
    }

    fn write(&self, node: &Node) -> Result<String, ConfigError> {
        let json = match node.to_json() {
            JsonValue::Null => JsonValue::Object(Map::new()),
            json => json,
        };
        let mut text = if self.pretty {
            serde_json::to_string_pretty(&json)?
        } else {
            serde_json::to_string(&json)?
        };
        text.push('\n');
        Ok(text)
    }
}

/// TOML documents. The root must be a table; an empty tree writes an empty document.
///
/// Node comments are written as `#` lines above their key or table header and
/// read back from the same place. Lists of tables carry comments per table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Toml;

impl Format for Toml {
    fn name(&self) -> &'static str {
        "toml"
    }

    fn read(&self, text: &str, options: Options) -> Result<Node, ConfigError> {
        let doc: DocumentMut = text.parse()?;
        let node = Node::with_options(options);
        read_table(doc.as_table(), &node);
        Ok(node)
    }

    fn write(&self, node: &Node) -> Result<String, ConfigError> {
        if node.is_scalar() || node.is_list() {
            return Err(ConfigError::UnsupportedRoot {
                format: self.name(),
                found: node_kind(node).to_string(),
            });
        }
        let mut doc = DocumentMut::new();
        write_table(node, doc.as_table_mut());
        Ok(doc.to_string())
    }
}

fn node_kind(node: &Node) -> &'static str {
    if node.is_scalar() {
        "scalar"
    } else if node.is_list() {
        "list"
    } else if node.is_map() {
        "map"
    } else {
        "empty"
    }
}

fn comment_of(decor: &Decor) -> Option<String> {
    let raw = decor.prefix()?.as_str()?;
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix('#'))
        .map(|line| line.strip_prefix(' ').unwrap_or(line))
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn comment_lines(comment: &str, leading: &str) -> String {
    let mut prefix = leading.to_string();
    for line in comment.lines() {
        prefix.push_str("# ");
        prefix.push_str(line);
        prefix.push('\n');
    }
    prefix
}

fn read_table(table: &Table, node: &Node) {
    node.set_map(Vec::<(Key, Element)>::new());
    for (key, item) in table.iter() {
        let child = node.child(key);
        read_item(item, &child);
        let comment = match item {
            Item::Table(sub) => comment_of(sub.decor()),
            _ => table.key(key).and_then(|k| comment_of(k.leaf_decor())),
        };
        if let Some(comment) = comment {
            child.set_comment(comment);
        }
    }
}

fn read_item(item: &Item, node: &Node) {
    match item {
        Item::None => {}
        Item::Value(value) => read_value(value, node),
        Item::Table(table) => read_table(table, node),
        Item::ArrayOfTables(tables) => {
            node.set_list(Vec::<Element>::new());
            for (i, table) in tables.iter().enumerate() {
                let entry = node.child(i);
                read_table(table, &entry);
                if let Some(comment) = comment_of(table.decor()) {
                    entry.set_comment(comment);
                }
            }
        }
    }
}

fn read_value(value: &TomlValue, node: &Node) {
    match value {
        TomlValue::String(v) => {
            node.set(v.value().as_str());
        }
        TomlValue::Integer(v) => {
            node.set(*v.value());
        }
        TomlValue::Float(v) => {
            node.set(*v.value());
        }
        TomlValue::Boolean(v) => {
            node.set(*v.value());
        }
        TomlValue::Datetime(v) => {
            node.set(v.value().to_string());
        }
        TomlValue::Array(items) => {
            node.set_list(Vec::<Element>::new());
            for (i, item) in items.iter().enumerate() {
                read_value(item, &node.child(i));
            }
        }
        TomlValue::InlineTable(table) => {
            node.set_map(Vec::<(Key, Element)>::new());
            for (key, item) in table.iter() {
                read_value(item, &node.child(key));
            }
        }
    }
}

// TOML has no null: absent entries are skipped, absent list items dropped.
fn write_table(node: &Node, table: &mut Table) {
    for (key, child) in node.child_map() {
        let key = key.to_string();
        let comment = child.comment();
        let item = match to_item(&child) {
            Some(Item::Table(mut sub)) => {
                if !comment.is_empty() {
                    sub.decor_mut().set_prefix(comment_lines(&comment, "\n"));
                }
                Item::Table(sub)
            }
            Some(item) => item,
            None => continue,
        };
        let inline = item.is_value();
        table.insert(&key, item);
        if inline && !comment.is_empty() {
            if let Some(mut k) = table.key_mut(&key) {
                k.leaf_decor_mut().set_prefix(comment_lines(&comment, ""));
            }
        }
    }
}

fn to_item(node: &Node) -> Option<Item> {
    if node.is_map() {
        let mut table = Table::new();
        write_table(node, &mut table);
        return Some(Item::Table(table));
    }
    let items = node.child_list();
    if !items.is_empty() && items.iter().all(Node::is_map) {
        let mut tables = ArrayOfTables::new();
        for item in &items {
            let mut table = Table::new();
            write_table(item, &mut table);
            let comment = item.comment();
            if !comment.is_empty() {
                table.decor_mut().set_prefix(comment_lines(&comment, "\n"));
            }
            tables.push(table);
        }
        return Some(Item::ArrayOfTables(tables));
    }
    to_value(node).map(Item::Value)
}

fn to_value(node: &Node) -> Option<TomlValue> {
    if let Some(scalar) = node.scalar() {
        return Some(match scalar {
            Scalar::Bool(v) => TomlValue::from(v),
            Scalar::Int(v) => TomlValue::from(v),
            Scalar::Float(v) => TomlValue::from(v),
            Scalar::Str(v) => TomlValue::from(v),
        });
    }
    if node.is_list() {
        let mut array = Array::new();
        for item in node.child_list() {
            if let Some(value) = to_value(&item) {
                array.push(value);
            }
        }
        return Some(TomlValue::Array(array));
    }
    if node.is_map() {
        let mut table = InlineTable::new();
        for (key, child) in node.child_map() {
            if let Some(value) = to_value(&child) {
                table.insert(key.to_string(), value);
            }
        }
        return Some(TomlValue::InlineTable(table));
    }
    None
}

/// Picks an adapter from the file extension: `.toml` is TOML, anything else JSON.
pub fn for_path(path: &Path) -> Box<dyn Format> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("toml") => Box::new(Toml),
        _ => Box::new(Json::default()),
    }
}
