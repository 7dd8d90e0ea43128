use confnode::format::{Format, Json, Toml};
use confnode::{Document, Element, Loader, Node, Options};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::cell::RefCell;
use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::Path;
use std::rc::Rc;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Person {
    name: String,
    age: i64,
}

fn populate(doc: &Document) {
    doc.set_at("name", "demo");
    doc.set_at("ratio", 0.5);
    doc.child("server").set_at("port", 8080).set_at("tls", true);
    doc.at(["server", "hosts"]).set_list(["a.example", "b.example"]);
}

#[test]
fn missing_file_starts_empty() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("app.json");

    let doc = Document::must(&path);
    assert!(doc.is_empty());
    assert!(!doc.is_virtual());
    assert!(!path.exists());
    assert!(doc.path().is_absolute());
    Ok(())
}

#[test]
fn corrupt_file_starts_empty() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("app.json");
    fs::write(&path, "{ not json")?;

    let doc = Document::must(&path);
    assert!(doc.is_empty());
    assert_eq!(doc.get_at("port", 1i32), 1);
    Ok(())
}

#[test]
fn save_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let doc = Document::must_in(dir.path(), "app.json");
    populate(&doc);
    assert!(doc.save());

    let first = doc.reload();
    assert_eq!(first.fingerprint(), doc.fingerprint());
    assert!(first.save());

    let second = first.reload();
    assert_eq!(second.to_json(), first.to_json());
    assert_eq!(second.fingerprint(), first.fingerprint());
    assert_eq!(
        second.at(["server", "hosts"]).get_list(|n| n.get(String::new())),
        ["a.example", "b.example"]
    );
    Ok(())
}

#[test]
fn bind_survives_save_and_reload() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let doc = Document::must_parts([dir.path(), Path::new("people"), Path::new("harry.json")]);
    let harry = Person {
        name: "Harry".to_string(),
        age: 25,
    };

    assert_eq!(doc.bind(harry.clone()), harry);
    assert!(doc.save());
    assert!(dir.path().join("people").join("harry.json").is_file());

    let reloaded = doc.reload();
    let bound = reloaded.bind(Person {
        name: "Sally".to_string(),
        age: 40,
    });
    assert_eq!(bound, harry);
    Ok(())
}

#[test]
fn virtual_writes_are_persisted() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let doc = Document::must(dir.path().join("deep.json"));
    let leaf = doc.at(["a", "b", "c"]);
    assert!(leaf.is_virtual());

    leaf.set(42);
    assert!(doc.save());

    let text = fs::read_to_string(dir.path().join("deep.json"))?;
    let json: serde_json::Value = serde_json::from_str(&text)?;
    assert_eq!(json, json!({ "a": { "b": { "c": 42 } } }));
    Ok(())
}

#[test]
fn reload_discards_unsaved_changes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let doc = Document::must(dir.path().join("app.json"));
    doc.set_at("kept", 1);
    assert!(doc.save());

    doc.set_at("unsaved", 2);
    let fresh = doc.reload();
    assert!(fresh.child("unsaved").is_virtual());
    assert_eq!(fresh.get_at("kept", 0i64), 1);
    assert_eq!(doc.get_at("unsaved", 0i64), 2);
    Ok(())
}

#[test]
fn save_if_absent_keeps_existing_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("app.json");

    let first = Document::must(&path);
    first.set_at("owner", "first");
    assert!(first.save_if_absent());

    let second = Document::must(&path);
    second.set_at("owner", "second");
    assert!(second.save_if_absent());

    assert_eq!(Document::must(&path).get_at("owner", String::new()), "first");
    Ok(())
}

#[test]
fn failed_save_reports_false() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "x")?;

    let doc = Document::must(blocker.join("app.json"));
    doc.set_at("a", 1);
    assert!(!doc.save());
    assert!(doc.try_save().is_err());
    assert_eq!(doc.get_at("a", 0i64), 1);
    Ok(())
}

#[test]
fn batch_load_filters_by_suffix() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("b.conf"), r#"{"name": "b"}"#)?;
    fs::write(dir.path().join("a.conf"), r#"{"name": "a"}"#)?;
    fs::write(dir.path().join("c.txt"), r#"{"name": "c"}"#)?;
    fs::create_dir(dir.path().join("nested.conf"))?;

    let names: Vec<String> = Document::all(dir.path(), ".conf")
        .map(|doc| doc.get_at("name", String::new()))
        .collect();
    assert_eq!(names, ["a", "b"]);

    assert_eq!(Document::all(dir.path().join("missing"), ".conf").count(), 0);
    Ok(())
}

#[test]
fn batch_bind_skips_documents_that_do_not_fit() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("a.json"), r#"{"name": "Ann", "age": 31}"#)?;
    fs::write(dir.path().join("b.json"), "garbage")?;
    fs::write(dir.path().join("c.json"), r#"{"name": "Cy"}"#)?;
    fs::write(dir.path().join("d.json"), r#"{"name": "Di", "age": 40}"#)?;

    let people: Vec<Person> = Document::all_bound(dir.path(), ".json").collect();
    let names: Vec<&str> = people.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Ann", "Di"]);
    Ok(())
}

#[test]
fn pure_documents_do_not_record_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("pure.json");

    let doc = Document::must_with(&path, Options::pure());
    assert_eq!(doc.get_at("port", 8080i32), 8080);
    assert!(doc.save());

    let fresh = Document::must(&path);
    assert!(fresh.child("port").is_virtual());
    Ok(())
}

#[test]
fn toml_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("app.toml");
    let doc = Document::must(&path);
    populate(&doc);
    let servers = [json!({ "host": "a" }), json!({ "host": "b" })];
    doc.child("servers").set_list(servers.iter().map(Element::serde));
    assert!(doc.save());

    let text = fs::read_to_string(&path)?;
    assert!(text.contains("[server]"));

    let reloaded = doc.reload();
    assert_eq!(reloaded.fingerprint(), doc.fingerprint());
    assert_eq!(reloaded.at(["servers", "1"]).get_at("host", String::new()), "b");
    Ok(())
}

#[test]
fn toml_keeps_comments_across_save() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("commented.toml");
    let doc = Document::must(&path);
    doc.child("port").set(8080).set_comment("listen port");
    doc.child("server").set_comment("primary upstream");
    doc.at(["server", "host"]).set("example.org");
    assert!(doc.save());

    let text = fs::read_to_string(&path)?;
    assert!(text.contains("# listen port"));

    let reloaded = doc.reload();
    assert_eq!(reloaded.child("port").comment(), "listen port");
    assert_eq!(reloaded.child("server").comment(), "primary upstream");
    assert_eq!(reloaded.get_at("port", 0i64), 8080);
    Ok(())
}

#[test]
fn json_drops_comments() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let doc = Document::must(dir.path().join("plain.json"));
    doc.child("port").set(8080).set_comment("listen port");
    assert!(doc.save());

    let reloaded = doc.reload();
    assert_eq!(reloaded.child("port").comment(), "");
    assert_eq!(reloaded.fingerprint(), doc.fingerprint());
    Ok(())
}

#[test]
fn toml_rejects_non_table_root() {
    let node = Node::new();
    node.set_list([1, 2]);
    assert!(Toml.write(&node).is_err());
    assert!(Json::default().write(&node).is_ok());
}

struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn stream_loader_reads_and_writes_buffers() -> Result<(), Box<dyn std::error::Error>> {
    let store = Rc::new(RefCell::new(br#"{"greeting": "hello"}"#.to_vec()));
    let read_store = Rc::clone(&store);
    let write_store = Rc::clone(&store);

    let loader = Loader::streams(
        Box::new(move || -> io::Result<Box<dyn Read>> {
            Ok(Box::new(Cursor::new(read_store.borrow().clone())))
        }),
        Box::new(move || -> io::Result<Box<dyn Write>> {
            write_store.borrow_mut().clear();
            Ok(Box::new(SharedBuf(Rc::clone(&write_store))))
        }),
        Box::new(Json::default()),
        Options::default(),
    );
    assert!(loader.exists());
    assert!(loader.path().is_none());

    let doc = Document::from_loader(loader, "embedded.json");
    assert_eq!(doc.get_at("greeting", String::new()), "hello");

    doc.set_at("greeting", "bye");
    assert!(doc.save());
    let text = String::from_utf8(store.borrow().clone())?;
    assert!(text.contains("bye"));
    assert_eq!(doc.reload().get_at("greeting", String::new()), "bye");
    Ok(())
}
