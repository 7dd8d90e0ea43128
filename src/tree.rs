use crate::options::Options;
use crate::value::{Key, Scalar};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};

pub type NodeId = usize;

pub(crate) const ROOT: NodeId = 0;

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) enum Value {
    #[default]
    Absent,
    Scalar(Scalar),
    List(Vec<NodeId>),
    Map(IndexMap<Key, NodeId>),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Slot {
    pub value: Value,
    pub comment: Option<String>,
}

/// Backing storage for one tree. Slots are never freed, so ids stay stable
/// for the life of the arena; overwritten subtrees simply become unreachable
/// and are only dropped with the arena itself.
#[derive(Debug)]
pub(crate) struct Arena {
    slots: Vec<Slot>,
    pub options: Options,
}

impl Arena {
    pub fn new(options: Options) -> Self {
        Self {
            slots: vec![Slot::default()],
            options,
        }
    }

    pub fn alloc(&mut self, value: Value) -> NodeId {
        self.slots.push(Slot {
            value,
            comment: None,
        });
        self.slots.len() - 1
    }

    pub fn slot(&self, id: NodeId) -> &Slot {
        &self.slots[id]
    }

    pub fn slot_mut(&mut self, id: NodeId) -> &mut Slot {
        &mut self.slots[id]
    }

    pub fn value(&self, id: NodeId) -> &Value {
        &self.slots[id].value
    }

    pub fn set_value(&mut self, id: NodeId, value: Value) {
        self.slots[id].value = value;
    }

    pub fn lookup(&self, id: NodeId, key: &Key) -> Option<NodeId> {
        match &self.slots[id].value {
            Value::List(items) => key.as_index().and_then(|i| items.get(i).copied()),
            Value::Map(map) => map
                .get(key)
                .or_else(|| key.alternate().and_then(|alt| map.get(&alt)))
                .copied(),
            _ => None,
        }
    }

    pub fn resolve(&self, base: NodeId, path: &[Key]) -> Option<NodeId> {
        path.iter().try_fold(base, |id, key| self.lookup(id, key))
    }

    /// Walks `path` from `base`, attaching an absent child for every missing segment.
    pub fn materialize(&mut self, base: NodeId, path: &[Key]) -> NodeId {
        let mut id = base;
        for key in path {
            id = match self.lookup(id, key) {
                Some(child) => child,
                None => self.attach(id, key.clone()),
            };
        }
        id
    }

    fn attach(&mut self, parent: NodeId, key: Key) -> NodeId {
        let index = key.as_index();
        let position = match (&self.slots[parent].value, index) {
            (Value::List(_), Some(i)) => Some(i),
            (Value::Map(_), _) => None,
            // a bare node turns into a list for integer keys, or for a leading "0"
            (_, Some(i)) if i == 0 || matches!(key, Key::Index(_)) => Some(i),
            _ => None,
        };
        if let Some(i) = position {
            return self.attach_item(parent, i);
        }

        // Anything else becomes a map: a child can only hang off a list or a map.
        let child = self.alloc(Value::Absent);
        let key = key.named();
        match &mut self.slots[parent].value {
            Value::Map(map) => {
                map.insert(key, child);
            }
            other => *other = Value::Map(IndexMap::from([(key, child)])),
        }
        child
    }

    /// Pads the list with absent items up to `index`, which becomes the new child.
    fn attach_item(&mut self, parent: NodeId, index: usize) -> NodeId {
        let mut items = match &self.slots[parent].value {
            Value::List(items) => items.clone(),
            _ => Vec::new(),
        };
        while items.len() <= index {
            items.push(self.alloc(Value::Absent));
        }
        let child = items[index];
        self.slots[parent].value = Value::List(items);
        child
    }

    #[cfg(test)]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match &self.slots[id].value {
            Value::List(items) => items.clone(),
            Value::Map(map) => map.values().copied().collect(),
            _ => Vec::new(),
        }
    }

    /// True if `target` is `from` or one of its descendants.
    pub fn reaches(&self, from: NodeId, target: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = vec![false; self.slots.len()];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if std::mem::replace(&mut seen[id], true) {
                continue;
            }
            stack.extend(self.children(id));
        }
        false
    }

    /// Deep copy of a slot's value inside this arena; children get fresh ids.
    pub fn clone_value(&mut self, id: NodeId) -> Value {
        match self.slots[id].value.clone() {
            Value::List(items) => {
                Value::List(items.into_iter().map(|c| self.deep_copy(c)).collect())
            }
            Value::Map(map) => Value::Map(
                map.into_iter()
                    .map(|(k, c)| (k, self.deep_copy(c)))
                    .collect(),
            ),
            other => other,
        }
    }

    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let value = self.clone_value(id);
        let copy = self.alloc(value);
        self.slots[copy].comment = self.slots[id].comment.clone();
        copy
    }

    /// Copies a subtree out of another arena.
    pub fn graft_value(&mut self, src: &Arena, id: NodeId) -> Value {
        match &src.slots[id].value {
            Value::List(items) => {
                Value::List(items.iter().map(|c| self.graft(src, *c)).collect())
            }
            Value::Map(map) => Value::Map(
                map.iter()
                    .map(|(k, c)| (k.clone(), self.graft(src, *c)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    pub fn graft(&mut self, src: &Arena, id: NodeId) -> NodeId {
        let value = self.graft_value(src, id);
        let copy = self.alloc(value);
        self.slots[copy].comment = src.slots[id].comment.clone();
        copy
    }

    fn write_canonical(&self, buf: &mut Vec<u8>, id: NodeId) {
        match &self.slots[id].value {
            Value::Absent => buf.push(0x00),
            Value::Scalar(Scalar::Int(v)) => {
                buf.push(0x01);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Value::Scalar(Scalar::Float(v)) => {
                buf.push(0x02);
                buf.extend_from_slice(&v.to_bits().to_be_bytes());
            }
            Value::Scalar(Scalar::Bool(v)) => {
                buf.push(0x03);
                buf.push(if *v { 0x01 } else { 0x00 });
            }
            Value::Scalar(Scalar::Str(v)) => {
                buf.push(0x04);
                write_str(buf, v);
            }
            Value::List(items) => {
                buf.push(0x06);
                let len = items.len() as u64;
                buf.extend_from_slice(&len.to_be_bytes());
                for item in items {
                    self.write_canonical(buf, *item);
                }
            }
            Value::Map(map) => {
                buf.push(0x07);
                let mut entries: Vec<(String, NodeId)> = map
                    .iter()
                    .filter(|(_, c)| self.slots[**c].value != Value::Absent)
                    .map(|(k, c)| (k.to_string(), *c))
                    .collect();
                entries.sort();
                let len = entries.len() as u64;
                buf.extend_from_slice(&len.to_be_bytes());
                for (key, child) in entries {
                    write_str(buf, &key);
                    self.write_canonical(buf, child);
                }
            }
        }
    }

    /// SHA-256 over a canonical encoding: map keys sorted, absent entries and comments skipped.
    pub fn fingerprint(&self, id: NodeId) -> [u8; 32] {
        let mut bytes = Vec::new();
        self.write_canonical(&mut bytes, id);

        let digest = Sha256::digest(bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }
}

fn write_str(buf: &mut Vec<u8>, s: &str) {
    let len = s.len() as u64;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
}
