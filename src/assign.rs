use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

// Trailing array marker on an override key: `[]`/`[+]`/`[N]` append, any
// negative-looking marker (`[-]`, `[-1]`) prepends.
static ARRAY_MARKER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+)\[(-?\d*|\+)\]$").unwrap());

/// One segment of a parsed override path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// A single merge instruction, parsed once from an override key/value pair.
#[derive(Debug, Clone, PartialEq)]
pub enum PathOp {
    Set { path: Vec<Segment>, value: Value },
    Delete { path: Vec<Segment> },
    Append { path: Vec<Segment>, value: Value },
    Prepend { path: Vec<Segment>, value: Value },
}

/// Applies every source mapping onto `target`, strictly in order: later
/// sources observe the mutations of earlier ones.
pub fn assign(target: &mut Value, sources: &[Map<String, Value>]) {
    for source in sources {
        for op in parse_ops(source) {
            apply(target, &op);
        }
    }
}

/// Parses a source mapping into its op list without applying it.
pub fn parse_ops(source: &Map<String, Value>) -> Vec<PathOp> {
    source
        .iter()
        .map(|(key, value)| parse_op(key, value.clone()))
        .collect()
}

fn parse_op(key: &str, value: Value) -> PathOp {
    let (base, marker) = match ARRAY_MARKER_REGEX.captures(key) {
        Some(captures) => {
            let base = captures.get(1).map_or("", |m| m.as_str()).to_string();
            let marker = captures.get(2).map_or("", |m| m.as_str()).to_string();
            (base, Some(marker))
        }
        None => (key.to_string(), None),
    };

    // Null plays the role of `undefined`: it unsets the path instead of
    // setting a literal null.
    if value.is_null() {
        return PathOp::Delete { path: parse_path(&base) };
    }

    match marker {
        Some(marker) if marker.starts_with('-') => PathOp::Prepend { path: parse_path(&base), value },
        Some(_) => PathOp::Append { path: parse_path(&base), value },
        None => PathOp::Set { path: parse_path(&base), value },
    }
}

/// Splits a dotted/bracketed key (`a.b`, `parameters[0].name`, `a.0.b`) into
/// typed segments. Purely numeric segments address array indices.
fn parse_path(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        let (head, mut brackets) = match part.find('[') {
            Some(start) => (&part[..start], &part[start..]),
            None => (part, ""),
        };
        if !head.is_empty() || brackets.is_empty() {
            segments.push(segment_for(head));
        }
        while brackets.starts_with('[') {
            match brackets.find(']') {
                Some(end) => {
                    segments.push(segment_for(&brackets[1..end]));
                    brackets = &brackets[end + 1..];
                }
                None => {
                    // Unterminated bracket, keep the raw text as a key.
                    segments.push(Segment::Key(brackets.to_string()));
                    break;
                }
            }
        }
    }
    segments
}

fn segment_for(raw: &str) -> Segment {
    match raw.parse::<usize>() {
        Ok(index) => Segment::Index(index),
        Err(_) => Segment::Key(raw.to_string()),
    }
}

/// Applies one op to the target document.
pub fn apply(target: &mut Value, op: &PathOp) {
    match op {
        PathOp::Set { path, value } => {
            if let Some(slot) = ensure_slot(target, path) {
                *slot = value.clone();
            }
        }
        PathOp::Delete { path } => delete_path(target, path),
        PathOp::Append { path, value } => push_into(target, path, value.clone(), false),
        PathOp::Prepend { path, value } => push_into(target, path, value.clone(), true),
    }
}

/// Walks to the slot addressed by `path`, creating intermediate objects and
/// arrays as needed.
fn ensure_slot<'a>(target: &'a mut Value, path: &[Segment]) -> Option<&'a mut Value> {
    if path.is_empty() {
        return None;
    }
    let mut current = target;
    for segment in path {
        current = descend(current, segment);
    }
    Some(current)
}

fn descend<'a>(parent: &'a mut Value, segment: &Segment) -> &'a mut Value {
    match segment {
        Segment::Key(key) => {
            if !parent.is_object() {
                *parent = Value::Object(Map::new());
            }
            parent
                .as_object_mut()
                .unwrap()
                .entry(key.clone())
                .or_insert(Value::Null)
        }
        Segment::Index(index) => {
            if !parent.is_array() {
                *parent = Value::Array(Vec::new());
            }
            let items = parent.as_array_mut().unwrap();
            while items.len() <= *index {
                items.push(Value::Null);
            }
            &mut items[*index]
        }
    }
}

/// Walks to the slot addressed by `path` without creating anything.
fn lookup_slot<'a>(target: &'a mut Value, path: &[Segment]) -> Option<&'a mut Value> {
    let mut current = target;
    for segment in path {
        current = match segment {
            Segment::Key(key) => current.as_object_mut()?.get_mut(key)?,
            Segment::Index(index) => current.as_array_mut()?.get_mut(*index)?,
        };
    }
    Some(current)
}

fn delete_path(target: &mut Value, path: &[Segment]) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let Some(parent) = lookup_slot(target, parents) else {
        return;
    };
    match (parent, last) {
        (Value::Object(map), Segment::Key(key)) => {
            map.remove(key);
        }
        (Value::Array(items), Segment::Index(index)) if *index < items.len() => {
            items.remove(*index);
        }
        _ => {}
    }
}

fn push_into(target: &mut Value, path: &[Segment], value: Value, front: bool) {
    let Some(slot) = ensure_slot(target, path) else {
        return;
    };
    if !slot.is_array() {
        let existing = std::mem::take(slot);
        let seed = match existing {
            Value::Null => Vec::new(),
            other => vec![other],
        };
        *slot = Value::Array(seed);
    }
    if let Value::Array(items) = slot {
        if front {
            items.insert(0, value);
        } else {
            items.push(value);
        }
    }
}
