//! File loaders, chosen by extension.

use serde_json::Value as Json;

use metagraph_tree::{ObjectTree, TreeError, Value};

/// Load file contents for `name`. `.json` and `.toml` files become data
/// (objects and arrays become subtrees); anything else is text.
pub fn load(name: &str, bytes: Vec<u8>) -> Result<Value, TreeError> {
    match extension(name) {
        Some("json") => {
            let json: Json = serde_json::from_slice(&bytes).map_err(|e| parse_error(name, e))?;
            Ok(ObjectTree::convert(json))
        }
        Some("toml") => {
            let contents = String::from_utf8(bytes).map_err(|e| parse_error(name, e))?;
            let value: toml::Value = toml::from_str(&contents).map_err(|e| parse_error(name, e))?;
            Ok(ObjectTree::convert(toml_to_json(value)))
        }
        _ => Ok(text(bytes)),
    }
}

/// File contents as text, replacing invalid UTF-8.
pub fn text(bytes: Vec<u8>) -> Value {
    Value::from(String::from_utf8_lossy(&bytes).into_owned())
}

fn extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        None
    } else {
        Some(ext)
    }
}

fn parse_error(name: &str, err: impl std::fmt::Display) -> TreeError {
    TreeError::Parse {
        path: name.to_string(),
        message: err.to_string(),
    }
}

/// Convert TOML Value to JSON Value
pub fn toml_to_json(toml: toml::Value) -> Json {
    match toml {
        toml::Value::String(s) => Json::String(s),
        toml::Value::Integer(i) => Json::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        toml::Value::Boolean(b) => Json::Bool(b),
        toml::Value::Datetime(dt) => Json::String(dt.to_string()),
        toml::Value::Array(arr) => Json::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Json::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}
