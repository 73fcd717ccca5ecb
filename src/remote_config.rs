//! Cluster configuration classifications fetched as a JSON document.
//!
//! The document is an array of objects shaped like EMR's `Configuration`:
//!
//! ```json
//! [{"Classification": "spark-defaults",
//!   "Properties": {"spark.executor.memory": "4g"},
//!   "Configurations": []}]
//! ```

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Classification {
    pub classification: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configurations: Option<Vec<Classification>>,
}

pub fn parse_classifications(document: &[u8]) -> Result<Vec<Classification>> {
    let value: Value = serde_json::from_slice(document)?;
    match value {
        Value::Array(items) => items.iter().map(classification_from_value).collect(),
        other => Err(Error::MalformedRemoteConfig(format!(
            "expected a JSON array at the top level, found {}",
            kind(&other)
        ))),
    }
}

fn classification_from_value(value: &Value) -> Result<Classification> {
    let object = value.as_object().ok_or_else(|| {
        Error::MalformedRemoteConfig(format!("expected an object, found {}", kind(value)))
    })?;

    let classification = match object.get("Classification") {
        Some(Value::String(name)) => name.clone(),
        Some(other) => {
            return Err(Error::MalformedRemoteConfig(format!(
                "Classification must be a string, found {}",
                kind(other)
            )))
        }
        None => {
            return Err(Error::MalformedRemoteConfig(
                "missing Classification field".to_string(),
            ))
        }
    };

    let properties = match object.get("Properties") {
        None | Some(Value::Null) => None,
        Some(Value::Object(props)) => {
            let mut properties = BTreeMap::new();
            for (key, value) in props {
                let value = value.as_str().ok_or_else(|| {
                    Error::MalformedRemoteConfig(format!(
                        "property {} of {} must be a string, found {}",
                        key,
                        classification,
                        kind(value)
                    ))
                })?;
                properties.insert(key.clone(), value.to_string());
            }
            Some(properties).filter(|p| !p.is_empty())
        }
        Some(other) => {
            return Err(Error::MalformedRemoteConfig(format!(
                "Properties of {} must be an object, found {}",
                classification,
                kind(other)
            )))
        }
    };

    let configurations = match object.get("Configurations") {
        None | Some(Value::Null) => None,
        Some(Value::Array(children)) => {
            let children = children
                .iter()
                .map(classification_from_value)
                .collect::<Result<Vec<_>>>()?;
            Some(children).filter(|c| !c.is_empty())
        }
        Some(other) => {
            return Err(Error::MalformedRemoteConfig(format!(
                "Configurations of {} must be an array, found {}",
                classification,
                kind(other)
            )))
        }
    };

    Ok(Classification {
        classification,
        properties,
        configurations,
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
