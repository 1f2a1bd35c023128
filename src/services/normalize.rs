//! Response envelope normalization.
//!
//! Backends wrap collections in a handful of ways; all of them reduce to a
//! [`Page`].

use super::entity::{Entity, Page};
use crate::{Error, ErrorContext, Result};
use serde_json::Value;

const LIST_KEYS: &[&str] = &["items", "results", "data"];

/// Accepts a bare array, `{data: [...]}`, or `{items|results: [...], total}`.
pub fn normalize_list<E: Entity>(payload: Value) -> Result<Page<E>> {
    let (items, total) = match payload {
        Value::Array(items) => (items, None),
        Value::Object(mut map) => {
            let total = map
                .get("total")
                .and_then(Value::as_u64)
                .map(|t| t as usize);
            let items = LIST_KEYS
                .iter()
                .find_map(|k| match map.remove(*k) {
                    Some(Value::Array(items)) => Some(items),
                    _ => None,
                })
                .ok_or_else(|| shape_error::<E>("expected an array or a list envelope"))?;
            (items, total)
        }
        _ => return Err(shape_error::<E>("expected an array or a list envelope")),
    };

    let items = items
        .into_iter()
        .map(serde_json::from_value)
        .collect::<std::result::Result<Vec<E>, _>>()?;
    let total = total.unwrap_or(items.len()).max(items.len());
    Ok(Page::new(items, total))
}

/// Accepts a bare object or `{data: {...}}`.
pub fn normalize_item<E: Entity>(payload: Value) -> Result<E> {
    let inner = match payload {
        Value::Object(mut map) if map.len() == 1 && map.get("data").map_or(false, Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        obj @ Value::Object(_) => obj,
        _ => return Err(shape_error::<E>("expected an object")),
    };
    Ok(serde_json::from_value(inner)?)
}

fn shape_error<E: Entity>(details: &str) -> Error {
    Error::validation_with_context(
        format!("unexpected response shape for '{}'", E::COLLECTION),
        ErrorContext::new()
            .with_details(details)
            .with_source("normalize"),
    )
}
