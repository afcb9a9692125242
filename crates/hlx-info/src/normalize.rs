//! Field-by-field extraction from raw JSON objects.
//!
//! Every `take_*` removes the key it reads. Whatever is left after a
//! struct has taken its modelled fields becomes that struct's `extra`
//! map, so normalization never loses data.

use crate::error::{InfoError, InfoResult};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;

pub(crate) struct Fields {
    what: &'static str,
    map: Map<String, Value>,
}

impl Fields {
    pub(crate) fn new(what: &'static str, value: Value) -> InfoResult<Self> {
        match value {
            Value::Object(map) => Ok(Self { what, map }),
            other => Err(InfoError::decode(format!(
                "{what}: expected object, got {}",
                type_name(&other)
            ))),
        }
    }

    fn missing(&self, key: &str) -> InfoError {
        InfoError::decode(format!("{}: missing field `{key}`", self.what))
    }

    fn invalid(&self, key: &str, expected: &str) -> InfoError {
        InfoError::decode(format!("{}: field `{key}` is not {expected}", self.what))
    }

    pub(crate) fn take(&mut self, key: &str) -> InfoResult<Value> {
        self.map.remove(key).ok_or_else(|| self.missing(key))
    }

    /// Absent and `null` both read as `None`.
    pub(crate) fn take_opt(&mut self, key: &str) -> Option<Value> {
        match self.map.remove(key) {
            None | Some(Value::Null) => None,
            Some(v) => Some(v),
        }
    }

    pub(crate) fn take_str(&mut self, key: &str) -> InfoResult<String> {
        match self.take(key)? {
            Value::String(s) => Ok(s),
            _ => Err(self.invalid(key, "a string")),
        }
    }

    pub(crate) fn take_opt_str(&mut self, key: &str) -> InfoResult<Option<String>> {
        match self.take_opt(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(self.invalid(key, "a string")),
        }
    }

    pub(crate) fn take_decimal(&mut self, key: &str) -> InfoResult<Decimal> {
        let value = self.take(key)?;
        parse_decimal(&value).ok_or_else(|| self.invalid(key, "a decimal"))
    }

    pub(crate) fn take_opt_decimal(&mut self, key: &str) -> InfoResult<Option<Decimal>> {
        match self.take_opt(key) {
            None => Ok(None),
            Some(value) => parse_decimal(&value)
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a decimal")),
        }
    }

    pub(crate) fn take_u64(&mut self, key: &str) -> InfoResult<u64> {
        match self.take(key)? {
            Value::Number(n) => n.as_u64().ok_or_else(|| self.invalid(key, "an unsigned integer")),
            _ => Err(self.invalid(key, "an unsigned integer")),
        }
    }

    pub(crate) fn take_opt_u64(&mut self, key: &str) -> InfoResult<Option<u64>> {
        match self.take_opt(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "an unsigned integer")),
            Some(_) => Err(self.invalid(key, "an unsigned integer")),
        }
    }

    pub(crate) fn take_bool_or(&mut self, key: &str, default: bool) -> InfoResult<bool> {
        match self.take_opt(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(b),
            Some(_) => Err(self.invalid(key, "a bool")),
        }
    }

    pub(crate) fn take_array(&mut self, key: &str) -> InfoResult<Vec<Value>> {
        match self.take(key)? {
            Value::Array(items) => Ok(items),
            _ => Err(self.invalid(key, "an array")),
        }
    }

    /// Remaining, unmodelled fields.
    pub(crate) fn rest(self) -> Map<String, Value> {
        self.map
    }
}

pub(crate) fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

pub(crate) fn into_array(what: &'static str, value: Value) -> InfoResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(InfoError::decode(format!(
            "{what}: expected array, got {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
