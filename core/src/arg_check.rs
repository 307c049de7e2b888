// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Validation of job arguments before they cross into a worker.
//!
//! Arguments travel to workers as `serde_json::Value`s. When a value cannot be
//! encoded, the checker walks into it (sequence elements by index, map entries
//! and struct fields by key) to report every innermost element that fails on
//! its own, together with the path that leads to it.
//!
//! Encoding alone is not enough: JSON has a single `null`, so a non-finite
//! float or a `Some` around a null-encoded value encodes fine but reaches the
//! worker as something else. Those elements are reported as well, and
//! [`check_transfer`] decodes every payload once more before it is accepted.

use serde::de::DeserializeOwned;
use serde::ser::{self, Serialize, Serializer as _};
use serde_json::Value;
use std::fmt;
use tracing::error;

/// One step from a value into one of its elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

/// Location of an element inside a job's arguments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgPath(pub Vec<PathSegment>);

impl fmt::Display for ArgPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "args")?;
        for segment in &self.0 {
            match segment {
                PathSegment::Index(i) => write!(f, "[{}]", i)?,
                PathSegment::Key(k) => write!(f, "[{:?}]", k)?,
            }
        }
        Ok(())
    }
}

/// An element that cannot be encoded and cannot be decomposed any further
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidArg {
    pub path: ArgPath,
    pub reason: String,
}

impl InvalidArg {
    fn at_root(reason: String) -> Self {
        Self {
            path: ArgPath::default(),
            reason,
        }
    }
}

impl fmt::Display for InvalidArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path, self.reason)
    }
}

/// Encodes job arguments for transfer to a worker.
///
/// On failure every invalid element is logged and returned.
pub fn encode_args<A: Serialize + ?Sized>(args: &A) -> Result<Value, Vec<InvalidArg>> {
    let leaves = match serde_json::to_value(args) {
        Ok(value) => {
            if !contains_null(&value) {
                return Ok(value);
            }
            let leaves = find_invalid_args(args);
            if leaves.is_empty() {
                return Ok(value);
            }
            leaves
        }
        Err(err) => {
            let mut leaves = find_invalid_args(args);
            if leaves.is_empty() {
                leaves.push(InvalidArg::at_root(err.to_string()));
            }
            leaves
        }
    };
    Err(log_leaves(leaves))
}

/// Encodes job arguments and makes sure the worker gets the same value back.
///
/// The payload is decoded into `A` and encoded again; a decode failure or a
/// payload that changes on the way is reported against the whole argument.
pub fn check_transfer<A>(args: &A) -> Result<Value, Vec<InvalidArg>>
where
    A: Serialize + DeserializeOwned,
{
    let payload = encode_args(args)?;
    let reason = match A::deserialize(&payload) {
        Ok(decoded) => match serde_json::to_value(&decoded) {
            Ok(again) if again == payload => return Ok(payload),
            Ok(_) => "value changes when decoded by the worker".to_string(),
            Err(err) => format!("decoded value cannot be encoded again: {}", err),
        },
        Err(err) => format!("worker cannot decode the value: {}", err),
    };
    Err(log_leaves(vec![InvalidArg::at_root(reason)]))
}

fn log_leaves(leaves: Vec<InvalidArg>) -> Vec<InvalidArg> {
    for leaf in &leaves {
        error!("Invalid value at {}: {}", leaf.path, leaf.reason);
    }
    leaves
}

/// Returns every element of `args` that cannot be encoded, or that encodes to
/// a `null` the worker would read back as a different value.
///
/// An empty result means the arguments can be transferred.
pub fn find_invalid_args<A: Serialize + ?Sized>(args: &A) -> Vec<InvalidArg> {
    let mut path = Vec::new();
    let mut leaves = Vec::new();
    descend_into(args, &mut path, &mut leaves);
    leaves
}

fn descend_into<T: Serialize + ?Sized>(
    value: &T,
    path: &mut Vec<PathSegment>,
    leaves: &mut Vec<InvalidArg>,
) {
    let depth = path.len();
    let err = match serde_json::to_value(value) {
        Ok(encoded) => {
            // Only a null can stand for something other than itself
            if contains_null(&encoded) {
                let _ = value.serialize(Probe {
                    path: &mut *path,
                    leaves: &mut *leaves,
                });
                path.truncate(depth);
            }
            return;
        }
        Err(err) => err,
    };

    let found_before = leaves.len();
    let decomposed = value
        .serialize(Probe {
            path: &mut *path,
            leaves: &mut *leaves,
        })
        .unwrap_or(false);
    // A Serialize impl may bail out halfway through a compound value
    path.truncate(depth);

    // Nothing inside is to blame, so the value itself is the invalid leaf
    if !decomposed || leaves.len() == found_before {
        leaves.push(InvalidArg {
            path: ArgPath(path.clone()),
            reason: err.to_string(),
        });
    }
}

fn contains_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.iter().any(contains_null),
        Value::Object(entries) => entries.values().any(contains_null),
        _ => false,
    }
}

fn key_label<K: Serialize + ?Sized>(key: &K) -> String {
    match serde_json::to_value(key) {
        Ok(Value::String(s)) => s,
        Ok(other) => other.to_string(),
        Err(_) => "<unencodable key>".to_string(),
    }
}

#[derive(Debug)]
struct ProbeError(String);

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ProbeError {}

impl ser::Error for ProbeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ProbeError(msg.to_string())
    }
}

/// Serializer that does not produce output: it only visits the elements of a
/// value and re-checks each of them. `Ok(true)` means the value was decomposed.
struct Probe<'a> {
    path: &'a mut Vec<PathSegment>,
    leaves: &'a mut Vec<InvalidArg>,
}

struct ProbeSeq<'a> {
    path: &'a mut Vec<PathSegment>,
    leaves: &'a mut Vec<InvalidArg>,
    index: usize,
    in_variant: bool,
}

struct ProbeMap<'a> {
    path: &'a mut Vec<PathSegment>,
    leaves: &'a mut Vec<InvalidArg>,
    next_key: String,
    in_variant: bool,
}

macro_rules! leaf_values {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method(self, _v: $ty) -> Result<bool, ProbeError> {
                Ok(false)
            }
        )*
    };
}

impl Probe<'_> {
    /// Records the current element as one that does not survive the transfer
    fn lossy(self, reason: String) -> bool {
        self.leaves.push(InvalidArg {
            path: ArgPath(self.path.clone()),
            reason,
        });
        true
    }
}

impl<'a> ser::Serializer for Probe<'a> {
    type Ok = bool;
    type Error = ProbeError;
    type SerializeSeq = ProbeSeq<'a>;
    type SerializeTuple = ProbeSeq<'a>;
    type SerializeTupleStruct = ProbeSeq<'a>;
    type SerializeTupleVariant = ProbeSeq<'a>;
    type SerializeMap = ProbeMap<'a>;
    type SerializeStruct = ProbeMap<'a>;
    type SerializeStructVariant = ProbeMap<'a>;

    leaf_values! {
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_char: char,
        serialize_str: &str,
        serialize_bytes: &[u8],
    }

    fn serialize_f32(self, v: f32) -> Result<bool, ProbeError> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<bool, ProbeError> {
        if v.is_finite() {
            return Ok(false);
        }
        Ok(self.lossy(format!("{} is encoded as null", v)))
    }

    fn serialize_none(self) -> Result<bool, ProbeError> {
        Ok(false)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<bool, ProbeError> {
        if matches!(serde_json::to_value(value), Ok(Value::Null)) {
            return Ok(self.lossy("Some(..) of a null value arrives as None".to_string()));
        }
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<bool, ProbeError> {
        Ok(false)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<bool, ProbeError> {
        Ok(false)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<bool, ProbeError> {
        Ok(false)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<bool, ProbeError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<bool, ProbeError> {
        self.path.push(PathSegment::Key(variant.to_string()));
        descend_into(value, self.path, self.leaves);
        self.path.pop();
        Ok(true)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<ProbeSeq<'a>, ProbeError> {
        Ok(ProbeSeq {
            path: self.path,
            leaves: self.leaves,
            index: 0,
            in_variant: false,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<ProbeSeq<'a>, ProbeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<ProbeSeq<'a>, ProbeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<ProbeSeq<'a>, ProbeError> {
        self.path.push(PathSegment::Key(variant.to_string()));
        Ok(ProbeSeq {
            path: self.path,
            leaves: self.leaves,
            index: 0,
            in_variant: true,
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<ProbeMap<'a>, ProbeError> {
        Ok(ProbeMap {
            path: self.path,
            leaves: self.leaves,
            next_key: String::new(),
            in_variant: false,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<ProbeMap<'a>, ProbeError> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<ProbeMap<'a>, ProbeError> {
        self.path.push(PathSegment::Key(variant.to_string()));
        Ok(ProbeMap {
            path: self.path,
            leaves: self.leaves,
            next_key: String::new(),
            in_variant: true,
        })
    }
}

impl ProbeSeq<'_> {
    fn element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ProbeError> {
        self.path.push(PathSegment::Index(self.index));
        descend_into(value, self.path, self.leaves);
        self.path.pop();
        self.index += 1;
        Ok(())
    }

    fn finish(self) -> Result<bool, ProbeError> {
        if self.in_variant {
            self.path.pop();
        }
        Ok(true)
    }
}

impl ser::SerializeSeq for ProbeSeq<'_> {
    type Ok = bool;
    type Error = ProbeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ProbeError> {
        self.element(value)
    }

    fn end(self) -> Result<bool, ProbeError> {
        self.finish()
    }
}

impl ser::SerializeTuple for ProbeSeq<'_> {
    type Ok = bool;
    type Error = ProbeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ProbeError> {
        self.element(value)
    }

    fn end(self) -> Result<bool, ProbeError> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for ProbeSeq<'_> {
    type Ok = bool;
    type Error = ProbeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ProbeError> {
        self.element(value)
    }

    fn end(self) -> Result<bool, ProbeError> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for ProbeSeq<'_> {
    type Ok = bool;
    type Error = ProbeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ProbeError> {
        self.element(value)
    }

    fn end(self) -> Result<bool, ProbeError> {
        self.finish()
    }
}

impl ProbeMap<'_> {
    fn entry<T: Serialize + ?Sized>(&mut self, key: String, value: &T) -> Result<(), ProbeError> {
        self.path.push(PathSegment::Key(key));
        descend_into(value, self.path, self.leaves);
        self.path.pop();
        Ok(())
    }

    fn finish(self) -> Result<bool, ProbeError> {
        if self.in_variant {
            self.path.pop();
        }
        Ok(true)
    }
}

impl ser::SerializeMap for ProbeMap<'_> {
    type Ok = bool;
    type Error = ProbeError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), ProbeError> {
        self.next_key = key_label(key);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ProbeError> {
        let key = std::mem::take(&mut self.next_key);
        self.entry(key, value)
    }

    fn end(self) -> Result<bool, ProbeError> {
        self.finish()
    }
}

impl ser::SerializeStruct for ProbeMap<'_> {
    type Ok = bool;
    type Error = ProbeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ProbeError> {
        self.entry(key.to_string(), value)
    }

    fn end(self) -> Result<bool, ProbeError> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for ProbeMap<'_> {
    type Ok = bool;
    type Error = ProbeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ProbeError> {
        self.entry(key.to_string(), value)
    }

    fn end(self) -> Result<bool, ProbeError> {
        self.finish()
    }
}
