// This file is part of ofono2mm, a daemon that exposes oFono managed modems through the ModemManager D-Bus API.
//
// Copyright 2025 The ofono2mm Authors.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// ofono2mm is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// ofono2mm is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! Typed property values and the marshalling adapter between zvariant and the engine.
//!
//! oFono reports every property as a variant. The engine never touches zvariant types: values are
//! converted once into [`PropertyValue`] when they cross the transport boundary, and read back
//! through the lenient accessors below, which return `None` instead of failing on a type
//! mismatch.

use crate::error::BridgeError;
use std::collections::HashMap;
use zbus::zvariant::{OwnedValue, Value};

/// A property bag as reported by `GetProperties` or a signal payload.
pub type PropertyMap = HashMap<String, PropertyValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    Str(String),
    Path(String),
    StrList(Vec<String>),
    List(Vec<PropertyValue>),
    Map(PropertyMap),
    Unsupported,
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Strings and object paths both read as `&str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) | PropertyValue::Path(s) => Some(s),
            _ => None,
        }
    }

    /// Any unsigned integer that fits, plus non-negative signed ones.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            PropertyValue::Byte(v) => Some(u32::from(*v)),
            PropertyValue::UInt16(v) => Some(u32::from(*v)),
            PropertyValue::UInt32(v) => Some(*v),
            PropertyValue::UInt64(v) => u32::try_from(*v).ok(),
            PropertyValue::Int16(v) => u32::try_from(*v).ok(),
            PropertyValue::Int32(v) => u32::try_from(*v).ok(),
            PropertyValue::Int64(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Any integer that fits, signed or not.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Byte(v) => Some(i64::from(*v)),
            PropertyValue::Int16(v) => Some(i64::from(*v)),
            PropertyValue::UInt16(v) => Some(i64::from(*v)),
            PropertyValue::Int32(v) => Some(i64::from(*v)),
            PropertyValue::UInt32(v) => Some(i64::from(*v)),
            PropertyValue::Int64(v) => Some(*v),
            PropertyValue::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            PropertyValue::StrList(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&PropertyMap> {
        match self {
            PropertyValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Convert back into a variant for `SetProperty`. Only the scalar shapes oFono accepts as
    /// writable properties are supported.
    pub fn to_value(&self) -> Result<Value<'static>, BridgeError> {
        let value = match self {
            PropertyValue::Bool(b) => Value::from(*b),
            PropertyValue::Byte(v) => Value::from(*v),
            PropertyValue::Int16(v) => Value::from(*v),
            PropertyValue::UInt16(v) => Value::from(*v),
            PropertyValue::Int32(v) => Value::from(*v),
            PropertyValue::UInt32(v) => Value::from(*v),
            PropertyValue::Int64(v) => Value::from(*v),
            PropertyValue::UInt64(v) => Value::from(*v),
            PropertyValue::Double(v) => Value::from(*v),
            PropertyValue::Str(s) => Value::from(s.clone()),
            other => {
                return Err(BridgeError::Argument(format!(
                    "{other:?} cannot be written as an oFono property"
                )));
            }
        };
        Ok(value)
    }
}

impl From<&Value<'_>> for PropertyValue {
    fn from(value: &Value<'_>) -> Self {
        match value {
            Value::Bool(b) => PropertyValue::Bool(*b),
            Value::U8(v) => PropertyValue::Byte(*v),
            Value::I16(v) => PropertyValue::Int16(*v),
            Value::U16(v) => PropertyValue::UInt16(*v),
            Value::I32(v) => PropertyValue::Int32(*v),
            Value::U32(v) => PropertyValue::UInt32(*v),
            Value::I64(v) => PropertyValue::Int64(*v),
            Value::U64(v) => PropertyValue::UInt64(*v),
            Value::F64(v) => PropertyValue::Double(*v),
            Value::Str(s) => PropertyValue::Str(s.to_string()),
            Value::ObjectPath(p) => PropertyValue::Path(p.to_string()),
            Value::Value(inner) => PropertyValue::from(&**inner),
            Value::Array(array) => {
                let items: Vec<PropertyValue> = array.iter().map(PropertyValue::from).collect();
                if items.iter().all(|item| item.as_str().is_some()) {
                    PropertyValue::StrList(
                        items
                            .iter()
                            .filter_map(|item| item.as_str().map(str::to_string))
                            .collect(),
                    )
                } else {
                    PropertyValue::List(items)
                }
            }
            Value::Dict(_) => match value
                .try_clone()
                .and_then(|dict| HashMap::<String, OwnedValue>::try_from(dict))
            {
                Ok(map) => PropertyValue::Map(property_map(&map)),
                Err(_) => PropertyValue::Unsupported,
            },
            _ => PropertyValue::Unsupported,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Str(value)
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        PropertyValue::UInt32(value)
    }
}

impl From<u8> for PropertyValue {
    fn from(value: u8) -> Self {
        PropertyValue::Byte(value)
    }
}

impl From<Vec<&str>> for PropertyValue {
    fn from(value: Vec<&str>) -> Self {
        PropertyValue::StrList(value.into_iter().map(str::to_string).collect())
    }
}

impl From<PropertyMap> for PropertyValue {
    fn from(value: PropertyMap) -> Self {
        PropertyValue::Map(value)
    }
}

/// Convert a raw `a{sv}` dictionary into a [`PropertyMap`].
pub fn property_map(raw: &HashMap<String, OwnedValue>) -> PropertyMap {
    raw.iter()
        .map(|(key, value)| (key.clone(), PropertyValue::from(&**value)))
        .collect()
}

/// Lenient typed lookups on a [`PropertyMap`]. Missing keys and wrong types read as `None`.
pub trait PropertyMapExt {
    fn bool_of(&self, key: &str) -> Option<bool>;
    fn str_of(&self, key: &str) -> Option<&str>;
    fn u32_of(&self, key: &str) -> Option<u32>;
    fn i64_of(&self, key: &str) -> Option<i64>;
    fn strings_of(&self, key: &str) -> Option<&[String]>;
    fn map_of(&self, key: &str) -> Option<&PropertyMap>;
}

impl PropertyMapExt for PropertyMap {
    fn bool_of(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(PropertyValue::as_bool)
    }

    fn str_of(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PropertyValue::as_str)
    }

    fn u32_of(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(PropertyValue::as_u32)
    }

    fn i64_of(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(PropertyValue::as_i64)
    }

    fn strings_of(&self, key: &str) -> Option<&[String]> {
        self.get(key).and_then(PropertyValue::as_strings)
    }

    fn map_of(&self, key: &str) -> Option<&PropertyMap> {
        self.get(key).and_then(PropertyValue::as_map)
    }
}
