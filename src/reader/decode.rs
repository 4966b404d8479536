// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Typed decoding of text cells.
//!
//! The engine renders every value as text. Each [`ColumnType`] has one
//! decoder here; arrays, maps, rows and times stay text.

use crate::error::{Error, Result};
use crate::types::query::{ColumnDescriptor, ColumnType};
use chrono::{NaiveDate, NaiveDateTime};

/// A decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// Unscaled value; the column's scale gives the decimal point.
    Decimal(i128),
    String(String),
    Binary(Vec<u8>),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

/// Decode one cell of `column`. `None` is a null cell.
pub fn decode_cell(column: &ColumnDescriptor, value: Option<&str>) -> Result<CellValue> {
    let Some(text) = value else {
        return Ok(CellValue::Null);
    };
    let invalid = |what: &str| {
        Error::decode(
            &column.name,
            format!("invalid {} value \"{}\"", what, text),
        )
    };

    let cell = match &column.column_type {
        ColumnType::Boolean => match text {
            "true" => CellValue::Boolean(true),
            "false" => CellValue::Boolean(false),
            _ => return Err(invalid("boolean")),
        },
        ColumnType::TinyInt => CellValue::Int8(text.parse().map_err(|_| invalid("tinyint"))?),
        ColumnType::SmallInt => {
            CellValue::Int16(text.parse().map_err(|_| invalid("smallint"))?)
        }
        ColumnType::Integer => CellValue::Int32(text.parse().map_err(|_| invalid("integer"))?),
        ColumnType::BigInt => CellValue::Int64(text.parse().map_err(|_| invalid("bigint"))?),
        ColumnType::Float => CellValue::Float32(text.parse().map_err(|_| invalid("float"))?),
        ColumnType::Double => CellValue::Float64(text.parse().map_err(|_| invalid("double"))?),
        ColumnType::Decimal { scale, .. } => CellValue::Decimal(
            parse_decimal(text, *scale).ok_or_else(|| invalid("decimal"))?,
        ),
        ColumnType::Varbinary => {
            CellValue::Binary(parse_hex_bytes(text).ok_or_else(|| invalid("varbinary"))?)
        }
        ColumnType::Date => CellValue::Date(
            NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| invalid("date"))?,
        ),
        ColumnType::Timestamp => CellValue::Timestamp(
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
                .map_err(|_| invalid("timestamp"))?,
        ),
        ColumnType::Char
        | ColumnType::Varchar
        | ColumnType::Time
        | ColumnType::Json
        | ColumnType::Other(_) => CellValue::String(text.to_string()),
    };
    Ok(cell)
}

/// Parse `-123.45` into an unscaled integer for `scale` (12345 at scale 2).
/// Fewer fraction digits than `scale` are padded; more are rejected.
fn parse_decimal(text: &str, scale: i8) -> Option<i128> {
    let scale = usize::try_from(scale).ok()?;
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if fraction.len() > scale
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let mut unscaled = String::with_capacity(whole.len() + scale);
    unscaled.push_str(whole);
    unscaled.push_str(fraction);
    unscaled.extend(std::iter::repeat('0').take(scale - fraction.len()));
    let value: i128 = unscaled.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Parse space separated hex bytes (`68 65 6c 6c 6f`).
fn parse_hex_bytes(text: &str) -> Option<Vec<u8>> {
    text.split_ascii_whitespace()
        .map(|byte| {
            if byte.len() == 2 {
                u8::from_str_radix(byte, 16).ok()
            } else {
                None
            }
        })
        .collect()
}
