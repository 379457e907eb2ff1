//! Row to text conversion.
//!
//! Every value a read statement returns is rendered as a text cell, whatever
//! its storage type. NULL stays a distinct [`CellValue::Null`].
//!
//! # Architecture
//!
//! Conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies the value's type name into a logical category
//! 2. Database-specific decoders extract the value and render it as text
//!
//! A value that no decoder accepts is a scan error; nothing is silently
//! replaced by NULL.

use crate::error::{DbError, DbResult};
use crate::models::{CellValue, DriverKind};
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueFormat, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, ColumnIndex, Decode, Row, Type, TypeInfo, ValueRef};
use std::fmt::Write as _;

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    Interval,
    Array,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DriverKind) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // PostgreSQL arrays, e.g. "INT4[]"; element names must not leak into the checks below
    if lower.ends_with("[]") {
        return TypeCategory::Array;
    }

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC is actually a float
        if db == DriverKind::SQLite && lower == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    match lower.as_str() {
        "timestamptz" => return TypeCategory::TimestampTz,
        "timestamp" | "datetime" => return TypeCategory::Timestamp,
        "date" => return TypeCategory::Date,
        "time" => return TypeCategory::Time,
        "interval" => return TypeCategory::Interval,
        "year" | "oid" => return TypeCategory::Integer,
        // Would otherwise match the "int" substring below
        "point" => return TypeCategory::Unknown,
        _ => {}
    }

    if lower.contains("int") || lower.contains("serial") {
        return TypeCategory::Integer;
    }

    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }

    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    if lower == "uuid" {
        return TypeCategory::Uuid;
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    if lower.contains("char") || lower.contains("text") || lower == "name" {
        return TypeCategory::Text;
    }

    TypeCategory::Unknown
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        match value.format() {
            PgValueFormat::Text => Ok(RawDecimal(value.as_str()?.to_string())),
            PgValueFormat::Binary => Ok(RawDecimal(pg_numeric_to_string(value.as_bytes()?)?)),
        }
    }
}

const PG_NUMERIC_POS: u16 = 0x0000;
const PG_NUMERIC_NEG: u16 = 0x4000;
const PG_NUMERIC_NAN: u16 = 0xC000;
const PG_NUMERIC_PINF: u16 = 0xD000;
const PG_NUMERIC_NINF: u16 = 0xF000;

/// Render a PostgreSQL binary NUMERIC as decimal text.
///
/// Layout: ndigits (i16), weight (i16), sign (u16), dscale (u16), then
/// `ndigits` base-10000 digits (i16 each), most significant first.
pub fn pg_numeric_to_string(bytes: &[u8]) -> Result<String, String> {
    if bytes.len() < 8 {
        return Err("truncated NUMERIC header".to_string());
    }
    let read_u16 = |at: usize| u16::from_be_bytes([bytes[at], bytes[at + 1]]);

    let ndigits = read_u16(0) as i16;
    let weight = read_u16(2) as i16;
    let sign = read_u16(4);
    let dscale = read_u16(6) as usize;

    match sign {
        PG_NUMERIC_NAN => return Ok("NaN".to_string()),
        PG_NUMERIC_PINF => return Ok("Infinity".to_string()),
        PG_NUMERIC_NINF => return Ok("-Infinity".to_string()),
        PG_NUMERIC_POS | PG_NUMERIC_NEG => {}
        other => return Err(format!("invalid NUMERIC sign 0x{other:04X}")),
    }

    if ndigits < 0 || bytes.len() != 8 + ndigits as usize * 2 {
        return Err(format!("NUMERIC length mismatch for {ndigits} digits"));
    }
    let digits: Vec<i16> = (0..ndigits as usize)
        .map(|i| read_u16(8 + i * 2) as i16)
        .collect();
    let digit_at = |idx: i32| -> i16 {
        if idx < 0 {
            0
        } else {
            digits.get(idx as usize).copied().unwrap_or(0)
        }
    };

    let mut out = String::new();
    if sign == PG_NUMERIC_NEG {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        for i in 0..=weight as i32 {
            let d = digit_at(i);
            if i == 0 {
                let _ = write!(out, "{}", d);
            } else {
                let _ = write!(out, "{:04}", d);
            }
        }
    }

    if dscale > 0 {
        let mut frac = String::with_capacity(dscale + 4);
        let mut k = 1;
        while frac.len() < dscale {
            let _ = write!(frac, "{:04}", digit_at(weight as i32 + k));
            k += 1;
        }
        frac.truncate(dscale);
        out.push('.');
        out.push_str(&frac);
    }

    Ok(out)
}

// =============================================================================
// Text Encoding Helpers
// =============================================================================

/// Render binary data as text: UTF-8 when valid, base64 otherwise.
pub fn binary_to_text(bytes: &[u8]) -> String {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => STANDARD.encode(bytes),
    }
}

fn bool_to_text(v: bool) -> String {
    if v { "true" } else { "false" }.to_string()
}

fn timestamp_to_text(v: chrono::NaiveDateTime) -> String {
    v.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

fn timestamptz_to_text(v: chrono::DateTime<chrono::Utc>) -> String {
    v.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
}

fn plural(n: i64, unit: &str) -> String {
    if n.abs() == 1 {
        format!("{} {}", n, unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

/// Render a time of day or duration in microseconds as `[-]HH:MM:SS[.ffffff]`.
///
/// Hours are not wrapped at 24, so durations longer than a day stay intact.
fn micros_to_clock(micros: i64) -> String {
    let sign = if micros < 0 { "-" } else { "" };
    let abs = micros.unsigned_abs();
    let secs = abs / 1_000_000;
    let frac = abs % 1_000_000;

    let mut out = format!(
        "{}{:02}:{:02}:{:02}",
        sign,
        secs / 3600,
        (secs / 60) % 60,
        secs % 60
    );
    if frac != 0 {
        let digits = format!("{:06}", frac);
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
    out
}

/// Render an interval the way PostgreSQL's default `postgres` style does,
/// e.g. `1 year 2 mons 3 days 04:05:06`.
pub fn interval_to_text(months: i32, days: i32, microseconds: i64) -> String {
    let mut parts = Vec::new();
    let years = months / 12;
    let mons = months % 12;

    if years != 0 {
        parts.push(plural(years.into(), "year"));
    }
    if mons != 0 {
        parts.push(plural(mons.into(), "mon"));
    }
    if days != 0 {
        parts.push(plural(days.into(), "day"));
    }
    if microseconds != 0 || parts.is_empty() {
        parts.push(micros_to_clock(microseconds));
    }
    parts.join(" ")
}

/// Render PostgreSQL money (an amount in cents) in the `C` locale format, e.g. `-$1,234.56`.
pub fn money_to_text(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let whole = (abs / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}${}.{:02}", sign, grouped, abs % 100)
}

/// Render array elements as a PostgreSQL array literal, e.g. `{1,NULL,3}`.
///
/// With `quote` set, elements that would be ambiguous are double-quoted.
pub fn array_to_text<T: std::fmt::Display>(items: &[Option<T>], quote: bool) -> String {
    let rendered: Vec<String> = items
        .iter()
        .map(|item| match item {
            None => "NULL".to_string(),
            Some(v) => {
                let text = v.to_string();
                if quote && needs_array_quotes(&text) {
                    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
                    format!("\"{}\"", escaped)
                } else {
                    text
                }
            }
        })
        .collect();
    format!("{{{}}}", rendered.join(","))
}

fn needs_array_quotes(text: &str) -> bool {
    text.is_empty()
        || text.eq_ignore_ascii_case("null")
        || text
            .chars()
            .any(|c| matches!(c, '{' | '}' | ',' | '"' | '\\') || c.is_whitespace())
}

/// Render a MySQL binary-protocol TIME value, which may exceed 24 hours or be negative.
///
/// Layout: optional length byte, then is_negative (u8), days (u32 LE), hours,
/// minutes, seconds (u8 each) and optionally microseconds (u32 LE).
pub fn mysql_time_to_text(bytes: &[u8]) -> Option<String> {
    let body = match bytes.split_first() {
        Some((len, rest)) if *len as usize == rest.len() => rest,
        _ => bytes,
    };
    if body.is_empty() {
        return Some("00:00:00".to_string());
    }
    if body.len() != 8 && body.len() != 12 {
        return None;
    }

    let negative = body[0] == 1;
    let days = u32::from_le_bytes([body[1], body[2], body[3], body[4]]) as i64;
    let (hours, minutes, seconds) = (body[5] as i64, body[6] as i64, body[7] as i64);
    let micros = if body.len() == 12 {
        u32::from_le_bytes([body[8], body[9], body[10], body[11]]) as i64
    } else {
        0
    };

    let total = (((days * 24 + hours) * 60 + minutes) * 60 + seconds) * 1_000_000 + micros;
    Some(micros_to_clock(if negative { -total } else { total }))
}

/// Whether a TIME value arrived as text (`-838:59:59.5`) rather than in binary layout.
///
/// The binary layout starts with a length or sign byte, never an ASCII digit or '-'.
pub fn is_clock_text(bytes: &[u8]) -> bool {
    !bytes.is_empty()
        && bytes
            .iter()
            .all(|b| b.is_ascii_digit() || matches!(b, b':' | b'-' | b'.'))
}

/// Render a MySQL BIT value (big-endian bytes) as its unsigned integer value.
pub fn bits_to_integer_text(bytes: &[u8]) -> String {
    let value = bytes
        .iter()
        .fold(0u128, |acc, b| (acc << 8) | u128::from(*b));
    value.to_string()
}

/// Render PostgreSQL binary BIT/VARBIT (bit length as i32, then packed bits) as `0`/`1` text.
pub fn pg_bits_to_text(bytes: &[u8]) -> Option<String> {
    if bytes.len() < 4 {
        return None;
    }
    let (len, data) = bytes.split_at(4);
    let bit_len = usize::try_from(i32::from_be_bytes([len[0], len[1], len[2], len[3]])).ok()?;
    if data.len() * 8 < bit_len {
        return None;
    }
    Some(
        (0..bit_len)
            .map(|i| {
                if data[i / 8] & (0x80 >> (i % 8)) != 0 {
                    '1'
                } else {
                    '0'
                }
            })
            .collect(),
    )
}

/// Render PostgreSQL binary INET/CIDR.
///
/// Layout: family (2 = IPv4, 3 = IPv6), prefix bits, is_cidr flag, address length, address.
/// INET omits the prefix when it covers the whole address; CIDR always shows it.
pub fn pg_inet_to_text(bytes: &[u8], always_prefix: bool) -> Option<String> {
    if bytes.len() < 4 {
        return None;
    }
    let (header, addr) = bytes.split_at(4);
    let (family, bits, nbytes) = (header[0], header[1], header[3] as usize);
    if addr.len() != nbytes {
        return None;
    }

    let (ip, full) = match (family, nbytes) {
        (2, 4) => {
            let octets: [u8; 4] = addr.try_into().ok()?;
            (std::net::Ipv4Addr::from(octets).to_string(), 32)
        }
        (3, 16) => {
            let octets: [u8; 16] = addr.try_into().ok()?;
            (std::net::Ipv6Addr::from(octets).to_string(), 128)
        }
        _ => return None,
    };

    if always_prefix || bits != full {
        Some(format!("{}/{}", ip, bits))
    } else {
        Some(ip)
    }
}

// =============================================================================
// Row to Text Trait
// =============================================================================

/// Trait for converting database rows to text cells.
pub trait RowToText {
    fn column_names(&self) -> Vec<String>;
    fn to_text_cells(&self) -> DbResult<Vec<CellValue>>;
}

impl RowToText for MySqlRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_text_cells(&self) -> DbResult<Vec<CellValue>> {
        (0..self.len())
            .map(|idx| mysql::decode_cell(self, idx))
            .collect()
    }
}

impl RowToText for PgRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_text_cells(&self) -> DbResult<Vec<CellValue>> {
        (0..self.len())
            .map(|idx| postgres::decode_cell(self, idx))
            .collect()
    }
}

impl RowToText for SqliteRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_text_cells(&self) -> DbResult<Vec<CellValue>> {
        (0..self.len())
            .map(|idx| sqlite::decode_cell(self, idx))
            .collect()
    }
}

/// Read the nullness and type name of a value without decoding it.
fn inspect<R>(row: &R, idx: usize) -> DbResult<(bool, String)>
where
    R: Row,
    usize: ColumnIndex<R>,
{
    let raw = row
        .try_get_raw(idx)
        .map_err(|e| DbError::scan(column_name(row, idx), e.to_string()))?;
    Ok((raw.is_null(), raw.type_info().name().to_string()))
}

fn column_name<R: Row>(row: &R, idx: usize) -> String {
    row.columns()
        .get(idx)
        .map(|c| c.name().to_string())
        .unwrap_or_else(|| idx.to_string())
}

fn unsupported<R: Row>(row: &R, idx: usize, type_name: &str) -> DbError {
    DbError::scan(
        column_name(row, idx),
        format!("cannot render {} value as text", type_name),
    )
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_cell(row: &MySqlRow, idx: usize) -> DbResult<CellValue> {
        let (is_null, type_name) = inspect(row, idx)?;
        if is_null {
            return Ok(CellValue::Null);
        }

        let text = match categorize_type(&type_name, DriverKind::MySQL) {
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Decimal => row.try_get::<RawDecimal, _>(idx).ok().map(|v| v.0),
            TypeCategory::Boolean => row.try_get::<bool, _>(idx).ok().map(bool_to_text),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Json => row
                .try_get::<serde_json::Value, _>(idx)
                .ok()
                .map(|v| v.to_string()),
            TypeCategory::Timestamp | TypeCategory::TimestampTz => row
                .try_get::<chrono::NaiveDateTime, _>(idx)
                .ok()
                .map(timestamp_to_text),
            TypeCategory::Date => row
                .try_get::<chrono::NaiveDate, _>(idx)
                .ok()
                .map(|v| v.to_string()),
            TypeCategory::Time => decode_time(row, idx),
            TypeCategory::Binary => row
                .try_get::<Vec<u8>, _>(idx)
                .ok()
                .map(|v| binary_to_text(&v)),
            _ if type_name.eq_ignore_ascii_case("BIT") => {
                decode_raw::<&[u8]>(row, idx).map(bits_to_integer_text)
            }
            _ => None,
        };

        text.or_else(|| fallback(row, idx))
            .map(CellValue::Text)
            .ok_or_else(|| unsupported(row, idx, &type_name))
    }

    /// Decode without the type compatibility check `try_get` applies.
    fn decode_raw<'r, T: Decode<'r, sqlx::MySql>>(row: &'r MySqlRow, idx: usize) -> Option<T> {
        let raw = row.try_get_raw(idx).ok()?;
        T::decode(raw).ok()
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> Option<String> {
        if let Ok(v) = row.try_get::<i64, _>(idx) {
            return Some(v.to_string());
        }
        if let Ok(v) = row.try_get::<u64, _>(idx) {
            return Some(v.to_string());
        }
        // YEAR
        decode_raw::<u16>(row, idx).map(|v| v.to_string())
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> Option<String> {
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return Some(v.to_string());
        }
        row.try_get::<f32, _>(idx).ok().map(|v| v.to_string())
    }

    /// TIME spans -838:59:59 to 838:59:59, beyond what `NaiveTime` holds.
    fn decode_time(row: &MySqlRow, idx: usize) -> Option<String> {
        if let Ok(v) = row.try_get::<chrono::NaiveTime, _>(idx) {
            return Some(v.to_string());
        }
        let bytes = decode_raw::<&[u8]>(row, idx)?;
        if is_clock_text(bytes) {
            return std::str::from_utf8(bytes).ok().map(str::to_string);
        }
        mysql_time_to_text(bytes)
    }

    fn fallback(row: &MySqlRow, idx: usize) -> Option<String> {
        if let Ok(v) = row.try_get::<String, _>(idx) {
            return Some(v);
        }
        if let Ok(v) = row.try_get::<Vec<u8>, _>(idx) {
            return Some(binary_to_text(&v));
        }
        decode_raw::<&[u8]>(row, idx).map(binary_to_text)
    }
}

mod postgres {
    use super::*;
    use sqlx::postgres::types::{Oid, PgInterval, PgMoney};

    pub fn decode_cell(row: &PgRow, idx: usize) -> DbResult<CellValue> {
        let (is_null, type_name) = inspect(row, idx)?;
        if is_null {
            return Ok(CellValue::Null);
        }

        let text = match categorize_type(&type_name, DriverKind::PostgreSQL) {
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Decimal => row.try_get::<RawDecimal, _>(idx).ok().map(|v| v.0),
            TypeCategory::Boolean => row.try_get::<bool, _>(idx).ok().map(bool_to_text),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Json => row
                .try_get::<serde_json::Value, _>(idx)
                .ok()
                .map(|v| v.to_string()),
            TypeCategory::Uuid => row
                .try_get::<uuid::Uuid, _>(idx)
                .ok()
                .map(|v| v.to_string()),
            TypeCategory::Timestamp => row
                .try_get::<chrono::NaiveDateTime, _>(idx)
                .ok()
                .map(timestamp_to_text),
            TypeCategory::TimestampTz => row
                .try_get::<chrono::DateTime<chrono::Utc>, _>(idx)
                .ok()
                .map(timestamptz_to_text),
            TypeCategory::Date => row
                .try_get::<chrono::NaiveDate, _>(idx)
                .ok()
                .map(|v| v.to_string()),
            TypeCategory::Time => row
                .try_get::<chrono::NaiveTime, _>(idx)
                .ok()
                .map(|v| v.to_string()),
            TypeCategory::Binary => row
                .try_get::<Vec<u8>, _>(idx)
                .ok()
                .map(|v| binary_to_text(&v)),
            // The server's own text is authoritative when it sent one
            TypeCategory::Array => raw_text(row, idx).or_else(|| decode_array(row, idx)),
            TypeCategory::Interval => row
                .try_get::<PgInterval, _>(idx)
                .ok()
                .map(|v| interval_to_text(v.months, v.days, v.microseconds)),
            _ => decode_other(row, idx, &type_name),
        };

        text.or_else(|| row.try_get::<String, _>(idx).ok())
            .or_else(|| raw_text(row, idx))
            .map(CellValue::Text)
            .ok_or_else(|| unsupported(row, idx, &type_name))
    }

    /// Text-format values (unprepared statements) carry PostgreSQL's own rendering.
    fn raw_text(row: &PgRow, idx: usize) -> Option<String> {
        let raw = row.try_get_raw(idx).ok()?;
        match raw.format() {
            PgValueFormat::Text => raw.as_str().ok().map(str::to_string),
            PgValueFormat::Binary => None,
        }
    }

    fn raw_bytes<'r>(row: &'r PgRow, idx: usize) -> Option<&'r [u8]> {
        let raw: PgValueRef<'r> = row.try_get_raw(idx).ok()?;
        match raw.format() {
            PgValueFormat::Binary => raw.as_bytes().ok(),
            PgValueFormat::Text => None,
        }
    }

    fn decode_integer(row: &PgRow, idx: usize) -> Option<String> {
        if let Ok(v) = row.try_get::<i16, _>(idx) {
            return Some(v.to_string());
        }
        if let Ok(v) = row.try_get::<i32, _>(idx) {
            return Some(v.to_string());
        }
        if let Ok(v) = row.try_get::<i64, _>(idx) {
            return Some(v.to_string());
        }
        row.try_get::<Oid, _>(idx).ok().map(|v| v.0.to_string())
    }

    fn decode_float(row: &PgRow, idx: usize) -> Option<String> {
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return Some(v.to_string());
        }
        row.try_get::<f32, _>(idx).ok().map(|v| v.to_string())
    }

    fn decode_array(row: &PgRow, idx: usize) -> Option<String> {
        if let Ok(v) = row.try_get::<Vec<Option<i16>>, _>(idx) {
            return Some(array_to_text(&v, false));
        }
        if let Ok(v) = row.try_get::<Vec<Option<i32>>, _>(idx) {
            return Some(array_to_text(&v, false));
        }
        if let Ok(v) = row.try_get::<Vec<Option<i64>>, _>(idx) {
            return Some(array_to_text(&v, false));
        }
        if let Ok(v) = row.try_get::<Vec<Option<f64>>, _>(idx) {
            return Some(array_to_text(&v, false));
        }
        if let Ok(v) = row.try_get::<Vec<Option<f32>>, _>(idx) {
            return Some(array_to_text(&v, false));
        }
        if let Ok(v) = row.try_get::<Vec<Option<bool>>, _>(idx) {
            let flags: Vec<Option<&str>> = v
                .iter()
                .map(|b| b.map(|b| if b { "t" } else { "f" }))
                .collect();
            return Some(array_to_text(&flags, false));
        }
        if let Ok(v) = row.try_get::<Vec<Option<uuid::Uuid>>, _>(idx) {
            return Some(array_to_text(&v, false));
        }
        row.try_get::<Vec<Option<String>>, _>(idx)
            .ok()
            .map(|v| array_to_text(&v, true))
    }

    /// Types without a logical category, decoded from their binary layout.
    fn decode_other(row: &PgRow, idx: usize, type_name: &str) -> Option<String> {
        match type_name.to_ascii_uppercase().as_str() {
            "MONEY" => row
                .try_get::<PgMoney, _>(idx)
                .ok()
                .map(|v| money_to_text(v.0)),
            "INET" => raw_bytes(row, idx).and_then(|b| pg_inet_to_text(b, false)),
            "CIDR" => raw_bytes(row, idx).and_then(|b| pg_inet_to_text(b, true)),
            "BIT" | "VARBIT" => raw_bytes(row, idx).and_then(pg_bits_to_text),
            _ => None,
        }
    }
}

mod sqlite {
    use super::*;

    pub fn decode_cell(row: &SqliteRow, idx: usize) -> DbResult<CellValue> {
        let (is_null, type_name) = inspect(row, idx)?;
        if is_null {
            return Ok(CellValue::Null);
        }

        // SQLite reports the storage class of the value, not the declared type
        let text = match categorize_type(&type_name, DriverKind::SQLite) {
            TypeCategory::Integer | TypeCategory::Boolean => {
                row.try_get::<i64, _>(idx).ok().map(|v| v.to_string())
            }
            TypeCategory::Float | TypeCategory::Decimal => {
                row.try_get::<f64, _>(idx).ok().map(|v| v.to_string())
            }
            TypeCategory::Binary => row
                .try_get::<Vec<u8>, _>(idx)
                .ok()
                .map(|v| binary_to_text(&v)),
            _ => None,
        };

        text.or_else(|| fallback(row, idx))
            .map(CellValue::Text)
            .ok_or_else(|| unsupported(row, idx, &type_name))
    }

    fn fallback(row: &SqliteRow, idx: usize) -> Option<String> {
        if let Ok(v) = row.try_get::<String, _>(idx) {
            return Some(v);
        }
        if let Ok(v) = row.try_get::<i64, _>(idx) {
            return Some(v.to_string());
        }
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return Some(v.to_string());
        }
        row.try_get::<Vec<u8>, _>(idx)
            .ok()
            .map(|v| binary_to_text(&v))
    }
}
