use std::collections::HashSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use itertools::Itertools;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Server-assigned product identifier. The API hands out either numeric or
/// string ids depending on the backing store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    Int(i64),
    Text(String),
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductId::Int(v) => write!(f, "{v}"),
            ProductId::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for ProductId {
    fn from(value: i64) -> Self {
        ProductId::Int(value)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        ProductId::Text(value.to_string())
    }
}

/// The five user-visible product columns, in table order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Stock,
    Sold,
    Date,
    Category,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Name,
        Field::Stock,
        Field::Sold,
        Field::Date,
        Field::Category,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            Field::Name => "nama_barang",
            Field::Stock => "stok",
            Field::Sold => "jumlah_terjual",
            Field::Date => "tanggal_transaksi",
            Field::Category => "jenis_barang",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "Nama Barang",
            Field::Stock => "Stok",
            Field::Sold => "Jumlah Terjual",
            Field::Date => "Tanggal Transaksi",
            Field::Category => "Jenis Barang",
        }
    }

    /// Accepts the column label, the wire name, or a short english alias.
    /// Matching ignores case, and treats spaces, dashes and underscores alike.
    pub fn parse(value: &str) -> Option<Self> {
        let key = value
            .trim()
            .to_lowercase()
            .replace(['-', ' '], "_");
        match key.as_str() {
            "nama_barang" | "name" | "nama" => Some(Field::Name),
            "stok" | "stock" => Some(Field::Stock),
            "jumlah_terjual" | "sold" | "terjual" => Some(Field::Sold),
            "tanggal_transaksi" | "date" | "tanggal" => Some(Field::Date),
            "jenis_barang" | "category" | "jenis" => Some(Field::Category),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(rename = "nama_barang")]
    pub name: String,
    #[serde(rename = "stok", deserialize_with = "deserialize_quantity")]
    pub stock: u64,
    #[serde(rename = "jumlah_terjual", deserialize_with = "deserialize_quantity")]
    pub sold: u64,
    #[serde(rename = "tanggal_transaksi", deserialize_with = "deserialize_date")]
    pub date: NaiveDate,
    #[serde(rename = "jenis_barang")]
    pub category: String,
}

impl Product {
    /// String form of a column, as shown in the table and matched by search.
    pub fn field_text(&self, field: Field) -> String {
        match field {
            Field::Name => self.name.clone(),
            Field::Stock => self.stock.to_string(),
            Field::Sold => self.sold.to_string(),
            Field::Date => format_date(self.date),
            Field::Category => self.category.clone(),
        }
    }
}

/// Request body for create and update. Carries no id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProductPayload {
    #[serde(rename = "nama_barang")]
    pub name: String,
    #[serde(rename = "stok")]
    pub stock: u64,
    #[serde(rename = "jumlah_terjual")]
    pub sold: u64,
    #[serde(rename = "tanggal_transaksi")]
    pub date: NaiveDate,
    #[serde(rename = "jenis_barang")]
    pub category: String,
}

/// Raw form input staged while the create/edit form is open.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProductDraft {
    pub name: String,
    pub stock: String,
    pub sold: String,
    pub date: String,
    pub category: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("please fill in every field (missing: {})", join_labels(.fields))]
    MissingFields { fields: Vec<Field> },

    #[error("{field} must be a non-negative whole number, got '{value}'")]
    InvalidQuantity { field: Field, value: String },

    #[error("{field} must be a date (YYYY-MM-DD), got '{value}'")]
    InvalidDate { field: Field, value: String },
}

fn join_labels(fields: &[Field]) -> String {
    fields.iter().map(|f| f.label()).join(", ")
}

impl ProductDraft {
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            stock: product.stock.to_string(),
            sold: product.sold.to_string(),
            date: format_date(product.date),
            category: product.category.clone(),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Stock => &self.stock,
            Field::Sold => &self.sold,
            Field::Date => &self.date,
            Field::Category => &self.category,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Name => self.name = value,
            Field::Stock => self.stock = value,
            Field::Sold => self.sold = value,
            Field::Date => self.date = value,
            Field::Category => self.category = value,
        }
    }

    pub fn missing_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| self.get(*f).trim().is_empty())
            .collect()
    }

    /// Presence check on every field first, then coercion of the quantities
    /// and the date.
    pub fn to_payload(&self) -> Result<ProductPayload, ValidationError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields { fields: missing });
        }
        let stock = parse_quantity(Field::Stock, &self.stock)?;
        let sold = parse_quantity(Field::Sold, &self.sold)?;
        let date = parse_date(&self.date).ok_or_else(|| ValidationError::InvalidDate {
            field: Field::Date,
            value: self.date.trim().to_string(),
        })?;
        Ok(ProductPayload {
            name: self.name.trim().to_string(),
            stock,
            sold,
            date,
            category: self.category.trim().to_string(),
        })
    }
}

fn parse_quantity(field: Field, raw: &str) -> Result<u64, ValidationError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ValidationError::InvalidQuantity {
            field,
            value: raw.trim().to_string(),
        })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Accepts a plain calendar date or a timestamp; only the date part is kept.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts.date());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(ts.date());
    }
    None
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawQuantity {
    Number(u64),
    Text(String),
    Other(serde_json::Value),
}

fn deserialize_quantity<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawQuantity::deserialize(deserializer) {
        Ok(RawQuantity::Number(n)) => Ok(n),
        Ok(RawQuantity::Text(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| D::Error::custom(format!("invalid quantity '{s}'"))),
        Ok(RawQuantity::Other(v)) => Err(D::Error::custom(format!(
            "quantity must be a non-negative integer, got {v}"
        ))),
        Err(e) => Err(e),
    }
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| D::Error::custom(format!("invalid date '{raw}'")))
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed product list: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate product id {id}")]
    DuplicateId { id: ProductId },
}

/// Decodes a list response into the canonical collection, keeping server
/// order. The whole response is rejected if any record is malformed.
pub fn decode_collection(body: &[u8]) -> Result<Vec<Product>, DecodeError> {
    let products: Vec<Product> =
        serde_json::from_slice(body).map_err(|source| DecodeError::Json { source })?;
    let mut seen: HashSet<&ProductId> = HashSet::new();
    for p in products.iter() {
        if !seen.insert(&p.id) {
            return Err(DecodeError::DuplicateId { id: p.id.clone() });
        }
    }
    Ok(products)
}
