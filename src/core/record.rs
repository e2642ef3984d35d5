//! Product records, attributes, patches and filters
//!
//! `None` is the only internal representation of an unset attribute. Empty
//! strings coming from callers are folded to `None` here, and converted back
//! to `""` only by the presentation helpers (`to_row`, `display`).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::core::error::{CatalogError, Result};

/// A product attribute (one catalog column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Product,
    Sku,
    Account,
    Class,
    Category,
    Subcategory,
}

impl Attribute {
    /// Column name in the `information` table
    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Product => "product",
            Attribute::Sku => "sku",
            Attribute::Account => "account",
            Attribute::Class => "class",
            Attribute::Category => "category",
            Attribute::Subcategory => "subcategory",
        }
    }

    /// All attributes in column order
    pub fn all() -> &'static [Attribute] {
        &[
            Attribute::Product,
            Attribute::Sku,
            Attribute::Account,
            Attribute::Class,
            Attribute::Category,
            Attribute::Subcategory,
        ]
    }

    /// Attributes whose values are hierarchy titles
    pub fn tiers() -> &'static [Attribute] {
        &[
            Attribute::Account,
            Attribute::Class,
            Attribute::Category,
            Attribute::Subcategory,
        ]
    }

    pub fn is_tier(&self) -> bool {
        !matches!(self, Attribute::Product | Attribute::Sku)
    }

    /// Parse a tier name, rejecting `product` and `sku`
    pub fn parse_tier(s: &str) -> Result<Self> {
        let attr: Attribute = s
            .parse()
            .map_err(|_| CatalogError::NotATier(s.to_string()))?;
        if attr.is_tier() {
            Ok(attr)
        } else {
            Err(CatalogError::NotATier(s.to_string()))
        }
    }

    /// Prefix matching applies to the identifying attributes only
    pub fn matches_by_prefix(&self) -> bool {
        matches!(self, Attribute::Product | Attribute::Sku)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "product" => Ok(Attribute::Product),
            "sku" => Ok(Attribute::Sku),
            "account" => Ok(Attribute::Account),
            "class" => Ok(Attribute::Class),
            "category" => Ok(Attribute::Category),
            "subcategory" => Ok(Attribute::Subcategory),
            _ => Err(CatalogError::UnknownAttribute(s.to_string())),
        }
    }
}

/// Fold a caller-supplied value into the internal representation
pub fn non_blank(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// One catalog row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product: String,
    pub sku: Option<String>,
    pub account: Option<String>,
    pub class: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
}

impl ProductRecord {
    pub fn new(product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            ..Default::default()
        }
    }

    /// Builder-style setter; an empty value leaves the attribute unset
    pub fn with(mut self, attr: Attribute, value: &str) -> Self {
        self.set(attr, value);
        self
    }

    /// Build a record from an attribute-name → value mapping
    ///
    /// Fails with `InvalidRecord` when `product` is absent or empty and with
    /// `UnknownAttribute` for keys that are not catalog columns.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self> {
        let mut record = ProductRecord::default();
        for (key, value) in fields {
            let attr: Attribute = key.parse()?;
            record.set(attr, value);
        }
        if record.product.is_empty() {
            return Err(CatalogError::InvalidRecord(
                "record has no product name".to_string(),
            ));
        }
        Ok(record)
    }

    /// Record holding the non-empty values of a product-carrying patch
    pub fn from_patch(patch: &Patch) -> Result<Self> {
        let mut record = ProductRecord::default();
        for (attr, value) in patch.iter() {
            record.set(attr, value);
        }
        if record.product.is_empty() {
            return Err(CatalogError::InvalidRecord(
                "record has no product name".to_string(),
            ));
        }
        Ok(record)
    }

    pub fn get(&self, attr: Attribute) -> Option<&str> {
        match attr {
            Attribute::Product => Some(self.product.as_str()).filter(|p| !p.is_empty()),
            Attribute::Sku => self.sku.as_deref(),
            Attribute::Account => self.account.as_deref(),
            Attribute::Class => self.class.as_deref(),
            Attribute::Category => self.category.as_deref(),
            Attribute::Subcategory => self.subcategory.as_deref(),
        }
    }

    pub fn set(&mut self, attr: Attribute, value: &str) {
        let value = non_blank(value);
        match attr {
            Attribute::Product => self.product = value.unwrap_or_default(),
            Attribute::Sku => self.sku = value,
            Attribute::Account => self.account = value,
            Attribute::Class => self.class = value,
            Attribute::Category => self.category = value,
            Attribute::Subcategory => self.subcategory = value,
        }
    }

    /// Attributes carrying a value, in column order
    pub fn present(&self) -> Vec<(Attribute, &str)> {
        Attribute::all()
            .iter()
            .filter_map(|attr| self.get(*attr).map(|v| (*attr, v)))
            .collect()
    }

    /// Presentation row with unset attributes rendered as empty strings
    pub fn to_row(&self) -> [String; 6] {
        let cell = |v: &Option<String>| v.clone().unwrap_or_default();
        [
            self.product.clone(),
            cell(&self.sku),
            cell(&self.account),
            cell(&self.class),
            cell(&self.category),
            cell(&self.subcategory),
        ]
    }
}

/// Attribute → new value changes for `set`/`set_bulk`
///
/// An empty value clears the attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch(BTreeMap<Attribute, String>);

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, attr: Attribute, value: impl Into<String>) -> Self {
        self.0.insert(attr, value.into());
        self
    }

    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self> {
        let mut patch = Patch::new();
        for (key, value) in fields {
            patch.0.insert(key.parse()?, value.clone());
        }
        Ok(patch)
    }

    pub fn get(&self, attr: Attribute) -> Option<&str> {
        self.0.get(&attr).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Patch without the `product` entry (used once a rename is split off)
    pub fn without_product(&self) -> Patch {
        let mut rest = self.clone();
        rest.0.remove(&Attribute::Product);
        rest
    }
}

/// Query filter: attribute → match value
///
/// `product`/`sku` match by prefix, tier attributes by equality. Empty
/// values are ignored; the remaining entries are AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter(BTreeMap<Attribute, String>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attr: Attribute, value: impl Into<String>) -> Self {
        self.0.insert(attr, value.into());
        self
    }

    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self> {
        let mut filter = Filter::new();
        for (key, value) in fields {
            filter.0.insert(key.parse()?, value.clone());
        }
        Ok(filter)
    }

    /// Entries that take part in the predicate
    pub fn active(&self) -> impl Iterator<Item = (Attribute, &str)> {
        self.0
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (*k, v.as_str()))
    }
}
