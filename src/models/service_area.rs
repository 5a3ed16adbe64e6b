//! Service area rows, request payloads and lookup results.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::pip::AreaGeometry;
use crate::validation::{
    present, required_text, FieldErrors, INVALID_NUMBER, NAME_MAX_LEN, REQUIRED,
};

/// Total digits allowed in a price.
pub const PRICE_MAX_DIGITS: u32 = 10;
/// Digits allowed after the decimal point in a price.
pub const PRICE_DECIMAL_PLACES: u32 = 2;

lazy_static! {
    // Plain or scientific decimal notation
    static ref NUMERIC_REGEX: Regex =
        Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").unwrap();
}

/// A priced geographic area served by one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceArea {
    pub id: u64,
    pub name: String,
    pub price: Decimal,
    pub area: AreaGeometry,
    /// Owning provider id
    pub provider: u64,
}

/// Validated service area fields, before an id is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewServiceArea {
    pub name: String,
    pub price: Decimal,
    pub area: AreaGeometry,
    pub provider: u64,
}

impl NewServiceArea {
    pub fn with_id(self, id: u64) -> ServiceArea {
        ServiceArea {
            id,
            name: self.name,
            price: self.price,
            area: self.area,
            provider: self.provider,
        }
    }
}

/// One row of a point lookup: area name, price and provider name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderInArea {
    pub name: String,
    pub price: Decimal,
    pub provider: String,
}

impl ProviderInArea {
    pub fn new(area: &ServiceArea, provider_name: &str) -> Self {
        Self {
            name: area.name.clone(),
            price: area.price,
            provider: provider_name.to_string(),
        }
    }
}

/// Create/update request body.
///
/// `price`, `area` and `provider` stay raw JSON so type mismatches become
/// field errors instead of body rejections. An explicit `null` is kept as
/// `Some(Value::Null)` (or `Some(None)` for `name`), apart from an absent field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceAreaPayload {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub price: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub area: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub provider: Option<Value>,
}

impl ServiceAreaPayload {
    /// Fill absent fields from the stored row (PATCH semantics). Explicit
    /// nulls are kept so validation rejects them.
    pub fn or_existing(self, existing: &ServiceArea) -> Self {
        Self {
            name: self.name.or_else(|| Some(Some(existing.name.clone()))),
            price: self
                .price
                .or_else(|| Some(Value::String(existing.price.to_string()))),
            area: self
                .area
                .or_else(|| serde_json::to_value(&existing.area).ok()),
            provider: self.provider.or_else(|| Some(Value::from(existing.provider))),
        }
    }

    /// The provider id, when the field holds something shaped like one.
    pub fn provider_pk(&self) -> Option<u64> {
        self.provider.as_ref().and_then(|v| parse_pk(v).ok())
    }

    /// Validate every field. `provider_exists` decides whether a
    /// well-formed provider id refers to a stored provider.
    pub fn validate(
        self,
        provider_exists: impl FnOnce(u64) -> bool,
    ) -> Result<NewServiceArea, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = required_text(&mut errors, "name", self.name, NAME_MAX_LEN);

        let price = match self.price {
            None | Some(Value::Null) => {
                errors.add("price", REQUIRED);
                None
            }
            Some(value) => match parse_price(&value) {
                Ok(price) => Some(price),
                Err(messages) => {
                    for message in messages {
                        errors.add("price", message);
                    }
                    None
                }
            },
        };

        let area = match self.area {
            None | Some(Value::Null) => {
                errors.add("area", REQUIRED);
                None
            }
            Some(value) => match AreaGeometry::from_json(&value) {
                Ok(area) => Some(area),
                Err(e) => {
                    errors.add("area", e.to_string());
                    None
                }
            },
        };

        let provider = match self.provider {
            None | Some(Value::Null) => {
                errors.add("provider", REQUIRED);
                None
            }
            Some(value) => match parse_pk(&value) {
                Ok(id) if provider_exists(id) => Some(id),
                Ok(id) => {
                    errors.add(
                        "provider",
                        format!("Invalid pk \"{}\" - object does not exist.", id),
                    );
                    None
                }
                Err(message) => {
                    errors.add("provider", message);
                    None
                }
            },
        };

        match (name, price, area, provider) {
            (Some(name), Some(price), Some(area), Some(provider)) if errors.is_empty() => {
                Ok(NewServiceArea {
                    name,
                    price,
                    area,
                    provider,
                })
            }
            _ => Err(errors),
        }
    }
}

fn parse_pk(value: &Value) -> Result<u64, String> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| format!("Invalid pk \"{}\" - object does not exist.", n)),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| "Incorrect type. Expected pk value, received str.".to_string()),
        other => Err(format!(
            "Incorrect type. Expected pk value, received {}.",
            json_type_name(other)
        )),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Parse and range-check a price, returning it with exactly two decimal places.
pub fn parse_price(value: &Value) -> Result<Decimal, Vec<String>> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(vec![INVALID_NUMBER.to_string()]),
    };

    let parsed = match Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)) {
        Ok(parsed) => parsed,
        // Well-formed but beyond what a Decimal holds, so far past the digit limit
        Err(_) if NUMERIC_REGEX.is_match(&text) => return Err(vec![max_digits_message()]),
        Err(_) => return Err(vec![INVALID_NUMBER.to_string()]),
    };

    let normalized = parsed.normalize();
    let decimals = normalized.scale();
    let digits = normalized.mantissa().unsigned_abs().to_string().len() as u32;
    let whole_digits = digits.saturating_sub(decimals);

    let mut messages = Vec::new();
    if digits.max(decimals) > PRICE_MAX_DIGITS {
        messages.push(max_digits_message());
    } else if decimals > PRICE_DECIMAL_PLACES {
        messages.push(format!(
            "Ensure that there are no more than {} decimal places.",
            PRICE_DECIMAL_PLACES
        ));
    } else if whole_digits > PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES {
        messages.push(format!(
            "Ensure that there are no more than {} digits before the decimal point.",
            PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES
        ));
    }

    if !messages.is_empty() {
        return Err(messages);
    }

    let mut price = normalized;
    price.rescale(PRICE_DECIMAL_PLACES);
    Ok(price)
}

fn max_digits_message() -> String {
    format!(
        "Ensure that there are no more than {} digits in total.",
        PRICE_MAX_DIGITS
    )
}
