//! Order model and ingestion validation

use std::fmt;

use chrono::{DateTime, Utc};
use ordercache::Keyed;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_uid: String,
    pub track_number: String,
    pub entry: String,
    pub locale: String,
    #[serde(default)]
    pub internal_signature: Option<String>,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: u32,
    pub date_created: DateTime<Utc>,
    pub oof_shard: String,

    pub delivery: Delivery,
    pub payment: Payment,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub transaction: String,
    #[serde(default)]
    pub request_id: Option<String>,
    pub currency: String,
    pub provider: String,
    pub amount: u64,
    pub payment_dt: u64,
    pub bank: String,
    pub delivery_cost: u64,
    pub goods_total: u64,
    pub custom_fee: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub chrt_id: u64,
    pub track_number: String,
    pub price: u64,
    pub rid: String,
    pub name: String,
    pub sale: u32,
    pub size: String,
    pub total_price: u64,
    pub nm_id: u64,
    pub brand: String,
    pub status: u32,
}

/// Reason an order was rejected at ingestion
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub reason: &'static str,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}' {}", self.field, self.reason)
    }
}

impl std::error::Error for ValidationError {}

fn required(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError {
            field: field.to_string(),
            reason: "is required",
        });
    }
    Ok(())
}

/// E.164: a plus sign followed by 2 to 15 digits, no leading zero
fn is_e164(phone: &str) -> bool {
    match phone.strip_prefix('+') {
        Some(digits) => {
            (2..=15).contains(&digits.len())
                && digits.bytes().all(|b| b.is_ascii_digit())
                && !digits.starts_with('0')
        }
        None => false,
    }
}

fn is_email(email: &str) -> bool {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    !local.is_empty()
        && !email.contains(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

impl Order {
    /// Check required fields and formats before the order is stored
    pub fn validate(&self) -> Result<(), ValidationError> {
        required("order_uid", &self.order_uid)?;
        required("track_number", &self.track_number)?;
        required("entry", &self.entry)?;
        required("locale", &self.locale)?;
        required("customer_id", &self.customer_id)?;
        required("delivery_service", &self.delivery_service)?;
        required("shardkey", &self.shardkey)?;
        required("oof_shard", &self.oof_shard)?;

        let delivery = &self.delivery;
        required("delivery.name", &delivery.name)?;
        required("delivery.zip", &delivery.zip)?;
        required("delivery.city", &delivery.city)?;
        required("delivery.address", &delivery.address)?;
        required("delivery.region", &delivery.region)?;
        if !is_e164(&delivery.phone) {
            return Err(ValidationError {
                field: "delivery.phone".to_string(),
                reason: "must be an E.164 phone number",
            });
        }
        if !is_email(&delivery.email) {
            return Err(ValidationError {
                field: "delivery.email".to_string(),
                reason: "must be an email address",
            });
        }

        let payment = &self.payment;
        required("payment.transaction", &payment.transaction)?;
        required("payment.currency", &payment.currency)?;
        required("payment.provider", &payment.provider)?;
        required("payment.bank", &payment.bank)?;

        if self.items.is_empty() {
            return Err(ValidationError {
                field: "items".to_string(),
                reason: "must contain at least one item",
            });
        }
        for (i, item) in self.items.iter().enumerate() {
            required(&format!("items[{}].track_number", i), &item.track_number)?;
            required(&format!("items[{}].rid", i), &item.rid)?;
            required(&format!("items[{}].name", i), &item.name)?;
            required(&format!("items[{}].size", i), &item.size)?;
            required(&format!("items[{}].brand", i), &item.brand)?;
        }

        Ok(())
    }
}

impl Keyed for Order {
    type Key = String;

    fn key(&self) -> String {
        self.order_uid.clone()
    }
}

#[cfg(test)]
pub(crate) fn sample_order(uid: &str) -> Order {
    Order {
        order_uid: uid.to_string(),
        track_number: "WBILMTESTTRACK".to_string(),
        entry: "WBIL".to_string(),
        locale: "en".to_string(),
        internal_signature: None,
        customer_id: "test".to_string(),
        delivery_service: "meest".to_string(),
        shardkey: "9".to_string(),
        sm_id: 99,
        date_created: "2021-11-26T06:22:19Z".parse().unwrap(),
        oof_shard: "1".to_string(),
        delivery: Delivery {
            name: "Test Testov".to_string(),
            phone: "+9720000000".to_string(),
            zip: "2639809".to_string(),
            city: "Kiryat Mozkin".to_string(),
            address: "Ploshad Mira 15".to_string(),
            region: "Kraiot".to_string(),
            email: "test@gmail.com".to_string(),
        },
        payment: Payment {
            transaction: uid.to_string(),
            request_id: None,
            currency: "USD".to_string(),
            provider: "wbpay".to_string(),
            amount: 1817,
            payment_dt: 1637907727,
            bank: "alpha".to_string(),
            delivery_cost: 1500,
            goods_total: 317,
            custom_fee: 0,
        },
        items: vec![Item {
            chrt_id: 9934930,
            track_number: "WBILMTESTTRACK".to_string(),
            price: 453,
            rid: "ab4219087a764ae0btest".to_string(),
            name: "Mascaras".to_string(),
            sale: 30,
            size: "0".to_string(),
            total_price: 317,
            nm_id: 2389212,
            brand: "Vivienne Sabo".to_string(),
            status: 202,
        }],
    }
}
