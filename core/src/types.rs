//! Request payloads shared by the endpoint sets.
//!
//! Field names are snake_case in Rust and camelCase on the wire. Optional
//! fields that were not supplied are omitted from the JSON entirely.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::connection::{paging, Query};

/// Extra fields merged verbatim into a registration body.
pub type Extra = Map<String, Value>;

/// Optional `limit` / `offset` for list endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    pub fn limit(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: None,
        }
    }

    pub(crate) fn to_query(self) -> Query {
        paging(self.limit, self.offset)
    }
}

/// A transfer registered through the V1 received/sent endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V1Transfer {
    pub asset: String,
    pub transfer_reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_amount: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_price: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_denomination: Option<String>,
}

impl V1Transfer {
    pub fn new(asset: impl Into<String>, transfer_reference: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            transfer_reference: transfer_reference.into(),
            network: None,
            transfer_timestamp: None,
            asset_amount: None,
            output_address: None,
            asset_price: None,
            asset_denomination: None,
        }
    }
}

/// A withdrawal or deposit address registered for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredAddress {
    pub asset: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

impl RegisteredAddress {
    pub fn new(asset: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            address: address.into(),
            network: None,
        }
    }
}

/// Renames the user id `from` to `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRename {
    pub from: String,
    pub to: String,
}

impl UserRename {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Query filters for the V1 alert listing.
///
/// Parameters are sent in insertion order. Setting a parameter twice keeps
/// the latest value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertFilter {
    params: Query,
}

impl AlertFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an arbitrary query parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        let name = name.into();
        let value = value.to_string();
        match self.params.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.params.push((name, value)),
        }
        self
    }

    pub fn limit(self, limit: u32) -> Self {
        self.param("limit", limit)
    }

    pub fn offset(self, offset: u32) -> Self {
        self.param("offset", offset)
    }

    pub fn created_at_gte(self, timestamp: impl Into<String>) -> Self {
        self.param("createdAt_gte", timestamp.into())
    }

    pub fn created_at_lte(self, timestamp: impl Into<String>) -> Self {
        self.param("createdAt_lte", timestamp.into())
    }

    pub fn level(self, level: impl Into<String>) -> Self {
        self.param("level", level.into())
    }

    pub fn alert_status(self, status: impl Into<String>) -> Self {
        self.param("alertStatus", status.into())
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub(crate) fn into_query(self) -> Query {
        self.params
    }
}

/// Merge `extra` under the mapped `fields`; mapped fields win on collision.
pub(crate) fn merge_extra(fields: Map<String, Value>, extra: &Extra) -> Map<String, Value> {
    let mut body = fields;
    for (name, value) in extra {
        body.entry(name.clone()).or_insert_with(|| value.clone());
    }
    body
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn page_defaults_to_no_query() {
        assert!(Page::default().to_query().is_empty());
        assert_eq!(
            Page::limit(5).to_query(),
            vec![("limit".to_string(), "5".to_string())]
        );
    }

    #[test]
    fn v1_transfer_uses_camel_case_and_skips_unset_fields() {
        let mut transfer = V1Transfer::new("BTC", "tx:addr");
        transfer.asset_amount = Some(json!(0.5));
        let value = serde_json::to_value(&transfer).unwrap();
        assert_eq!(
            value,
            json!({"asset": "BTC", "transferReference": "tx:addr", "assetAmount": 0.5})
        );
    }

    #[test]
    fn registered_address_skips_missing_network() {
        let value = serde_json::to_value(RegisteredAddress::new("ETH", "0xabc")).unwrap();
        assert_eq!(value, json!({"asset": "ETH", "address": "0xabc"}));
    }

    #[test]
    fn alert_filter_keeps_order_and_overwrites() {
        let query = AlertFilter::new()
            .level("HIGH")
            .limit(10)
            .param("alertAssignee", "jane")
            .limit(20)
            .into_query();
        assert_eq!(
            query,
            vec![
                ("level".to_string(), "HIGH".to_string()),
                ("limit".to_string(), "20".to_string()),
                ("alertAssignee".to_string(), "jane".to_string()),
            ]
        );
    }

    #[test]
    fn merge_extra_prefers_mapped_fields() {
        let mut fields = Map::new();
        fields.insert("network".to_string(), json!("Bitcoin"));
        let mut extra = Extra::new();
        extra.insert("network".to_string(), json!("Ethereum"));
        extra.insert("memo".to_string(), json!("hello"));

        let body = merge_extra(fields, &extra);
        assert_eq!(Value::Object(body), json!({"network": "Bitcoin", "memo": "hello"}));
    }
}
