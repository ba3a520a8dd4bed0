//! Current V2 endpoints: transfer and withdrawal-attempt registration with
//! their risk lookups, the category catalogue, and the organization's
//! internal users on the admin root.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::connection::{BaseClient, Query};
use crate::error::KytError;
use crate::http::Transport;
use crate::types::{merge_extra, Extra};

/// A transfer submitted for risk scoring.
///
/// `extra` is merged into the request body; the named fields take precedence
/// when a key appears in both.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterTransfer {
    pub network: String,
    pub asset: String,
    pub transfer_reference: String,
    /// `received` for deposits, `sent` for withdrawals.
    pub direction: String,
    /// Sent as given; see `utc_timestamp` for formatting a chrono time.
    pub transfer_timestamp: Option<String>,
    pub asset_amount: Option<Value>,
    pub output_address: Option<String>,
    pub asset_price: Option<Value>,
    pub asset_denomination: Option<String>,
    pub asset_id: Option<String>,
    pub extra: Extra,
}

impl RegisterTransfer {
    pub fn new(
        network: impl Into<String>,
        asset: impl Into<String>,
        transfer_reference: impl Into<String>,
        direction: impl Into<String>,
    ) -> Self {
        Self {
            network: network.into(),
            asset: asset.into(),
            transfer_reference: transfer_reference.into(),
            direction: direction.into(),
            transfer_timestamp: None,
            asset_amount: None,
            output_address: None,
            asset_price: None,
            asset_denomination: None,
            asset_id: None,
            extra: Extra::new(),
        }
    }

    /// Add a field that has no named counterpart.
    pub fn with_extra(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    pub fn to_body(&self) -> Value {
        let mut fields = Map::new();
        fields.insert("network".to_string(), Value::from(self.network.as_str()));
        fields.insert("asset".to_string(), Value::from(self.asset.as_str()));
        fields.insert(
            "transferReference".to_string(),
            Value::from(self.transfer_reference.as_str()),
        );
        fields.insert("direction".to_string(), Value::from(self.direction.as_str()));
        insert_opt(
            &mut fields,
            "transferTimestamp",
            self.transfer_timestamp.as_deref().map(Value::from),
        );
        insert_opt(&mut fields, "assetAmount", self.asset_amount.clone());
        insert_opt(&mut fields, "outputAddress", self.output_address.as_deref().map(Value::from));
        insert_opt(&mut fields, "assetPrice", self.asset_price.clone());
        insert_opt(
            &mut fields,
            "assetDenomination",
            self.asset_denomination.as_deref().map(Value::from),
        );
        insert_opt(&mut fields, "assetId", self.asset_id.as_deref().map(Value::from));
        Value::Object(merge_extra(fields, &self.extra))
    }
}

/// A proposed withdrawal submitted for pre-transaction screening.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterWithdrawalAttempt {
    pub network: String,
    pub asset: String,
    pub address: String,
    pub attempt_identifier: String,
    /// Numeric or decimal-string amount, sent as given.
    pub asset_amount: Value,
    /// Sent as given; see `utc_timestamp` for formatting a chrono time.
    pub attempt_timestamp: String,
    pub asset_price: Option<Value>,
    pub asset_denomination: Option<String>,
    pub asset_id: Option<String>,
    pub extra: Extra,
}

impl RegisterWithdrawalAttempt {
    pub fn new(
        network: impl Into<String>,
        asset: impl Into<String>,
        address: impl Into<String>,
        attempt_identifier: impl Into<String>,
        asset_amount: impl Into<Value>,
        attempt_timestamp: impl Into<String>,
    ) -> Self {
        Self {
            network: network.into(),
            asset: asset.into(),
            address: address.into(),
            attempt_identifier: attempt_identifier.into(),
            asset_amount: asset_amount.into(),
            attempt_timestamp: attempt_timestamp.into(),
            asset_price: None,
            asset_denomination: None,
            asset_id: None,
            extra: Extra::new(),
        }
    }

    pub fn with_extra(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    pub fn to_body(&self) -> Value {
        let mut fields = Map::new();
        fields.insert("network".to_string(), Value::from(self.network.as_str()));
        fields.insert("asset".to_string(), Value::from(self.asset.as_str()));
        fields.insert("address".to_string(), Value::from(self.address.as_str()));
        fields.insert(
            "attemptIdentifier".to_string(),
            Value::from(self.attempt_identifier.as_str()),
        );
        fields.insert("assetAmount".to_string(), self.asset_amount.clone());
        fields.insert(
            "attemptTimestamp".to_string(),
            Value::from(self.attempt_timestamp.as_str()),
        );
        insert_opt(&mut fields, "assetPrice", self.asset_price.clone());
        insert_opt(
            &mut fields,
            "assetDenomination",
            self.asset_denomination.as_deref().map(Value::from),
        );
        insert_opt(&mut fields, "assetId", self.asset_id.as_deref().map(Value::from));
        Value::Object(merge_extra(fields, &self.extra))
    }
}

fn insert_opt(fields: &mut Map<String, Value>, name: &str, value: Option<Value>) {
    if let Some(value) = value {
        fields.insert(name.to_string(), value);
    }
}

/// Render a UTC time the way the service documents timestamps, e.g.
/// `2025-01-10T00:00:00Z`.
pub fn utc_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn format_query(format_type: Option<&str>) -> Query {
    format_type
        .map(|format_type| vec![("format_type".to_string(), format_type.to_string())])
        .unwrap_or_default()
}

/// Client for the V2 API.
#[derive(Debug)]
pub struct V2Client {
    base: BaseClient,
}

impl V2Client {
    pub fn new(config: Arc<ClientConfig>, transport: Arc<dyn Transport>) -> Self {
        Self {
            base: BaseClient::new(config, transport),
        }
    }

    pub fn api_key(&self) -> &str {
        self.base.api_key()
    }

    // -----------------------------------------------------------------------
    // Transfers
    // -----------------------------------------------------------------------

    pub fn register_transfer(
        &self,
        user_id: &str,
        transfer: &RegisterTransfer,
    ) -> Result<Value, KytError> {
        self.base
            .post_request(&format!("v2/users/{user_id}/transfers"), &transfer.to_body())
    }

    pub fn get_transfer(
        &self,
        external_id: &str,
        format_type: Option<&str>,
    ) -> Result<Value, KytError> {
        self.base.get_request(
            &format!("v2/transfers/{external_id}"),
            format_query(format_type),
            false,
        )
    }

    pub fn get_transfer_exposures(&self, external_id: &str) -> Result<Value, KytError> {
        self.get(&format!("v2/transfers/{external_id}/exposures"))
    }

    pub fn get_transfer_alerts(&self, external_id: &str) -> Result<Value, KytError> {
        self.get(&format!("v2/transfers/{external_id}/alerts"))
    }

    pub fn get_transfer_network_identifications(
        &self,
        external_id: &str,
    ) -> Result<Value, KytError> {
        self.get(&format!("v2/transfers/{external_id}/network-identifications"))
    }

    // -----------------------------------------------------------------------
    // Withdrawal attempts
    // -----------------------------------------------------------------------

    pub fn register_withdrawal_attempt(
        &self,
        user_id: &str,
        attempt: &RegisterWithdrawalAttempt,
    ) -> Result<Value, KytError> {
        self.base.post_request(
            &format!("v2/users/{user_id}/withdrawal-attempts"),
            &attempt.to_body(),
        )
    }

    pub fn get_withdrawal_attempt(
        &self,
        external_id: &str,
        format_type: Option<&str>,
    ) -> Result<Value, KytError> {
        self.base.get_request(
            &format!("v2/withdrawal-attempts/{external_id}"),
            format_query(format_type),
            false,
        )
    }

    pub fn get_withdrawal_attempt_exposures(&self, external_id: &str) -> Result<Value, KytError> {
        self.get(&format!("v2/withdrawal-attempts/{external_id}/exposures"))
    }

    pub fn get_withdrawal_attempt_alerts(&self, external_id: &str) -> Result<Value, KytError> {
        self.get(&format!("v2/withdrawal-attempts/{external_id}/alerts"))
    }

    pub fn get_withdrawal_attempt_high_risk_addresses(
        &self,
        external_id: &str,
    ) -> Result<Value, KytError> {
        self.get(&format!("v2/withdrawal-attempts/{external_id}/high-risk-addresses"))
    }

    pub fn get_withdrawal_attempt_network_identifications(
        &self,
        external_id: &str,
    ) -> Result<Value, KytError> {
        self.get(&format!("v2/withdrawal-attempts/{external_id}/network-identifications"))
    }

    // -----------------------------------------------------------------------
    // Reference data
    // -----------------------------------------------------------------------

    pub fn get_categories(&self) -> Result<Value, KytError> {
        self.get("v2/categories")
    }

    /// Lists the organization's users. Served from the admin root.
    pub fn get_internal_users(&self) -> Result<Value, KytError> {
        self.base.get_request("organization/users", Vec::new(), true)
    }

    fn get(&self, path: &str) -> Result<Value, KytError> {
        self.base.get_request(path, Vec::new(), false)
    }
}
