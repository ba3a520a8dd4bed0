//! Legacy V1 endpoints: user-scoped transfers, withdrawal and deposit
//! address registries, alert triage and user management.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::ClientConfig;
use crate::connection::{to_payload, BaseClient};
use crate::error::KytError;
use crate::http::Transport;
use crate::types::{AlertFilter, Page, RegisteredAddress, UserRename, V1Transfer};

/// Client for the V1 API.
#[derive(Debug)]
pub struct V1Client {
    base: BaseClient,
}

impl V1Client {
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

    pub fn register_received_transfer(
        &self,
        user_id: &str,
        transfers: &[V1Transfer],
    ) -> Result<Value, KytError> {
        self.base.post_request(
            &format!("v1/users/{user_id}/transfers/received"),
            &to_payload(transfers)?,
        )
    }

    pub fn get_received_transfers(&self, user_id: &str, page: Page) -> Result<Value, KytError> {
        self.base.get_request(
            &format!("v1/users/{user_id}/transfers/received"),
            page.to_query(),
            false,
        )
    }

    pub fn register_sent_transfer(
        &self,
        user_id: &str,
        transfers: &[V1Transfer],
    ) -> Result<Value, KytError> {
        self.base.post_request(
            &format!("v1/users/{user_id}/transfers/sent"),
            &to_payload(transfers)?,
        )
    }

    pub fn get_sent_transfers(&self, user_id: &str, page: Page) -> Result<Value, KytError> {
        self.base.get_request(
            &format!("v1/users/{user_id}/transfers/sent"),
            page.to_query(),
            false,
        )
    }

    // -----------------------------------------------------------------------
    // Withdrawal addresses
    // -----------------------------------------------------------------------

    pub fn register_withdrawal_addresses(
        &self,
        user_id: &str,
        addresses: &[RegisteredAddress],
    ) -> Result<Value, KytError> {
        self.base.post_request(
            &format!("v1/users/{user_id}/withdrawaladdresses"),
            &to_payload(addresses)?,
        )
    }

    pub fn get_withdrawal_addresses(&self, user_id: &str, page: Page) -> Result<Value, KytError> {
        self.base.get_request(
            &format!("v1/users/{user_id}/withdrawaladdresses"),
            page.to_query(),
            false,
        )
    }

    pub fn delete_withdrawal_address(
        &self,
        user_id: &str,
        asset: &str,
        address: &str,
    ) -> Result<Value, KytError> {
        self.base
            .delete_request(&format!("v1/users/{user_id}/withdrawaladdresses/{asset}/{address}"))
    }

    // -----------------------------------------------------------------------
    // Deposit addresses
    // -----------------------------------------------------------------------

    pub fn register_deposit_addresses(
        &self,
        user_id: &str,
        addresses: &[RegisteredAddress],
    ) -> Result<Value, KytError> {
        self.base.post_request(
            &format!("v1/users/{user_id}/depositaddresses"),
            &to_payload(addresses)?,
        )
    }

    pub fn get_deposit_addresses(&self, user_id: &str, page: Page) -> Result<Value, KytError> {
        self.base.get_request(
            &format!("v1/users/{user_id}/depositaddresses"),
            page.to_query(),
            false,
        )
    }

    pub fn delete_deposit_address(
        &self,
        user_id: &str,
        asset: &str,
        address: &str,
    ) -> Result<Value, KytError> {
        self.base
            .delete_request(&format!("v1/users/{user_id}/depositaddresses/{asset}/{address}"))
    }

    // -----------------------------------------------------------------------
    // Alerts
    // -----------------------------------------------------------------------

    pub fn get_alerts(&self, filter: AlertFilter) -> Result<Value, KytError> {
        self.base.get_request("v1/alerts/", filter.into_query(), false)
    }

    pub fn assign_alert(
        &self,
        alert_identifier: &str,
        alert_assignee: &str,
    ) -> Result<Value, KytError> {
        self.base.post_request(
            &format!("v1/alerts/{alert_identifier}/assignment"),
            &json!({ "alertAssignee": alert_assignee }),
        )
    }

    /// Move an alert to `status`, optionally with a reviewer comment.
    pub fn update_alert_status(
        &self,
        alert_identifier: &str,
        status: &str,
        comment: Option<&str>,
    ) -> Result<Value, KytError> {
        let mut body = json!({ "status": status });
        if let Some(comment) = comment {
            body["comment"] = Value::from(comment);
        }
        self.base
            .post_request(&format!("v1/alerts/{alert_identifier}/statuses"), &body)
    }

    pub fn get_alert_activity(&self, alert_identifier: &str) -> Result<Value, KytError> {
        self.base.get_request(
            &format!("v1/alerts/{alert_identifier}/activity"),
            Vec::new(),
            false,
        )
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    pub fn get_users(&self, page: Page) -> Result<Value, KytError> {
        self.base.get_request("v1/users/", page.to_query(), false)
    }

    pub fn get_user(&self, user_id: &str) -> Result<Value, KytError> {
        self.base
            .get_request(&format!("v1/users/{user_id}"), Vec::new(), false)
    }

    pub fn rename_users(&self, renames: &[UserRename]) -> Result<Value, KytError> {
        self.base.post_request("v1/users/rename", &to_payload(renames)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use crate::testing::RecordingTransport;

    const ROOT: &str = "http://kyt.test/api/kyt";

    fn client(transport: Arc<RecordingTransport>) -> V1Client {
        let mut config = ClientConfig::new("key");
        config.base_url = ROOT.to_string();
        V1Client::new(Arc::new(config), transport)
    }

    #[test]
    fn register_received_transfer_posts_array() {
        let transport = RecordingTransport::replying(200, r#"[{"updatedAt":null}]"#);
        let mut transfer = V1Transfer::new("BTC", "tx:addr");
        transfer.transfer_timestamp = Some("2025-01-10T00:00:00Z".to_string());
        let result = client(transport.clone())
            .register_received_transfer("U", &[transfer])
            .unwrap();

        assert_eq!(result, json!([{"updatedAt": null}]));
        let req = transport.last();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, format!("{ROOT}/v1/users/U/transfers/received"));
        assert_eq!(
            transport.last_body(),
            json!([{
                "asset": "BTC",
                "transferReference": "tx:addr",
                "transferTimestamp": "2025-01-10T00:00:00Z"
            }])
        );
    }

    #[test]
    fn register_sent_transfer_targets_sent_path() {
        let transport = RecordingTransport::replying(200, "[]");
        client(transport.clone())
            .register_sent_transfer("U", &[V1Transfer::new("ETH", "0xtx:0xaddr")])
            .unwrap();
        assert_eq!(transport.last().url, format!("{ROOT}/v1/users/U/transfers/sent"));
    }

    #[test]
    fn empty_registration_sends_no_body() {
        let transport = RecordingTransport::replying(200, "");
        client(transport.clone())
            .register_withdrawal_addresses("U", &[])
            .unwrap();
        assert!(transport.last().body.is_none());
    }

    #[test]
    fn list_endpoints_forward_paging() {
        let transport = RecordingTransport::replying(200, r#"{"data":[]}"#);
        let v1 = client(transport.clone());

        let result = v1.get_withdrawal_addresses("U", Page::default()).unwrap();
        assert_eq!(result, json!({"data": []}));
        let req = transport.last();
        assert_eq!(req.url, format!("{ROOT}/v1/users/U/withdrawaladdresses"));
        assert!(req.query.is_empty());

        v1.get_received_transfers("U", Page::new(10, 20)).unwrap();
        let req = transport.last();
        assert_eq!(req.query_param("limit"), Some("10"));
        assert_eq!(req.query_param("offset"), Some("20"));

        v1.get_sent_transfers("U", Page { limit: None, offset: Some(5) }).unwrap();
        let req = transport.last();
        assert_eq!(req.url, format!("{ROOT}/v1/users/U/transfers/sent"));
        assert_eq!(req.query, vec![("offset".to_string(), "5".to_string())]);

        v1.get_deposit_addresses("U", Page::limit(1)).unwrap();
        assert_eq!(transport.last().url, format!("{ROOT}/v1/users/U/depositaddresses"));

        v1.get_users(Page::default()).unwrap();
        assert_eq!(transport.last().url, format!("{ROOT}/v1/users/"));
    }

    #[test]
    fn delete_address_interpolates_asset_and_address() {
        let transport = RecordingTransport::replying(200, "");
        let v1 = client(transport.clone());

        let result = v1.delete_withdrawal_address("U", "BTC", "1abc").unwrap();
        assert_eq!(result, json!({}));
        let req = transport.last();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, format!("{ROOT}/v1/users/U/withdrawaladdresses/BTC/1abc"));

        v1.delete_deposit_address("U", "ETH", "0xdef").unwrap();
        assert_eq!(
            transport.last().url,
            format!("{ROOT}/v1/users/U/depositaddresses/ETH/0xdef")
        );
    }

    #[test]
    fn register_deposit_addresses_posts_array() {
        let transport = RecordingTransport::replying(200, "[]");
        client(transport.clone())
            .register_deposit_addresses("U", &[RegisteredAddress::new("BTC", "1abc")])
            .unwrap();
        assert_eq!(transport.last().url, format!("{ROOT}/v1/users/U/depositaddresses"));
        assert_eq!(transport.last_body(), json!([{"asset": "BTC", "address": "1abc"}]));
    }

    #[test]
    fn get_alerts_passes_filters_through() {
        let transport = RecordingTransport::replying(200, r#"{"alerts":[]}"#);
        let v1 = client(transport.clone());

        v1.get_alerts(AlertFilter::new()).unwrap();
        let req = transport.last();
        assert_eq!(req.url, format!("{ROOT}/v1/alerts/"));
        assert!(req.query.is_empty());

        v1.get_alerts(AlertFilter::new().level("SEVERE").created_at_gte("2025-01-01"))
            .unwrap();
        let req = transport.last();
        assert_eq!(req.query_param("level"), Some("SEVERE"));
        assert_eq!(req.query_param("createdAt_gte"), Some("2025-01-01"));
    }

    #[test]
    fn assign_alert_renames_assignee() {
        let transport = RecordingTransport::replying(200, "{}");
        client(transport.clone()).assign_alert("a1", "jane").unwrap();
        assert_eq!(transport.last().url, format!("{ROOT}/v1/alerts/a1/assignment"));
        assert_eq!(transport.last_body(), json!({"alertAssignee": "jane"}));
    }

    #[test]
    fn update_alert_status_omits_missing_comment() {
        let transport = RecordingTransport::replying(200, "{}");
        let v1 = client(transport.clone());

        v1.update_alert_status("a1", "In Review", None).unwrap();
        assert_eq!(transport.last().url, format!("{ROOT}/v1/alerts/a1/statuses"));
        assert_eq!(transport.last_body(), json!({"status": "In Review"}));

        v1.update_alert_status("a1", "Dismissed", Some("false positive")).unwrap();
        assert_eq!(
            transport.last_body(),
            json!({"status": "Dismissed", "comment": "false positive"})
        );
    }

    #[test]
    fn alert_activity_and_user_lookup_are_plain_gets() {
        let transport = RecordingTransport::replying(200, "{}");
        let v1 = client(transport.clone());

        v1.get_alert_activity("a1").unwrap();
        let req = transport.last();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, format!("{ROOT}/v1/alerts/a1/activity"));

        v1.get_user("U").unwrap();
        let req = transport.last();
        assert_eq!(req.url, format!("{ROOT}/v1/users/U"));
        assert!(req.query.is_empty());
    }

    #[test]
    fn rename_users_posts_pairs() {
        let transport = RecordingTransport::replying(200, "");
        client(transport.clone())
            .rename_users(&[UserRename::new("old", "new")])
            .unwrap();
        assert_eq!(transport.last().url, format!("{ROOT}/v1/users/rename"));
        assert_eq!(transport.last_body(), json!([{"from": "old", "to": "new"}]));
    }
}
