use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Token value that makes every request fail with 429.
pub const RATE_LIMITED_TOKEN: &str = "rate-limited";

/// Alert seeded into every fresh server.
pub const SEEDED_ALERT_ID: &str = "d3cfc9a4-2b2c-11ee-a8f8-0242ac120002";

/// Internal user listed by the admin root.
pub const ADMIN_USER_EMAIL: &str = "analyst@example.com";

#[derive(Default)]
pub struct Store {
    received: HashMap<String, Vec<Value>>,
    sent: HashMap<String, Vec<Value>>,
    withdrawal_addresses: HashMap<String, Vec<Value>>,
    deposit_addresses: HashMap<String, Vec<Value>>,
    transfers: HashMap<String, Value>,
    withdrawal_attempts: HashMap<String, Value>,
    alerts: Vec<Value>,
    alert_activity: HashMap<String, Vec<Value>>,
}

impl Store {
    fn seeded() -> Self {
        Self {
            alerts: vec![json!({
                "alertIdentifier": SEEDED_ALERT_ID,
                "level": "HIGH",
                "alertStatus": "Unreviewed",
                "alertAssignee": null,
                "userId": "seed-user",
                "category": "sanctions",
            })],
            ..Self::default()
        }
    }

    fn touch_user(&mut self, user_id: &str) {
        self.received.entry(user_id.to_string()).or_default();
        self.sent.entry(user_id.to_string()).or_default();
    }

    fn user_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.received.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn alert_mut(&mut self, id: &str) -> Option<&mut Value> {
        self.alerts
            .iter_mut()
            .find(|alert| alert["alertIdentifier"] == id)
    }
}

pub type Db = Arc<RwLock<Store>>;

/// An error response carrying a JSON body.
pub struct Failure(StatusCode, Value);

impl Failure {
    fn message(status: StatusCode, message: &str) -> Self {
        Self(status, json!({ "message": message }))
    }

    fn error(status: StatusCode, error: &str) -> Self {
        Self(status, json!({ "error": error }))
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.0, Json(self.1)).into_response()
    }
}

type Reply = Result<(StatusCode, Json<Value>), Failure>;

#[derive(Debug, Default, Deserialize)]
pub struct Paging {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Paging {
    fn apply(&self, items: &[Value]) -> Value {
        let offset = self.offset.unwrap_or(0);
        let limit = self.limit.unwrap_or(100);
        let data: Vec<Value> = items.iter().skip(offset).take(limit).cloned().collect();
        json!({ "total": items.len(), "limit": limit, "offset": offset, "data": data })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FormatQuery {
    pub format_type: Option<String>,
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::seeded()));
    let kyt = Router::new()
        .route(
            "/v1/users/{user_id}/transfers/received",
            post(register_received).get(list_received),
        )
        .route(
            "/v1/users/{user_id}/transfers/sent",
            post(register_sent).get(list_sent),
        )
        .route(
            "/v1/users/{user_id}/withdrawaladdresses",
            post(register_withdrawal_addresses).get(list_withdrawal_addresses),
        )
        .route(
            "/v1/users/{user_id}/withdrawaladdresses/{asset}/{address}",
            delete(delete_withdrawal_address),
        )
        .route(
            "/v1/users/{user_id}/depositaddresses",
            post(register_deposit_addresses).get(list_deposit_addresses),
        )
        .route(
            "/v1/users/{user_id}/depositaddresses/{asset}/{address}",
            delete(delete_deposit_address),
        )
        .route("/v1/alerts/", get(list_alerts))
        .route("/v1/alerts/{alert_id}/assignment", post(assign_alert))
        .route("/v1/alerts/{alert_id}/statuses", post(update_alert_status))
        .route("/v1/alerts/{alert_id}/activity", get(alert_activity))
        .route("/v1/users/", get(list_users))
        .route("/v1/users/rename", post(rename_users))
        .route("/v1/users/{user_id}", get(get_user))
        .route("/v2/users/{user_id}/transfers", post(register_transfer))
        .route("/v2/transfers/{external_id}", get(get_transfer))
        .route("/v2/transfers/{external_id}/exposures", get(transfer_exposures))
        .route("/v2/transfers/{external_id}/alerts", get(transfer_alerts))
        .route(
            "/v2/transfers/{external_id}/network-identifications",
            get(transfer_network_identifications),
        )
        .route(
            "/v2/users/{user_id}/withdrawal-attempts",
            post(register_withdrawal_attempt),
        )
        .route("/v2/withdrawal-attempts/{external_id}", get(get_withdrawal_attempt))
        .route(
            "/v2/withdrawal-attempts/{external_id}/exposures",
            get(withdrawal_attempt_exposures),
        )
        .route(
            "/v2/withdrawal-attempts/{external_id}/alerts",
            get(withdrawal_attempt_alerts),
        )
        .route(
            "/v2/withdrawal-attempts/{external_id}/high-risk-addresses",
            get(withdrawal_attempt_high_risk_addresses),
        )
        .route(
            "/v2/withdrawal-attempts/{external_id}/network-identifications",
            get(withdrawal_attempt_network_identifications),
        )
        .route("/v2/categories", get(categories));
    let admin = Router::new().route("/organization/users", get(internal_users));

    Router::new()
        .nest("/api/kyt", kyt)
        .nest("/admin", admin)
        .layer(middleware::from_fn(require_token))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn require_token(request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get("Token")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if token.is_empty() {
        return Failure::message(StatusCode::FORBIDDEN, "Missing API key").into_response();
    }
    if token == RATE_LIMITED_TOKEN {
        return Failure::message(StatusCode::TOO_MANY_REQUESTS, "slow down").into_response();
    }
    next.run(request).await
}

// ---------------------------------------------------------------------------
// Body helpers
// ---------------------------------------------------------------------------

/// Parse an optional JSON body; an absent body reads as `null`.
fn parse_body(body: &str) -> Result<Value, Failure> {
    if body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|_| Failure::error(StatusCode::BAD_REQUEST, "Malformed JSON"))
}

fn parse_array(body: &str) -> Result<Vec<Value>, Failure> {
    match parse_body(body)? {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        _ => Err(Failure::error(StatusCode::BAD_REQUEST, "Expected a JSON array")),
    }
}

fn parse_object(body: &str) -> Result<Map<String, Value>, Failure> {
    match parse_body(body)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(Failure::error(StatusCode::BAD_REQUEST, "Expected a JSON object")),
    }
}

/// Every named field must be present, non-null and not an empty string.
fn require(fields: &Map<String, Value>, names: &[&str]) -> Result<(), Failure> {
    let missing = |name: &&&str| match fields.get(**name) {
        None | Some(Value::Null) => true,
        Some(Value::String(value)) => value.is_empty(),
        Some(_) => false,
    };
    match names.iter().find(missing) {
        Some(missing) => Err(Failure::error(
            StatusCode::BAD_REQUEST,
            &format!("Missing required field: {missing}"),
        )),
        None => Ok(()),
    }
}

fn require_each(items: &[Value], names: &[&str]) -> Result<(), Failure> {
    for item in items {
        match item.as_object() {
            Some(fields) => require(fields, names)?,
            None => {
                return Err(Failure::error(StatusCode::BAD_REQUEST, "Expected JSON objects"))
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// V1 transfers
// ---------------------------------------------------------------------------

fn register_v1_transfers(
    store: &mut HashMap<String, Vec<Value>>,
    user_id: &str,
    body: &str,
) -> Reply {
    let items = parse_array(body)?;
    require_each(&items, &["asset", "transferReference"])?;
    let registered: Vec<Value> = items
        .into_iter()
        .map(|mut item| {
            item["updatedAt"] = Value::Null;
            item["rating"] = Value::from("unknown");
            item
        })
        .collect();
    store
        .entry(user_id.to_string())
        .or_default()
        .extend(registered.iter().cloned());
    Ok((StatusCode::OK, Json(Value::Array(registered))))
}

async fn register_received(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    body: String,
) -> Reply {
    let mut store = db.write().await;
    store.touch_user(&user_id);
    register_v1_transfers(&mut store.received, &user_id, &body)
}

async fn register_sent(State(db): State<Db>, Path(user_id): Path<String>, body: String) -> Reply {
    let mut store = db.write().await;
    store.touch_user(&user_id);
    register_v1_transfers(&mut store.sent, &user_id, &body)
}

fn list_for(store: &HashMap<String, Vec<Value>>, user_id: &str, paging: &Paging) -> Json<Value> {
    let items = store.get(user_id).map(Vec::as_slice).unwrap_or_default();
    Json(paging.apply(items))
}

async fn list_received(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    Query(paging): Query<Paging>,
) -> Json<Value> {
    list_for(&db.read().await.received, &user_id, &paging)
}

async fn list_sent(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    Query(paging): Query<Paging>,
) -> Json<Value> {
    list_for(&db.read().await.sent, &user_id, &paging)
}

// ---------------------------------------------------------------------------
// V1 address registries
// ---------------------------------------------------------------------------

fn register_addresses(
    store: &mut HashMap<String, Vec<Value>>,
    user_id: &str,
    body: &str,
) -> Reply {
    let items = parse_array(body)?;
    require_each(&items, &["asset", "address"])?;
    let entry = store.entry(user_id.to_string()).or_default();
    for item in &items {
        if !entry.contains(item) {
            entry.push(item.clone());
        }
    }
    Ok((StatusCode::OK, Json(Value::Array(items))))
}

fn remove_address(
    store: &mut HashMap<String, Vec<Value>>,
    user_id: &str,
    asset: &str,
    address: &str,
) -> Result<StatusCode, Failure> {
    let entries = store.get_mut(user_id).ok_or_else(|| {
        Failure::error(StatusCode::NOT_FOUND, &format!("User {user_id} not found"))
    })?;
    let before = entries.len();
    entries.retain(|entry| !(entry["asset"] == asset && entry["address"] == address));
    if entries.len() == before {
        return Err(Failure::error(StatusCode::NOT_FOUND, "Address not registered"));
    }
    Ok(StatusCode::OK)
}

async fn register_withdrawal_addresses(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    body: String,
) -> Reply {
    let mut store = db.write().await;
    store.touch_user(&user_id);
    register_addresses(&mut store.withdrawal_addresses, &user_id, &body)
}

async fn list_withdrawal_addresses(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    Query(paging): Query<Paging>,
) -> Json<Value> {
    list_for(&db.read().await.withdrawal_addresses, &user_id, &paging)
}

async fn delete_withdrawal_address(
    State(db): State<Db>,
    Path((user_id, asset, address)): Path<(String, String, String)>,
) -> Result<StatusCode, Failure> {
    let mut store = db.write().await;
    remove_address(&mut store.withdrawal_addresses, &user_id, &asset, &address)
}

async fn register_deposit_addresses(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    body: String,
) -> Reply {
    let mut store = db.write().await;
    store.touch_user(&user_id);
    register_addresses(&mut store.deposit_addresses, &user_id, &body)
}

async fn list_deposit_addresses(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    Query(paging): Query<Paging>,
) -> Json<Value> {
    list_for(&db.read().await.deposit_addresses, &user_id, &paging)
}

async fn delete_deposit_address(
    State(db): State<Db>,
    Path((user_id, asset, address)): Path<(String, String, String)>,
) -> Result<StatusCode, Failure> {
    let mut store = db.write().await;
    remove_address(&mut store.deposit_addresses, &user_id, &asset, &address)
}

// ---------------------------------------------------------------------------
// V1 alerts
// ---------------------------------------------------------------------------

async fn list_alerts(
    State(db): State<Db>,
    Query(filters): Query<HashMap<String, String>>,
) -> Json<Value> {
    let store = db.read().await;
    let matching: Vec<Value> = store
        .alerts
        .iter()
        .filter(|alert| {
            filters.get("level").map_or(true, |level| alert["level"] == level.as_str())
                && filters
                    .get("alertStatus")
                    .map_or(true, |status| alert["alertStatus"] == status.as_str())
        })
        .cloned()
        .collect();
    let paging = Paging {
        limit: filters.get("limit").and_then(|v| v.parse().ok()),
        offset: filters.get("offset").and_then(|v| v.parse().ok()),
    };
    let page = paging.apply(&matching);
    Json(json!({ "total": page["total"], "alerts": page["data"] }))
}

async fn assign_alert(
    State(db): State<Db>,
    Path(alert_id): Path<String>,
    body: String,
) -> Reply {
    let fields = parse_object(&body)?;
    require(&fields, &["alertAssignee"])?;
    let mut store = db.write().await;
    let alert = store
        .alert_mut(&alert_id)
        .ok_or_else(|| Failure::error(StatusCode::NOT_FOUND, "Alert not found"))?;
    alert["alertAssignee"] = fields["alertAssignee"].clone();
    let updated = alert.clone();
    store.alert_activity.entry(alert_id).or_default().push(json!({
        "action": "ASSIGNED",
        "alertAssignee": fields["alertAssignee"],
    }));
    Ok((StatusCode::OK, Json(updated)))
}

async fn update_alert_status(
    State(db): State<Db>,
    Path(alert_id): Path<String>,
    body: String,
) -> Reply {
    let fields = parse_object(&body)?;
    require(&fields, &["status"])?;
    let mut store = db.write().await;
    let alert = store
        .alert_mut(&alert_id)
        .ok_or_else(|| Failure::error(StatusCode::NOT_FOUND, "Alert not found"))?;
    alert["alertStatus"] = fields["status"].clone();
    let updated = alert.clone();
    store.alert_activity.entry(alert_id).or_default().push(json!({
        "action": "STATUS_CHANGED",
        "status": fields["status"],
        "comment": fields.get("comment").cloned().unwrap_or(Value::Null),
    }));
    Ok((StatusCode::OK, Json(updated)))
}

async fn alert_activity(State(db): State<Db>, Path(alert_id): Path<String>) -> Reply {
    let store = db.read().await;
    if !store.alerts.iter().any(|alert| alert["alertIdentifier"] == alert_id.as_str()) {
        return Err(Failure::error(StatusCode::NOT_FOUND, "Alert not found"));
    }
    let activity = store.alert_activity.get(&alert_id).cloned().unwrap_or_default();
    Ok((StatusCode::OK, Json(json!({ "activity": activity }))))
}

// ---------------------------------------------------------------------------
// V1 users
// ---------------------------------------------------------------------------

fn user_summary(store: &Store, user_id: &str) -> Value {
    json!({
        "userId": user_id,
        "score": "green",
        "receivedTransfers": store.received.get(user_id).map_or(0, Vec::len),
        "sentTransfers": store.sent.get(user_id).map_or(0, Vec::len),
    })
}

async fn list_users(State(db): State<Db>, Query(paging): Query<Paging>) -> Json<Value> {
    let store = db.read().await;
    let users: Vec<Value> = store
        .user_ids()
        .iter()
        .map(|id| user_summary(&store, id))
        .collect();
    Json(paging.apply(&users))
}

async fn get_user(State(db): State<Db>, Path(user_id): Path<String>) -> Reply {
    let store = db.read().await;
    if !store.received.contains_key(&user_id) {
        return Err(Failure::error(StatusCode::NOT_FOUND, "User not found"));
    }
    Ok((StatusCode::OK, Json(user_summary(&store, &user_id))))
}

fn rename_in<T>(map: &mut HashMap<String, T>, from: &str, to: &str) {
    if let Some(value) = map.remove(from) {
        map.insert(to.to_string(), value);
    }
}

async fn rename_users(State(db): State<Db>, body: String) -> Result<StatusCode, Failure> {
    let renames = parse_array(&body)?;
    require_each(&renames, &["from", "to"])?;
    let mut store = db.write().await;
    for rename in &renames {
        let from = rename["from"].as_str().unwrap_or_default();
        let to = rename["to"].as_str().unwrap_or_default();
        let Store {
            received,
            sent,
            withdrawal_addresses,
            deposit_addresses,
            ..
        } = &mut *store;
        rename_in(received, from, to);
        rename_in(sent, from, to);
        rename_in(withdrawal_addresses, from, to);
        rename_in(deposit_addresses, from, to);
    }
    Ok(StatusCode::OK)
}

// ---------------------------------------------------------------------------
// V2 transfers and withdrawal attempts
// ---------------------------------------------------------------------------

fn register_v2(
    user_id: &str,
    body: &str,
    required: &[&str],
) -> Result<(String, Value), Failure> {
    let mut fields = parse_object(body)?;
    require(&fields, required)?;
    let external_id = Uuid::new_v4().to_string();
    fields.insert("externalId".to_string(), Value::from(external_id.as_str()));
    fields.insert("userId".to_string(), Value::from(user_id));
    fields.insert("updatedAt".to_string(), Value::Null);
    Ok((external_id, Value::Object(fields)))
}

async fn register_transfer(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    body: String,
) -> Reply {
    let (external_id, record) = register_v2(
        &user_id,
        &body,
        &["network", "asset", "transferReference", "direction"],
    )?;
    db.write().await.transfers.insert(external_id, record.clone());
    Ok((StatusCode::ACCEPTED, Json(record)))
}

async fn register_withdrawal_attempt(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    body: String,
) -> Reply {
    let (external_id, record) = register_v2(
        &user_id,
        &body,
        &[
            "network",
            "asset",
            "address",
            "attemptIdentifier",
            "assetAmount",
            "attemptTimestamp",
        ],
    )?;
    db.write()
        .await
        .withdrawal_attempts
        .insert(external_id, record.clone());
    Ok((StatusCode::ACCEPTED, Json(record)))
}

fn lookup<'a>(
    records: &'a HashMap<String, Value>,
    external_id: &str,
    kind: &str,
) -> Result<&'a Value, Failure> {
    records.get(external_id).ok_or_else(|| {
        Failure::error(StatusCode::NOT_FOUND, &format!("{kind} {external_id} not found"))
    })
}

fn with_format(record: &Value, format: &FormatQuery) -> Value {
    let mut record = record.clone();
    if let Some(format_type) = &format.format_type {
        record["formatType"] = Value::from(format_type.as_str());
    }
    record
}

fn exposures() -> Value {
    json!({ "direct": { "name": null, "category": null, "categoryId": null } })
}

fn network_identifications() -> Value {
    json!({ "count": 0, "networkIdentificationOrgs": [] })
}

async fn get_transfer(
    State(db): State<Db>,
    Path(external_id): Path<String>,
    Query(format): Query<FormatQuery>,
) -> Reply {
    let store = db.read().await;
    let record = lookup(&store.transfers, &external_id, "Transfer")?;
    Ok((StatusCode::OK, Json(with_format(record, &format))))
}

async fn transfer_exposures(State(db): State<Db>, Path(external_id): Path<String>) -> Reply {
    lookup(&db.read().await.transfers, &external_id, "Transfer")?;
    Ok((StatusCode::OK, Json(exposures())))
}

async fn transfer_alerts(State(db): State<Db>, Path(external_id): Path<String>) -> Reply {
    lookup(&db.read().await.transfers, &external_id, "Transfer")?;
    Ok((StatusCode::OK, Json(json!({ "alerts": [] }))))
}

async fn transfer_network_identifications(
    State(db): State<Db>,
    Path(external_id): Path<String>,
) -> Reply {
    lookup(&db.read().await.transfers, &external_id, "Transfer")?;
    Ok((StatusCode::OK, Json(network_identifications())))
}

async fn get_withdrawal_attempt(
    State(db): State<Db>,
    Path(external_id): Path<String>,
    Query(format): Query<FormatQuery>,
) -> Reply {
    let store = db.read().await;
    let record = lookup(&store.withdrawal_attempts, &external_id, "Withdrawal attempt")?;
    Ok((StatusCode::OK, Json(with_format(record, &format))))
}

async fn withdrawal_attempt_exposures(
    State(db): State<Db>,
    Path(external_id): Path<String>,
) -> Reply {
    lookup(&db.read().await.withdrawal_attempts, &external_id, "Withdrawal attempt")?;
    Ok((StatusCode::OK, Json(exposures())))
}

async fn withdrawal_attempt_alerts(
    State(db): State<Db>,
    Path(external_id): Path<String>,
) -> Reply {
    lookup(&db.read().await.withdrawal_attempts, &external_id, "Withdrawal attempt")?;
    Ok((StatusCode::OK, Json(json!({ "alerts": [] }))))
}

async fn withdrawal_attempt_high_risk_addresses(
    State(db): State<Db>,
    Path(external_id): Path<String>,
) -> Reply {
    lookup(&db.read().await.withdrawal_attempts, &external_id, "Withdrawal attempt")?;
    Ok((
        StatusCode::OK,
        Json(json!({ "chainalysisIdentifications": [], "customAddresses": [] })),
    ))
}

async fn withdrawal_attempt_network_identifications(
    State(db): State<Db>,
    Path(external_id): Path<String>,
) -> Reply {
    lookup(&db.read().await.withdrawal_attempts, &external_id, "Withdrawal attempt")?;
    Ok((StatusCode::OK, Json(network_identifications())))
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

async fn categories() -> Json<Value> {
    Json(json!({
        "categories": [
            { "categoryId": 1, "categoryName": "sanctioned entity" },
            { "categoryId": 2, "categoryName": "darknet market" },
            { "categoryId": 3, "categoryName": "exchange" },
        ]
    }))
}

async fn internal_users() -> Json<Value> {
    Json(json!({
        "data": [
            { "id": 1, "name": "Compliance Analyst", "email": ADMIN_USER_EMAIL, "role": "ANALYST" }
        ]
    }))
}
