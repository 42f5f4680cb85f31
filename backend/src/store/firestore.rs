use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::FirebaseConfig;
use crate::error::AppError;
use crate::models::{LeaveRequest, LeaveRequestPatch, LeaveStatus, LeaveType, NewLeaveRequest};
use crate::services::session::SessionState;
use crate::store::dto::{self, Value};
use crate::store::{CollectionPath, DocumentStore, SnapshotEvent, Subscription};

const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";
const PAGE_SIZE: &str = "300";
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Cloud Firestore over its REST API. The live query is a poll that only
/// reports snapshots that differ from the previous one.
pub struct FirestoreStore {
    client: Client,
    project_id: String,
    session: watch::Receiver<SessionState>,
    poll_interval: Duration,
}

impl FirestoreStore {
    pub fn new(
        config: &FirebaseConfig,
        session: watch::Receiver<SessionState>,
        poll_interval: Duration,
    ) -> Result<Self, AppError> {
        let project_id = config
            .project_id
            .clone()
            .ok_or_else(|| AppError::Unavailable("Firebase project id is not set".to_string()))?;
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Store(format!("Failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            project_id,
            session,
            poll_interval,
        })
    }

    fn collection_url(&self, path: &CollectionPath) -> Result<Url, AppError> {
        let raw = format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            FIRESTORE_URL, self.project_id, path
        );
        Url::parse(&raw).map_err(|e| AppError::Store(format!("Invalid collection url {}: {}", raw, e)))
    }

    fn document_url(&self, path: &CollectionPath, id: &str) -> Result<Url, AppError> {
        let mut url = self.collection_url(path)?;
        url.path_segments_mut()
            .map_err(|_| AppError::Store("Collection url cannot be a base".to_string()))?
            .push(id);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, AppError> {
        match &*self.session.borrow() {
            SessionState::SignedIn(session) => Ok(request.bearer_auth(&session.id_token)),
            _ => Err(AppError::Unavailable("Not signed in".to_string())),
        }
    }

    async fn list_page(&self, path: &CollectionPath, page_token: Option<&str>) -> Result<dto::ListDocumentsResponse, AppError> {
        let mut url = self.collection_url(path)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pageSize", PAGE_SIZE);
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }

        let response = self.authorized(self.client.get(url))?.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Store(format!("Firestore API error {}: {}", status, body)));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn create(&self, path: &CollectionPath, request: &NewLeaveRequest) -> Result<String, AppError> {
        let url = self.collection_url(path)?;
        let body = dto::WriteDocumentRequest {
            fields: encode_request(request),
        };

        let response = self.authorized(self.client.post(url))?.json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Store(format!("Failed to create leave request: {} {}", status, body)));
        }

        let document: dto::Document = response.json().await?;
        info!("Created leave request {} in {}", document.id(), path);
        Ok(document.id().to_string())
    }

    async fn update(&self, path: &CollectionPath, id: &str, patch: &LeaveRequestPatch) -> Result<(), AppError> {
        let mut url = self.document_url(path, id)?;
        url.query_pairs_mut()
            .append_pair("updateMask.fieldPaths", "status")
            .append_pair("currentDocument.exists", "true");

        let mut fields = HashMap::new();
        fields.insert("status".to_string(), Value::StringValue(patch.status.as_str().to_string()));
        let body = dto::WriteDocumentRequest { fields };

        let response = self.authorized(self.client.patch(url))?.json(&body).send().await?;

        match response.status() {
            status if status.is_success() => {
                info!("Set leave request {} to {}", id, patch.status.as_str());
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(AppError::NotFound),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AppError::Store(format!("Failed to update leave request: {} {}", status, body)))
            }
        }
    }

    async fn fetch_all(&self, path: &CollectionPath) -> Result<Vec<LeaveRequest>, AppError> {
        let mut requests = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.list_page(path, page_token.as_deref()).await?;
            for document in &page.documents {
                match decode_document(document) {
                    Ok(request) => requests.push(request),
                    Err(e) => warn!("Failed to parse leave request from document {}: {}", document.name, e),
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!("Fetched {} leave requests from {}", requests.len(), path);
        Ok(requests)
    }

    fn subscribe(self: Arc<Self>, path: CollectionPath) -> Subscription {
        Subscription::spawn(move |tx| async move {
            info!("Polling {} every {:?}", path, self.poll_interval);
            poll_snapshots(self.poll_interval, tx, || self.fetch_all(&path)).await;
        })
    }
}

/// Drives a polling live query. Unchanged snapshots are swallowed and an
/// outage is reported once; the first good fetch after it is always sent.
pub async fn poll_snapshots<F, Fut>(period: Duration, tx: mpsc::Sender<SnapshotEvent>, mut fetch: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<LeaveRequest>, AppError>>,
{
    let mut ticker = tokio::time::interval(period.max(MIN_POLL_INTERVAL));
    let mut last: Option<Vec<LeaveRequest>> = None;
    let mut failing = false;

    loop {
        ticker.tick().await;

        let event = match fetch().await {
            Ok(requests) => {
                failing = false;
                if last.as_ref() == Some(&requests) {
                    continue;
                }
                last = Some(requests.clone());
                SnapshotEvent::Snapshot(requests)
            }
            Err(e) => {
                if failing {
                    continue;
                }
                failing = true;
                last = None;
                SnapshotEvent::Error(e.to_string())
            }
        };

        if tx.send(event).await.is_err() {
            break;
        }
    }
}

pub fn encode_request(request: &NewLeaveRequest) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    let mut put = |key: &str, value: Value| {
        fields.insert(key.to_string(), value);
    };

    put("studentName", Value::StringValue(request.student_name.clone()));
    put("studentId", Value::StringValue(request.student_id.clone()));
    put("leaveType", Value::StringValue(request.leave_type.as_str().to_string()));
    put("startDate", Value::StringValue(request.start_date.to_string()));
    put(
        "endDate",
        match request.end_date {
            Some(date) => Value::StringValue(date.to_string()),
            None => Value::NullValue(()),
        },
    );
    put("totalDays", Value::DoubleValue(request.total_days));
    put("missedSubjects", Value::StringValue(request.missed_subjects.clone()));
    put("reason", Value::StringValue(request.reason.clone()));
    put("status", Value::StringValue(request.status.as_str().to_string()));
    put("requestDate", Value::StringValue(request.request_date.to_string()));
    put("timestamp", Value::IntegerValue(request.timestamp.to_string()));

    fields
}

pub fn decode_document(document: &dto::Document) -> Result<LeaveRequest, AppError> {
    let fields = &document.fields;

    let status_raw = get_string(fields, "status")?;
    let status = LeaveStatus::parse(&status_raw)
        .ok_or_else(|| AppError::Store(format!("Unknown status: {}", status_raw)))?;

    let leave_type = get_string(fields, "leaveType")
        .ok()
        .and_then(|raw| LeaveType::parse(&raw))
        .unwrap_or(LeaveType::Other);

    Ok(LeaveRequest {
        id: document.id().to_string(),
        student_name: get_string(fields, "studentName")?,
        student_id: get_string(fields, "studentId")?,
        leave_type,
        start_date: get_date(fields, "startDate")?,
        end_date: get_date(fields, "endDate").ok(),
        total_days: get_number(fields, "totalDays")?,
        missed_subjects: get_string(fields, "missedSubjects").unwrap_or_default(),
        reason: get_string(fields, "reason").unwrap_or_default(),
        status,
        request_date: get_date(fields, "requestDate")?,
        timestamp: get_number(fields, "timestamp").map(|t| t as i64).unwrap_or(0),
    })
}

fn get_string(fields: &HashMap<String, Value>, key: &str) -> Result<String, AppError> {
    match fields.get(key) {
        Some(Value::StringValue(s)) => Ok(s.clone()),
        _ => Err(AppError::Store(format!("Missing string field: {}", key))),
    }
}

fn get_date(fields: &HashMap<String, Value>, key: &str) -> Result<NaiveDate, AppError> {
    let raw = get_string(fields, key)?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| AppError::Store(format!("Invalid date field {}: {}", key, e)))
}

/// Older documents carry numbers typed in by hand, so strings are accepted too.
fn get_number(fields: &HashMap<String, Value>, key: &str) -> Result<f64, AppError> {
    let parsed = match fields.get(key) {
        Some(Value::DoubleValue(n)) => Some(*n),
        Some(Value::IntegerValue(s)) => s.parse::<i64>().ok().map(|n| n as f64),
        Some(Value::StringValue(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| AppError::Store(format!("Missing numeric field: {}", key)))
}
