// src/api.rs

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::attendance::{self, AttendanceLine, AttendanceSummary};
use crate::dashboard;
use crate::dispatch::{DispatchError, ReportDispatcher};
use crate::error::AppError;
use crate::justification::JustificationIndex;
use crate::model::{
    AttendanceRecord, AttendanceStatus, CleaningAssignment, Event, EventPatch, Flight,
    FlightPatch, Justification, JustificationPatch, KeyLog, NewAttendanceRecord, NewEvent,
    NewFlight, NewJustification, NewKeyLog, NewNote, Note, NotePatch, PermanenceEntry, Personnel,
    Rank, TiTicket, encode_military_ids,
};
use crate::report;
use crate::roster::{ReorderDirection, RosterService};
use crate::store::{
    StoreClient, TABLE_ATTENDANCE, TABLE_CLEANING, TABLE_EVENTS, TABLE_FLIGHTS,
    TABLE_JUSTIFICATIONS, TABLE_KEYS, TABLE_MILITARY, TABLE_NOTES, TABLE_PERMANENCE,
    TABLE_TI_TICKETS,
};

const DEFAULT_CALL_LABEL: &str = "GERAL";

#[derive(Clone)]
pub struct AppState {
    pub store: StoreClient,
    pub roster: RosterService,
    pub dispatcher: Option<Arc<ReportDispatcher>>,
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/personnel", get(list_personnel).post(create_personnel))
        .route("/personnel/reorder", post(reorder_personnel))
        .route(
            "/personnel/{id}",
            patch(update_personnel).delete(delete_personnel),
        )
        .route("/attendance", get(list_attendance).post(create_attendance))
        .route(
            "/justifications",
            get(list_justifications).post(create_justification),
        )
        .route(
            "/justifications/{id}",
            patch(update_justification).delete(delete_justification),
        )
        .route("/flights", get(list_flights).post(create_flight))
        .route("/flights/{id}", patch(update_flight).delete(delete_flight))
        .route("/events", get(list_events).post(create_event))
        .route("/events/{id}", patch(update_event).delete(delete_event))
        .route("/keys", get(list_keys).post(create_key_log))
        .route("/keys/{id}/return", post(return_key))
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/{id}", patch(update_note).delete(delete_note))
        .route("/dashboard/attendance", get(dashboard_attendance))
        .route("/dashboard/flights", get(dashboard_flights))
        .route("/dashboard/events", get(dashboard_events))
        .route("/dashboard/justifications", get(dashboard_justifications))
        .route("/dashboard/keys", get(dashboard_keys))
        .route("/dashboard/notes", get(dashboard_notes))
        .route("/dashboard/permanence", get(dashboard_permanence))
        .route("/dashboard/cleaning", get(dashboard_cleaning))
        .route("/dashboard/ti-tickets", get(dashboard_ti_tickets))
        .route("/reports/attendance", get(attendance_report_pdf))
        .route("/reports/attendance/send", post(send_attendance_report))
        .route("/reports/dispatch", post(dispatch_report));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

// --- Validation helpers ---
// Checked before any remote call is issued; invalid input never costs a
// round-trip to the store.

fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::Validation(format!("Malformed {}: expected YYYY-MM-DD", field))
    })
}

fn parse_time(raw: &str, field: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| AppError::Validation(format!("Malformed {}: expected HH:MM", field)))
}

fn eq_filter(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

// --- Health ---

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

// --- Personnel ---

#[derive(Debug, Deserialize)]
struct CreatePersonnelRequest {
    rank: Rank,
    name: String,
}

async fn list_personnel(
    State(state): State<AppState>,
) -> Result<Json<Vec<Personnel>>, AppError> {
    Ok(Json(state.roster.list().await?))
}

async fn create_personnel(
    State(state): State<AppState>,
    Json(req): Json<CreatePersonnelRequest>,
) -> Result<Json<Personnel>, AppError> {
    require_text(&req.name, "name")?;
    let created = state.roster.create(req.rank, &req.name).await?;
    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
struct UpdatePersonnelRequest {
    rank: Option<Rank>,
    name: Option<String>,
}

async fn update_personnel(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePersonnelRequest>,
) -> Result<StatusCode, AppError> {
    if req.rank.is_none() && req.name.is_none() {
        return Err(AppError::Validation("Nothing to update".to_string()));
    }
    if let Some(name) = &req.name {
        require_text(name, "name")?;
    }
    state
        .roster
        .update(&id, req.rank, req.name.as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_personnel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.roster.remove(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ReorderRequest {
    id: String,
    direction: ReorderDirection,
    /// The client's current search text. A non-empty value blocks the
    /// reorder: index positions under a filtered view do not correspond to
    /// the true total order.
    filter: Option<String>,
}

async fn reorder_personnel(
    State(state): State<AppState>,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<Vec<Personnel>>, AppError> {
    let roster = state
        .roster
        .reorder(&req.id, req.direction, req.filter.as_deref())
        .await?;
    Ok(Json(roster))
}

// --- Attendance ---

#[derive(Debug, Deserialize)]
struct AttendanceQuery {
    date: Option<String>,
    call_type: Option<String>,
}

async fn list_attendance(
    State(state): State<AppState>,
    Query(query): Query<AttendanceQuery>,
) -> Result<Json<Vec<AttendanceRecord>>, AppError> {
    let mut filters: Vec<(&str, String)> = Vec::new();
    if let Some(raw) = &query.date {
        let date = parse_date(raw, "date")?;
        filters.push(("date", eq_filter(date)));
    }
    if let Some(call_type) = &query.call_type {
        if !call_type.trim().is_empty() {
            filters.push(("call_type", eq_filter(call_type.trim())));
        }
    }
    let records: Vec<AttendanceRecord> = state.store.select(TABLE_ATTENDANCE, &filters).await?;
    Ok(Json(records))
}

#[derive(Debug, Deserialize)]
struct CreateAttendanceRequest {
    military_id: String,
    military_name: String,
    rank: Rank,
    call_type: String,
    date: String,
    status: AttendanceStatus,
    justification_id: Option<String>,
}

async fn create_attendance(
    State(state): State<AppState>,
    Json(req): Json<CreateAttendanceRequest>,
) -> Result<Json<AttendanceRecord>, AppError> {
    require_text(&req.military_id, "military_id")?;
    require_text(&req.military_name, "military_name")?;
    require_text(&req.call_type, "call_type")?;
    let date = parse_date(&req.date, "date")?;
    let payload = NewAttendanceRecord {
        military_id: req.military_id,
        military_name: req.military_name,
        rank: req.rank,
        call_type: req.call_type.trim().to_string(),
        date,
        status: req.status,
        justification_id: req.justification_id,
    };
    let created: AttendanceRecord = state.store.insert(TABLE_ATTENDANCE, &payload).await?;
    Ok(Json(created))
}

// --- Justifications ---

async fn list_justifications(
    State(state): State<AppState>,
) -> Result<Json<Vec<Justification>>, AppError> {
    let rows: Vec<Justification> = state.store.select(TABLE_JUSTIFICATIONS, &[]).await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
struct CreateJustificationRequest {
    military_id: String,
    military_name: String,
    reason: String,
    start_date: String,
    end_date: String,
}

async fn create_justification(
    State(state): State<AppState>,
    Json(req): Json<CreateJustificationRequest>,
) -> Result<Json<Justification>, AppError> {
    require_text(&req.military_id, "military_id")?;
    require_text(&req.military_name, "military_name")?;
    require_text(&req.reason, "reason")?;
    let start_date = parse_date(&req.start_date, "start_date")?;
    let end_date = parse_date(&req.end_date, "end_date")?;
    if start_date > end_date {
        return Err(AppError::Validation(
            "start_date must not be after end_date".to_string(),
        ));
    }
    let payload = NewJustification {
        military_id: req.military_id,
        military_name: req.military_name,
        reason: req.reason.trim().to_string(),
        start_date,
        end_date,
    };
    let created: Justification = state.store.insert(TABLE_JUSTIFICATIONS, &payload).await?;
    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
struct UpdateJustificationRequest {
    reason: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn update_justification(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateJustificationRequest>,
) -> Result<StatusCode, AppError> {
    let start_date = req
        .start_date
        .as_deref()
        .map(|raw| parse_date(raw, "start_date"))
        .transpose()?;
    let end_date = req
        .end_date
        .as_deref()
        .map(|raw| parse_date(raw, "end_date"))
        .transpose()?;
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(AppError::Validation(
                "start_date must not be after end_date".to_string(),
            ));
        }
    }
    let patch = JustificationPatch {
        reason: req.reason.map(|r| r.trim().to_string()),
        start_date,
        end_date,
    };
    state.store.update(TABLE_JUSTIFICATIONS, &id, &patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_justification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.store.delete(TABLE_JUSTIFICATIONS, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Flights ---

/// API view of a flight: the stored JSON-encoded id string decoded into a
/// native array.
#[derive(Debug, Serialize)]
struct FlightView {
    id: String,
    flight_date: NaiveDate,
    flight_time: String,
    military_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

impl From<Flight> for FlightView {
    fn from(flight: Flight) -> Self {
        let military_ids = flight.responsible_ids();
        Self {
            id: flight.id,
            flight_date: flight.flight_date,
            flight_time: flight.flight_time,
            military_ids,
            created_at: flight.created_at,
        }
    }
}

async fn list_flights(State(state): State<AppState>) -> Result<Json<Vec<FlightView>>, AppError> {
    let flights: Vec<Flight> = state.store.select(TABLE_FLIGHTS, &[]).await?;
    Ok(Json(flights.into_iter().map(FlightView::from).collect()))
}

#[derive(Debug, Deserialize)]
struct CreateFlightRequest {
    flight_date: String,
    flight_time: String,
    military_ids: Vec<String>,
}

async fn create_flight(
    State(state): State<AppState>,
    Json(req): Json<CreateFlightRequest>,
) -> Result<Json<FlightView>, AppError> {
    let flight_date = parse_date(&req.flight_date, "flight_date")?;
    parse_time(&req.flight_time, "flight_time")?;
    let payload = NewFlight {
        flight_date,
        flight_time: req.flight_time.trim().to_string(),
        military_ids: encode_military_ids(&req.military_ids),
    };
    let created: Flight = state.store.insert(TABLE_FLIGHTS, &payload).await?;
    Ok(Json(FlightView::from(created)))
}

#[derive(Debug, Deserialize)]
struct UpdateFlightRequest {
    flight_date: Option<String>,
    flight_time: Option<String>,
    military_ids: Option<Vec<String>>,
}

async fn update_flight(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateFlightRequest>,
) -> Result<StatusCode, AppError> {
    let flight_date = req
        .flight_date
        .as_deref()
        .map(|raw| parse_date(raw, "flight_date"))
        .transpose()?;
    let flight_time = match req.flight_time {
        Some(raw) => {
            parse_time(&raw, "flight_time")?;
            Some(raw.trim().to_string())
        }
        None => None,
    };
    let patch = FlightPatch {
        flight_date,
        flight_time,
        military_ids: req.military_ids.as_deref().map(encode_military_ids),
    };
    state.store.update(TABLE_FLIGHTS, &id, &patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_flight(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.store.delete(TABLE_FLIGHTS, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Events ---

async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, AppError> {
    let events: Vec<Event> = state.store.select(TABLE_EVENTS, &[]).await?;
    Ok(Json(events))
}

#[derive(Debug, Deserialize)]
struct CreateEventRequest {
    title: String,
    event_date: String,
    event_time: Option<String>,
    description: Option<String>,
}

async fn create_event(
    State(state): State<AppState>,
    Json(req): Json<CreateEventRequest>,
) -> Result<Json<Event>, AppError> {
    require_text(&req.title, "title")?;
    let event_date = parse_date(&req.event_date, "event_date")?;
    if let Some(time) = &req.event_time {
        parse_time(time, "event_time")?;
    }
    let payload = NewEvent {
        title: req.title.trim().to_string(),
        event_date,
        event_time: req.event_time.map(|t| t.trim().to_string()),
        description: req.description,
    };
    let created: Event = state.store.insert(TABLE_EVENTS, &payload).await?;
    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
struct UpdateEventRequest {
    title: Option<String>,
    event_date: Option<String>,
    event_time: Option<String>,
    description: Option<String>,
}

async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<StatusCode, AppError> {
    if let Some(title) = &req.title {
        require_text(title, "title")?;
    }
    let event_date = req
        .event_date
        .as_deref()
        .map(|raw| parse_date(raw, "event_date"))
        .transpose()?;
    if let Some(time) = &req.event_time {
        parse_time(time, "event_time")?;
    }
    let patch = EventPatch {
        title: req.title.map(|t| t.trim().to_string()),
        event_date,
        event_time: req.event_time.map(|t| t.trim().to_string()),
        description: req.description,
    };
    state.store.update(TABLE_EVENTS, &id, &patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.store.delete(TABLE_EVENTS, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Keys ---

async fn list_keys(State(state): State<AppState>) -> Result<Json<Vec<KeyLog>>, AppError> {
    let keys: Vec<KeyLog> = state.store.select(TABLE_KEYS, &[]).await?;
    Ok(Json(keys))
}

#[derive(Debug, Deserialize)]
struct CreateKeyLogRequest {
    key_name: String,
    military_id: Option<String>,
    military_name: String,
}

async fn create_key_log(
    State(state): State<AppState>,
    Json(req): Json<CreateKeyLogRequest>,
) -> Result<Json<KeyLog>, AppError> {
    require_text(&req.key_name, "key_name")?;
    require_text(&req.military_name, "military_name")?;
    let payload = NewKeyLog {
        key_name: req.key_name.trim().to_string(),
        military_id: req.military_id,
        military_name: req.military_name.trim().to_string(),
        taken_at: Utc::now(),
    };
    let created: KeyLog = state.store.insert(TABLE_KEYS, &payload).await?;
    Ok(Json(created))
}

async fn return_key(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    info!("Marking key log {} as returned", id);
    state
        .store
        .update(TABLE_KEYS, &id, &json!({ "returned_at": Utc::now() }))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Notes ---

async fn list_notes(State(state): State<AppState>) -> Result<Json<Vec<Note>>, AppError> {
    let notes: Vec<Note> = state.store.select(TABLE_NOTES, &[]).await?;
    Ok(Json(notes))
}

#[derive(Debug, Deserialize)]
struct CreateNoteRequest {
    title: String,
    content: String,
}

async fn create_note(
    State(state): State<AppState>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<Json<Note>, AppError> {
    require_text(&req.title, "title")?;
    require_text(&req.content, "content")?;
    let payload = NewNote {
        title: req.title.trim().to_string(),
        content: req.content,
    };
    let created: Note = state.store.insert(TABLE_NOTES, &payload).await?;
    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
struct UpdateNoteRequest {
    title: Option<String>,
    content: Option<String>,
}

async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateNoteRequest>,
) -> Result<StatusCode, AppError> {
    if let Some(title) = &req.title {
        require_text(title, "title")?;
    }
    if let Some(content) = &req.content {
        require_text(content, "content")?;
    }
    let patch = NotePatch {
        title: req.title.map(|t| t.trim().to_string()),
        content: req.content,
    };
    state.store.update(TABLE_NOTES, &id, &patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.store.delete(TABLE_NOTES, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Dashboard ---

#[derive(Debug, Deserialize)]
struct DashboardDateQuery {
    date: Option<String>,
}

fn dashboard_date(query: &DashboardDateQuery) -> Result<NaiveDate, AppError> {
    match &query.date {
        Some(raw) => parse_date(raw, "date"),
        None => Ok(Local::now().date_naive()),
    }
}

async fn dashboard_attendance(
    State(state): State<AppState>,
    Query(query): Query<DashboardDateQuery>,
) -> Result<Json<dashboard::AttendanceCounts>, AppError> {
    let date = dashboard_date(&query)?;
    let roster: Vec<Personnel> = state.store.select(TABLE_MILITARY, &[]).await?;
    let records: Vec<AttendanceRecord> = state
        .store
        .select(TABLE_ATTENDANCE, &[("date", eq_filter(date))])
        .await?;
    let justifications: Vec<Justification> =
        state.store.select(TABLE_JUSTIFICATIONS, &[]).await?;
    let index = JustificationIndex::build(&justifications);
    Ok(Json(dashboard::attendance_counts(
        &roster, &records, &index, date,
    )))
}

async fn dashboard_flights(
    State(state): State<AppState>,
) -> Result<Json<dashboard::FlightCounts>, AppError> {
    let flights: Vec<Flight> = state.store.select(TABLE_FLIGHTS, &[]).await?;
    Ok(Json(dashboard::flight_counts(
        &flights,
        Local::now().date_naive(),
    )))
}

async fn dashboard_events(
    State(state): State<AppState>,
) -> Result<Json<dashboard::EventCounts>, AppError> {
    let events: Vec<Event> = state.store.select(TABLE_EVENTS, &[]).await?;
    Ok(Json(dashboard::event_counts(
        &events,
        Local::now().date_naive(),
    )))
}

async fn dashboard_justifications(
    State(state): State<AppState>,
) -> Result<Json<dashboard::JustificationCounts>, AppError> {
    let justifications: Vec<Justification> =
        state.store.select(TABLE_JUSTIFICATIONS, &[]).await?;
    Ok(Json(dashboard::justification_counts(
        &justifications,
        Local::now().date_naive(),
    )))
}

async fn dashboard_keys(
    State(state): State<AppState>,
) -> Result<Json<dashboard::KeyCounts>, AppError> {
    let keys: Vec<KeyLog> = state.store.select(TABLE_KEYS, &[]).await?;
    Ok(Json(dashboard::key_counts(&keys)))
}

async fn dashboard_notes(
    State(state): State<AppState>,
) -> Result<Json<dashboard::NoteCounts>, AppError> {
    let notes: Vec<Note> = state.store.select(TABLE_NOTES, &[]).await?;
    Ok(Json(dashboard::note_counts(&notes)))
}

async fn dashboard_permanence(
    State(state): State<AppState>,
) -> Result<Json<dashboard::PermanenceCounts>, AppError> {
    let entries: Vec<PermanenceEntry> = state.store.select(TABLE_PERMANENCE, &[]).await?;
    Ok(Json(dashboard::permanence_counts(
        &entries,
        Local::now().date_naive(),
    )))
}

async fn dashboard_cleaning(
    State(state): State<AppState>,
) -> Result<Json<dashboard::CleaningCounts>, AppError> {
    let assignments: Vec<CleaningAssignment> = state.store.select(TABLE_CLEANING, &[]).await?;
    Ok(Json(dashboard::cleaning_counts(
        &assignments,
        Local::now().date_naive(),
    )))
}

async fn dashboard_ti_tickets(
    State(state): State<AppState>,
) -> Result<Json<dashboard::TiTicketCounts>, AppError> {
    let tickets: Vec<TiTicket> = state.store.select(TABLE_TI_TICKETS, &[]).await?;
    Ok(Json(dashboard::ti_ticket_counts(&tickets)))
}

// --- Reports ---

async fn build_report(
    state: &AppState,
    date: NaiveDate,
    call_type: Option<&str>,
) -> Result<(Vec<AttendanceLine>, AttendanceSummary), AppError> {
    let roster = state.roster.list().await?;
    let mut filters: Vec<(&str, String)> = vec![("date", eq_filter(date))];
    if let Some(call_type) = call_type {
        if !call_type.trim().is_empty() {
            filters.push(("call_type", eq_filter(call_type.trim())));
        }
    }
    let records: Vec<AttendanceRecord> = state.store.select(TABLE_ATTENDANCE, &filters).await?;
    let justifications: Vec<Justification> =
        state.store.select(TABLE_JUSTIFICATIONS, &[]).await?;
    let index = JustificationIndex::build(&justifications);
    Ok(attendance::aggregate(&roster, &records, &index, date))
}

fn call_label(call_type: Option<&str>) -> String {
    match call_type.map(str::trim).filter(|label| !label.is_empty()) {
        Some(label) => label.to_uppercase(),
        None => DEFAULT_CALL_LABEL.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct ReportQuery {
    date: Option<String>,
    call_type: Option<String>,
}

async fn attendance_report_pdf(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, AppError> {
    let raw_date = query
        .date
        .as_deref()
        .ok_or_else(|| AppError::Validation("date is required".to_string()))?;
    let date = parse_date(raw_date, "date")?;
    let (lines, summary) = build_report(&state, date, query.call_type.as_deref()).await?;
    let pdf = report::render_attendance_pdf(
        &lines,
        &summary,
        &call_label(query.call_type.as_deref()),
        date,
    )?;
    let file_name = report::report_file_name(date, query.call_type.as_deref());
    info!(
        "Rendered attendance report {} ({} bytes)",
        file_name,
        pdf.len()
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        pdf,
    )
        .into_response())
}

// Wire contract for report dispatch. `to` is accepted for compatibility but
// ignored: the configured distribution list is authoritative.
#[derive(Debug, Deserialize)]
struct DispatchRequest {
    #[serde(default)]
    to: Option<serde_json::Value>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(rename = "pdfBuffer")]
    pdf_buffer: String,
    #[serde(rename = "pdfName")]
    pdf_name: String,
    #[serde(rename = "callType", default)]
    call_type: Option<String>,
    #[serde(default)]
    stats: Option<DispatchStats>,
}

#[derive(Debug, Deserialize)]
struct DispatchStats {
    total: u64,
    present: u64,
    absent: u64,
    justified: u64,
}

#[derive(Debug, Serialize)]
struct DispatchResponse {
    success: bool,
    #[serde(rename = "messageId", skip_serializing_if = "Option::is_none")]
    message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl DispatchResponse {
    fn ok(message_id: String) -> Self {
        Self {
            success: true,
            message_id: Some(message_id),
            error: None,
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

fn dispatch_failure(error: DispatchError) -> (StatusCode, Json<DispatchResponse>) {
    let status = match &error {
        DispatchError::InvalidRecipient(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DispatchError::NoRecipients | DispatchError::Build(_) => StatusCode::INTERNAL_SERVER_ERROR,
        DispatchError::Transport(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(DispatchResponse::failure(error.to_string())))
}

fn compose_body(
    text: Option<&str>,
    call_type: Option<&str>,
    stats: Option<&DispatchStats>,
) -> String {
    let mut body = text
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(crate::dispatch::DEFAULT_BODY)
        .to_string();
    if let Some(call_type) = call_type.map(str::trim).filter(|c| !c.is_empty()) {
        body.push_str(&format!("\n\nChamada: {}", call_type.to_uppercase()));
    }
    if let Some(stats) = stats {
        body.push_str(&format!(
            "\n\nEfetivo: {}\nPresentes: {}\nAusentes: {}\nJustificados: {}",
            stats.total, stats.present, stats.absent, stats.justified
        ));
    }
    body
}

async fn dispatch_report(
    State(state): State<AppState>,
    Json(req): Json<DispatchRequest>,
) -> (StatusCode, Json<DispatchResponse>) {
    if req.to.is_some() {
        warn!("Ignoring caller-supplied recipients; the configured distribution list is used");
    }
    let Some(dispatcher) = &state.dispatcher else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(DispatchResponse::failure("Mail dispatch is not configured")),
        );
    };
    if req.pdf_name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(DispatchResponse::failure("pdfName is required")),
        );
    }
    let pdf = match BASE64_STANDARD.decode(req.pdf_buffer.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(DispatchResponse::failure(format!(
                    "pdfBuffer is not valid base64: {}",
                    e
                ))),
            );
        }
    };
    let body = compose_body(
        req.text.as_deref(),
        req.call_type.as_deref(),
        req.stats.as_ref(),
    );
    match dispatcher
        .send_report(pdf, req.pdf_name.trim(), req.subject.as_deref(), Some(&body))
        .await
    {
        Ok(receipt) => (StatusCode::OK, Json(DispatchResponse::ok(receipt.message_id))),
        Err(e) => dispatch_failure(e),
    }
}

// The primary "generate report" flow: aggregate, render and dispatch in one
// action.
#[derive(Debug, Deserialize)]
struct SendReportRequest {
    date: String,
    call_type: Option<String>,
    subject: Option<String>,
    text: Option<String>,
}

async fn send_attendance_report(
    State(state): State<AppState>,
    Json(req): Json<SendReportRequest>,
) -> Result<(StatusCode, Json<DispatchResponse>), AppError> {
    let date = parse_date(&req.date, "date")?;
    let Some(dispatcher) = state.dispatcher.clone() else {
        return Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(DispatchResponse::failure("Mail dispatch is not configured")),
        ));
    };
    let (lines, summary) = build_report(&state, date, req.call_type.as_deref()).await?;
    let label = call_label(req.call_type.as_deref());
    let pdf = report::render_attendance_pdf(&lines, &summary, &label, date)?;
    let file_name = report::report_file_name(date, req.call_type.as_deref());
    let stats = DispatchStats {
        total: summary.total as u64,
        present: summary.present as u64,
        absent: summary.absent as u64,
        justified: summary.justified as u64,
    };
    let body = compose_body(req.text.as_deref(), req.call_type.as_deref(), Some(&stats));
    match dispatcher
        .send_report(pdf, &file_name, req.subject.as_deref(), Some(&body))
        .await
    {
        Ok(receipt) => Ok((
            StatusCode::OK,
            Json(DispatchResponse::ok(receipt.message_id)),
        )),
        Err(e) => Ok(dispatch_failure(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_label_defaults_and_uppercases() {
        assert_eq!(call_label(None), "GERAL");
        assert_eq!(call_label(Some("  ")), "GERAL");
        assert_eq!(call_label(Some("alvorada")), "ALVORADA");
    }

    #[test]
    fn compose_body_appends_call_type_and_stats() {
        let stats = DispatchStats {
            total: 30,
            present: 25,
            absent: 3,
            justified: 2,
        };
        let body = compose_body(None, Some("alvorada"), Some(&stats));
        assert!(body.starts_with(crate::dispatch::DEFAULT_BODY));
        assert!(body.contains("Chamada: ALVORADA"));
        assert!(body.contains("Presentes: 25"));
    }

    #[test]
    fn compose_body_prefers_caller_text() {
        let body = compose_body(Some("Texto próprio"), None, None);
        assert_eq!(body, "Texto próprio");
    }

    #[test]
    fn date_and_time_validation_reject_malformed_input() {
        assert!(parse_date("2024-01-10", "date").is_ok());
        assert!(parse_date("10/01/2024", "date").is_err());
        assert!(parse_date("", "date").is_err());
        assert!(parse_time("08:30", "flight_time").is_ok());
        assert!(parse_time("8h30", "flight_time").is_err());
    }

    #[test]
    fn require_text_rejects_blank_values() {
        assert!(require_text("BRAVO", "name").is_ok());
        assert!(require_text("   ", "name").is_err());
    }
}
