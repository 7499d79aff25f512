// src/model.rs

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

// --- Personnel ---

/// Military rank codes as stored by the row store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rank {
    #[serde(rename = "CEL")]
    Coronel,
    #[serde(rename = "TC")]
    TenenteCoronel,
    #[serde(rename = "MAJ")]
    Major,
    #[serde(rename = "CAP")]
    Capitao,
    #[serde(rename = "1T")]
    PrimeiroTenente,
    #[serde(rename = "2T")]
    SegundoTenente,
    #[serde(rename = "ASP")]
    Aspirante,
    #[serde(rename = "SO")]
    Suboficial,
    #[serde(rename = "1S")]
    PrimeiroSargento,
    #[serde(rename = "2S")]
    SegundoSargento,
    #[serde(rename = "3S")]
    TerceiroSargento,
    #[serde(rename = "CB")]
    Cabo,
    #[serde(rename = "S1")]
    SoldadoPrimeiraClasse,
    #[serde(rename = "S2")]
    SoldadoSegundaClasse,
}

impl Rank {
    pub fn code(&self) -> &'static str {
        match self {
            Rank::Coronel => "CEL",
            Rank::TenenteCoronel => "TC",
            Rank::Major => "MAJ",
            Rank::Capitao => "CAP",
            Rank::PrimeiroTenente => "1T",
            Rank::SegundoTenente => "2T",
            Rank::Aspirante => "ASP",
            Rank::Suboficial => "SO",
            Rank::PrimeiroSargento => "1S",
            Rank::SegundoSargento => "2S",
            Rank::TerceiroSargento => "3S",
            Rank::Cabo => "CB",
            Rank::SoldadoPrimeiraClasse => "S1",
            Rank::SoldadoSegundaClasse => "S2",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Roster entry. `seniority` is the total-order key (lower = more senior);
/// it is nullable in storage and sorted last when null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Personnel {
    pub id: String,
    pub rank: Rank,
    pub name: String,
    pub seniority: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPersonnel {
    pub rank: Rank,
    pub name: String,
    pub seniority: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PersonnelPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<Rank>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// --- Attendance ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Other,
}

impl AttendanceStatus {
    /// Uppercase label used on rendered reports.
    pub fn display_label(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENTE",
            AttendanceStatus::Absent => "AUSENTE",
            AttendanceStatus::Late => "ATRASADO",
            AttendanceStatus::Other => "OUTRO",
        }
    }
}

/// One roll-call row. Records are historical: created once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub military_id: String,
    pub military_name: String,
    pub rank: Rank,
    pub call_type: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAttendanceRecord {
    pub military_id: String,
    pub military_name: String,
    pub rank: Rank,
    pub call_type: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification_id: Option<String>,
}

// --- Justification ---

/// Approved-absence window, boundary-inclusive on both ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Justification {
    pub id: String,
    pub military_id: String,
    pub military_name: String,
    pub reason: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewJustification {
    pub military_id: String,
    pub military_name: String,
    pub reason: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct JustificationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

// --- Flights ---

/// `military_ids` is stored as a JSON-encoded array of personnel ids inside a
/// single text field. Decode before use, encode before write, at every access
/// site; the stored shape is a wire-compat contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    pub id: String,
    pub flight_date: NaiveDate,
    pub flight_time: String,
    pub military_ids: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Flight {
    pub fn responsible_ids(&self) -> Vec<String> {
        decode_military_ids(&self.military_ids)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewFlight {
    pub flight_date: NaiveDate,
    pub flight_time: String,
    pub military_ids: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FlightPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub military_ids: Option<String>,
}

/// Lenient read: a malformed stored value is logged and surfaced as an empty
/// id list rather than failing the whole listing.
pub fn decode_military_ids(raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(ids) => ids,
        Err(e) => {
            warn!("Malformed military_ids value {:?}: {}. Treating as empty.", raw, e);
            Vec::new()
        }
    }
}

pub fn encode_military_ids(ids: &[String]) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| String::from("[]"))
}

// --- Events ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub event_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewEvent {
    pub title: String,
    pub event_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EventPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// --- Key checkout log ---

/// A key is considered "out" while `returned_at` is null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyLog {
    pub id: String,
    pub key_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub military_id: Option<String>,
    pub military_name: String,
    pub taken_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewKeyLog {
    pub key_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub military_id: Option<String>,
    pub military_name: String,
    pub taken_at: DateTime<Utc>,
}

// --- Notes ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewNote {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

// --- Dashboard-only domains ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermanenceEntry {
    pub id: String,
    pub military_id: String,
    pub military_name: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningAssignment {
    pub id: String,
    pub sector: String,
    pub military_name: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TiTicket {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_codes_round_trip_through_serde() {
        let encoded = serde_json::to_string(&Rank::TerceiroSargento).unwrap();
        assert_eq!(encoded, "\"3S\"");
        let decoded: Rank = serde_json::from_str("\"TC\"").unwrap();
        assert_eq!(decoded, Rank::TenenteCoronel);
        assert_eq!(Rank::Capitao.to_string(), "CAP");
    }

    #[test]
    fn attendance_status_uses_lowercase_wire_values() {
        let encoded = serde_json::to_string(&AttendanceStatus::Present).unwrap();
        assert_eq!(encoded, "\"present\"");
        let decoded: AttendanceStatus = serde_json::from_str("\"late\"").unwrap();
        assert_eq!(decoded, AttendanceStatus::Late);
        assert_eq!(AttendanceStatus::Absent.display_label(), "AUSENTE");
    }

    #[test]
    fn military_ids_round_trip() {
        let ids = vec!["a1".to_string(), "b2".to_string()];
        let encoded = encode_military_ids(&ids);
        assert_eq!(encoded, "[\"a1\",\"b2\"]");
        assert_eq!(decode_military_ids(&encoded), ids);
    }

    #[test]
    fn malformed_military_ids_reads_as_empty() {
        assert!(decode_military_ids("not json").is_empty());
        assert!(decode_military_ids("{\"a\":1}").is_empty());
        assert!(decode_military_ids("").is_empty());
    }

    #[test]
    fn empty_military_ids_encodes_as_empty_array() {
        assert_eq!(encode_military_ids(&[]), "[]");
        assert!(decode_military_ids("[]").is_empty());
    }
}
