// src/dashboard.rs
//
// Per-domain dashboard counters. Each endpoint fetches its domain's full row
// set and recomputes from scratch on every call; nothing is cached.

use chrono::NaiveDate;
use serde::Serialize;

use crate::justification::{window_covers, JustificationIndex};
use crate::model::{
    AttendanceRecord, AttendanceStatus, CleaningAssignment, Event, Flight, Justification, KeyLog,
    Note, PermanenceEntry, Personnel, TiTicket,
};

pub const TI_TICKET_OPEN_STATUS: &str = "open";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttendanceCounts {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub justified: usize,
    pub percentage: u32,
}

/// Live dashboard counter for a day's attendance.
///
/// Counts explicit records only: a roster member with no record for the day
/// is not tallied as absent here. The report aggregator does count such
/// members as absent; the two interpretations are distinct on purpose and
/// must not be unified.
pub fn attendance_counts(
    roster: &[Personnel],
    records: &[AttendanceRecord],
    justifications: &JustificationIndex,
    date: NaiveDate,
) -> AttendanceCounts {
    let total = roster.len();
    let present = records
        .iter()
        .filter(|r| r.status == AttendanceStatus::Present)
        .count();
    let absent = records
        .iter()
        .filter(|r| r.status == AttendanceStatus::Absent && !justifications.is_covered(&r.military_id, date))
        .count();
    let justified = roster
        .iter()
        .filter(|member| justifications.is_covered(&member.id, date))
        .count();
    AttendanceCounts {
        total,
        present,
        absent,
        justified,
        percentage: crate::attendance::presence_percentage(present, total),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlightCounts {
    pub total: usize,
    pub upcoming: usize,
}

pub fn flight_counts(flights: &[Flight], today: NaiveDate) -> FlightCounts {
    FlightCounts {
        total: flights.len(),
        upcoming: flights.iter().filter(|f| f.flight_date >= today).count(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventCounts {
    pub total: usize,
    pub upcoming: usize,
}

pub fn event_counts(events: &[Event], today: NaiveDate) -> EventCounts {
    EventCounts {
        total: events.len(),
        upcoming: events.iter().filter(|e| e.event_date >= today).count(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JustificationCounts {
    pub total: usize,
    pub active: usize,
}

pub fn justification_counts(
    justifications: &[Justification],
    today: NaiveDate,
) -> JustificationCounts {
    JustificationCounts {
        total: justifications.len(),
        active: justifications
            .iter()
            .filter(|j| window_covers(j, today))
            .count(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyCounts {
    pub total: usize,
    pub checked_out: usize,
}

pub fn key_counts(keys: &[KeyLog]) -> KeyCounts {
    KeyCounts {
        total: keys.len(),
        checked_out: keys.iter().filter(|k| k.returned_at.is_none()).count(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NoteCounts {
    pub total: usize,
}

pub fn note_counts(notes: &[Note]) -> NoteCounts {
    NoteCounts { total: notes.len() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermanenceCounts {
    pub total: usize,
    pub today: usize,
}

pub fn permanence_counts(entries: &[PermanenceEntry], today: NaiveDate) -> PermanenceCounts {
    PermanenceCounts {
        total: entries.len(),
        today: entries.iter().filter(|e| e.date == today).count(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleaningCounts {
    pub total: usize,
    pub today: usize,
}

pub fn cleaning_counts(assignments: &[CleaningAssignment], today: NaiveDate) -> CleaningCounts {
    CleaningCounts {
        total: assignments.len(),
        today: assignments.iter().filter(|a| a.date == today).count(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TiTicketCounts {
    pub total: usize,
    pub open: usize,
}

pub fn ti_ticket_counts(tickets: &[TiTicket]) -> TiTicketCounts {
    TiTicketCounts {
        total: tickets.len(),
        open: tickets
            .iter()
            .filter(|t| t.status.eq_ignore_ascii_case(TI_TICKET_OPEN_STATUS))
            .count(),
    }
}
