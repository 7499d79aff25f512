// src/attendance.rs

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::justification::JustificationIndex;
use crate::model::{AttendanceRecord, AttendanceStatus, Personnel, Rank};

/// Literal label shown for a justified absence. The justification overrides
/// the displayed status but never the raw-status tallies.
pub const JUSTIFIED_LABEL: &str = "JUSTIFICADO";

/// One report row per roster member, in roster order.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceLine {
    pub rank: Rank,
    pub name: String,
    /// Displayed status label (JUSTIFICADO when a window covers the date).
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_status: Option<AttendanceStatus>,
    pub is_justified: bool,
    pub observation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub justified: usize,
    pub percentage: u32,
}

/// round(present / total * 100), with 0 for an empty roster.
pub fn presence_percentage(present: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((present as f64 / total as f64) * 100.0).round() as u32
}

/// Joins the roster against the day's attendance rows and the justification
/// windows. The caller fetches the inputs (records already filtered by date
/// and, when given, call type) and sorts the roster; a member with no record
/// for the day is treated as absent here, which intentionally differs from
/// the live dashboard counter (see dashboard::attendance_counts).
pub fn aggregate(
    roster: &[Personnel],
    records: &[AttendanceRecord],
    justifications: &JustificationIndex,
    date: NaiveDate,
) -> (Vec<AttendanceLine>, AttendanceSummary) {
    let by_member: HashMap<&str, &AttendanceRecord> = records
        .iter()
        .map(|record| (record.military_id.as_str(), record))
        .collect();

    let mut lines = Vec::with_capacity(roster.len());
    let mut present = 0usize;
    let mut absent = 0usize;
    let mut justified = 0usize;

    for member in roster {
        let raw_status = by_member.get(member.id.as_str()).map(|record| record.status);
        let covering = justifications.covering(&member.id, date);
        let is_justified = covering.is_some();

        if raw_status == Some(AttendanceStatus::Present) {
            present += 1;
        }
        let raw_absent = matches!(raw_status, None | Some(AttendanceStatus::Absent));
        if raw_absent && !is_justified {
            absent += 1;
        }
        if is_justified {
            justified += 1;
        }

        let status = if is_justified {
            JUSTIFIED_LABEL.to_string()
        } else {
            raw_status
                .map(|s| s.display_label())
                .unwrap_or(AttendanceStatus::Absent.display_label())
                .to_string()
        };
        let observation = match covering {
            Some(justification) => {
                let reason = justification.reason.trim();
                if reason.is_empty() {
                    JUSTIFIED_LABEL.to_string()
                } else {
                    reason.to_string()
                }
            }
            None => String::new(),
        };

        lines.push(AttendanceLine {
            rank: member.rank,
            name: member.name.clone(),
            status,
            raw_status,
            is_justified,
            observation,
        });
    }

    let summary = AttendanceSummary {
        total: roster.len(),
        present,
        absent,
        justified,
        percentage: presence_percentage(present, roster.len()),
    };
    (lines, summary)
}
