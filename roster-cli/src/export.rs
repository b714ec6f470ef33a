//! CSV and ICS renderings of a solution bundle.
//!
//! Both formats are regenerated purely from the bundle; no additional
//! context is needed. CSV is one row per event with assignees pipe-joined;
//! ICS is one VEVENT per assignment with the assignees in DESCRIPTION and
//! the UID derived from the event id.

use chrono::Utc;
use roster_core::models::SolutionBundle;

pub fn to_csv(bundle: &SolutionBundle) -> String {
    let mut out = String::from(
        "event_id,event_type,start,end,assignees,assignee_ids,resource_id,team_ids\n",
    );
    for assignment in &bundle.assignments {
        let row = [
            assignment.event_id.clone(),
            assignment.event_type.clone(),
            assignment.start.to_rfc3339(),
            assignment.end.to_rfc3339(),
            assignment.assignees.join("|"),
            assignment.assignee_ids.join("|"),
            assignment.resource_id.clone().unwrap_or_default(),
            assignment.team_ids.join("|"),
        ];
        let escaped: Vec<String> = row.iter().map(|field| csv_field(field)).collect();
        out.push_str(&escaped.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn to_ics(bundle: &SolutionBundle) -> String {
    let stamp = bundle.meta.generated_at.format("%Y%m%dT%H%M%SZ");
    let mut out = String::new();
    out.push_str("BEGIN:VCALENDAR\r\n");
    out.push_str("VERSION:2.0\r\n");
    out.push_str("PRODID:-//roster//roster-cli//EN\r\n");
    for assignment in &bundle.assignments {
        out.push_str("BEGIN:VEVENT\r\n");
        out.push_str(&format!("UID:{}@roster\r\n", assignment.event_id));
        out.push_str(&format!("DTSTAMP:{}\r\n", stamp));
        out.push_str(&format!(
            "DTSTART:{}\r\n",
            assignment
                .start
                .with_timezone(&Utc)
                .format("%Y%m%dT%H%M%SZ")
        ));
        out.push_str(&format!(
            "DTEND:{}\r\n",
            assignment.end.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ")
        ));
        out.push_str(&format!(
            "SUMMARY:{}\r\n",
            ics_text(&format!("{} {}", assignment.event_type, assignment.event_id))
        ));
        out.push_str(&format!(
            "DESCRIPTION:{}\r\n",
            ics_text(&assignment.assignees.join(", "))
        ));
        out.push_str("END:VEVENT\r\n");
    }
    out.push_str("END:VCALENDAR\r\n");
    out
}

fn ics_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}
