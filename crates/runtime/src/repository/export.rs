//! CSV rendering of the player log.

use chrono::SecondsFormat;

use super::ledger::PlayerRecord;

pub const CSV_HEADER: &str = "Name,Phone,Email,Identifier,RegisteredAt";

/// Renders the header plus one line per record. Every field is quoted and
/// embedded quotes are doubled.
pub fn render_csv(records: &[PlayerRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_HEADER.to_string());

    for record in records {
        let registered_at = record
            .registered_at
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let fields = [
            record.name.as_str(),
            record.phone.as_str(),
            record.email.as_deref().unwrap_or(""),
            record.identifier.as_str(),
            registered_at.as_str(),
        ];
        let line = fields.iter().map(|f| quote(f)).collect::<Vec<_>>().join(",");
        lines.push(line);
    }

    lines.join("\n")
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
