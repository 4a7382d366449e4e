//! Plain-text table rendering for list results.

use serde_json::Value as JsonValue;

/// Columns shown first when present, in this order. Other keys follow alphabetically.
const LEADING_COLUMNS: &[&str] = &["id", "name", "sku", "productName", "movementType", "quantity", "stockQuantity"];

/// Render a JSON array of objects as an aligned table.
///
/// Anything else (a single object, scalars) is pretty-printed JSON.
pub fn render(value: &JsonValue) -> String {
    let Some(rows) = value.as_array() else {
        return serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    };
    if rows.is_empty() {
        return "(no rows)".to_string();
    }

    let columns = columns(rows);
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| columns.iter().map(|c| cell(row.get(c.as_str()))).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    out.push_str(&line(&columns, &widths));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &cells {
        out.push('\n');
        out.push_str(&line(row, &widths));
    }
    out
}

fn columns(rows: &[JsonValue]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for row in rows {
        if let Some(obj) = row.as_object() {
            for k in obj.keys() {
                if !keys.contains(k) {
                    keys.push(k.clone());
                }
            }
        }
    }
    if keys.is_empty() {
        return vec!["value".to_string()];
    }

    let rank = |k: &String| {
        LEADING_COLUMNS
            .iter()
            .position(|c| *c == k.as_str())
            .unwrap_or(LEADING_COLUMNS.len())
    };
    keys.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.cmp(b)));
    keys
}

fn cell(value: Option<&JsonValue>) -> String {
    match value {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn line(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(c, &w)| format!("{c:<w$}"))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}
