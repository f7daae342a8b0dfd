//! Reference tables of the operator registry.

use crate::operator::{Operator, OperatorKind, registry};

const HEADERS: [&str; 6] = ["Keyword", "SQL", "Kind", "Filter template", "SQL template", "Notes"];

/// One row per operator. Whitespace and grouping entries are left out; unimplemented
/// operators only when `include_unimplemented` is set.
pub fn to_markdown(include_unimplemented: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!("| {} |\n", HEADERS.join(" | ")));
    out.push_str(&format!("|{}\n", "---|".repeat(HEADERS.len())));

    for operator in documented(include_unimplemented) {
        let cells: Vec<String> = row(operator)
            .iter()
            .map(|cell| format!("`{}`", cell).replace("``", "").replace('|', "\\|"))
            .collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out
}

/// All operators, implemented or not, as an HTML table.
pub fn to_html() -> String {
    let mut out = String::from("<table>\n  <tr>");
    for header in HEADERS {
        out.push_str(&format!("<th>{}</th>", header));
    }
    out.push_str("</tr>\n");

    for operator in documented(true) {
        out.push_str("  <tr>");
        for cell in row(operator) {
            out.push_str(&format!("<td>{}</td>", escape_html(&cell)));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
    out
}

fn documented(include_unimplemented: bool) -> impl Iterator<Item = &'static Operator> {
    registry().operators().iter().filter(move |operator| {
        !matches!(operator.kind(), OperatorKind::Whitespace | OperatorKind::Grouping)
            && (include_unimplemented || operator.is_implemented())
    })
}

fn row(operator: &Operator) -> [String; 6] {
    let templates = operator.base_templates();
    let (filter, sql) = match operator.overload_templates() {
        Some(overload) => (
            format!("{} / {}", templates.filter, overload.filter),
            format!("{} / {}", templates.sql, overload.sql),
        ),
        None => (templates.filter.to_string(), templates.sql.to_string()),
    };
    let notes = match operator.unimplemented_reason() {
        Some(reason) => format!("not implemented: {}", reason),
        None => String::new(),
    };

    [
        operator.keyword().to_string(),
        operator.sql().to_string(),
        operator.kind().to_string(),
        filter,
        sql,
        notes,
    ]
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
