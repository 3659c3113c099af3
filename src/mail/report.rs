//! Plain-text and HTML rendering of a submission
//!
//! A [`Report`] is a labeled list of values. It renders to a "Label: value"
//! text block and to a two-column HTML table. Rendering is pure: the same
//! report always yields byte-identical output.

/// Shown in place of an absent optional value
pub const NOT_PROVIDED: &str = "Not provided";

const CELL_LABEL_STYLE: &str =
    "padding:8px 12px;font-weight:bold;border:1px solid #e5e7eb;background:#f9fafb;";
const CELL_VALUE_STYLE: &str = "padding:8px 12px;border:1px solid #e5e7eb;";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub label: &'static str,
    pub value: Option<String>,
}

impl Row {
    pub fn new(label: &'static str, value: Option<String>) -> Self {
        Self { label, value }
    }

    fn value(&self) -> &str {
        self.value.as_deref().unwrap_or(NOT_PROVIDED)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Heading of the HTML table
    pub heading: &'static str,
    /// First line of the text body
    pub text_title: &'static str,
    /// `max-width` of the HTML table, in pixels
    pub max_width: u16,
    pub rows: Vec<Row>,
    /// Long-form value printed after a blank line in text, last table row in HTML
    pub body: Option<(&'static str, String)>,
}

impl Report {
    pub fn new(heading: &'static str, text_title: &'static str, max_width: u16) -> Self {
        Self {
            heading,
            text_title,
            max_width,
            rows: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn row(mut self, label: &'static str, value: Option<String>) -> Self {
        self.rows.push(Row::new(label, value));
        self
    }

    #[must_use]
    pub fn body(mut self, label: &'static str, value: String) -> Self {
        self.body = Some((label, value));
        self
    }

    pub fn to_text(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows.len() + 4);
        lines.push(self.text_title.to_string());
        lines.extend(
            self.rows
                .iter()
                .map(|row| format!("{}: {}", row.label, row.value())),
        );
        if let Some((label, value)) = &self.body {
            lines.push(String::new());
            lines.push(format!("{label}:"));
            lines.push(value.clone());
        }
        lines.join("\n")
    }

    pub fn to_html(&self) -> String {
        let mut table_rows: String = self
            .rows
            .iter()
            .map(|row| html_row(row.label, row.value()))
            .collect();
        if let Some((label, value)) = &self.body {
            table_rows.push_str(&html_row(label, value));
        }

        format!(
            "<div style=\"font-family:Arial,sans-serif;font-size:14px;color:#111827;\">\n  \
             <h2 style=\"margin-bottom:16px;\">{}</h2>\n  \
             <table style=\"border-collapse:collapse;border:1px solid #e5e7eb;width:100%;max-width:{}px;\">{}</table>\n\
             </div>",
            escape_html(self.heading),
            self.max_width,
            table_rows,
        )
    }
}

fn html_row(label: &str, value: &str) -> String {
    format!(
        "<tr>\n  <td style=\"{CELL_LABEL_STYLE}\">{}</td>\n  <td style=\"{CELL_VALUE_STYLE}\">{}</td>\n</tr>",
        escape_html(label),
        escape_html(value).replace('\n', "<br/>"),
    )
}

/// Escape the characters that are significant in HTML text and attributes
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
