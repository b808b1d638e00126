/// Quotes a free-text field when it would otherwise break the row.
pub fn field(value: &str) -> std::borrow::Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        std::borrow::Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        std::borrow::Cow::Borrowed(value)
    }
}

/// Seconds with millisecond resolution, as written to every timestamp column.
pub fn seconds(value: f64) -> String {
    format!("{value:.3}")
}
