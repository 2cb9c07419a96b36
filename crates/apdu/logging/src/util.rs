//! Formatting helpers shared by the trace lines

use std::time::Duration;

use apdu_trace_core::Error;

use crate::config::ErrorTranslator;

/// Marker logged for failures the translator has no message for
const FAILURE_MARKER: &str = "Exception";

/// Format an exchange duration: `950ms` below one second, `1s500ms` above
pub fn format_elapsed(elapsed: Duration) -> String {
    let ms = elapsed.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{}s{}ms", ms / 1000, ms % 1000)
    }
}

/// Protocol as shown in connect lines, `*` reads `T=*`
pub(crate) fn display_protocol(protocol: &str) -> &str {
    if protocol == "*" { "T=*" } else { protocol }
}

/// Message logged for a failed call
pub(crate) fn describe_error(translator: ErrorTranslator, error: &Error) -> String {
    translator(error).unwrap_or_else(|| FAILURE_MARKER.to_string())
}
