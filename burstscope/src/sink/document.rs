//! Document-mode scaffolding
//!
//! The visualization shell is a static HTML asset checked in verbatim; the
//! sink only knows where its embedding region begins and ends. The asset
//! carries a single placeholder line, replaced at session open by the open
//! marker; burst records stream in as plain log lines and the close marker
//! plus the remainder of the asset follow at session close.

use crate::domain::TracerError;

/// Visualization shell, consumed verbatim.
const TEMPLATE: &str = include_str!("../../assets/burst_viewer.html");

/// Placeholder line in the template where the embedding region goes.
const PLACEHOLDER: &str = "@@BURSTS@@\n";

/// Opens the embedding region. Records between the markers are the same
/// lines log mode emits; `text/plain` keeps the browser from interpreting
/// them.
pub const OPEN_MARKER: &str = "<script type=\"text/plain\" id=\"burst-data\">\n";

/// Closes the embedding region. The trailing comment keeps the marker
/// distinct from the shell's own script tags.
pub const CLOSE_MARKER: &str = "</script><!-- /burst-data -->\n";

/// Split the shell into the part written before any bursts (header plus open
/// marker) and the part written after the last one (close marker plus
/// footer).
///
/// # Errors
///
/// [`TracerError::TemplateMalformed`] when the placeholder is missing from
/// the asset.
pub fn split_template() -> Result<(String, String), TracerError> {
    let (head, tail) = TEMPLATE.split_once(PLACEHOLDER).ok_or(TracerError::TemplateMalformed)?;
    Ok((format!("{head}{OPEN_MARKER}"), format!("{CLOSE_MARKER}{tail}")))
}
