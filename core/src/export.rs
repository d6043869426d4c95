//! Two-column tabular export of ranked keywords.

use crate::error::ExportError;
use crate::rank::RankedKeyword;
use std::io::Write;

pub const KEYWORD_HEADER: &str = "Keyword";
pub const CONFIDENCE_HEADER: &str = "Confidence (%)";

/// Display form of a confidence, e.g. `33.33%`.
pub fn format_confidence(confidence: f64) -> String {
    format!("{confidence:.2}%")
}

pub fn write_csv<W: Write>(keywords: &[RankedKeyword], writer: W) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([KEYWORD_HEADER, CONFIDENCE_HEADER])?;
    for k in keywords {
        wtr.write_record([k.term.as_str(), format_confidence(k.confidence).as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_csv_string(keywords: &[RankedKeyword]) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_csv(keywords, &mut buf)?;
    String::from_utf8(buf).map_err(|_| ExportError::Utf8)
}
