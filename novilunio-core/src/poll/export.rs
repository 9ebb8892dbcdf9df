//! CSV export of a poll report.
//!
//! Every cell is double-quoted:
//!
//! ```text
//! "OPZIONE","VOTI","MAGGIORANZA","QUORUM"
//! "<answer>","<votes>","SI|NO",""
//! "","","",""
//! "HANNO VOTATO","<total>","su <eligible>","SI|NO"
//! ```

use std::fs;
use std::path::PathBuf;

use tracing::info;

use super::record::PollId;
use super::report::PollReport;
use crate::config::DataDir;
use crate::store::StoreError;

/// Longest question slug kept in a file name, in bytes.
const SLUG_MAX_BYTES: usize = 150;

/// `poll_<id>_<slug>.csv`, where the slug keeps letters, digits, `-` and `_`
/// of the question, maps everything else to `-` and stops before
/// [`SLUG_MAX_BYTES`].
pub fn csv_file_name(id: PollId, question: &str) -> String {
    let mut slug = String::new();
    for c in question.trim().chars() {
        let c = if c.is_alphanumeric() || c == '-' || c == '_' {
            c
        } else {
            '-'
        };
        if slug.len() + c.len_utf8() > SLUG_MAX_BYTES {
            break;
        }
        slug.push(c);
    }
    format!("poll_{id}_{slug}.csv")
}

pub fn render_csv(report: &PollReport) -> String {
    let mut out = String::new();
    push_row(&mut out, &["OPZIONE", "VOTI", "MAGGIORANZA", "QUORUM"]);
    for option in &report.options {
        push_row(
            &mut out,
            &[
                option.text.as_str(),
                option.votes.to_string().as_str(),
                yes_no(option.majority),
                "",
            ],
        );
    }
    push_row(&mut out, &["", "", "", ""]);
    push_row(
        &mut out,
        &[
            "HANNO VOTATO",
            report.total_votes.to_string().as_str(),
            format!("su {}", report.eligible).as_str(),
            yes_no(report.quorum_reached),
        ],
    );
    out
}

/// Write the report into the data directory and return the file path.
pub fn write_csv(data_dir: &DataDir, report: &PollReport) -> Result<PathBuf, StoreError> {
    data_dir.ensure()?;
    let path = data_dir.join(csv_file_name(report.id, &report.question));
    fs::write(&path, render_csv(report)).map_err(|source| StoreError::Io {
        path: path.clone(),
        source,
    })?;
    info!(poll_id = report.id, path = %path.display(), "poll exported");
    Ok(path)
}

fn yes_no(value: bool) -> &'static str {
    if value { "SI" } else { "NO" }
}

fn push_row(out: &mut String, cells: &[&str]) {
    let row = cells
        .iter()
        .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&row);
    out.push('\n');
}
