//! User-facing text for recoverable data problems.

use fm_data::DuplicateFlow;

use crate::config::Config;

/// Longest list of ids shown in one message.
pub const MAX_NUM_OF_IDS_IN_ERROR: usize = 100;

/// Warning about summed duplicate flows, or `None` when there is nothing to
/// report or `ignore.errors` is set.
pub fn duplicate_flows_message(duplicates: &[DuplicateFlow], config: &Config) -> Option<String> {
    if duplicates.is_empty() || config.ignore_errors() {
        return None;
    }

    let shown = duplicates.len().min(MAX_NUM_OF_IDS_IN_ERROR);
    let pairs: Vec<String> = duplicates[..shown]
        .iter()
        .map(|d| format!("{} → {}", d.origin, d.dest))
        .collect();
    let mut message = String::from(
        "The following flows (origin → dest pairs) were encountered more than once in the dataset: ",
    );
    message.push_str(&pairs.join(", "));
    if duplicates.len() > shown {
        message.push_str(&format!(" … and {} others", duplicates.len() - shown));
    }
    message.push_str(". Their counts were summed up.");
    Some(message)
}
