//! Progress reporting: byte-based bars over export files.

use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;

pub fn make_progress_bar_labeled(total_bytes: u64, label: Option<&str>) -> ProgressBar {
    let pb = ProgressBar::new(total_bytes);
    let style = ProgressStyle::with_template(
        "{spinner:.green} {msg} {bytes:>10}/{total_bytes:<10} [{bar:.cyan/blue}] {percent:>3}%  \
         {bytes_per_sec}  elapsed: {elapsed_precise}  eta: {eta_precise}"
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ");
    pb.set_style(style);
    if let Some(msg) = label {
        pb.set_message(msg.to_string());
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// On-disk size of an input file, 0 if it cannot be stat'ed.
pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
