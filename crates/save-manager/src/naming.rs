use chrono::NaiveDateTime;

use crate::SaveFormat;

/// Short product code shown for a save folder: `BASLUS-21050SAVE` gives
/// `SLUS21050`. Names shorter than 12 characters are used from the start.
pub fn title_id(dir_name: &str) -> String {
    let start = if dir_name.len() < 12 { 0 } else { 2 };
    let mut id: String = dir_name.chars().skip(start).take(10).collect();
    if id.len() == 10 && id.as_bytes()[4] == b'-' {
        id.remove(4);
    }
    id
}

/// `{title}_{YYYY-MM-DD}_{HHMMSS}.{ext}`. Callers pass UTC time.
pub fn export_file_name(title: &str, format: SaveFormat, timestamp: NaiveDateTime) -> String {
    let title: String = title
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!(
        "{title}_{}.{}",
        timestamp.format("%Y-%m-%d_%H%M%S"),
        format.extension()
    )
}
