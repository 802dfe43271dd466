//! Minimal Shift-JIS folding for save titles.
//!
//! Titles in `icon.sys` and PSV headers are stored as full-width Shift-JIS.
//! Full-width letters, digits and common punctuation fold to ASCII; anything
//! else is passed through as raw bytes and decoded lossily.

const REPLACEMENT_TABLE: &[u8; 111] = b" ,.,..:;?!\"*'`*^\
-_????????*---/\\\
~||--''\"\"()()[]{\
}<><>[][][]+-+X?\
-==<><>????*'\"CY\
$c&%#&*@S*******\
*******T><^_'='";

pub fn to_ascii(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    let data = &data[..end];
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let lead = data[i];
        if lead < 0x80 || i + 1 == data.len() {
            out.push(lead);
            i += 1;
            continue;
        }

        let ch = u16::from_be_bytes([lead, data[i + 1]]);
        let low = data[i + 1];
        match ch {
            0x8260..=0x8279 | 0x824F..=0x8258 => out.push(low - 0x1F),
            0x8281..=0x829A => out.push(low - 0x20),
            0x8140..=0x81AC => {
                let index = usize::from(low - 0x40);
                out.push(REPLACEMENT_TABLE.get(index).copied().unwrap_or(b'?'));
            }
            _ => out.extend_from_slice(&data[i..i + 2]),
        }
        i += 2;
    }

    String::from_utf8_lossy(&out).into_owned()
}
