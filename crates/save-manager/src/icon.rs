use memcard::MemcardIo;
use ps2_filetypes::{decode_icon, IconSys, ICON_SYS_FILE, TEXTURE_HEIGHT, TEXTURE_WIDTH};
use tracing::debug;

use crate::{Error, Result};

/// Decoded icon texture, RGBA8 rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconImage {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

/// Loads the list-view icon of a PS2 save. `Ok(None)` when the icon file is
/// missing or cannot be decoded.
pub fn load_icon(card: &dyn MemcardIo, dir: &str) -> Result<Option<IconImage>> {
    let icon_sys = card
        .read_file(&format!("{dir}/{ICON_SYS_FILE}"))
        .map_err(|_| Error::MissingIconSys(dir.to_string()))?;
    let icon_sys = IconSys::new(&icon_sys)?;

    let Ok(icon) = card.read_file(&format!("{dir}/{}", icon_sys.icon_file)) else {
        debug!("{dir}: icon {} not found", icon_sys.icon_file);
        return Ok(None);
    };
    Ok(decode_icon(&icon).map(|rgba| IconImage {
        width: TEXTURE_WIDTH,
        height: TEXTURE_HEIGHT,
        rgba,
    }))
}
