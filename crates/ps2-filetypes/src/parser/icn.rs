use crate::ByteReader;

pub const ICON_ID: u32 = 0x010000;
pub const TEXTURE_WIDTH: usize = 128;
pub const TEXTURE_HEIGHT: usize = 128;
pub const TEXEL_COUNT: usize = TEXTURE_WIDTH * TEXTURE_HEIGHT;

const VERTEX_COORD_SIZE: usize = 8;
const TEXTURE_DATA_SIZE: usize = 8;
const FRAME_KEY_SIZE: usize = 8;
const ANIMATION_HEADER_SIZE: usize = 20;
const FRAME_DATA_SIZE: usize = 16;
const LAST_UNCOMPRESSED_TYPE: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconHeader {
    pub id: u32,
    pub animation_shapes: u32,
    pub texture_type: u32,
    pub unknown: u32,
    pub vertex_count: u32,
}

impl IconHeader {
    fn read(reader: &mut ByteReader) -> Option<Self> {
        Some(Self {
            id: reader.u32().ok()?,
            animation_shapes: reader.u32().ok()?,
            texture_type: reader.u32().ok()?,
            unknown: reader.u32().ok()?,
            vertex_count: reader.u32().ok()?,
        })
    }

    fn is_compressed(&self) -> bool {
        self.texture_type > LAST_UNCOMPRESSED_TYPE
    }
}

fn texel_to_rgba(texel: u16) -> [u8; 4] {
    [
        8 * (texel & 0x1F) as u8,
        8 * ((texel >> 5) & 0x1F) as u8,
        8 * ((texel >> 10) & 0x1F) as u8,
        0xFF,
    ]
}

/// Decodes the 128x128 texture of a PS2 icon model into RGBA8.
///
/// The model geometry and animation are skipped. Returns `None` for anything
/// that is not a well-formed icon.
pub fn decode_icon(data: &[u8]) -> Option<Vec<u8>> {
    let mut reader = ByteReader::new(data);
    let header = IconHeader::read(&mut reader)?;
    if header.id != ICON_ID || header.vertex_count % 3 != 0 {
        return None;
    }

    let shapes = usize::try_from(header.animation_shapes).ok()?;
    let per_vertex = shapes
        .checked_add(1)?
        .checked_mul(VERTEX_COORD_SIZE)?
        .checked_add(TEXTURE_DATA_SIZE)?;
    reader
        .skip(per_vertex.checked_mul(header.vertex_count as usize)?)
        .ok()?;

    let animation = reader.take(ANIMATION_HEADER_SIZE).ok()?;
    let frames = u32::from_le_bytes(animation[16..20].try_into().ok()?);
    for _ in 0..frames {
        let frame = reader.take(FRAME_DATA_SIZE).ok()?;
        let keys = u32::from_le_bytes(frame[4..8].try_into().ok()?) as usize;
        reader.skip(keys.checked_mul(FRAME_KEY_SIZE)?).ok()?;
    }

    let mut rgba = Vec::with_capacity(TEXEL_COUNT * 4);
    if header.is_compressed() {
        let _size = reader.u32().ok()?;
        let mut produced = 0;
        while produced < TEXEL_COUNT {
            let run = reader.u16().ok()?;
            if run & 0xFF00 == 0xFF00 {
                let literal = (0u16.wrapping_sub(run)) as usize;
                for _ in 0..literal.min(TEXEL_COUNT - produced) {
                    rgba.extend_from_slice(&texel_to_rgba(reader.u16().ok()?));
                }
                produced += literal.min(TEXEL_COUNT - produced);
            } else {
                let texel = texel_to_rgba(reader.u16().ok()?);
                let repeat = usize::from(run).min(TEXEL_COUNT - produced);
                for _ in 0..repeat {
                    rgba.extend_from_slice(&texel);
                }
                produced += repeat;
            }
        }
    } else {
        for _ in 0..TEXEL_COUNT {
            rgba.extend_from_slice(&texel_to_rgba(reader.u16().ok()?));
        }
    }

    Some(rgba)
}

#[cfg(test)]
pub(crate) fn sample_icon(texture_type: u32, texels: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    for value in [ICON_ID, 1, texture_type, 0, 3] {
        data.extend_from_slice(&value.to_le_bytes());
    }
    // Three vertices, each with one shape, a normal and texture data.
    data.extend_from_slice(&[0u8; 3 * 24]);
    let mut animation = [0u8; ANIMATION_HEADER_SIZE];
    animation[16] = 1;
    data.extend_from_slice(&animation);
    let mut frame = [0u8; FRAME_DATA_SIZE];
    frame[4] = 2;
    data.extend_from_slice(&frame);
    data.extend_from_slice(&[0u8; 2 * FRAME_KEY_SIZE]);
    data.extend_from_slice(texels);
    data
}
