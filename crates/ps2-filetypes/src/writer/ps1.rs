use crate::{Ps1Save, MCS_HEADER_SIZE};

const MCS_SAVE_SIZE_OFFSETS: [usize; 2] = [4, 56];
const MCS_NAME_OFFSET: usize = 0x0A;

pub struct MCSWriter {
    save: Ps1Save,
}

impl MCSWriter {
    pub fn new(save: Ps1Save) -> Self {
        Self { save }
    }

    pub fn file_name(&self) -> String {
        format!("{}.mcs", self.save.name())
    }

    /// 128-byte directory frame followed by the save blocks. The last header
    /// byte is the XOR of the other 127.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut header = [0u8; MCS_HEADER_SIZE];
        header[0] = b'Q';
        let size = (self.save.data.len() as u32).to_le_bytes();
        for offset in MCS_SAVE_SIZE_OFFSETS {
            header[offset..offset + 4].copy_from_slice(&size);
        }
        header[8] = 0xFF;
        header[9] = 0xFF;
        header[MCS_NAME_OFFSET..MCS_NAME_OFFSET + self.save.name.len()]
            .copy_from_slice(&self.save.name);
        header[MCS_HEADER_SIZE - 1] = header[..MCS_HEADER_SIZE - 1]
            .iter()
            .fold(0, |acc, byte| acc ^ byte);

        let mut out = Vec::with_capacity(MCS_HEADER_SIZE + self.save.data.len());
        out.extend_from_slice(&header);
        out.extend_from_slice(&self.save.data);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MCS;

    #[test]
    fn header_checksum_and_round_trip() {
        let save = Ps1Save::new("BESLES-01234GAME", b"SC\x13\x01blocks".to_vec());
        let writer = MCSWriter::new(save.clone());
        assert_eq!(writer.file_name(), "BESLES-01234GAME.mcs");

        let bytes = writer.to_bytes();
        assert_eq!(bytes.len(), MCS_HEADER_SIZE + 10);
        assert_eq!(&bytes[4..8], &10u32.to_le_bytes());
        assert_eq!(&bytes[56..60], &10u32.to_le_bytes());
        assert_eq!(&bytes[8..10], &[0xFF, 0xFF]);
        assert_eq!(bytes[..MCS_HEADER_SIZE].iter().fold(0, |acc, b| acc ^ b), 0);

        assert_eq!(MCS::new(&bytes).unwrap().save, save);
    }
}
