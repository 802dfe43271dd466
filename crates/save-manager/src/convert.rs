//! File-to-file conversions that never touch a memory card.

use std::path::{Path, PathBuf};

use ps2_filetypes::crypto::psv;
use ps2_filetypes::{MCSWriter, PSVWriter, PsvContent, MCS, PSV, PSX};
use tracing::info;

use crate::Result;

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn write_psv(writer: PSVWriter, out_dir: &Path) -> Result<PathBuf> {
    let dest = out_dir.join(writer.file_name());
    std::fs::write(&dest, writer.to_bytes()?)?;
    info!("wrote {}", dest.display());
    Ok(dest)
}

/// `.mcs` to a signed PS1 `.PSV` in `out_dir`.
pub fn mcs_to_psv(src: &Path, out_dir: &Path) -> Result<PathBuf> {
    let mcs = MCS::new(&std::fs::read(src)?)?;
    write_psv(PSVWriter::ps1(mcs.save), out_dir)
}

/// `.psx` to a signed PS1 `.PSV` in `out_dir`.
pub fn psx_to_psv(src: &Path, out_dir: &Path) -> Result<PathBuf> {
    let psx = PSX::new(&std::fs::read(src)?)?;
    write_psv(PSVWriter::ps1(psx.save), out_dir)
}

/// PS1 `.PSV` to `.mcs`. The output keeps the source name with `.mcs`
/// appended.
pub fn psv_to_mcs(src: &Path, out_dir: &Path) -> Result<PathBuf> {
    let psv = PSV::new(&std::fs::read(src)?)?;
    let PsvContent::Ps1(save) = psv.content else {
        return Err(ps2_filetypes::Error::UnsupportedVariant(
            "PS2 PSV cannot be converted to MCS".to_string(),
        )
        .into());
    };

    let dest = out_dir.join(format!("{}.mcs", file_name(src)));
    std::fs::write(&dest, MCSWriter::new(save).to_bytes())?;
    info!("wrote {}", dest.display());
    Ok(dest)
}

/// Recomputes the signature of a PSV file in place.
pub fn resign_file(path: &Path) -> Result<()> {
    let mut data = std::fs::read(path)?;
    psv::resign(&mut data)?;
    std::fs::write(path, &data)?;
    info!("re-signed {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ps2_filetypes::{Ps1Save, MCS_HEADER_SIZE, PSX_HEADER_SIZE};
    use tempfile::tempdir;

    fn save() -> Ps1Save {
        Ps1Save::new("BASCUS-94228", b"SC\x11\x01ps1 blocks".to_vec())
    }

    #[test]
    fn mcs_psv_mcs() {
        let tempdir = tempdir().expect("temp dir");
        let mcs_path = tempdir.path().join("in.mcs");
        let original = MCSWriter::new(save()).to_bytes();
        std::fs::write(&mcs_path, &original).expect("write mcs");

        let psv_path = mcs_to_psv(&mcs_path, tempdir.path()).expect("mcs to psv");
        assert_eq!(psv_path.file_name().unwrap(), "BASCUS-94228.PSV");
        assert!(psv::verify(&std::fs::read(&psv_path).unwrap()).unwrap());

        let back = psv_to_mcs(&psv_path, tempdir.path()).expect("psv to mcs");
        assert_eq!(back.file_name().unwrap(), "BASCUS-94228.PSV.mcs");
        assert_eq!(std::fs::read(&back).unwrap(), original);
    }

    #[test]
    fn psx_to_psv_keeps_payload() {
        let tempdir = tempdir().expect("temp dir");
        let mut psx = vec![0u8; PSX_HEADER_SIZE];
        psx[..12].copy_from_slice(b"BASCUS-94228");
        psx.extend_from_slice(&save().data);
        let psx_path = tempdir.path().join("in.psx");
        std::fs::write(&psx_path, &psx).expect("write psx");

        let psv_path = psx_to_psv(&psx_path, tempdir.path()).expect("psx to psv");
        let mcs_path = psv_to_mcs(&psv_path, tempdir.path()).expect("psv to mcs");
        let mcs = std::fs::read(mcs_path).unwrap();
        assert_eq!(&mcs[MCS_HEADER_SIZE..], &save().data[..]);
    }

    #[test]
    fn resign_fixes_a_damaged_signature() {
        let tempdir = tempdir().expect("temp dir");
        let path = tempdir.path().join("save.PSV");
        let mut bytes = PSVWriter::ps1(save()).to_bytes().unwrap();
        bytes[0x1C] ^= 0xFF;
        std::fs::write(&path, &bytes).expect("write psv");
        assert!(!psv::verify(&bytes).unwrap());

        resign_file(&path).expect("resign");
        assert!(psv::verify(&std::fs::read(&path).unwrap()).unwrap());

        std::fs::write(&path, b"not a psv").expect("write junk");
        assert!(resign_file(&path).unwrap_err().is_format_mismatch());
    }
}
