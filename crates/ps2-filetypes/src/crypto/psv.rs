//! PSV signature generation.
//!
//! The PS3 checks a keyed SHA1 over the whole file. The 64-byte salt is
//! derived from the seed stored in the header with a per-platform AES
//! schedule.

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Block};
use sha1_smol::Sha1;
use tracing::debug;

use crate::{memxor, Error, Result};

pub const PSV_MAGIC: &[u8; 4] = b"\0VSP";
pub const SEED_OFFSET: usize = 0x08;
pub const SEED_SIZE: usize = 0x14;
pub const SIGNATURE_OFFSET: usize = 0x1C;
pub const SIGNATURE_SIZE: usize = 0x14;
pub const TYPE_OFFSET: usize = 0x3C;
pub const HEADER_SIZE: usize = 0x40;

pub const TYPE_PS1: u8 = 1;
pub const TYPE_PS2: u8 = 2;

const PS2_KEY: [u8; 16] = [
    0xFA, 0x72, 0xCE, 0xEF, 0x59, 0xB4, 0xD2, 0x98, 0x9F, 0x11, 0x19, 0x13, 0x28, 0x7F, 0x51, 0xC7,
];
const PS1_KEY: [u8; 16] = [
    0xAB, 0x5A, 0xBC, 0x9F, 0xC1, 0xF4, 0x9D, 0xE6, 0xA0, 0x51, 0xDB, 0xAE, 0xFA, 0x51, 0x88, 0x59,
];
const PSV_IV: [u8; 16] = [
    0xB3, 0x0F, 0xFE, 0xED, 0xB7, 0xDC, 0x5E, 0xB7, 0x13, 0x3D, 0xA6, 0x0D, 0x1B, 0x6B, 0x2C, 0xDC,
];
const LAID_PAID: [u8; 16] = [
    0x10, 0x70, 0x00, 0x00, 0x02, 0x00, 0x00, 0x01, 0x10, 0x70, 0x00, 0x03, 0xFF, 0x00, 0x00, 0x01,
];

const SALT_SIZE: usize = 0x40;

fn ps1_salt(seed: &[u8]) -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    let cipher = Aes128::new(&PS1_KEY.into());

    let mut block = *Block::from_slice(&seed[..16]);
    cipher.decrypt_block(&mut block);
    memxor(&block, &PSV_IV, &mut salt[..16]);

    let mut block = *Block::from_slice(&seed[..16]);
    cipher.encrypt_block(&mut block);
    let mut mask = [0xFFu8; 16];
    mask[..4].copy_from_slice(&seed[16..20]);
    memxor(&block, &mask, &mut salt[16..32]);

    salt
}

fn ps2_salt(seed: &[u8]) -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    salt[..SEED_SIZE].copy_from_slice(seed);

    let mut key = [0u8; 16];
    memxor(&LAID_PAID, &PS2_KEY, &mut key);
    let cipher = Aes128::new(&key.into());

    let mut prev = Block::from(PSV_IV);
    for chunk in salt.chunks_exact_mut(16) {
        let ciphertext = *Block::from_slice(chunk);
        let mut block = ciphertext;
        cipher.decrypt_block(&mut block);
        memxor(&block, &prev, chunk);
        prev = ciphertext;
    }

    salt
}

fn check_header(psv: &[u8]) -> Result<u8> {
    if psv.len() < HEADER_SIZE || &psv[..4] != PSV_MAGIC {
        return Err(Error::FormatMismatch("PSV"));
    }
    Ok(psv[TYPE_OFFSET])
}

/// Computes the signature `psv` should carry. The signature field itself is
/// hashed as zeroes, so the result does not depend on its current content.
pub fn compute_signature(psv: &[u8]) -> Result<[u8; SIGNATURE_SIZE]> {
    let save_type = check_header(psv)?;
    let seed = &psv[SEED_OFFSET..SEED_OFFSET + SEED_SIZE];

    let mut salt = match save_type {
        TYPE_PS1 => ps1_salt(seed),
        TYPE_PS2 => ps2_salt(seed),
        other => {
            return Err(Error::UnsupportedVariant(format!(
                "PSV save type {other:#04x}"
            )))
        }
    };
    salt[SEED_SIZE..].fill(0);

    for byte in salt.iter_mut() {
        *byte ^= 0x36;
    }
    let mut inner = Sha1::new();
    inner.update(&salt);
    inner.update(&psv[..SIGNATURE_OFFSET]);
    inner.update(&[0u8; SIGNATURE_SIZE]);
    inner.update(&psv[SIGNATURE_OFFSET + SIGNATURE_SIZE..]);
    let inner = inner.digest().bytes();

    // The second mask goes over the already masked salt.
    for byte in salt.iter_mut() {
        *byte ^= 0x6A;
    }
    let mut outer = Sha1::new();
    outer.update(&salt);
    outer.update(&inner);
    Ok(outer.digest().bytes())
}

/// Rewrites the signature field in place. On error `psv` is left untouched.
pub fn resign(psv: &mut [u8]) -> Result<()> {
    let signature = compute_signature(psv)?;
    psv[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_SIZE].copy_from_slice(&signature);
    debug!(
        "new PSV signature: {}",
        signature.iter().map(|b| format!("{b:02X}")).collect::<String>()
    );
    Ok(())
}

pub fn verify(psv: &[u8]) -> Result<bool> {
    let signature = compute_signature(psv)?;
    Ok(psv[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_SIZE] == signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(save_type: u8) -> Vec<u8> {
        let mut psv = vec![0u8; 0x100];
        psv[..4].copy_from_slice(PSV_MAGIC);
        psv[SEED_OFFSET..SEED_OFFSET + 19].copy_from_slice(b"www.bucanero.com.ar");
        psv[TYPE_OFFSET] = save_type;
        for (i, byte) in psv[HEADER_SIZE..].iter_mut().enumerate() {
            *byte = i as u8;
        }
        psv
    }

    #[test]
    fn known_signatures() {
        let ps1: [u8; SIGNATURE_SIZE] = [
            0x33, 0x14, 0xB2, 0xDB, 0x6F, 0x57, 0x42, 0x3D, 0x47, 0x94, 0xD2, 0xC7, 0x1A, 0xE3,
            0x8A, 0x49, 0x9E, 0x97, 0x25, 0x0E,
        ];
        let ps2: [u8; SIGNATURE_SIZE] = [
            0xD1, 0x31, 0xE7, 0x7E, 0x19, 0x3A, 0xEB, 0x70, 0xE4, 0x26, 0x6B, 0x7A, 0xEC, 0x66,
            0xD7, 0x51, 0xC1, 0x11, 0x36, 0x95,
        ];
        assert_eq!(compute_signature(&sample(TYPE_PS1)).unwrap(), ps1);
        assert_eq!(compute_signature(&sample(TYPE_PS2)).unwrap(), ps2);

        let mut psv = sample(TYPE_PS2);
        resign(&mut psv).unwrap();
        assert_eq!(&psv[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_SIZE], &ps2);
    }

    #[test]
    fn resign_is_idempotent() {
        for save_type in [TYPE_PS1, TYPE_PS2] {
            let mut psv = sample(save_type);
            resign(&mut psv).unwrap();
            let first = psv.clone();
            resign(&mut psv).unwrap();
            assert_eq!(psv, first);
            assert!(verify(&psv).unwrap());
            assert_ne!(&psv[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_SIZE], &[0u8; 20]);
        }
    }

    #[test]
    fn signature_covers_the_body() {
        let mut psv = sample(TYPE_PS2);
        resign(&mut psv).unwrap();
        psv[0x80] ^= 1;
        assert!(!verify(&psv).unwrap());
    }

    #[test]
    fn platforms_sign_differently() {
        let ps1 = compute_signature(&sample(TYPE_PS1)).unwrap();
        let mut ps2_input = sample(TYPE_PS1);
        ps2_input[TYPE_OFFSET] = TYPE_PS2;
        assert_ne!(ps1, compute_signature(&ps2_input).unwrap());
    }

    #[test]
    fn unknown_type_leaves_input_untouched() {
        let mut psv = sample(3);
        let before = psv.clone();
        assert!(matches!(
            resign(&mut psv),
            Err(Error::UnsupportedVariant(_))
        ));
        assert_eq!(psv, before);
    }

    #[test]
    fn rejects_other_magic() {
        let mut psv = sample(TYPE_PS2);
        psv[1] = b'X';
        assert!(resign(&mut psv).unwrap_err().is_format_mismatch());
        assert!(compute_signature(&[0u8; 8]).unwrap_err().is_format_mismatch());
    }
}
