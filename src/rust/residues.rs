use crate::errors::{MapError, MapResult};

/// The 20 standard amino acids
pub const STANDARD_AA: [u8; 20] = [
    b'A', b'C', b'D', b'E', b'F', b'G', b'H', b'I', b'K', b'L', b'M', b'N', b'P', b'Q', b'R', b'S',
    b'T', b'V', b'W', b'Y',
];

/// Unknown, selenocysteine and pyrrolysine
pub const SPECIAL_AA: [u8; 3] = [b'X', b'U', b'O'];

/// Ambiguity codes: B (D/N), Z (E/Q), J (I/L)
pub const AMBIGUOUS_AA: [u8; 3] = [b'B', b'Z', b'J'];

const STOP: u8 = b'*';

fn is_valid_residue(aa: u8) -> bool {
    // Put the most common case, the 20 standard amino acids, first
    STANDARD_AA.contains(&aa) || SPECIAL_AA.contains(&aa) || AMBIGUOUS_AA.contains(&aa)
}

/// Normalizes a protein sequence for searching.
///
/// Residues are upper-cased and whitespace is dropped. A trailing stop (`*`)
/// ends the sequence. Anything else outside the protein alphabet, including
/// alignment gaps (`-`, `.`), is rejected: hhblits and hhsearch expect an
/// ungapped query. The error carries the 0-based offset into `raw`.
pub fn normalize_protein(raw: &[u8]) -> MapResult<Vec<u8>> {
    let mut residues = Vec::with_capacity(raw.len());
    for (pos, &byte) in raw.iter().enumerate() {
        if byte.is_ascii_whitespace() {
            continue;
        }
        if byte == STOP {
            break;
        }
        let aa = byte.to_ascii_uppercase();
        if !is_valid_residue(aa) {
            return Err(MapError::InvalidResidue(byte as char, pos));
        }
        residues.push(aa);
    }
    Ok(residues)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_uppercases() {
        let residues = normalize_protein(b"mkll ILtc\n").unwrap();
        assert_eq!(residues, b"MKLLILTC".to_vec());
    }

    #[test]
    fn test_stop_ends_sequence() {
        let residues = normalize_protein(b"PLANT*ANIMAL").unwrap();
        assert_eq!(residues, b"PLANT".to_vec());
    }

    #[test]
    fn test_ambiguous_and_special_accepted() {
        assert!(normalize_protein(b"BZJXUO").is_ok());
    }

    #[test]
    fn test_invalid_residue_position() {
        // Contains invalid character '1' which is not a valid amino acid
        let err = normalize_protein(b"PLANTANDANIMALGEN1MES").unwrap_err();
        match err {
            MapError::InvalidResidue(c, pos) => {
                assert_eq!(c, '1');
                assert_eq!(pos, 17);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_position_counts_raw_input() {
        assert!(matches!(normalize_protein(b"MK LL\n1"), Err(MapError::InvalidResidue('1', 6))));
    }

    #[test]
    fn test_gaps_rejected() {
        assert!(matches!(normalize_protein(b"MKL-LI"), Err(MapError::InvalidResidue('-', 3))));
        assert!(matches!(normalize_protein(b"MKL.LI"), Err(MapError::InvalidResidue('.', 3))));
    }
}
