//! Parses the embedded REACLIB binary blob: a contiguous array of
//! fixed-width, unpadded records.
//!
//! ```text
//! int32  chapter
//! float64 q_value_MeV
//! float64 coeffs[7]
//! uint8  reverse_flag          (0 or 1)
//! char   label[8]              (NUL-padded if shorter)
//! char   pe_name[64]           (NUL-padded)
//! char   reactants_str[128]    (whitespace-separated species names, NUL-padded)
//! char   products_str[128]     (whitespace-separated species names, NUL-padded)
//! ```

use crate::error::{NetworkError, Result};
use crate::reaction::rate::RateCoefficients;
use crate::reaction::reaction::Reaction;
use crate::species::parse_species_name;

const LABEL_WIDTH: usize = 8;
const PE_NAME_WIDTH: usize = 64;
const REACTANTS_WIDTH: usize = 128;
const PRODUCTS_WIDTH: usize = 128;
const RECORD_WIDTH: usize =
    4 + 8 + 8 * 7 + 1 + LABEL_WIDTH + PE_NAME_WIDTH + REACTANTS_WIDTH + PRODUCTS_WIDTH;

/// Parses every record in `blob` into a [`Reaction`]. `blob.len()` need
/// not be validated by the caller; a trailing partial record is an error.
pub fn parse_reaclib_blob(blob: &[u8]) -> Result<Vec<Reaction>> {
    if blob.len() % RECORD_WIDTH != 0 {
        return Err(NetworkError::MalformedRecord {
            offset: blob.len() - (blob.len() % RECORD_WIDTH),
            detail: format!(
                "blob length {} is not a multiple of the record width {}",
                blob.len(),
                RECORD_WIDTH
            ),
        });
    }
    let count = blob.len() / RECORD_WIDTH;
    let mut reactions = Vec::with_capacity(count);
    for i in 0..count {
        let offset = i * RECORD_WIDTH;
        reactions.push(parse_record(&blob[offset..offset + RECORD_WIDTH], offset)?);
    }
    Ok(reactions)
}

fn parse_record(record: &[u8], offset: usize) -> Result<Reaction> {
    let mut cursor = 0usize;

    let chapter = i32::from_le_bytes(read_fixed::<4>(record, &mut cursor));
    let q_value_mev = f64::from_le_bytes(read_fixed::<8>(record, &mut cursor));
    let mut coeffs = [0.0_f64; 7];
    for coeff in &mut coeffs {
        *coeff = f64::from_le_bytes(read_fixed::<8>(record, &mut cursor));
    }
    let reverse_flag = read_fixed::<1>(record, &mut cursor)[0] != 0;
    let label = read_trimmed_str(record, &mut cursor, LABEL_WIDTH, offset)?;
    let pe_name = read_trimmed_str(record, &mut cursor, PE_NAME_WIDTH, offset)?;
    let reactants_str = read_trimmed_str(record, &mut cursor, REACTANTS_WIDTH, offset)?;
    let products_str = read_trimmed_str(record, &mut cursor, PRODUCTS_WIDTH, offset)?;

    let reactants = parse_species_list(&reactants_str, offset)?;
    let products = parse_species_list(&products_str, offset)?;

    let chapter = u8::try_from(chapter).map_err(|_| NetworkError::MalformedRecord {
        offset,
        detail: format!("chapter {chapter} out of range 1..=8"),
    })?;

    Reaction::new(
        pe_name,
        chapter,
        reactants,
        products,
        q_value_mev,
        label,
        RateCoefficients::new(coeffs),
        reverse_flag,
    )
}

fn read_fixed<const N: usize>(record: &[u8], cursor: &mut usize) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&record[*cursor..*cursor + N]);
    *cursor += N;
    buf
}

fn read_trimmed_str(
    record: &[u8],
    cursor: &mut usize,
    width: usize,
    offset: usize,
) -> Result<String> {
    let slice = &record[*cursor..*cursor + width];
    *cursor += width;
    let end = slice.iter().position(|&b| b == 0).unwrap_or(width);
    std::str::from_utf8(&slice[..end])
        .map(|s| s.to_string())
        .map_err(|e| NetworkError::MalformedRecord {
            offset,
            detail: format!("invalid UTF-8 in fixed-width field: {e}"),
        })
}

fn parse_species_list(field: &str, offset: usize) -> Result<Vec<crate::species::Species>> {
    field
        .split_whitespace()
        .map(|name| {
            parse_species_name(name).ok_or_else(|| NetworkError::MalformedRecord {
                offset,
                detail: format!("unknown species name '{name}'"),
            })
        })
        .collect()
}
