//! B3 expiration series letters
//!
//! `A`..`L` are calls expiring January..December, `M`..`X` the puts for the
//! same months. Option symbols carry the letter right after the root, e.g.
//! `PETRD400` is an April call.

use chrono::Datelike;
use common::{NormalizedContract, OptionSide};

/// Side and month (1-12) encoded by a series letter
pub fn decode_series_letter(letter: char) -> Option<(OptionSide, u32)> {
    let upper = letter.to_ascii_uppercase();
    match upper {
        'A'..='L' => Some((OptionSide::Call, upper as u32 - 'A' as u32 + 1)),
        'M'..='X' => Some((OptionSide::Put, upper as u32 - 'M' as u32 + 1)),
        _ => None,
    }
}

/// Series letter for a side and month (1-12)
pub fn series_letter(side: OptionSide, month: u32) -> Option<char> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let base = match side {
        OptionSide::Call => b'A',
        OptionSide::Put => b'M',
    };
    Some((base + (month - 1) as u8) as char)
}

/// Expiry month selected by an expiration code
pub fn parse_expiration_code(code: &str) -> common::Result<u32> {
    let mut chars = code.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) => decode_series_letter(letter)
            .map(|(_, month)| month)
            .ok_or_else(|| common::Error::invalid_input(format!("invalid expiration code: {}", code))),
        _ => Err(common::Error::invalid_input(format!(
            "expiration code must be a single letter A-X, got '{}'",
            code
        ))),
    }
}

/// Contracts expiring in the month named by `code`, calls and puts alike
pub fn filter_by_expiration(
    contracts: Vec<NormalizedContract>,
    code: &str,
) -> common::Result<Vec<NormalizedContract>> {
    let month = parse_expiration_code(code)?;
    Ok(contracts
        .into_iter()
        .filter(|c| c.contract.expiry_date.month() == month)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::priced;
    use chrono::NaiveDate;

    #[test]
    fn test_letters() {
        assert_eq!(decode_series_letter('A'), Some((OptionSide::Call, 1)));
        assert_eq!(decode_series_letter('d'), Some((OptionSide::Call, 4)));
        assert_eq!(decode_series_letter('L'), Some((OptionSide::Call, 12)));
        assert_eq!(decode_series_letter('M'), Some((OptionSide::Put, 1)));
        assert_eq!(decode_series_letter('X'), Some((OptionSide::Put, 12)));
        assert_eq!(decode_series_letter('Y'), None);

        for month in 1..=12 {
            for side in [OptionSide::Call, OptionSide::Put] {
                let letter = series_letter(side, month).unwrap();
                assert_eq!(decode_series_letter(letter), Some((side, month)));
            }
        }
        assert_eq!(series_letter(OptionSide::Call, 13), None);
    }

    #[test]
    fn test_filter_by_expiration() {
        let mut april_call = priced(OptionSide::Call, 40.0, 0.3, 0.04, 10, 10);
        april_call.contract.expiry_date = NaiveDate::from_ymd_opt(2024, 4, 19).unwrap();
        let mut april_put = priced(OptionSide::Put, 38.0, 0.3, 0.04, 10, 10);
        april_put.contract.expiry_date = NaiveDate::from_ymd_opt(2024, 4, 19).unwrap();
        let mut may_call = priced(OptionSide::Call, 40.0, 0.3, 0.04, 10, 10);
        may_call.contract.expiry_date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();

        let chain = vec![april_call, april_put, may_call];
        assert_eq!(filter_by_expiration(chain.clone(), "D").unwrap().len(), 2);
        assert_eq!(filter_by_expiration(chain.clone(), "p").unwrap().len(), 2);
        assert_eq!(filter_by_expiration(chain.clone(), "E").unwrap().len(), 1);
        assert!(filter_by_expiration(chain.clone(), "Z").is_err());
        assert!(filter_by_expiration(chain, "DE").is_err());
    }
}
