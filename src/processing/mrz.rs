use crate::models::{CheckDigitReport, ExtractedRecord, MrzLinePair};
use crate::processing::DateParser;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

/// Characters per line in a TD3 (passport) MRZ.
pub const TD3_LINE_LENGTH: usize = 44;

/// OCR tends to drop trailing fillers. Lines at least this long (enough to cover
/// every decoded column of the data line) are padded back to full width.
const MIN_PADDABLE_LENGTH: usize = 28;

const FILLER: char = '<';

lazy_static! {
    static ref FULL_MRZ_LINE: Regex = Regex::new(r"^[A-Z0-9<]{44}$").unwrap();
}

/// Locates and decodes a TD3 Machine Readable Zone inside recognized text.
pub struct MrzExtractor;

impl MrzExtractor {
    /// A line is an MRZ candidate when it contains `P<`, or when it is exactly 44
    /// MRZ characters once surrounding whitespace is trimmed.
    pub fn is_candidate_line(line: &str) -> bool {
        line.contains("P<") || FULL_MRZ_LINE.is_match(line.trim())
    }

    /// All candidate lines in document order, untrimmed.
    pub fn candidate_lines(text: &str) -> Vec<&str> {
        text.lines().filter(|line| Self::is_candidate_line(line)).collect()
    }

    /// The first two candidate lines, if there are at least two.
    pub fn find_line_pair(text: &str) -> Option<MrzLinePair> {
        let candidates = Self::candidate_lines(text);
        if candidates.len() < 2 {
            return None;
        }
        Some(MrzLinePair {
            line1: Self::normalize_line(candidates[0]),
            line2: Self::normalize_line(candidates[1]),
        })
    }

    /// Decode the first MRZ line pair found in `text`. Empty record when there is none.
    pub fn extract(text: &str) -> ExtractedRecord {
        match Self::find_line_pair(text) {
            Some(pair) => Self::decode(&pair.line1, &pair.line2),
            None => ExtractedRecord::new(),
        }
    }

    /// Decode a TD3 line pair. Each line is decoded independently; a slice that
    /// yields nothing leaves its field unset.
    pub fn decode(line1: &str, line2: &str) -> ExtractedRecord {
        let mut record = ExtractedRecord::new();
        let line1: Vec<char> = Self::normalize_line(line1).chars().collect();
        let line2: Vec<char> = Self::normalize_line(line2).chars().collect();

        if line1.first() == Some(&'P') {
            record.document_type = Some("Passport".to_string());
            record.country_code = non_empty(strip_filler(&segment(&line1, 2, 5)));

            let names = segment(&line1, 5, line1.len());
            if let Some((surname, given_names)) = names.split_once("<<") {
                record.last_name = non_empty(clean_name(surname));
                record.first_name = non_empty(clean_name(given_names));
            }
        }

        if line2.len() >= TD3_LINE_LENGTH {
            record.passport_number = non_empty(strip_filler(&segment(&line2, 0, 9)));
            record.nationality = non_empty(strip_filler(&segment(&line2, 10, 13)));
            record.date_of_birth = DateParser::parse_mrz(&segment(&line2, 13, 19));
            record.gender = non_empty(strip_filler(&segment(&line2, 20, 21)));
            record.date_of_expiry = DateParser::parse_mrz(&segment(&line2, 21, 27));
        }

        debug!(
            "Decoded MRZ: type={:?} country={:?} number={:?}",
            record.document_type, record.country_code, record.passport_number
        );
        record
    }

    /// Run the ICAO 9303 check digit tests on a TD3 data line.
    ///
    /// Returns `None` when the line is too short or holds characters outside the
    /// MRZ alphabet. The result is informational; decoding never depends on it.
    pub fn verify_check_digits(line2: &str) -> Option<CheckDigitReport> {
        let line: Vec<char> = Self::normalize_line(line2).chars().collect();
        if line.len() < TD3_LINE_LENGTH {
            return None;
        }

        let check = |start: usize, end: usize, at: usize| -> Option<bool> {
            Some(check_digit(&line[start..end])? == char_value(line[at])?)
        };

        let personal_number = &line[28..42];
        let personal_number_check_valid = if personal_number.iter().all(|c| *c == FILLER) {
            matches!(line[42], FILLER | '0')
        } else {
            check(28, 42, 42)?
        };

        let composite: Vec<char> = line[0..10]
            .iter()
            .chain(&line[13..20])
            .chain(&line[21..43])
            .copied()
            .collect();

        Some(CheckDigitReport {
            document_number_check_valid: check(0, 9, 9)?,
            date_of_birth_check_valid: check(13, 19, 19)?,
            date_of_expiry_check_valid: check(21, 27, 27)?,
            personal_number_check_valid,
            composite_check_valid: check_digit(&composite)? == char_value(line[43])?,
        })
    }

    /// Remove all whitespace and restore trailing fillers dropped by OCR.
    pub fn normalize_line(line: &str) -> String {
        let mut cleaned: String = line.chars().filter(|c| !c.is_whitespace()).collect();
        let length = cleaned.chars().count();
        if (MIN_PADDABLE_LENGTH..TD3_LINE_LENGTH).contains(&length) {
            cleaned.extend(std::iter::repeat(FILLER).take(TD3_LINE_LENGTH - length));
        }
        cleaned
    }
}

/// ICAO 9303 check digit: weights 7, 3, 1 over character values, modulo 10.
pub fn check_digit(chars: &[char]) -> Option<u32> {
    const WEIGHTS: [u32; 3] = [7, 3, 1];
    let mut sum = 0;
    for (index, c) in chars.iter().enumerate() {
        sum += char_value(*c)? * WEIGHTS[index % 3];
    }
    Some(sum % 10)
}

fn char_value(c: char) -> Option<u32> {
    match c {
        '0'..='9' => c.to_digit(10),
        'A'..='Z' => Some(c as u32 - 'A' as u32 + 10),
        FILLER => Some(0),
        _ => None,
    }
}

fn segment(chars: &[char], start: usize, end: usize) -> String {
    let end = end.min(chars.len());
    if start >= end {
        return String::new();
    }
    chars[start..end].iter().collect()
}

fn strip_filler(value: &str) -> String {
    value.replace(FILLER, "")
}

// Fillers separate name components.
fn clean_name(name: &str) -> String {
    name.replace(FILLER, " ")
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const LINE1: &str = "P<USADOE<<JOHN<<<<<<<<<<<<<<<<<<<<<<<<<<<<";
    const LINE2: &str = "L898902C36USA6908061F9512316<<<<<<<<<<<<<02";

    fn pad(value: &str, width: usize) -> String {
        let mut out = value.replace(' ', "<");
        while out.len() < width {
            out.push('<');
        }
        out
    }

    fn compose(
        country: &str,
        surname: &str,
        given: &str,
        number: &str,
        nationality: &str,
        dob: &str,
        gender: &str,
        expiry: &str,
    ) -> (String, String) {
        let line1 = pad(&format!("P<{}{}<<{}", country, surname, given), 44);
        let line2 = pad(
            &format!("{}0{}{}0{}{}0", pad(number, 9), nationality, dob, gender, expiry),
            44,
        );
        (line1, line2)
    }

    #[test]
    fn test_decode_sample_pair() {
        let record = MrzExtractor::decode(LINE1, LINE2);

        assert_eq!(record.document_type.as_deref(), Some("Passport"));
        assert_eq!(record.country_code.as_deref(), Some("USA"));
        assert_eq!(record.last_name.as_deref(), Some("DOE"));
        assert_eq!(record.first_name.as_deref(), Some("JOHN"));
        assert_eq!(record.passport_number.as_deref(), Some("L898902C3"));
        assert_eq!(record.nationality.as_deref(), Some("USA"));
        assert_eq!(record.date_of_birth, NaiveDate::from_ymd_opt(1969, 8, 6));
        assert_eq!(record.gender.as_deref(), Some("F"));
        assert_eq!(record.date_of_expiry, NaiveDate::from_ymd_opt(1995, 12, 31));
    }

    #[test]
    fn test_decoded_fields_round_trip() {
        let samples = [
            ("D<<", "MUSTERMANN", "ERIKA", "C01X00T47", "D<<", "640812", "F", "270731"),
            ("GBR", "O<BRIEN", "MARY ANNE", "123456789", "GBR", "011130", "F", "310101"),
            ("UTO", "ERIKSSON", "ANNA MARIA", "L898902C", "UTO", "740812", "M", "120415"),
        ];

        for (country, surname, given, number, nationality, dob, gender, expiry) in samples {
            let (line1, line2) =
                compose(country, surname, given, number, nationality, dob, gender, expiry);
            let record = MrzExtractor::decode(&line1, &line2);

            assert_eq!(record.country_code.as_deref(), Some(country.replace('<', "").as_str()));
            assert_eq!(record.last_name.as_deref(), Some(surname.replace('<', " ").as_str()));
            assert_eq!(record.first_name.as_deref(), Some(given));
            assert_eq!(record.passport_number.as_deref(), Some(number));
            assert_eq!(
                record.nationality.as_deref(),
                Some(nationality.replace('<', "").as_str())
            );
            assert_eq!(record.date_of_birth, DateParser::parse_mrz(dob));
            assert_eq!(record.gender.as_deref(), Some(gender));
            assert_eq!(record.date_of_expiry, DateParser::parse_mrz(expiry));
        }
    }

    #[test]
    fn test_non_passport_first_line_leaves_identity_unset() {
        let record = MrzExtractor::decode(&LINE1.replacen('P', "I", 1), LINE2);
        assert!(record.document_type.is_none());
        assert!(record.last_name.is_none());
        assert_eq!(record.passport_number.as_deref(), Some("L898902C3"));
    }

    #[test]
    fn test_name_without_separator_is_unset() {
        let record = MrzExtractor::decode("P<USADOE<JOHN", "");
        assert_eq!(record.country_code.as_deref(), Some("USA"));
        assert!(record.last_name.is_none());
        assert!(record.first_name.is_none());
    }

    #[test]
    fn test_short_data_line_is_ignored() {
        let record = MrzExtractor::decode(LINE1, "L898902C36USA690806");
        assert!(record.passport_number.is_none());
        assert!(record.date_of_birth.is_none());
    }

    #[test]
    fn test_candidate_detection_keeps_document_order() {
        let full_line2 = pad(LINE2, 44);
        let text = format!(
            "PASSPORT\nSurname DOE\n  {}  \nnoise line\n{}\n{}\n",
            LINE1, full_line2, "X".repeat(44)
        );

        let candidates = MrzExtractor::candidate_lines(&text);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[1], full_line2);

        let pair = MrzExtractor::find_line_pair(&text).unwrap();
        assert_eq!(pair.line1.len(), 44);
        assert!(pair.line1.starts_with("P<USADOE"));
        assert_eq!(pair.line2, full_line2);

        let record = MrzExtractor::extract(&text);
        assert_eq!(record.last_name.as_deref(), Some("DOE"));
        assert_eq!(record.passport_number.as_deref(), Some("L898902C3"));
    }

    #[test]
    fn test_fewer_than_two_candidates_yield_nothing() {
        let text = format!("Passport\n{}\nSex: F", LINE1);
        assert!(MrzExtractor::find_line_pair(&text).is_none());
        assert_eq!(MrzExtractor::extract(&text), ExtractedRecord::new());
        assert_eq!(MrzExtractor::extract(""), ExtractedRecord::new());
    }

    #[test]
    fn test_check_digits() {
        let report = MrzExtractor::verify_check_digits(LINE2).unwrap();
        assert!(report.document_number_check_valid);
        assert!(report.date_of_birth_check_valid);
        // 951231 has check digit 3, the line carries 6
        assert!(!report.date_of_expiry_check_valid);
        assert!(!report.is_valid());
        assert!(report.failures().contains(&"date of expiry"));

        let specimen = "L898902C<3UTO6908061F9406236ZE184226B<<<<<14";
        let report = MrzExtractor::verify_check_digits(specimen).unwrap();
        assert!(report.document_number_check_valid);
        assert!(report.date_of_birth_check_valid);
        assert!(report.date_of_expiry_check_valid);
        assert!(report.personal_number_check_valid);
        assert!(report.composite_check_valid);
        assert!(report.is_valid());

        assert!(MrzExtractor::verify_check_digits("L898902C3").is_none());
    }

    #[test]
    fn test_check_digit_weights() {
        let chars: Vec<char> = "L898902C3".chars().collect();
        assert_eq!(check_digit(&chars), Some(6));
        let chars: Vec<char> = "AB2134<<<".chars().collect();
        assert_eq!(check_digit(&chars), Some(5));
        assert_eq!(check_digit(&['a']), None);
    }
}
