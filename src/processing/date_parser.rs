use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Day first: "06 AUG 1969", "6-Aug-69", "06/08/1969", "06.08.1969"
    static ref DAY_FIRST: Regex =
        Regex::new(r"^(\d{1,2})[\s\-/.]+([A-Za-z]{3,}\.?|\d{1,2})[\s\-/.]+(\d{4}|\d{2})$").unwrap();
    static ref ISO_DATE: Regex = Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").unwrap();
}

const MONTH_NAMES: [&str; 12] = [
    "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december",
];

/// Two-digit years up to this value belong to the 2000s, later ones to the 1900s.
pub const CENTURY_PIVOT: u32 = 30;

/// Turns textual dates into calendar dates.
///
/// Free text is read day-first with English month names; ISO `YYYY-MM-DD` is also
/// accepted. Anything else, including impossible dates, is `None`.
pub struct DateParser;

impl DateParser {
    pub fn parse(text: &str) -> Option<NaiveDate> {
        let text = text.trim();

        if let Some(caps) = ISO_DATE.captures(text) {
            let year = caps[1].parse::<i32>().ok()?;
            let month = caps[2].parse::<u32>().ok()?;
            let day = caps[3].parse::<u32>().ok()?;
            return NaiveDate::from_ymd_opt(year, month, day);
        }

        let caps = DAY_FIRST.captures(text)?;
        let day = caps[1].parse::<u32>().ok()?;
        let month_text = caps[2].trim_end_matches('.');
        let month = match month_text.parse::<u32>() {
            Ok(number) => number,
            Err(_) => Self::month_from_name(month_text)?,
        };
        let year_text = &caps[3];
        let year = if year_text.len() == 2 {
            Self::expand_two_digit_year(year_text.parse().ok()?)
        } else {
            year_text.parse::<i32>().ok()?
        };

        NaiveDate::from_ymd_opt(year, month, day)
    }

    /// Decode an MRZ `YYMMDD` date. The month is 1-based in the MRZ, as it is in
    /// `NaiveDate`; use `month0()` on the result for a 0-based month.
    pub fn parse_mrz(yymmdd: &str) -> Option<NaiveDate> {
        if yymmdd.len() != 6 || !yymmdd.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year = yymmdd[0..2].parse::<u32>().ok()?;
        let month = yymmdd[2..4].parse::<u32>().ok()?;
        let day = yymmdd[4..6].parse::<u32>().ok()?;

        NaiveDate::from_ymd_opt(Self::expand_two_digit_year(year), month, day)
    }

    pub fn expand_two_digit_year(year: u32) -> i32 {
        if year <= CENTURY_PIVOT {
            2000 + year as i32
        } else {
            1900 + year as i32
        }
    }

    /// "aug", "August", "SEPT" -> month number. At least three letters, and the
    /// text must be a prefix of the full English name.
    fn month_from_name(name: &str) -> Option<u32> {
        let lower = name.to_lowercase();
        if lower.len() < 3 {
            return None;
        }
        MONTH_NAMES
            .iter()
            .position(|full| full.starts_with(&lower))
            .map(|index| index as u32 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_mrz_dates_use_century_pivot() {
        let date = DateParser::parse_mrz("990101").unwrap();
        assert_eq!(date.year(), 1999);
        assert_eq!(date.month0(), 0);
        assert_eq!(date.day(), 1);

        let date = DateParser::parse_mrz("050630").unwrap();
        assert_eq!(date.year(), 2005);
        assert_eq!(date.month0(), 5);
        assert_eq!(date.day(), 30);

        assert_eq!(DateParser::parse_mrz("300101"), Some(ymd(2030, 1, 1)));
        assert_eq!(DateParser::parse_mrz("310101"), Some(ymd(1931, 1, 1)));
    }

    #[test]
    fn test_malformed_mrz_dates() {
        assert_eq!(DateParser::parse_mrz("99010"), None);
        assert_eq!(DateParser::parse_mrz("9901011"), None);
        assert_eq!(DateParser::parse_mrz("99O101"), None);
        assert_eq!(DateParser::parse_mrz("991301"), None);
        assert_eq!(DateParser::parse_mrz(""), None);
    }

    #[test]
    fn test_free_text_dates() {
        assert_eq!(DateParser::parse("06 AUG 1969"), Some(ymd(1969, 8, 6)));
        assert_eq!(DateParser::parse("6-Aug-69"), Some(ymd(1969, 8, 6)));
        assert_eq!(DateParser::parse("15 January 2020"), Some(ymd(2020, 1, 15)));
        assert_eq!(DateParser::parse("01 SEPT 2015"), Some(ymd(2015, 9, 1)));
        assert_eq!(DateParser::parse("03/04/2020"), Some(ymd(2020, 4, 3)));
        assert_eq!(DateParser::parse("03.04.2020"), Some(ymd(2020, 4, 3)));
        assert_eq!(DateParser::parse("2020-04-03"), Some(ymd(2020, 4, 3)));
    }

    #[test]
    fn test_unparseable_dates_are_none() {
        assert_eq!(DateParser::parse("31 FEB 2020"), None);
        assert_eq!(DateParser::parse("12 Foo 2020"), None);
        assert_eq!(DateParser::parse("tomorrow"), None);
        assert_eq!(DateParser::parse("12/13/2020"), None);
        assert_eq!(DateParser::parse(""), None);
    }
}
