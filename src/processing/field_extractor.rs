use crate::models::{ExtractedRecord, Field, FieldValue};
use crate::processing::{DateParser, MrzExtractor};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

// Value shapes. Rules match case-insensitively as a whole, so a value may run on
// into the next label ("Smith Given names"); `cut_at_label` trims it back.
const NAME_VALUE: &str = r"([A-Z][A-Z'\-]*\b(?:\s[A-Z][A-Z'\-]*\b)*)";
const UPPER_WORDS_VALUE: &str = r"([A-Z]+\b(?:\s[A-Z]+\b)*)";
const PLACE_VALUE: &str = r"([A-Z]+\b(?:,?\s?[A-Z]+\b)*)";
const DATE_VALUE: &str = r"(\d{1,2}[\s\-/.](?:[A-Za-z]{3,}|\d{1,2})[\s\-/.]\d{2,4})";
const LABEL_GAP: &str = r"[\s:/.]*";

/// One label-anchored extraction rule: the first match of `pattern` (capture 1)
/// is handed to `normalize`, which may still reject it.
pub struct FieldRule {
    pub field: Field,
    pub pattern: Regex,
    pub normalize: fn(&str) -> Option<FieldValue>,
}

impl FieldRule {
    fn new(field: Field, labels: &str, value: &str, normalize: fn(&str) -> Option<FieldValue>) -> Self {
        let pattern = format!(r"(?i)\b(?:{}){}{}", labels, LABEL_GAP, value);
        FieldRule {
            field,
            pattern: Regex::new(&pattern).unwrap(),
            normalize,
        }
    }

    pub fn apply(&self, text: &str) -> Option<FieldValue> {
        let captures = self.pattern.captures(text)?;
        (self.normalize)(captures.get(1)?.as_str())
    }
}

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();

    /// `P<` + issuing state + surname + `<<` + given names, anywhere in the text.
    static ref MRZ_SIGNATURE: Regex = Regex::new(r"P<[A-Z]{3}[A-Z<]+<<[A-Z<]+").unwrap();

    // Words that start another field's label. A captured value is cut where one appears,
    // which matters on all-caps documents ("SURNAME DOE GIVEN NAMES JOHN").
    static ref LABEL_WORDS: Regex = Regex::new(
        r"(?i)\b(?:passport|surname|last|family|given|first|forenames?|names?|date|birth|born|issued?|expiry|expires|valid|nationality|citizen(?:ship)?|sex|gender|place|birthplace|authority|type|code|signature)\b"
    ).unwrap();

    pub static ref FIELD_RULES: Vec<FieldRule> = vec![
        FieldRule {
            field: Field::PassportNumber,
            pattern: Regex::new(
                r"(?i)(?:passport\s*(?:no|number|#)?[\s:.]*)?\b([A-Z]{1,2}\d{6,9})\b"
            ).unwrap(),
            normalize: normalize_upper,
        },
        FieldRule::new(Field::LastName, r"surname|last\s*names?|family\s*names?", NAME_VALUE, normalize_name),
        FieldRule::new(Field::FirstName, r"given\s*names?|first\s*names?|forenames?", NAME_VALUE, normalize_name),
        FieldRule::new(Field::DateOfBirth, r"date\s*of\s*birth|birth\s*date|born", DATE_VALUE, normalize_date),
        FieldRule::new(Field::DateOfIssue, r"date\s*of\s*issue|issued", DATE_VALUE, normalize_date),
        FieldRule::new(
            Field::DateOfExpiry,
            r"date\s*of\s*expiry|expiry\s*date|expires|valid\s*until",
            DATE_VALUE,
            normalize_date,
        ),
        FieldRule::new(Field::Nationality, r"nationality|citizen(?:ship)?", UPPER_WORDS_VALUE, normalize_name),
        FieldRule::new(Field::Gender, r"sex|gender", r"(male|female|m|f)\b", normalize_gender),
        FieldRule::new(Field::PlaceOfBirth, r"place\s*of\s*birth|birthplace", PLACE_VALUE, normalize_place),
    ];
}

/// Recovers passport fields from free-form recognized text.
pub struct FieldExtractor;

impl FieldExtractor {
    /// Run every rule over the whitespace-normalized text, then look for an MRZ.
    ///
    /// Merge order: a decoded MRZ is only the baseline. Fields found by the label
    /// rules are laid on top of it and replace MRZ values for the same field.
    /// This is intentional: the printed data page wins over the MRZ, not the
    /// other way round, even though the MRZ is the more constrained source.
    pub fn extract(text: &str) -> ExtractedRecord {
        let clean = Self::normalize_whitespace(text);
        let fields = Self::extract_labelled_fields(&clean);

        if !MRZ_SIGNATURE.is_match(&clean) {
            return fields;
        }

        // Line structure only survives in the original text.
        let candidates = MrzExtractor::candidate_lines(text);
        if candidates.len() < 2 {
            debug!("MRZ signature present but fewer than two MRZ lines found");
            return fields;
        }

        let mut record = MrzExtractor::decode(candidates[0], candidates[1]);
        record.mrz_line1 = Some(candidates[0].trim().to_string());
        record.mrz_line2 = Some(candidates[1].trim().to_string());
        record.overlay(fields);
        record
    }

    /// Apply the rule table only. `text` is expected to be whitespace-normalized.
    pub fn extract_labelled_fields(text: &str) -> ExtractedRecord {
        let mut record = ExtractedRecord::new();
        for rule in FIELD_RULES.iter() {
            if let Some(value) = rule.apply(text) {
                record.set(rule.field, value);
            }
        }
        record
    }

    pub fn normalize_whitespace(text: &str) -> String {
        WHITESPACE.replace_all(text, " ").trim().to_string()
    }

    pub fn has_mrz_signature(text: &str) -> bool {
        MRZ_SIGNATURE.is_match(&Self::normalize_whitespace(text))
    }
}

fn normalize_upper(value: &str) -> Option<FieldValue> {
    Some(FieldValue::Text(value.trim().to_uppercase()))
}

fn normalize_name(value: &str) -> Option<FieldValue> {
    let value = cut_at_label(value).trim();
    if value.is_empty() {
        None
    } else {
        Some(FieldValue::Text(value.to_string()))
    }
}

fn normalize_place(value: &str) -> Option<FieldValue> {
    let value = cut_at_label(value).trim().trim_end_matches(',').trim_end();
    if value.is_empty() {
        None
    } else {
        Some(FieldValue::Text(value.to_string()))
    }
}

fn normalize_date(value: &str) -> Option<FieldValue> {
    DateParser::parse(value).map(FieldValue::Date)
}

fn normalize_gender(value: &str) -> Option<FieldValue> {
    value
        .chars()
        .next()
        .map(|c| FieldValue::Text(c.to_ascii_uppercase().to_string()))
}

fn cut_at_label(value: &str) -> &str {
    match LABEL_WORDS.find(value) {
        Some(label) => &value[..label.start()],
        None => value,
    }
}
