use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Media type of an uploaded document, as declared by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Pdf,
    Image,
}

impl MediaType {
    /// `application/pdf` selects the PDF branch; every other type is treated as an image.
    /// The declared type is trusted, file contents are not sniffed.
    pub fn from_mime(mime: &str) -> Self {
        if mime.trim().eq_ignore_ascii_case("application/pdf") {
            MediaType::Pdf
        } else {
            MediaType::Image
        }
    }

    /// Best-effort guess for callers that have no declared type (the CLI).
    pub fn guess_from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => MediaType::Pdf,
            _ => MediaType::Image,
        }
    }

    pub fn as_mime(&self) -> &'static str {
        match self {
            MediaType::Pdf => "application/pdf",
            MediaType::Image => "image/*",
        }
    }
}

/// Named fields of an [`ExtractedRecord`] that extraction rules can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    PassportNumber,
    FirstName,
    LastName,
    DateOfBirth,
    PlaceOfBirth,
    Nationality,
    Gender,
    DateOfIssue,
    DateOfExpiry,
    PlaceOfIssue,
    DocumentType,
    CountryCode,
    MrzLine1,
    MrzLine2,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
}

/// Structured passport data recovered from one document.
///
/// Every field is independently optional: `None` means "not recovered".
/// The record is built fresh for every pipeline run and is never persisted here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passport_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_issue: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_expiry: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_of_issue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrz_line1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrz_line2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl ExtractedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value for `field`. A date value for a text field (or the reverse) is ignored
    /// and `false` is returned.
    pub fn set(&mut self, field: Field, value: FieldValue) -> bool {
        match value {
            FieldValue::Text(text) => match self.text_slot(field) {
                Some(slot) => {
                    *slot = Some(text);
                    true
                }
                None => false,
            },
            FieldValue::Date(date) => match self.date_slot(field) {
                Some(slot) => {
                    *slot = Some(date);
                    true
                }
                None => false,
            },
        }
    }

    pub fn get(&self, field: Field) -> Option<FieldValue> {
        let text = |v: &Option<String>| v.clone().map(FieldValue::Text);
        let date = |v: &Option<NaiveDate>| v.map(FieldValue::Date);
        match field {
            Field::PassportNumber => text(&self.passport_number),
            Field::FirstName => text(&self.first_name),
            Field::LastName => text(&self.last_name),
            Field::DateOfBirth => date(&self.date_of_birth),
            Field::PlaceOfBirth => text(&self.place_of_birth),
            Field::Nationality => text(&self.nationality),
            Field::Gender => text(&self.gender),
            Field::DateOfIssue => date(&self.date_of_issue),
            Field::DateOfExpiry => date(&self.date_of_expiry),
            Field::PlaceOfIssue => text(&self.place_of_issue),
            Field::DocumentType => text(&self.document_type),
            Field::CountryCode => text(&self.country_code),
            Field::MrzLine1 => text(&self.mrz_line1),
            Field::MrzLine2 => text(&self.mrz_line2),
        }
    }

    fn text_slot(&mut self, field: Field) -> Option<&mut Option<String>> {
        match field {
            Field::PassportNumber => Some(&mut self.passport_number),
            Field::FirstName => Some(&mut self.first_name),
            Field::LastName => Some(&mut self.last_name),
            Field::PlaceOfBirth => Some(&mut self.place_of_birth),
            Field::Nationality => Some(&mut self.nationality),
            Field::Gender => Some(&mut self.gender),
            Field::PlaceOfIssue => Some(&mut self.place_of_issue),
            Field::DocumentType => Some(&mut self.document_type),
            Field::CountryCode => Some(&mut self.country_code),
            Field::MrzLine1 => Some(&mut self.mrz_line1),
            Field::MrzLine2 => Some(&mut self.mrz_line2),
            Field::DateOfBirth | Field::DateOfIssue | Field::DateOfExpiry => None,
        }
    }

    fn date_slot(&mut self, field: Field) -> Option<&mut Option<NaiveDate>> {
        match field {
            Field::DateOfBirth => Some(&mut self.date_of_birth),
            Field::DateOfIssue => Some(&mut self.date_of_issue),
            Field::DateOfExpiry => Some(&mut self.date_of_expiry),
            _ => None,
        }
    }

    /// Copy every field present in `other` over `self`. Fields absent in `other`
    /// leave the current value untouched, so `other` wins only where it has data.
    pub fn overlay(&mut self, other: ExtractedRecord) {
        macro_rules! take_present {
            ($dst:ident, $src:ident; $($name:ident),*) => {
                $(if $src.$name.is_some() { $dst.$name = $src.$name; })*
            };
        }
        let dst = self;
        take_present!(
            dst, other;
            passport_number, first_name, last_name, date_of_birth, place_of_birth,
            nationality, gender, date_of_issue, date_of_expiry, place_of_issue,
            document_type, country_code, mrz_line1, mrz_line2, extracted_text, confidence
        );
    }

    /// True when at least one passport field (not text or confidence) was recovered.
    pub fn has_structured_fields(&self) -> bool {
        ALL_FIELDS.iter().any(|f| self.get(*f).is_some())
    }

    /// Confidence is reported on a 0-100 scale; out-of-range engine values are clamped.
    pub fn set_confidence(&mut self, confidence: f32) {
        self.confidence = Some(confidence.clamp(0.0, 100.0));
    }
}

pub const ALL_FIELDS: [Field; 14] = [
    Field::PassportNumber,
    Field::FirstName,
    Field::LastName,
    Field::DateOfBirth,
    Field::PlaceOfBirth,
    Field::Nationality,
    Field::Gender,
    Field::DateOfIssue,
    Field::DateOfExpiry,
    Field::PlaceOfIssue,
    Field::DocumentType,
    Field::CountryCode,
    Field::MrzLine1,
    Field::MrzLine2,
];

/// The two TD3 lines of a passport MRZ, whitespace removed and padded to 44 characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MrzLinePair {
    pub line1: String,
    pub line2: String,
}

/// Outcome of the ICAO 9303 check digit tests on a TD3 data line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckDigitReport {
    pub document_number_check_valid: bool,
    pub date_of_birth_check_valid: bool,
    pub date_of_expiry_check_valid: bool,
    pub personal_number_check_valid: bool,
    pub composite_check_valid: bool,
}

impl CheckDigitReport {
    pub fn is_valid(&self) -> bool {
        self.document_number_check_valid
            && self.date_of_birth_check_valid
            && self.date_of_expiry_check_valid
            && self.personal_number_check_valid
            && self.composite_check_valid
    }

    /// Names of the checks that failed, for logging.
    pub fn failures(&self) -> Vec<&'static str> {
        let checks = [
            ("document number", self.document_number_check_valid),
            ("date of birth", self.date_of_birth_check_valid),
            ("date of expiry", self.date_of_expiry_check_valid),
            ("personal number", self.personal_number_check_valid),
            ("composite", self.composite_check_valid),
        ];
        checks
            .iter()
            .filter(|(_, ok)| !ok)
            .map(|(name, _)| *name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_rejects_mismatched_value_kind() {
        let mut record = ExtractedRecord::new();
        let date = NaiveDate::from_ymd_opt(2001, 2, 3).unwrap();

        assert!(!record.set(Field::LastName, FieldValue::Date(date)));
        assert!(!record.set(Field::DateOfBirth, FieldValue::Text("x".to_string())));
        assert!(record.set(Field::DateOfBirth, FieldValue::Date(date)));
        assert_eq!(record.date_of_birth, Some(date));
        assert!(record.last_name.is_none());
    }

    #[test]
    fn test_overlay_only_replaces_present_fields() {
        let mut base = ExtractedRecord::new();
        base.last_name = Some("DOE".to_string());
        base.passport_number = Some("L898902C3".to_string());

        let mut top = ExtractedRecord::new();
        top.passport_number = Some("X1234567".to_string());
        top.gender = Some("F".to_string());

        base.overlay(top);
        assert_eq!(base.last_name.as_deref(), Some("DOE"));
        assert_eq!(base.passport_number.as_deref(), Some("X1234567"));
        assert_eq!(base.gender.as_deref(), Some("F"));
    }

    #[test]
    fn test_structured_fields_ignore_text_and_confidence() {
        let mut record = ExtractedRecord::new();
        record.extracted_text = Some("hello".to_string());
        record.set_confidence(140.0);
        assert!(!record.has_structured_fields());
        assert_eq!(record.confidence, Some(100.0));
    }

    #[test]
    fn test_serializes_camel_case_and_skips_absent() {
        let mut record = ExtractedRecord::new();
        record.passport_number = Some("AB1234567".to_string());
        record.date_of_expiry = NaiveDate::from_ymd_opt(2030, 1, 31);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["passportNumber"], "AB1234567");
        assert_eq!(json["dateOfExpiry"], "2030-01-31");
        assert!(json.get("firstName").is_none());
    }

    #[test]
    fn test_media_type_from_mime() {
        assert_eq!(MediaType::from_mime("application/pdf"), MediaType::Pdf);
        assert_eq!(MediaType::from_mime(" Application/PDF "), MediaType::Pdf);
        assert_eq!(MediaType::from_mime("image/jpeg"), MediaType::Image);
        assert_eq!(MediaType::guess_from_path(Path::new("scan.PDF")), MediaType::Pdf);
        assert_eq!(MediaType::guess_from_path(Path::new("scan.png")), MediaType::Image);
    }
}
