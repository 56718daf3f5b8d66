//! The extraction prompt and the spreadsheet column titles.
//!
//! The prompt fixes the order of the nine values the model must return, and
//! [`COLUMNS`] names them in that same order. Changing one without the other
//! silently shifts every column in the exported workbook.
//!
//! Callers can override the prompt via
//! [`crate::config::ExtractionConfig::prompt`].

/// Number of values extracted from each report.
pub const FIELD_COUNT: usize = 9;

/// Spreadsheet header titles, in reply order.
pub const COLUMNS: [&str; FIELD_COUNT] = [
    "First Name",
    "Family Name",
    "Date of Examination",
    "Listening Score",
    "Reading Score",
    "Writing Score",
    "Speaking Score",
    "Overall Band Score",
    "CEFR Level",
];

/// Default instruction sent alongside the rendered report page.
pub const EXTRACTION_PROMPT: &str = r#"
You are reading an official IELTS Test Report Form image.

CRITICAL RULES:

1) Extract the TEST DATE shown near "Centre Number".
2) DO NOT extract Date of Birth.
3) DO NOT extract the bottom issue date.
4) Extract each score strictly from its labeled box:
   - Listening → number next to Listening
   - Reading → number next to Reading
   - Writing → number next to Writing
   - Speaking → number next to Speaking
   - Overall Band Score → number next to it
   - CEFR Level → value next to it
5) Do NOT rearrange scores.
6) Do NOT guess.
7) If something is missing, leave blank.
8) Return EXACTLY 9 comma-separated values.
9) No labels. No explanations.

Return in this order:

First Name,
Family Name,
Date of Examination,
Listening Score,
Reading Score,
Writing Score,
Speaking Score,
Overall Band Score,
CEFR Level
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_columns_in_order() {
        let order = EXTRACTION_PROMPT
            .split("Return in this order:")
            .nth(1)
            .expect("prompt has an ordering section");
        let listed: Vec<&str> = order
            .lines()
            .map(|l| l.trim().trim_end_matches(','))
            .filter(|l| !l.is_empty())
            .collect();
        assert_eq!(listed, COLUMNS);
    }

    #[test]
    fn prompt_demands_exact_field_count() {
        assert!(EXTRACTION_PROMPT.contains(&format!("EXACTLY {FIELD_COUNT}")));
    }
}
