//! US-English phrase table.
//!
//! Fixed strings are constants; parameterized sentences are builders that
//! validate their arguments before formatting.

use crate::error::{QreError, QreResult};

pub const BLANK: &str = "";
pub const WHITESPACE: &str = " ";

/// Left-column labels of the question block.
pub mod headers {
    pub const BASE_LABEL_DEFINITION: &str = "Base Label/Definition";
    pub const COMMENTS: &str = "Comment/Advice";
    pub const PROG_INST: &str = "Programming Instructions";
    pub const ROUT_INST: &str = "Routing Instructions";
    pub const QUESTION_TYPE: &str = "Question Type";
    pub const QUESTION_TEXT: &str = "Question Text";
    pub const RESP_INST: &str = "Respondent instruction";
    pub const GENERIC_CODE: &str = "CODE";
    pub const COLUMN_CODE: &str = "COLUMN CODE";
    pub const ROW_CODE: &str = "ROW CODE";
}

/// Text produced by response flags.
pub mod responses {
    pub const OTHER: &str = "Other";
    pub const OTHER_SPEC: &str = "Other (please specify)";
    pub const NONE: &str = "None of the above";
    pub const ALL: &str = "All of the above";
    pub const PREFER_NO_ANSWER: &str = "Prefer not to answer";
    pub const IDK: &str = "Don't know";
    pub const OPEN_END: &str = "[INSERT TEXT BOX]";

    pub const ANCHOR_BOTTOM: &str = "[ANCHOR ON BOTTOM]";
    pub const ANCHOR_TOP: &str = "[ANCHOR ON TOP]";
    pub const ANCHOR_LEFT: &str = "[ANCHOR LEFT]";
    pub const ANCHOR_CENTER: &str = "[ANCHOR IN CENTER]";
    pub const ANCHOR_RIGHT: &str = "[ANCHOR RIGHT]";

    pub const TERM_SELECTED: &str = "[TERM IF SELECTED]";
    pub const TERM_NOT_SELECTED: &str = "[TERM IF NOT SELECTED]";

    pub const MUTUALLY_EXCLUSIVE: &str = "[MUTUALLY EXCLUSIVE]";
}

/// Non-ADC programming sentences.
pub mod programming {
    use super::{at_least_one, pluralize};
    use crate::error::{QreError, QreResult};

    pub const RANDOMIZE_ROWS: &str = "Randomize rows.";
    pub const RANDOMIZE_COLUMNS: &str = "Randomize columns.";
    pub const NO_RANDOMIZE_ROWS: &str = "Do not randomize rows.";
    pub const NO_RANDOMIZE_COLUMNS: &str = "Do not randomize columns.";
    pub const SORT_ALPHABETICAL_ASCENDING: &str = "Sort in ascending alphabetical order.";
    pub const SORT_ALPHABETICAL_DESCENDING: &str = "Sort in descending alphabetical order.";

    pub const SHOW_ROW_CODES: &str = "Show row codes.";
    pub const SHOW_COLUMN_CODES: &str = "Show column codes.";
    pub const HIDE_ROW_CODES: &str = "Hide row codes.";
    pub const HIDE_COLUMN_CODES: &str = "Hide column codes";
    pub const SHOW_BRAND_LOGOS: &str = "Show brand logos.";
    pub const NEW_SCREEN_PER_STATEMENT: &str = "Show each statement on a new screen.";

    pub const SINGLE_CODE_PER_ROW: &str = "Single code per row statement.";
    pub const SINGLE_CODE_PER_COLUMN: &str = "Single code per column statement.";

    pub const FLAG_STRAIGHT_LINER: &str = "Flag straightliner respondents.";
    pub const INCLUDE_IN_DQ: &str = "Include question in DQ report.";
    pub const CODE_OE: &str = "Code OEs.";

    pub fn keep_order_from_qx(q_num: &str) -> QreResult<String> {
        let q_num = required_text("qNum", q_num)?;
        Ok(format!("Keep order from {q_num}."))
    }

    pub fn show_num_boxes(num: i32) -> QreResult<String> {
        at_least_one("num", num)?;
        Ok(format!("Show {num} {}.", pluralize("text box", num)?))
    }

    pub fn force_num_boxes_others_optional(num: i32) -> QreResult<String> {
        at_least_one("num", num)?;
        if num == 1 {
            Ok("Force first mention; others optional.".to_string())
        } else {
            Ok(format!("Force first {num} mentions; others optional."))
        }
    }

    pub fn record_num_mentions_separately(num: i32) -> QreResult<String> {
        at_least_one("num", num)?;
        if num == 1 {
            Ok("Record first mention separately.".to_string())
        } else {
            Ok(format!("Record first {num} mentions separately."))
        }
    }

    pub fn force_at_least_num_chars(num: i32) -> QreResult<String> {
        Ok(format!("Force at least {num} {}.", pluralize("character", num)?))
    }

    pub fn force_num_chars(num: i32) -> QreResult<String> {
        Ok(format!("Force {num} {}.", pluralize("character", num)?))
    }

    pub fn accept_btwn_x_and_y(low: i32, high: i32) -> QreResult<String> {
        if high <= low {
            return Err(QreError::range(
                "num2",
                high,
                format!("second number must be greater than first ({low})"),
            ));
        }
        Ok(format!("Only accept values between {low} and {high}."))
    }

    pub fn max_num_selected(num: i32) -> QreResult<String> {
        at_least_one("num", num)?;
        Ok(format!("Allow selection up to {num} MAX."))
    }

    pub fn quota(quota: &str) -> QreResult<String> {
        let quota = required_text("quota", quota)?;
        Ok(format!("QUOTA: {quota}."))
    }

    fn required_text<'a>(argument: &'static str, text: &'a str) -> QreResult<&'a str> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Err(QreError::range(argument, "\"\"", "text parameter is required"))
        } else {
            Ok(trimmed)
        }
    }
}

/// Default respondent instructions by question type.
pub mod respondent {
    use super::at_least_one;
    use crate::error::QreResult;

    pub const SINGLE_CODE: &str = "Please select one answer below.";
    pub const MULTI_CODE: &str = "Please select all that apply.";
    pub const SINGLE_TEXT_FIELD: &str = "Please enter your answer below.";
    pub const MULTI_TEXT_FIELD: &str =
        "Please enter your answers in the boxes below, one answer per box only.";
    pub const GRID: &str = "Please select one answer for each statement.";

    pub fn multi_code_max_select(num: i32) -> QreResult<String> {
        at_least_one("num", num)?;
        Ok(format!("Please select all that apply, up to {num} at most."))
    }
}

pub mod routing {
    pub const NEXT_QUESTION: &str = "Next question";
    pub const SKIP_TO: &str = "Skip to";
    pub const END_SURVEY: &str = "End survey";
}

pub mod question_type {
    pub const BREAK_SCREEN: &str = "Break Screen.";
    pub const SINGLE_CODE: &str = "Single code. Radio buttons.";
    pub const MULTI_CODE: &str = "Multi code. Checkboxes.";
    pub const BRAND_TEXT_FIELD: &str = "Brand OE.";
    pub const FULL_TEXT_FIELD: &str = "Full OE.";
    pub const NUMERIC_TEXT_FIELD: &str = "Numeric OE.";
    pub const MULTI_TEXT_FIELD: &str = "Multiple OE.";
    pub const HORIZONTAL_SCALE: &str = "Horizontal Scale.";
    pub const GRID: &str = "Grid.";
    pub const MARKER: &str = "Mark respondents based on the below.";
}

fn at_least_one(argument: &'static str, num: i32) -> QreResult<()> {
    if num >= 1 {
        Ok(())
    } else {
        Err(QreError::range(argument, num, "must be at least 1"))
    }
}

/// Singular for 1, English plural above 1, RangeError otherwise.
///
/// Only the last word of `phrase` is inflected ("text box" -> "text boxes").
pub fn pluralize(phrase: &str, num: i32) -> QreResult<String> {
    at_least_one("num", num)?;
    if num == 1 {
        return Ok(phrase.to_string());
    }
    let (head, word) = match phrase.rsplit_once(' ') {
        Some((head, word)) => (Some(head), word),
        None => (None, phrase),
    };
    let plural = plural_of(word);
    Ok(match head {
        Some(head) => format!("{head} {plural}"),
        None => plural,
    })
}

fn plural_of(word: &str) -> String {
    const SIBILANTS: [&str; 5] = ["s", "x", "z", "ch", "sh"];
    let lower = word.to_ascii_lowercase();
    if SIBILANTS.iter().any(|s| lower.ends_with(s)) {
        return format!("{word}es");
    }
    let mut chars = lower.chars().rev();
    if let (Some('y'), Some(prev)) = (chars.next(), chars.next()) {
        if !"aeiou".contains(prev) {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }
    format!("{word}s")
}

#[cfg(test)]
mod tests {
    use super::programming::*;
    use super::*;

    #[test]
    fn keep_order_from_qx_formats_label() {
        assert_eq!(keep_order_from_qx("Q10").unwrap(), "Keep order from Q10.");
        assert!(keep_order_from_qx("  ").is_err());
    }

    #[test]
    fn show_num_boxes_singular_and_plural() {
        assert_eq!(show_num_boxes(1).unwrap(), "Show 1 text box.");
        assert_eq!(show_num_boxes(3).unwrap(), "Show 3 text boxes.");
        assert_eq!(show_num_boxes(10).unwrap(), "Show 10 text boxes.");
    }

    #[test]
    fn mentions_phrasing() {
        assert_eq!(
            force_num_boxes_others_optional(1).unwrap(),
            "Force first mention; others optional."
        );
        assert_eq!(
            force_num_boxes_others_optional(3).unwrap(),
            "Force first 3 mentions; others optional."
        );
        assert_eq!(
            record_num_mentions_separately(1).unwrap(),
            "Record first mention separately."
        );
        assert_eq!(
            record_num_mentions_separately(3).unwrap(),
            "Record first 3 mentions separately."
        );
        assert!(force_num_boxes_others_optional(-1).is_err());
        assert!(record_num_mentions_separately(-1).is_err());
    }

    #[test]
    fn characters_phrasing() {
        assert_eq!(force_at_least_num_chars(1).unwrap(), "Force at least 1 character.");
        assert_eq!(force_at_least_num_chars(3).unwrap(), "Force at least 3 characters.");
        assert_eq!(force_num_chars(5).unwrap(), "Force 5 characters.");
        assert!(force_at_least_num_chars(0).is_err());
    }

    #[test]
    fn accept_between_rejects_reversed_bounds() {
        assert_eq!(
            accept_btwn_x_and_y(1, 99).unwrap(),
            "Only accept values between 1 and 99."
        );
        match accept_btwn_x_and_y(1, 1) {
            Err(QreError::Range { argument, value, .. }) => {
                assert_eq!(argument, "num2");
                assert_eq!(value, "1");
            }
            other => panic!("expected range error, got {other:?}"),
        }
        assert!(accept_btwn_x_and_y(50, 49).is_err());
    }

    #[test]
    fn max_num_selected_phrasing() {
        assert_eq!(max_num_selected(3).unwrap(), "Allow selection up to 3 MAX.");
        assert!(max_num_selected(0).is_err());
    }

    #[test]
    fn quota_requires_text() {
        assert_eq!(quota("n=200 females").unwrap(), "QUOTA: n=200 females.");
        assert!(quota("").is_err());
    }

    #[test]
    fn english_plural_rules() {
        assert_eq!(pluralize("box", 2).unwrap(), "boxes");
        assert_eq!(pluralize("category", 2).unwrap(), "categories");
        assert_eq!(pluralize("day", 2).unwrap(), "days");
        assert_eq!(pluralize("match", 4).unwrap(), "matches");
        assert_eq!(pluralize("character", 2).unwrap(), "characters");
        assert_eq!(pluralize("character", 1).unwrap(), "character");
        assert!(pluralize("character", 0).is_err());
    }
}
