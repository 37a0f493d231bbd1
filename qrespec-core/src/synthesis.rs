//! Text Synthesis Engine
//!
//! Pure functions from (flags, parameters) to display strings. No hidden
//! state: the same inputs always give the same string.
//!
//! Both flag families are driven by descriptor tables. Synthesis walks the
//! table in its fixed order and looks each entry up in the caller's flags,
//! so the caller's ordering never leaks into the output.

use crate::error::{QreError, QreResult};
use crate::flags::{
    AdcFlag, Arity, NonAdcCategory, NonAdcFlag, ProgFlagEntry, QuestionType, ResponseCode, ResponseFlag,
    ResponsePartition, RoutingFlag,
};
use crate::language::{self, headers, programming, question_type, respondent, responses, routing};

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static SYNTHESIS_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_synthesis_call_count() -> u32 {
    SYNTHESIS_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_synthesis_call_count() {
    SYNTHESIS_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[inline]
fn count_call() {
    #[cfg(feature = "test-hooks")]
    SYNTHESIS_CALL_COUNT.fetch_add(1, Ordering::SeqCst);
}

// --- Response attributes ---

/// What a response flag does to the response's text and code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseEffect {
    /// Replace text and code.
    Determine { text: &'static str, code: i32 },
    /// Blank the text and assign a classification sentinel.
    Classify { code: i32 },
    /// Append a bracketed marker.
    Append(&'static str),
    Inert,
}

pub fn response_effect(flag: ResponseFlag) -> ResponseEffect {
    use ResponseEffect::*;
    match flag {
        ResponseFlag::Other => Determine { text: responses::OTHER, code: ResponseCode::OTHER },
        ResponseFlag::OtherSpec => Determine {
            text: responses::OTHER_SPEC,
            code: ResponseCode::OTHER,
        },
        ResponseFlag::None => Determine { text: responses::NONE, code: ResponseCode::NONE },
        ResponseFlag::All => Determine { text: responses::ALL, code: ResponseCode::ALL },
        ResponseFlag::PrefNoAnswer => Determine {
            text: responses::PREFER_NO_ANSWER,
            code: ResponseCode::IDK,
        },
        ResponseFlag::Idk => Determine { text: responses::IDK, code: ResponseCode::IDK },
        ResponseFlag::OpenEnd => Determine {
            text: responses::OPEN_END,
            code: ResponseCode::BLANK,
        },
        ResponseFlag::Generic => Classify { code: ResponseCode::GENERIC_CODE },
        ResponseFlag::RowResponse => Classify { code: ResponseCode::ROW_CODE },
        ResponseFlag::ColumnResponse => Classify { code: ResponseCode::COLUMN_CODE },
        ResponseFlag::AnchorBottom => Append(responses::ANCHOR_BOTTOM),
        ResponseFlag::AnchorTop => Append(responses::ANCHOR_TOP),
        ResponseFlag::AnchorLeft => Append(responses::ANCHOR_LEFT),
        ResponseFlag::AnchorCenter => Append(responses::ANCHOR_CENTER),
        ResponseFlag::AnchorRight => Append(responses::ANCHOR_RIGHT),
        ResponseFlag::TermSelected => Append(responses::TERM_SELECTED),
        ResponseFlag::TermNotSelected => Append(responses::TERM_NOT_SELECTED),
        ResponseFlag::MutuallyExclusive => Append(responses::MUTUALLY_EXCLUSIVE),
        ResponseFlag::Test => Inert,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseAttributes {
    pub code: i32,
    pub text: String,
}

/// Derives a response's display code and text from scratch.
///
/// Partitions are processed DetRText, Classify, Anchor, Terminate, Misc.
/// In an exclusive partition only the first flag in check order applies;
/// every Misc flag applies.
pub fn derive_response_attributes(
    flags: &[ResponseFlag],
    entered_text: &str,
    entered_code: i32,
) -> ResponseAttributes {
    count_call();
    let mut attrs = ResponseAttributes {
        code: entered_code,
        text: entered_text.to_string(),
    };

    for partition in ResponsePartition::ORDER {
        let mut active = ResponseFlag::ALL
            .iter()
            .filter(|f| f.partition() == partition && flags.contains(f));
        let applied: Vec<ResponseFlag> = if partition.is_exclusive() {
            active.next().copied().into_iter().collect()
        } else {
            active.copied().collect()
        };

        for flag in applied {
            match response_effect(flag) {
                ResponseEffect::Determine { text, code } => {
                    attrs.text = text.to_string();
                    attrs.code = code;
                }
                ResponseEffect::Classify { code } => {
                    attrs.text = language::BLANK.to_string();
                    attrs.code = code;
                }
                ResponseEffect::Append(marker) => append_marker(&mut attrs.text, marker),
                ResponseEffect::Inert => {}
            }
        }
    }
    attrs
}

fn append_marker(text: &mut String, marker: &str) {
    if !text.is_empty() {
        text.push_str(language::WHITESPACE);
    }
    text.push_str(marker);
}

/// Left-column label for a response code. Sentinels become role labels.
pub fn code_label(code: i32) -> String {
    match code {
        ResponseCode::BLANK => language::BLANK.to_string(),
        ResponseCode::GENERIC_CODE => headers::GENERIC_CODE.to_string(),
        ResponseCode::ROW_CODE => headers::ROW_CODE.to_string(),
        ResponseCode::COLUMN_CODE => headers::COLUMN_CODE.to_string(),
        other => other.to_string(),
    }
}

// --- Question type ---

pub fn question_type_label(q_type: QuestionType) -> &'static str {
    match q_type {
        QuestionType::BreakScreen => question_type::BREAK_SCREEN,
        QuestionType::SingleCode => question_type::SINGLE_CODE,
        QuestionType::MultiCode => question_type::MULTI_CODE,
        QuestionType::BrandTextField => question_type::BRAND_TEXT_FIELD,
        QuestionType::FullTextField => question_type::FULL_TEXT_FIELD,
        QuestionType::NumericTextField => question_type::NUMERIC_TEXT_FIELD,
        QuestionType::MultiTextField => question_type::MULTI_TEXT_FIELD,
        QuestionType::HorizontalScale => question_type::HORIZONTAL_SCALE,
        QuestionType::Grid => question_type::GRID,
        QuestionType::Marker => question_type::MARKER,
    }
}

/// Custom label if given, otherwise the table label.
pub fn question_type_string(q_type: QuestionType, custom: Option<&str>) -> String {
    match custom {
        Some(custom) => custom.to_string(),
        None => question_type_label(q_type).to_string(),
    }
}

/// Same as [`question_type_string`] for a raw ordinal from an older tool.
pub fn question_type_string_from_ordinal(ordinal: i32, custom: Option<&str>) -> QreResult<String> {
    let q_type = QuestionType::try_from(ordinal)?;
    Ok(question_type_string(q_type, custom))
}

// --- Non-ADC programming instructions ---

/// Sentence builder for one Non-ADC flag. The variant fixes the arity.
#[derive(Clone, Copy)]
pub enum Phrase {
    Fixed(&'static str),
    Count(fn(i32) -> QreResult<String>),
    Range(fn(i32, i32) -> QreResult<String>),
    Text(fn(&str) -> QreResult<String>),
    /// Caller-supplied free text.
    Custom,
}

#[derive(Clone, Copy)]
pub struct NonAdcDescriptor {
    pub flag: NonAdcFlag,
    pub phrase: Phrase,
}

impl NonAdcDescriptor {
    pub fn category(&self) -> NonAdcCategory {
        self.flag.category()
    }

    pub fn arity(&self) -> Arity {
        match self.phrase {
            Phrase::Fixed(_) | Phrase::Custom => Arity::Plain,
            Phrase::Count(_) => Arity::Count,
            Phrase::Range(_) => Arity::Range,
            Phrase::Text(_) => Arity::Text,
        }
    }

    fn render(&self, entry: &ProgFlagEntry, custom: Option<&str>) -> QreResult<String> {
        match self.phrase {
            Phrase::Fixed(text) => Ok(text.to_string()),
            Phrase::Count(build) => build(required(entry.first, "num")?),
            Phrase::Range(build) => {
                build(required(entry.first, "num1")?, required(entry.second, "num2")?)
            }
            Phrase::Text(build) => build(entry.text.as_deref().unwrap_or_default()),
            Phrase::Custom => Ok(custom.unwrap_or_default().trim().to_string()),
        }
    }
}

fn required(param: Option<i32>, argument: &'static str) -> QreResult<i32> {
    param.ok_or_else(|| QreError::range(argument, "missing", "numeric parameter is required"))
}

/// Canonical order: response sort, visual, open end, selection, programming, custom.
pub static NON_ADC_TABLE: [NonAdcDescriptor; 27] = [
    NonAdcDescriptor {
        flag: NonAdcFlag::RandomizeRows,
        phrase: Phrase::Fixed(programming::RANDOMIZE_ROWS),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::RandomizeColumns,
        phrase: Phrase::Fixed(programming::RANDOMIZE_COLUMNS),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::NoRandomizeRows,
        phrase: Phrase::Fixed(programming::NO_RANDOMIZE_ROWS),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::NoRandomizeColumns,
        phrase: Phrase::Fixed(programming::NO_RANDOMIZE_COLUMNS),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::SortAlphabeticalAscending,
        phrase: Phrase::Fixed(programming::SORT_ALPHABETICAL_ASCENDING),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::SortAlphabeticalDescending,
        phrase: Phrase::Fixed(programming::SORT_ALPHABETICAL_DESCENDING),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::KeepOrderFromQX,
        phrase: Phrase::Text(programming::keep_order_from_qx),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::ShowRowCodes,
        phrase: Phrase::Fixed(programming::SHOW_ROW_CODES),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::ShowColumnCodes,
        phrase: Phrase::Fixed(programming::SHOW_COLUMN_CODES),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::HideRowCodes,
        phrase: Phrase::Fixed(programming::HIDE_ROW_CODES),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::HideColumnCodes,
        phrase: Phrase::Fixed(programming::HIDE_COLUMN_CODES),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::ShowBrandLogos,
        phrase: Phrase::Fixed(programming::SHOW_BRAND_LOGOS),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::NewScreenPerStatement,
        phrase: Phrase::Fixed(programming::NEW_SCREEN_PER_STATEMENT),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::ShowNumBoxes,
        phrase: Phrase::Count(programming::show_num_boxes),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::ForceNumBoxesOthersOptional,
        phrase: Phrase::Count(programming::force_num_boxes_others_optional),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::RecordNumMentionsSeparately,
        phrase: Phrase::Count(programming::record_num_mentions_separately),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::ForceAtLeastNumChars,
        phrase: Phrase::Count(programming::force_at_least_num_chars),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::ForceNumChars,
        phrase: Phrase::Count(programming::force_num_chars),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::AcceptBtwnXandY,
        phrase: Phrase::Range(programming::accept_btwn_x_and_y),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::MaxNumSelected,
        phrase: Phrase::Count(programming::max_num_selected),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::SingleCodePerRow,
        phrase: Phrase::Fixed(programming::SINGLE_CODE_PER_ROW),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::SingleCodePerColumn,
        phrase: Phrase::Fixed(programming::SINGLE_CODE_PER_COLUMN),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::FlagStraightLiner,
        phrase: Phrase::Fixed(programming::FLAG_STRAIGHT_LINER),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::IncludeInDQ,
        phrase: Phrase::Fixed(programming::INCLUDE_IN_DQ),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::CodeOE,
        phrase: Phrase::Fixed(programming::CODE_OE),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::Quota,
        phrase: Phrase::Text(programming::quota),
    },
    NonAdcDescriptor {
        flag: NonAdcFlag::Custom,
        phrase: Phrase::Custom,
    },
];

pub fn descriptor(flag: NonAdcFlag) -> &'static NonAdcDescriptor {
    // Every flag has exactly one row; checked by the table test below.
    let index = NonAdcFlag::ALL
        .iter()
        .position(|f| *f == flag)
        .unwrap_or(NonAdcFlag::ALL.len() - 1);
    &NON_ADC_TABLE[index]
}

/// Concatenates the sentences of every supplied flag in canonical order.
///
/// When a flag is supplied more than once, its first entry is used. The
/// custom text only appears if [`NonAdcFlag::Custom`] is supplied.
pub fn non_adc_instruction(entries: &[ProgFlagEntry], custom: Option<&str>) -> QreResult<String> {
    let sentences = NON_ADC_TABLE.iter().try_fold(Vec::new(), |mut acc, desc| {
        if let Some(entry) = entries.iter().find(|e| e.flag == desc.flag) {
            let sentence = desc.render(entry, custom)?;
            if !sentence.is_empty() {
                acc.push(sentence);
            }
        }
        Ok::<_, QreError>(acc)
    })?;
    Ok(sentences.join(language::WHITESPACE).trim().to_string())
}

/// ADC synthesis has no phrase table yet and always fails loudly.
pub fn adc_instruction(flag: AdcFlag) -> QreResult<String> {
    let _ = flag;
    Err(QreError::NotImplemented("ADC programming instruction synthesis"))
}

/// Builds the full programming instruction: question type label followed by
/// the flag-derived sentences.
///
/// A non-null Non-ADC list always wins over a non-default ADC flag.
pub fn generate_prog_inst_string(
    q_type: QuestionType,
    custom_q_type: Option<&str>,
    non_adc: Option<&[ProgFlagEntry]>,
    adc: AdcFlag,
    custom_prog_inst: Option<&str>,
) -> QreResult<String> {
    count_call();
    let label = question_type_string(q_type, custom_q_type);
    let appendage = match non_adc {
        Some(entries) => non_adc_instruction(entries, custom_prog_inst)?,
        None if adc != AdcFlag::None => adc_instruction(adc)?,
        None => String::new(),
    };
    Ok(format!("{label}{}{appendage}", language::WHITESPACE)
        .trim()
        .to_string())
}

// --- Routing ---

pub fn routing_instruction(flag: RoutingFlag, target: Option<&str>) -> QreResult<String> {
    match flag {
        RoutingFlag::NextQuestion => Ok(routing::NEXT_QUESTION.to_string()),
        RoutingFlag::EndSurvey => Ok(routing::END_SURVEY.to_string()),
        RoutingFlag::SkipTo => match target.map(str::trim) {
            Some(target) if !target.is_empty() => Ok(format!("{} {target}", routing::SKIP_TO)),
            _ => Err(QreError::range("target", "\"\"", "SkipTo needs a target question")),
        },
    }
}

/// Routing phrase for a raw ordinal; unknown ordinals are range errors.
pub fn routing_instruction_from_ordinal(ordinal: i32, target: Option<&str>) -> QreResult<String> {
    routing_instruction(RoutingFlag::try_from(ordinal)?, target)
}

// --- Respondent instruction ---

/// Default respondent instruction for a question type.
pub fn default_respondent_instruction(
    q_type: QuestionType,
    non_adc: Option<&[ProgFlagEntry]>,
) -> QreResult<String> {
    let max_selected = non_adc
        .and_then(|entries| entries.iter().find(|e| e.flag == NonAdcFlag::MaxNumSelected))
        .map(|e| required(e.first, "num"))
        .transpose()?;

    let text = match q_type {
        QuestionType::SingleCode => respondent::SINGLE_CODE.to_string(),
        QuestionType::MultiCode => match max_selected {
            Some(num) => respondent::multi_code_max_select(num)?,
            None => respondent::MULTI_CODE.to_string(),
        },
        QuestionType::BrandTextField
        | QuestionType::FullTextField
        | QuestionType::NumericTextField => respondent::SINGLE_TEXT_FIELD.to_string(),
        QuestionType::MultiTextField => respondent::MULTI_TEXT_FIELD.to_string(),
        QuestionType::Grid => respondent::GRID.to_string(),
        QuestionType::BreakScreen | QuestionType::HorizontalScale | QuestionType::Marker => {
            language::BLANK.to_string()
        }
    };
    Ok(text)
}
