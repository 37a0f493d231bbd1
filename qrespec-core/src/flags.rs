//! Flag Vocabulary - Closed, Partitioned Enumerations
//!
//! Every flag carries an explicit partition (or category) tag through an
//! exhaustive `match`, so adding a flag without tagging it does not compile.
//! Ordinals are kept stable for tools that still exchange numbers, but
//! partition membership never depends on them.

use serde::{Deserialize, Serialize};

use crate::error::{QreError, QreResult};

// --- Response flags ---

/// Display and behavioral attributes of a single response.
///
/// Within one response at most one flag per partition may be set, except
/// for [`ResponsePartition::Misc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum ResponseFlag {
    // DetRText
    Other = 0,
    OtherSpec = 1,
    None = 2,
    All = 3,
    PrefNoAnswer = 4,
    Idk = 5,
    OpenEnd = 6,

    // Classify
    Generic = 10,
    RowResponse = 11,
    ColumnResponse = 12,

    // Anchor
    AnchorBottom = 20,
    AnchorTop = 21,
    AnchorLeft = 22,
    AnchorCenter = 23,
    AnchorRight = 24,

    // Terminate
    TermSelected = 100,
    TermNotSelected = 101,

    // Misc
    MutuallyExclusive = 500,
    Test = 501,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResponsePartition {
    /// Determines the response text and code.
    DetRText,
    /// Blanks the text and assigns a classification sentinel code.
    Classify,
    Anchor,
    Terminate,
    /// Combinable with anything.
    Misc,
}

impl ResponsePartition {
    /// Fixed processing order used by attribute synthesis.
    pub const ORDER: [ResponsePartition; 5] = [
        ResponsePartition::DetRText,
        ResponsePartition::Classify,
        ResponsePartition::Anchor,
        ResponsePartition::Terminate,
        ResponsePartition::Misc,
    ];

    pub fn is_exclusive(self) -> bool {
        self != ResponsePartition::Misc
    }
}

impl ResponseFlag {
    /// All flags in check order. Within a partition, earlier flags win.
    pub const ALL: [ResponseFlag; 19] = [
        ResponseFlag::Other,
        ResponseFlag::OtherSpec,
        ResponseFlag::None,
        ResponseFlag::All,
        ResponseFlag::PrefNoAnswer,
        ResponseFlag::Idk,
        ResponseFlag::OpenEnd,
        ResponseFlag::Generic,
        ResponseFlag::RowResponse,
        ResponseFlag::ColumnResponse,
        ResponseFlag::AnchorBottom,
        ResponseFlag::AnchorTop,
        ResponseFlag::AnchorLeft,
        ResponseFlag::AnchorCenter,
        ResponseFlag::AnchorRight,
        ResponseFlag::TermSelected,
        ResponseFlag::TermNotSelected,
        ResponseFlag::MutuallyExclusive,
        ResponseFlag::Test,
    ];

    pub fn partition(self) -> ResponsePartition {
        use ResponseFlag::*;
        match self {
            Other | OtherSpec | None | All | PrefNoAnswer | Idk | OpenEnd => {
                ResponsePartition::DetRText
            }
            Generic | RowResponse | ColumnResponse => ResponsePartition::Classify,
            AnchorBottom | AnchorTop | AnchorLeft | AnchorCenter | AnchorRight => {
                ResponsePartition::Anchor
            }
            TermSelected | TermNotSelected => ResponsePartition::Terminate,
            MutuallyExclusive | Test => ResponsePartition::Misc,
        }
    }

    pub fn ordinal(self) -> u16 {
        self as u16
    }

    pub fn from_ordinal(ordinal: u16) -> QreResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.ordinal() == ordinal)
            .ok_or_else(|| QreError::range("flag", ordinal, "no response flag has this ordinal"))
    }
}

// --- Response codes ---

/// Reserved response codes. User codes must stay below [`ResponseCode::ALL`].
pub struct ResponseCode;

impl ResponseCode {
    pub const BLANK: i32 = -1;
    pub const ALL: i32 = 96;
    pub const IDK: i32 = 97;
    pub const OTHER: i32 = 98;
    pub const NONE: i32 = 99;
    pub const GENERIC_CODE: i32 = 4094;
    pub const ROW_CODE: i32 = 4095;
    pub const COLUMN_CODE: i32 = 4096;

    pub const LOWEST_SENTINEL: i32 = Self::ALL;

    pub const SENTINELS: [i32; 8] = [
        Self::BLANK,
        Self::ALL,
        Self::IDK,
        Self::OTHER,
        Self::NONE,
        Self::GENERIC_CODE,
        Self::ROW_CODE,
        Self::COLUMN_CODE,
    ];

    pub fn is_sentinel(code: i32) -> bool {
        Self::SENTINELS.contains(&code)
    }

    /// Checks a code typed by a user. Blank is allowed; reserved roles and
    /// anything at or above the lowest sentinel are not.
    pub fn check_user_code(code: i32) -> QreResult<i32> {
        if code == Self::BLANK || (0..Self::LOWEST_SENTINEL).contains(&code) {
            Ok(code)
        } else {
            Err(QreError::range(
                "code",
                code,
                format!("user codes must be blank or in 0..{}", Self::LOWEST_SENTINEL),
            ))
        }
    }
}

// --- Question programming flags ---

/// Independently combinable programming-instruction fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum NonAdcFlag {
    // Response sort
    RandomizeRows = 0,
    RandomizeColumns = 1,
    NoRandomizeRows = 2,
    NoRandomizeColumns = 3,
    SortAlphabeticalAscending = 4,
    SortAlphabeticalDescending = 5,
    KeepOrderFromQX = 6,

    // Visual
    ShowRowCodes = 10,
    ShowColumnCodes = 11,
    HideRowCodes = 12,
    HideColumnCodes = 13,
    ShowBrandLogos = 14,
    NewScreenPerStatement = 15,

    // Open end
    ShowNumBoxes = 20,
    ForceNumBoxesOthersOptional = 21,
    RecordNumMentionsSeparately = 22,
    ForceAtLeastNumChars = 23,
    ForceNumChars = 24,
    AcceptBtwnXandY = 25,

    // Selection
    MaxNumSelected = 30,
    SingleCodePerRow = 31,
    SingleCodePerColumn = 32,

    // Programming
    FlagStraightLiner = 100,
    IncludeInDQ = 101,
    CodeOE = 102,
    Quota = 103,

    Custom = 1000,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NonAdcCategory {
    ResponseSort,
    Visual,
    OpenEnd,
    Selection,
    Programming,
    Custom,
}

/// Parameters a flag needs before its sentence can be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Plain,
    Count,
    Range,
    Text,
}

impl NonAdcFlag {
    /// Canonical synthesis order: category order, then declaration order.
    pub const ALL: [NonAdcFlag; 27] = [
        NonAdcFlag::RandomizeRows,
        NonAdcFlag::RandomizeColumns,
        NonAdcFlag::NoRandomizeRows,
        NonAdcFlag::NoRandomizeColumns,
        NonAdcFlag::SortAlphabeticalAscending,
        NonAdcFlag::SortAlphabeticalDescending,
        NonAdcFlag::KeepOrderFromQX,
        NonAdcFlag::ShowRowCodes,
        NonAdcFlag::ShowColumnCodes,
        NonAdcFlag::HideRowCodes,
        NonAdcFlag::HideColumnCodes,
        NonAdcFlag::ShowBrandLogos,
        NonAdcFlag::NewScreenPerStatement,
        NonAdcFlag::ShowNumBoxes,
        NonAdcFlag::ForceNumBoxesOthersOptional,
        NonAdcFlag::RecordNumMentionsSeparately,
        NonAdcFlag::ForceAtLeastNumChars,
        NonAdcFlag::ForceNumChars,
        NonAdcFlag::AcceptBtwnXandY,
        NonAdcFlag::MaxNumSelected,
        NonAdcFlag::SingleCodePerRow,
        NonAdcFlag::SingleCodePerColumn,
        NonAdcFlag::FlagStraightLiner,
        NonAdcFlag::IncludeInDQ,
        NonAdcFlag::CodeOE,
        NonAdcFlag::Quota,
        NonAdcFlag::Custom,
    ];

    pub fn category(self) -> NonAdcCategory {
        use NonAdcFlag::*;
        match self {
            RandomizeRows
            | RandomizeColumns
            | NoRandomizeRows
            | NoRandomizeColumns
            | SortAlphabeticalAscending
            | SortAlphabeticalDescending
            | KeepOrderFromQX => NonAdcCategory::ResponseSort,
            ShowRowCodes | ShowColumnCodes | HideRowCodes | HideColumnCodes | ShowBrandLogos
            | NewScreenPerStatement => NonAdcCategory::Visual,
            ShowNumBoxes
            | ForceNumBoxesOthersOptional
            | RecordNumMentionsSeparately
            | ForceAtLeastNumChars
            | ForceNumChars
            | AcceptBtwnXandY => NonAdcCategory::OpenEnd,
            MaxNumSelected | SingleCodePerRow | SingleCodePerColumn => NonAdcCategory::Selection,
            FlagStraightLiner | IncludeInDQ | CodeOE | Quota => NonAdcCategory::Programming,
            Custom => NonAdcCategory::Custom,
        }
    }

    pub fn ordinal(self) -> u16 {
        self as u16
    }
}

/// A Non-ADC flag together with its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgFlagEntry {
    pub flag: NonAdcFlag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ProgFlagEntry {
    pub fn plain(flag: NonAdcFlag) -> Self {
        Self {
            flag,
            first: None,
            second: None,
            text: None,
        }
    }

    pub fn count(flag: NonAdcFlag, num: i32) -> Self {
        Self {
            first: Some(num),
            ..Self::plain(flag)
        }
    }

    pub fn range(flag: NonAdcFlag, low: i32, high: i32) -> Self {
        Self {
            first: Some(low),
            second: Some(high),
            ..Self::plain(flag)
        }
    }

    pub fn text(flag: NonAdcFlag, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::plain(flag)
        }
    }
}

impl From<NonAdcFlag> for ProgFlagEntry {
    fn from(flag: NonAdcFlag) -> Self {
        Self::plain(flag)
    }
}

/// Advanced display configuration presets. Only one per question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdcFlag {
    #[default]
    None,
    Gender,
    SingleOpenTextBox,
    MultipleOpenTextBox,
    HeartMatrix,
    BrandListLogoSelect,
    BrandListTextSelect,
    HorizontalScaleMultipleBrandLogos,
    HorizontalScaleSingleStatement,
    VerticalScaleDragDropLogos,
    MultipleSliderMultipleStatement,
}

// --- Routing and question type ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoutingFlag {
    #[default]
    NextQuestion,
    SkipTo,
    EndSurvey,
}

impl TryFrom<i32> for RoutingFlag {
    type Error = QreError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RoutingFlag::NextQuestion),
            1 => Ok(RoutingFlag::SkipTo),
            2 => Ok(RoutingFlag::EndSurvey),
            other => Err(QreError::range("rFlag", other, "unrecognized routing flag")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[default]
    BreakScreen,
    SingleCode,
    MultiCode,
    BrandTextField,
    FullTextField,
    NumericTextField,
    MultiTextField,
    HorizontalScale,
    Grid,
    Marker,
}

impl QuestionType {
    pub const ALL: [QuestionType; 10] = [
        QuestionType::BreakScreen,
        QuestionType::SingleCode,
        QuestionType::MultiCode,
        QuestionType::BrandTextField,
        QuestionType::FullTextField,
        QuestionType::NumericTextField,
        QuestionType::MultiTextField,
        QuestionType::HorizontalScale,
        QuestionType::Grid,
        QuestionType::Marker,
    ];
}

impl TryFrom<i32> for QuestionType {
    type Error = QreError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or_else(|| QreError::range("qType", value, "unrecognized question type"))
    }
}
