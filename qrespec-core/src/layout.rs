//! Layout Engine
//!
//! Walks Module -> Section -> QuestionBlock -> Response with a single row
//! cursor and emits rows, merges and borders to a [`RenderSurface`]. The
//! walk reads only materialized strings; it never calls synthesis except to
//! label response codes.
//!
//! Per module page:
//! ```text
//! [module description]            merged, optional, then one blank row
//! SECTION A: Title                merged banner
//! [section description]           merged, optional
//! (blank)
//! Q1 | Title                      ┐
//! Base Label/Definition | ...     │ seven info rows
//! ...                             │
//! Respondent instruction | ...    │
//! code | response text            ┘ bordered
//! (blank)
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LayoutConfig;
use crate::document::Document;
use crate::error::{QreError, QreResult};
use crate::flags::ResponseCode;
use crate::ids::{ModuleId, QuestionId};
use crate::language::headers;
use crate::model::{Entity, Module, QuestionBlock, Section};
use crate::surface::{RenderSurface, SurfaceError};
use crate::synthesis;

pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const WHITE: &str = "#FFFFFF";
    pub const LIGHT_GREEN: &str = "#D6EAB0";
    pub const DARK_GREEN: &str = "#99CA3C";
    pub const GREY: &str = "#BFBFBF";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowKind {
    ModuleDescription,
    SectionHeader,
    SectionDescription,
    QuestionNumTitle,
    BaseDefinition,
    Comments,
    ProgrammingInstruction,
    RoutingInstruction,
    QuestionType,
    QuestionText,
    RespondentInstruction,
    GenericCode,
    ColumnCode,
    RowCode,
    Response,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    Normal,
    Bold,
    Italic,
}

/// Static formatting of one row kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowStyle {
    /// Fixed left-column text; `None` when the left text comes from the data.
    pub left_label: Option<&'static str>,
    pub format: TextFormat,
    pub fill: Option<&'static str>,
    pub text_color: &'static str,
    /// Spans both columns as one banner.
    pub merged: bool,
    /// Left cell centered and formatted apart from the right cell.
    pub separate_code_cell: bool,
    /// Takes the section row height and font size instead of the page defaults.
    pub banner: bool,
}

const PLAIN: RowStyle = RowStyle {
    left_label: None,
    format: TextFormat::Normal,
    fill: None,
    text_color: colors::BLACK,
    merged: false,
    separate_code_cell: false,
    banner: false,
};

impl RowStyle {
    /// Concrete formatting of a row under the page setup `setup`.
    pub fn resolve(&self, setup: &LayoutConfig) -> RowFormat {
        let (height, font_size) = if self.banner {
            (setup.section_row_height, setup.section_font_size)
        } else {
            (setup.row_height, setup.font_size)
        };
        RowFormat {
            format: self.format,
            fill: self.fill.map(str::to_string),
            text_color: self.text_color.to_string(),
            height,
            font_size,
            separate_code_cell: self.separate_code_cell,
        }
    }
}

/// Formatting a surface applies to one written row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFormat {
    pub format: TextFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    pub text_color: String,
    pub height: f64,
    pub font_size: f64,
    pub separate_code_cell: bool,
}

impl RowKind {
    /// Info rows in emission order, after the number/title row.
    pub const INFO: [RowKind; 7] = [
        RowKind::BaseDefinition,
        RowKind::Comments,
        RowKind::ProgrammingInstruction,
        RowKind::RoutingInstruction,
        RowKind::QuestionType,
        RowKind::QuestionText,
        RowKind::RespondentInstruction,
    ];

    pub fn style(self) -> RowStyle {
        match self {
            RowKind::SectionHeader => RowStyle {
                format: TextFormat::Bold,
                fill: Some(colors::DARK_GREEN),
                text_color: colors::WHITE,
                merged: true,
                banner: true,
                ..PLAIN
            },
            RowKind::ModuleDescription | RowKind::SectionDescription => RowStyle {
                format: TextFormat::Italic,
                merged: true,
                ..PLAIN
            },
            RowKind::QuestionNumTitle => RowStyle {
                format: TextFormat::Bold,
                ..PLAIN
            },
            RowKind::BaseDefinition => RowStyle {
                left_label: Some(headers::BASE_LABEL_DEFINITION),
                fill: Some(colors::LIGHT_GREEN),
                ..PLAIN
            },
            RowKind::Comments => RowStyle {
                left_label: Some(headers::COMMENTS),
                fill: Some(colors::GREY),
                ..PLAIN
            },
            RowKind::ProgrammingInstruction => RowStyle {
                left_label: Some(headers::PROG_INST),
                fill: Some(colors::LIGHT_GREEN),
                ..PLAIN
            },
            RowKind::RoutingInstruction => RowStyle {
                left_label: Some(headers::ROUT_INST),
                fill: Some(colors::LIGHT_GREEN),
                ..PLAIN
            },
            RowKind::QuestionType => RowStyle {
                left_label: Some(headers::QUESTION_TYPE),
                fill: Some(colors::LIGHT_GREEN),
                ..PLAIN
            },
            RowKind::QuestionText => RowStyle {
                left_label: Some(headers::QUESTION_TEXT),
                format: TextFormat::Bold,
                ..PLAIN
            },
            RowKind::RespondentInstruction => RowStyle {
                left_label: Some(headers::RESP_INST),
                format: TextFormat::Italic,
                ..PLAIN
            },
            RowKind::GenericCode => RowStyle {
                left_label: Some(headers::GENERIC_CODE),
                format: TextFormat::Bold,
                separate_code_cell: true,
                ..PLAIN
            },
            RowKind::ColumnCode => RowStyle {
                left_label: Some(headers::COLUMN_CODE),
                format: TextFormat::Bold,
                separate_code_cell: true,
                ..PLAIN
            },
            RowKind::RowCode => RowStyle {
                left_label: Some(headers::ROW_CODE),
                format: TextFormat::Bold,
                separate_code_cell: true,
                ..PLAIN
            },
            RowKind::Response => RowStyle {
                separate_code_cell: true,
                ..PLAIN
            },
        }
    }

    /// Row kind for a response with display code `code`.
    pub fn for_response_code(code: i32) -> RowKind {
        match code {
            ResponseCode::GENERIC_CODE => RowKind::GenericCode,
            ResponseCode::ROW_CODE => RowKind::RowCode,
            ResponseCode::COLUMN_CODE => RowKind::ColumnCode,
            _ => RowKind::Response,
        }
    }
}

// --- Addressing ---

/// Base-26 column letters, 1-based: 1 -> A, 26 -> Z, 27 -> AA.
pub fn column_name(column: u32) -> QreResult<String> {
    if column == 0 {
        return Err(QreError::range("column", column, "columns are 1-based"));
    }
    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    Ok(letters.into_iter().map(char::from).collect())
}

pub fn cell_ref(row: u32, column: u32) -> QreResult<String> {
    if row == 0 {
        return Err(QreError::range("row", row, "rows are 1-based"));
    }
    Ok(format!("{}{row}", column_name(column)?))
}

pub fn range_ref(start_row: u32, start_column: u32, end_row: u32, end_column: u32) -> QreResult<String> {
    Ok(format!(
        "{}:{}",
        cell_ref(start_row, start_column)?,
        cell_ref(end_row, end_column)?
    ))
}

// --- Page titles ---

pub const MAX_PAGE_TITLE_CHARS: usize = 31;
pub const FORBIDDEN_TITLE_CHARS: [char; 7] = [':', '\\', '/', '?', '*', '[', ']'];

/// Page title safe for spreadsheet surfaces.
pub fn page_title(title: &str, number: u32) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !FORBIDDEN_TITLE_CHARS.contains(c))
        .collect();
    let cleaned: String = cleaned.trim().chars().take(MAX_PAGE_TITLE_CHARS).collect();
    let cleaned = cleaned.trim_end().to_string();
    if cleaned.is_empty() {
        format!("Module {number}")
    } else {
        cleaned
    }
}

// --- Report ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSpan {
    pub question_id: QuestionId,
    pub qnum: String,
    pub start_row: u32,
    pub end_row: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    pub module_id: ModuleId,
    pub title: String,
    /// Last row written on the page; 0 when nothing was written.
    pub last_row: u32,
    pub questions: Vec<QuestionSpan>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutReport {
    pub pages: Vec<PageReport>,
    pub rows_written: u32,
}

// --- Engine ---

pub struct LayoutEngine<'a> {
    config: &'a LayoutConfig,
}

struct Cursor<'s> {
    surface: &'s mut dyn RenderSurface,
    row: u32,
    column: u32,
    last_written: u32,
    rows_written: u32,
}

impl Cursor<'_> {
    fn write(&mut self, left: &str, right: &str, kind: RowKind) -> Result<(), SurfaceError> {
        self.surface
            .write_row(self.row, self.column, left, right, kind)?;
        if kind.style().merged {
            self.surface
                .merge_range(self.row, self.column, self.column + 1)?;
        }
        self.last_written = self.row;
        self.rows_written += 1;
        self.row += 1;
        Ok(())
    }

    fn skip(&mut self) {
        self.row += 1;
    }
}

impl<'a> LayoutEngine<'a> {
    pub fn new(config: &'a LayoutConfig) -> Self {
        Self { config }
    }

    /// Lays out the whole document. The first surface failure aborts the walk.
    pub fn run(
        &self,
        doc: &Document,
        surface: &mut dyn RenderSurface,
    ) -> Result<LayoutReport, SurfaceError> {
        let mut report = LayoutReport::default();
        for module in doc.modules() {
            let (page, rows) = self.module(doc, module, surface)?;
            report.rows_written += rows;
            report.pages.push(page);
        }
        Ok(report)
    }

    fn module(
        &self,
        doc: &Document,
        module: &Module,
        surface: &mut dyn RenderSurface,
    ) -> Result<(PageReport, u32), SurfaceError> {
        let title = page_title(module.title(), module.number());
        surface.open_page(&title)?;
        surface.apply_page_setup(self.config)?;
        debug!(module = %module.id(), page = %title, "page opened");

        let mut cursor = Cursor {
            surface,
            row: self.config.first_row,
            column: self.config.first_column,
            last_written: 0,
            rows_written: 0,
        };
        let mut questions = Vec::new();

        if module.show_description() && !module.description().is_empty() {
            cursor.write(module.description(), "", RowKind::ModuleDescription)?;
            cursor.skip();
        }

        for section in doc.sections_of(module.id()) {
            self.section_header(section, &mut cursor)?;
            for question in doc.questions_of(section.id()) {
                questions.push(self.question(doc, question, &mut cursor)?);
            }
        }

        let page = PageReport {
            module_id: module.id(),
            title,
            last_row: cursor.last_written,
            questions,
        };
        Ok((page, cursor.rows_written))
    }

    fn section_header(&self, section: &Section, cursor: &mut Cursor<'_>) -> Result<(), SurfaceError> {
        cursor.write(&section.header_text(), "", RowKind::SectionHeader)?;
        if section.show_description() && !section.description().is_empty() {
            cursor.write(section.description(), "", RowKind::SectionDescription)?;
        }
        cursor.skip();
        Ok(())
    }

    fn question(
        &self,
        doc: &Document,
        question: &QuestionBlock,
        cursor: &mut Cursor<'_>,
    ) -> Result<QuestionSpan, SurfaceError> {
        let start_row = cursor.row;
        cursor.write(question.qnum(), question.title(), RowKind::QuestionNumTitle)?;

        let base = question.base_text();
        let info: [&str; 7] = [
            &base,
            question.comments(),
            question.prog_inst(),
            question.routing_inst(),
            question.question_type_label(),
            question.question_text(),
            question.respondent_inst(),
        ];
        for (kind, right) in RowKind::INFO.into_iter().zip(info) {
            let left = kind.style().left_label.unwrap_or_default();
            cursor.write(left, right, kind)?;
        }

        for response in doc.responses_of(question.id()) {
            let kind = RowKind::for_response_code(response.code());
            let left = synthesis::code_label(response.code());
            cursor.write(&left, response.text(), kind)?;
        }

        let end_row = cursor.row - 1;
        cursor
            .surface
            .draw_border(start_row, end_row, cursor.column, cursor.column + 1)?;
        cursor.skip();
        debug!(question = %question.id(), start_row, end_row, "question laid out");

        Ok(QuestionSpan {
            question_id: question.id(),
            qnum: question.qnum().to_string(),
            start_row,
            end_row,
        })
    }
}
