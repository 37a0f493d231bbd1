//! Rendering Surface Contract
//!
//! The layout engine talks to its output only through [`RenderSurface`].
//! Two surfaces ship with the crate: [`RecordingSurface`] keeps an ordered,
//! serializable log of every call, and [`GridSurface`] fills an in-memory
//! cell grid that can be dumped as TSV.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use thiserror::Error;

use crate::config::LayoutConfig;
use crate::error::QreError;
use crate::layout::{cell_ref, range_ref, RowFormat, RowKind};

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("{0} called before any page was opened")]
    NoPage(&'static str),

    #[error("invalid range: rows {start_row}..={end_row}, columns {start_column}..={end_column}")]
    InvalidRange {
        start_row: u32,
        end_row: u32,
        start_column: u32,
        end_column: u32,
    },

    #[error("bad cell address: {0}")]
    Address(#[from] QreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the layout engine needs from an output backend.
///
/// Rows and columns are 1-based. A failing call aborts the remaining walk.
pub trait RenderSurface {
    fn open_page(&mut self, title: &str) -> Result<(), SurfaceError>;

    /// Column widths, row heights, fonts and wrapping for the open page.
    /// Rows written afterwards are formatted from their kind under this setup.
    fn apply_page_setup(&mut self, setup: &LayoutConfig) -> Result<(), SurfaceError>;

    fn write_row(
        &mut self,
        row: u32,
        column: u32,
        left: &str,
        right: &str,
        kind: RowKind,
    ) -> Result<(), SurfaceError>;

    fn merge_range(&mut self, row: u32, start_column: u32, end_column: u32)
        -> Result<(), SurfaceError>;

    fn draw_border(
        &mut self,
        start_row: u32,
        end_row: u32,
        start_column: u32,
        end_column: u32,
    ) -> Result<(), SurfaceError>;

    fn set_page_visible(&mut self, visible: bool) -> Result<(), SurfaceError>;

    fn activate_first_page(&mut self) -> Result<(), SurfaceError>;
}

fn check_range(
    start_row: u32,
    end_row: u32,
    start_column: u32,
    end_column: u32,
) -> Result<(), SurfaceError> {
    if start_row == 0 || start_column == 0 || end_row < start_row || end_column < start_column {
        return Err(SurfaceError::InvalidRange {
            start_row,
            end_row,
            start_column,
            end_column,
        });
    }
    Ok(())
}

// --- Recording surface ---

/// One recorded surface call. Cell addresses are A1-style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum SurfaceOp {
    OpenPage {
        title: String,
    },
    #[serde(rename_all = "camelCase")]
    ApplyPageSetup {
        left_column_width: f64,
        right_column_width: f64,
        row_height: f64,
        section_row_height: f64,
        font: String,
        font_size: f64,
        section_font_size: f64,
        word_wrap: bool,
    },
    #[serde(rename_all = "camelCase")]
    WriteRow {
        page: usize,
        row: u32,
        left_cell: String,
        right_cell: String,
        left: String,
        right: String,
        kind: RowKind,
        format: RowFormat,
    },
    MergeRange {
        page: usize,
        range: String,
    },
    DrawBorder {
        page: usize,
        range: String,
    },
    SetPageVisible {
        visible: bool,
    },
    ActivateFirstPage,
}

/// A written row as seen through [`RecordingSurface::rows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedRow<'a> {
    pub page: usize,
    pub row: u32,
    pub left: &'a str,
    pub right: &'a str,
    pub kind: RowKind,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    ops: Vec<SurfaceOp>,
    pages: Vec<String>,
    /// Setup of the open page; defaults until `apply_page_setup` is called.
    setup: LayoutConfig,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<SurfaceOp> {
        self.ops
    }

    pub fn page_titles(&self) -> &[String] {
        &self.pages
    }

    pub fn rows(&self) -> Vec<RecordedRow<'_>> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                SurfaceOp::WriteRow {
                    page,
                    row,
                    left,
                    right,
                    kind,
                    ..
                } => Some(RecordedRow {
                    page: *page,
                    row: *row,
                    left,
                    right,
                    kind: *kind,
                }),
                _ => None,
            })
            .collect()
    }

    /// Border ranges in the order they were drawn.
    pub fn borders(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                SurfaceOp::DrawBorder { range, .. } => Some(range.as_str()),
                _ => None,
            })
            .collect()
    }

    fn current_page(&self, operation: &'static str) -> Result<usize, SurfaceError> {
        match self.pages.len() {
            0 => Err(SurfaceError::NoPage(operation)),
            n => Ok(n - 1),
        }
    }
}

impl RenderSurface for RecordingSurface {
    fn open_page(&mut self, title: &str) -> Result<(), SurfaceError> {
        self.pages.push(title.to_string());
        self.setup = LayoutConfig::default();
        self.ops.push(SurfaceOp::OpenPage {
            title: title.to_string(),
        });
        Ok(())
    }

    fn apply_page_setup(&mut self, setup: &LayoutConfig) -> Result<(), SurfaceError> {
        self.current_page("apply_page_setup")?;
        self.ops.push(SurfaceOp::ApplyPageSetup {
            left_column_width: setup.left_column_width,
            right_column_width: setup.right_column_width,
            row_height: setup.row_height,
            section_row_height: setup.section_row_height,
            font: setup.font.clone(),
            font_size: setup.font_size,
            section_font_size: setup.section_font_size,
            word_wrap: setup.word_wrap,
        });
        self.setup = setup.clone();
        Ok(())
    }

    fn write_row(
        &mut self,
        row: u32,
        column: u32,
        left: &str,
        right: &str,
        kind: RowKind,
    ) -> Result<(), SurfaceError> {
        let page = self.current_page("write_row")?;
        self.ops.push(SurfaceOp::WriteRow {
            page,
            row,
            left_cell: cell_ref(row, column)?,
            right_cell: cell_ref(row, column + 1)?,
            left: left.to_string(),
            right: right.to_string(),
            kind,
            format: kind.style().resolve(&self.setup),
        });
        Ok(())
    }

    fn merge_range(
        &mut self,
        row: u32,
        start_column: u32,
        end_column: u32,
    ) -> Result<(), SurfaceError> {
        let page = self.current_page("merge_range")?;
        check_range(row, row, start_column, end_column)?;
        self.ops.push(SurfaceOp::MergeRange {
            page,
            range: range_ref(row, start_column, row, end_column)?,
        });
        Ok(())
    }

    fn draw_border(
        &mut self,
        start_row: u32,
        end_row: u32,
        start_column: u32,
        end_column: u32,
    ) -> Result<(), SurfaceError> {
        let page = self.current_page("draw_border")?;
        check_range(start_row, end_row, start_column, end_column)?;
        self.ops.push(SurfaceOp::DrawBorder {
            page,
            range: range_ref(start_row, start_column, end_row, end_column)?,
        });
        Ok(())
    }

    fn set_page_visible(&mut self, visible: bool) -> Result<(), SurfaceError> {
        self.ops.push(SurfaceOp::SetPageVisible { visible });
        Ok(())
    }

    fn activate_first_page(&mut self) -> Result<(), SurfaceError> {
        self.current_page("activate_first_page")?;
        self.ops.push(SurfaceOp::ActivateFirstPage);
        Ok(())
    }
}

// --- Grid surface ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridRow {
    pub left: String,
    pub right: String,
    pub kind: RowKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPage {
    pub title: String,
    pub rows: BTreeMap<u32, GridRow>,
    /// (row, start column, end column)
    pub merges: Vec<(u32, u32, u32)>,
    /// (start row, end row, start column, end column)
    pub borders: Vec<(u32, u32, u32, u32)>,
}

/// In-memory two-column grid, one page per module.
#[derive(Debug, Clone, Default)]
pub struct GridSurface {
    pages: Vec<GridPage>,
    visible: bool,
    active_page: Option<usize>,
}

impl GridSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> &[GridPage] {
        &self.pages
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn active_page(&self) -> Option<usize> {
        self.active_page
    }

    fn page_mut(&mut self, operation: &'static str) -> Result<&mut GridPage, SurfaceError> {
        self.pages.last_mut().ok_or(SurfaceError::NoPage(operation))
    }

    /// Tab-separated dump: a `# title` line per page, then one line per row
    /// from row 1 to the last written row. Unwritten rows are empty lines.
    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        for page in &self.pages {
            out.push_str("# ");
            out.push_str(&page.title);
            out.push('\n');
            let last = page.rows.keys().next_back().copied().unwrap_or(0);
            for row in 1..=last {
                if let Some(cells) = page.rows.get(&row) {
                    out.push_str(&tsv_escape(&cells.left));
                    out.push('\t');
                    out.push_str(&tsv_escape(&cells.right));
                }
                out.push('\n');
            }
        }
        out
    }

    pub fn write_tsv<W: Write>(&self, mut writer: W) -> Result<(), SurfaceError> {
        writer.write_all(self.to_tsv().as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

fn tsv_escape(cell: &str) -> String {
    cell.replace('\t', " ").replace('\n', "\\n")
}

impl RenderSurface for GridSurface {
    fn open_page(&mut self, title: &str) -> Result<(), SurfaceError> {
        self.pages.push(GridPage {
            title: title.to_string(),
            ..GridPage::default()
        });
        Ok(())
    }

    fn apply_page_setup(&mut self, _setup: &LayoutConfig) -> Result<(), SurfaceError> {
        // Plain text has no widths or fonts.
        self.page_mut("apply_page_setup").map(|_| ())
    }

    fn write_row(
        &mut self,
        row: u32,
        column: u32,
        left: &str,
        right: &str,
        kind: RowKind,
    ) -> Result<(), SurfaceError> {
        check_range(row, row, column, column + 1)?;
        let page = self.page_mut("write_row")?;
        page.rows.insert(
            row,
            GridRow {
                left: left.to_string(),
                right: right.to_string(),
                kind,
            },
        );
        Ok(())
    }

    fn merge_range(
        &mut self,
        row: u32,
        start_column: u32,
        end_column: u32,
    ) -> Result<(), SurfaceError> {
        check_range(row, row, start_column, end_column)?;
        self.page_mut("merge_range")?
            .merges
            .push((row, start_column, end_column));
        Ok(())
    }

    fn draw_border(
        &mut self,
        start_row: u32,
        end_row: u32,
        start_column: u32,
        end_column: u32,
    ) -> Result<(), SurfaceError> {
        check_range(start_row, end_row, start_column, end_column)?;
        self.page_mut("draw_border")?
            .borders
            .push((start_row, end_row, start_column, end_column));
        Ok(())
    }

    fn set_page_visible(&mut self, visible: bool) -> Result<(), SurfaceError> {
        self.visible = visible;
        Ok(())
    }

    fn activate_first_page(&mut self) -> Result<(), SurfaceError> {
        if self.pages.is_empty() {
            return Err(SurfaceError::NoPage("activate_first_page"));
        }
        self.active_page = Some(0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writing_before_open_page_fails() {
        let mut surface = RecordingSurface::new();
        let err = surface
            .write_row(1, 1, "a", "b", RowKind::Response)
            .unwrap_err();
        assert!(matches!(err, SurfaceError::NoPage("write_row")));

        let mut grid = GridSurface::new();
        assert!(grid.activate_first_page().is_err());
    }

    #[test]
    fn recording_uses_a1_addresses() {
        let mut surface = RecordingSurface::new();
        surface.open_page("Screener").unwrap();
        surface.write_row(3, 1, "1", "Yes", RowKind::Response).unwrap();
        surface.draw_border(2, 4, 1, 2).unwrap();
        surface.merge_range(1, 1, 2).unwrap();

        match &surface.ops()[1] {
            SurfaceOp::WriteRow {
                left_cell,
                right_cell,
                ..
            } => {
                assert_eq!(left_cell, "A3");
                assert_eq!(right_cell, "B3");
            }
            other => panic!("unexpected op {other:?}"),
        }
        assert_eq!(surface.borders(), ["A2:B4"]);
    }

    #[test]
    fn rows_follow_the_page_setup() {
        let mut surface = RecordingSurface::new();
        surface.open_page("Screener").unwrap();
        let setup = LayoutConfig {
            row_height: 20.0,
            section_font_size: 18.0,
            ..LayoutConfig::default()
        };
        surface.apply_page_setup(&setup).unwrap();
        surface.write_row(1, 1, "SECTION A: Intro", "", RowKind::SectionHeader).unwrap();
        surface.write_row(3, 1, "1", "Yes", RowKind::Response).unwrap();

        let formats: Vec<_> = surface
            .ops()
            .iter()
            .filter_map(|op| match op {
                SurfaceOp::WriteRow { format, .. } => Some((format.height, format.font_size)),
                _ => None,
            })
            .collect();
        assert_eq!(formats, [(27.75, 18.0), (20.0, 10.0)]);

        // A new page starts from the defaults again.
        surface.open_page("Usage").unwrap();
        surface.write_row(1, 1, "1", "Yes", RowKind::Response).unwrap();
        match surface.ops().last() {
            Some(SurfaceOp::WriteRow { format, .. }) => assert_eq!(format.height, 14.25),
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn reversed_border_is_rejected() {
        let mut surface = RecordingSurface::new();
        surface.open_page("p").unwrap();
        assert!(matches!(
            surface.draw_border(5, 4, 1, 2),
            Err(SurfaceError::InvalidRange { .. })
        ));
    }

    #[test]
    fn ops_serialize_with_op_tag() {
        let op = SurfaceOp::MergeRange {
            page: 0,
            range: "A1:B1".into(),
        };
        let json = serde_json::to_string(&op).unwrap();
        assert_eq!(json, r#"{"op":"mergeRange","page":0,"range":"A1:B1"}"#);
    }

    #[test]
    fn grid_tsv_keeps_blank_rows() {
        let mut grid = GridSurface::new();
        grid.open_page("Screener").unwrap();
        grid.write_row(1, 1, "SECTION A: Intro", "", RowKind::SectionHeader)
            .unwrap();
        grid.write_row(3, 1, "Q1", "Age\tgroup", RowKind::QuestionNumTitle)
            .unwrap();
        assert_eq!(grid.to_tsv(), "# Screener\nSECTION A: Intro\t\n\nQ1\tAge group\n");

        let mut buf = Vec::new();
        grid.write_tsv(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), grid.to_tsv());
    }
}
