use crate::core::db::Column;
use crate::records::{RecordView, ReferenceValue};

/// Results Grid Module for addrdesk
///
/// Renders tabular rows as aligned plain text with a header, an underline
/// and a row-count footer. Only one page of rows is shown at a time.

/// Represents a row of cells in the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub cells: Vec<String>,
    /// Record id shown in the leading column, if any
    pub key: Option<i64>,
}

/// Represents the entire grid structure.
#[derive(Debug, Clone)]
pub struct ResultsGrid {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    pub page_size: usize,
    pub page: usize,
}

impl ResultsGrid {
    /// Creates a new, empty ResultsGrid.
    pub fn new(page_size: usize) -> Self {
        ResultsGrid {
            headers: Vec::new(),
            rows: Vec::new(),
            page_size: page_size.max(1),
            page: 0,
        }
    }

    /// Grid of address book records, one row per record, keyed by id.
    pub fn from_records(views: &[RecordView], page_size: usize) -> Self {
        let mut grid = ResultsGrid::new(page_size);
        let mut headers = vec!["#".to_string()];
        headers.extend(Column::ALL.iter().map(|c| c.label().to_string()));
        grid.set_headers(headers);
        for view in views {
            grid.add_row(Some(view.id), view.display_row());
        }
        grid
    }

    /// Grid of one reference table's values.
    pub fn from_reference_values(values: &[ReferenceValue], label: &str, page_size: usize) -> Self {
        let mut grid = ResultsGrid::new(page_size);
        grid.set_headers(vec!["#".to_string(), label.to_string()]);
        for value in values {
            grid.add_row(Some(value.id), vec![value.text.clone()]);
        }
        grid
    }

    /// Sets the headers for the grid.
    pub fn set_headers(&mut self, headers: Vec<String>) {
        self.headers = headers;
    }

    /// Adds a row to the grid. When `key` is set it becomes the first cell.
    pub fn add_row(&mut self, key: Option<i64>, cells: Vec<String>) {
        let mut row_cells = Vec::with_capacity(cells.len() + 1);
        if let Some(key) = key {
            row_cells.push(key.to_string());
        }
        row_cells.extend(cells);
        self.rows.push(Row { cells: row_cells, key });
    }

    pub fn page_count(&self) -> usize {
        self.rows.len().div_ceil(self.page_size).max(1)
    }

    /// Moves to the next page, returns false at the last page.
    pub fn next_page(&mut self) -> bool {
        if self.page + 1 < self.page_count() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev_page(&mut self) -> bool {
        if self.page > 0 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    fn visible_rows(&self) -> &[Row] {
        let start = (self.page * self.page_size).min(self.rows.len());
        let end = (start + self.page_size).min(self.rows.len());
        &self.rows[start..end]
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.cells.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths
    }

    /// Renders the current page with headers and a footer.
    pub fn render(&self) -> String {
        let widths = self.column_widths();
        let pad = |cells: &[String]| -> String {
            cells
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    let width = widths.get(i).copied().unwrap_or(0);
                    format!("{:<width$}", cell, width = width)
                })
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        let mut output = String::new();
        if !self.headers.is_empty() {
            output.push_str(&pad(&self.headers));
            output.push('\n');
            let underline: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            output.push_str(&underline.join("-|-"));
            output.push('\n');
        }
        for row in self.visible_rows() {
            output.push_str(&pad(&row.cells));
            output.push('\n');
        }

        let total = self.rows.len();
        if self.page_count() > 1 {
            output.push_str(&format!(
                "({} records, page {}/{})\n",
                total,
                self.page + 1,
                self.page_count()
            ));
        } else {
            output.push_str(&format!("({} records)\n", total));
        }
        output
    }
}
