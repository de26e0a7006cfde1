//! Record service: the operations a front end may call on the address book.
//!
//! Person records live in the main table; the four reference tables hold the
//! normalized display texts. Writes are single statements. Validation runs
//! before any connection is opened.

use crate::config::ConnectionConfig;
use crate::core::db::{Column, Connector, Database, Operation, ReferenceKind, SqliteConnector, MAIN_TABLE};
use crate::core::{DeskError, OperationResult, Result};
use rusqlite::types::Value;
use serde::Serialize;
use tracing::{info, warn};

const RECORD_COLUMNS: &str = "fam, names, second_name, street, bldng, bldng_k, appr, telef";

const INSERT_RECORD_SQL: &str = "INSERT INTO address_book \
     (fam, names, second_name, street, bldng, bldng_k, appr, telef) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

// Keyed by the full old row; IS compares NULLs as equal
const UPDATE_RECORD_SQL: &str = "UPDATE address_book SET \
     fam = ?1, names = ?2, second_name = ?3, street = ?4, \
     bldng = ?5, bldng_k = ?6, appr = ?7, telef = ?8 \
     WHERE fam IS ?9 AND names IS ?10 AND second_name IS ?11 AND street IS ?12 \
     AND bldng IS ?13 AND bldng_k IS ?14 AND appr IS ?15 AND telef IS ?16";

const DELETE_RECORD_SQL: &str = "DELETE FROM address_book WHERE id = ?1";

const VIEW_SQL: &str = "SELECT ab.id, ab.fam, ab.names, ab.second_name, ab.street, \
     ab.bldng, ab.bldng_k, ab.appr, ab.telef, \
     s.fam, n.names, p.second_name, st.street \
     FROM address_book ab \
     LEFT JOIN surname s ON s.id = ab.fam \
     LEFT JOIN given_name n ON n.id = ab.names \
     LEFT JOIN patronymic p ON p.id = ab.second_name \
     LEFT JOIN street st ON st.id = ab.street";

/// Columns that must be filled before a record may be inserted.
pub const REQUIRED_COLUMNS: [Column; 4] = [Column::Surname, Column::Name, Column::Street, Column::Building];

/// Field values of one person/address record.
///
/// The first four fields are ids into the reference tables. `None` means
/// "not yet set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersonRecord {
    pub surname_id: Option<i64>,
    pub name_id: Option<i64>,
    pub patronymic_id: Option<i64>,
    pub street_id: Option<i64>,
    pub building: Option<String>,
    pub building_section: Option<String>,
    pub apartment: Option<String>,
    pub phone: Option<String>,
}

impl PersonRecord {
    /// SQL value of `column`; unset fields bind as NULL.
    pub fn value(&self, column: Column) -> Value {
        let id = |v: Option<i64>| v.map_or(Value::Null, Value::Integer);
        let text = |v: &Option<String>| v.clone().map_or(Value::Null, Value::Text);
        match column {
            Column::Surname => id(self.surname_id),
            Column::Name => id(self.name_id),
            Column::Patronymic => id(self.patronymic_id),
            Column::Street => id(self.street_id),
            Column::Building => text(&self.building),
            Column::BuildingSection => text(&self.building_section),
            Column::Apartment => text(&self.apartment),
            Column::Phone => text(&self.phone),
        }
    }

    /// All eight values in main-table column order.
    pub fn params(&self) -> Vec<Value> {
        Column::ALL.iter().map(|c| self.value(*c)).collect()
    }

    /// Columns whose value differs between `self` and `other`.
    pub fn changed_columns(&self, other: &PersonRecord) -> Vec<Column> {
        Column::ALL
            .iter()
            .copied()
            .filter(|c| self.value(*c) != other.value(*c))
            .collect()
    }

    /// Required columns that are unset or blank.
    pub fn missing_required(&self) -> Vec<Column> {
        REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| match self.value(*c) {
                Value::Null => true,
                Value::Text(t) => t.trim().is_empty(),
                _ => false,
            })
            .collect()
    }

    /// Reads the eight main-table columns starting at `offset`.
    fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        let at = |column: Column| offset + column.index();
        Ok(PersonRecord {
            surname_id: row.get(at(Column::Surname))?,
            name_id: row.get(at(Column::Name))?,
            patronymic_id: row.get(at(Column::Patronymic))?,
            street_id: row.get(at(Column::Street))?,
            building: row.get(at(Column::Building))?,
            building_section: row.get(at(Column::BuildingSection))?,
            apartment: row.get(at(Column::Apartment))?,
            phone: row.get(at(Column::Phone))?,
        })
    }
}

/// A stored record with its row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRow {
    pub id: i64,
    pub record: PersonRecord,
}

/// A stored record joined to the display texts of its references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordView {
    pub id: i64,
    pub record: PersonRecord,
    pub surname: Option<String>,
    pub name: Option<String>,
    pub patronymic: Option<String>,
    pub street: Option<String>,
}

impl RecordView {
    /// Display text of `column`, blank when unset.
    pub fn display(&self, column: Column) -> String {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        match column {
            Column::Surname => text(&self.surname),
            Column::Name => text(&self.name),
            Column::Patronymic => text(&self.patronymic),
            Column::Street => text(&self.street),
            Column::Building => text(&self.record.building),
            Column::BuildingSection => text(&self.record.building_section),
            Column::Apartment => text(&self.record.apartment),
            Column::Phone => text(&self.record.phone),
        }
    }

    /// The eight grid cells in column order.
    pub fn display_row(&self) -> Vec<String> {
        Column::ALL.iter().map(|c| self.display(*c)).collect()
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(RecordView {
            id: row.get(0)?,
            record: PersonRecord::from_row(row, 1)?,
            surname: row.get(9)?,
            name: row.get(10)?,
            patronymic: row.get(11)?,
            street: row.get(12)?,
        })
    }
}

/// One entry of a reference table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceValue {
    pub id: i64,
    pub text: String,
}

/// Rows of `[id, text]` as carried in `OperationResult::data`.
pub fn reference_rows(values: &[ReferenceValue]) -> Vec<Vec<String>> {
    values
        .iter()
        .map(|v| vec![v.id.to_string(), v.text.clone()])
        .collect()
}

/// Escapes LIKE wildcards so a search term matches literally.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Address book operations exposed to front ends.
#[derive(Debug)]
pub struct RecordService<C: Connector = SqliteConnector> {
    db: Database<C>,
}

impl RecordService<SqliteConnector> {
    pub fn new(config: ConnectionConfig) -> Self {
        RecordService::with_database(Database::new(config))
    }
}

impl<C: Connector> RecordService<C> {
    pub fn with_database(db: Database<C>) -> Self {
        RecordService { db }
    }

    pub fn database(&self) -> &Database<C> {
        &self.db
    }

    /// All records in row-id order.
    pub fn list_records(&self) -> Result<Vec<PersonRow>> {
        let sql = format!("SELECT id, {} FROM {} ORDER BY id", RECORD_COLUMNS, MAIN_TABLE);
        self.db.query_map(&sql, &[], |row| {
            Ok(PersonRow {
                id: row.get(0)?,
                record: PersonRecord::from_row(row, 1)?,
            })
        })
    }

    /// All records joined to their reference texts, in row-id order.
    pub fn list_record_views(&self) -> Result<Vec<RecordView>> {
        let sql = format!("{} ORDER BY ab.id", VIEW_SQL);
        self.db.query_map(&sql, &[], RecordView::from_row)
    }

    /// Records whose surname, name, patronymic, street or phone contains `term`.
    pub fn search_records(&self, term: &str) -> Result<Vec<RecordView>> {
        let term = term.trim();
        if term.is_empty() {
            return self.list_record_views();
        }
        let sql = format!(
            "{} WHERE s.fam LIKE ?1 ESCAPE '\\' OR n.names LIKE ?1 ESCAPE '\\' \
             OR p.second_name LIKE ?1 ESCAPE '\\' OR st.street LIKE ?1 ESCAPE '\\' \
             OR ab.telef LIKE ?1 ESCAPE '\\' ORDER BY ab.id",
            VIEW_SQL
        );
        self.db
            .query_map(&sql, &[Value::Text(like_pattern(term))], RecordView::from_row)
    }

    /// One joined record by row id.
    pub fn record_view(&self, id: i64) -> Result<Option<RecordView>> {
        let sql = format!("{} WHERE ab.id = ?1", VIEW_SQL);
        let mut views = self
            .db
            .query_map(&sql, &[Value::Integer(id)], RecordView::from_row)?;
        Ok(views.pop())
    }

    /// Inserts a record after checking the required fields.
    ///
    /// # Returns
    ///
    /// `DeskError::Validation` (no connection opened) when surname, name,
    /// street or building is missing.
    pub fn insert_record(&self, record: &PersonRecord) -> Result<OperationResult> {
        let missing = record.missing_required();
        if !missing.is_empty() {
            let labels: Vec<&str> = missing.iter().map(|c| c.label()).collect();
            return Err(DeskError::Validation(format!(
                "fill in all required fields: {}",
                labels.join(", ")
            )));
        }

        self.db.execute(INSERT_RECORD_SQL, &record.params())?;
        info!("Inserted address book record");
        Ok(OperationResult::ok())
    }

    /// Replaces `old` with `new`.
    ///
    /// # Returns
    ///
    /// `DeskError::Validation("nothing to save")` (no connection opened) when
    /// no field differs; a failed result when no stored row equals `old`.
    pub fn update_record(&self, old: &PersonRecord, new: &PersonRecord) -> Result<OperationResult> {
        let changed = old.changed_columns(new);
        if changed.is_empty() {
            return Err(DeskError::Validation("nothing to save".to_string()));
        }

        let mut params = new.params();
        params.extend(old.params());
        let result = self.db.execute(UPDATE_RECORD_SQL, &params)?;

        if result.rows_affected == 0 {
            warn!("Update matched no record");
            return Ok(OperationResult::failure("the record was changed or removed by someone else"));
        }
        info!("Updated {} record(s), {} field(s) changed", result.rows_affected, changed.len());
        Ok(OperationResult::ok())
    }

    /// Deletes the record with row id `id`.
    pub fn delete_record(&self, id: i64) -> Result<OperationResult> {
        let result = self.db.execute(DELETE_RECORD_SQL, &[Value::Integer(id)])?;
        if result.rows_affected == 0 {
            return Ok(OperationResult::failure(format!("no record with id {}", id)));
        }
        info!("Deleted record {}", id);
        Ok(OperationResult::ok())
    }

    /// Values of one reference table in id order.
    pub fn list_reference_values(&self, kind: ReferenceKind) -> Result<Vec<ReferenceValue>> {
        let sql = format!("SELECT id, {} FROM {} ORDER BY id", kind.column(), kind.table());
        self.db.query_map(&sql, &[], |row| {
            Ok(ReferenceValue {
                id: row.get(0)?,
                text: row.get(1)?,
            })
        })
    }

    pub fn insert_reference_value(&self, kind: ReferenceKind, value: &str) -> Result<OperationResult> {
        let result = self
            .db
            .dispatch(kind, Operation::Insert, None, Some(value.trim()))?;
        self.reload_after(kind, result)
    }

    /// Renames the value whose display text is `old` to `new`.
    pub fn update_reference_value(&self, kind: ReferenceKind, old: &str, new: &str) -> Result<OperationResult> {
        let result = self
            .db
            .dispatch(kind, Operation::Update, Some(old), Some(new.trim()))?;
        self.reload_after(kind, result)
    }

    pub fn delete_reference_value(&self, kind: ReferenceKind, value: &str) -> Result<OperationResult> {
        let result = self.db.dispatch(kind, Operation::Delete, Some(value), None)?;
        self.reload_after(kind, result)
    }

    // The caller's choice list is refreshed whether or not the edit succeeded.
    // A failed reload leaves `data` unset and never turns the result into an error.
    fn reload_after(&self, kind: ReferenceKind, mut result: OperationResult) -> Result<OperationResult> {
        match self.list_reference_values(kind) {
            Ok(values) => result.data = Some(reference_rows(&values)),
            Err(e) => {
                warn!("Could not reload {} values: {}", kind.table(), e);
                result.data = None;
            }
        }
        Ok(result)
    }
}
