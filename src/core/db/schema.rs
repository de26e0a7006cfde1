/// Schema Module
///
/// Fixed identifiers of the address book tables. Every table and column name
/// that ends up in statement text comes from the closed enums in this module,
/// so no caller-supplied identifier is ever interpolated into SQL.
use crate::core::{DeskError, Result};
use rusqlite::Connection;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Main table holding one row per person/address record.
pub const MAIN_TABLE: &str = "address_book";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS surname (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    fam TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS given_name (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    names TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS patronymic (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    second_name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS street (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    street TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS address_book (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    fam INTEGER REFERENCES surname (id),
    names INTEGER REFERENCES given_name (id),
    second_name INTEGER REFERENCES patronymic (id),
    street INTEGER REFERENCES street (id),
    bldng TEXT,
    bldng_k TEXT,
    appr TEXT,
    telef TEXT
);
"#;

/// The four lookup tables normalizing repeated text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReferenceKind {
    Surname,
    Name,
    Patronymic,
    Street,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 4] = [
        ReferenceKind::Surname,
        ReferenceKind::Name,
        ReferenceKind::Patronymic,
        ReferenceKind::Street,
    ];

    /// Table holding the values of this kind.
    pub fn table(self) -> &'static str {
        match self {
            ReferenceKind::Surname => "surname",
            ReferenceKind::Name => "given_name",
            ReferenceKind::Patronymic => "patronymic",
            ReferenceKind::Street => "street",
        }
    }

    /// Display-text column of the reference table.
    pub fn column(self) -> &'static str {
        match self {
            ReferenceKind::Surname => "fam",
            ReferenceKind::Name => "names",
            ReferenceKind::Patronymic => "second_name",
            ReferenceKind::Street => "street",
        }
    }

    /// Main-table column holding the foreign key into this reference table.
    pub fn main_column(self) -> Column {
        match self {
            ReferenceKind::Surname => Column::Surname,
            ReferenceKind::Name => Column::Name,
            ReferenceKind::Patronymic => Column::Patronymic,
            ReferenceKind::Street => Column::Street,
        }
    }

    pub fn label(self) -> &'static str {
        self.main_column().label()
    }

    /// Command-line keyword for this kind.
    pub fn keyword(self) -> &'static str {
        match self {
            ReferenceKind::Surname => "surname",
            ReferenceKind::Name => "name",
            ReferenceKind::Patronymic => "patronymic",
            ReferenceKind::Street => "street",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for ReferenceKind {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "surname" | "fam" => Ok(ReferenceKind::Surname),
            "name" | "names" | "given_name" => Ok(ReferenceKind::Name),
            "patronymic" | "second_name" => Ok(ReferenceKind::Patronymic),
            "street" => Ok(ReferenceKind::Street),
            other => Err(DeskError::InvalidOperation(format!(
                "unknown reference table '{}'. Expected one of: surname, name, patronymic, street",
                other
            ))),
        }
    }
}

/// Columns of the main table, in grid order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Surname,
    Name,
    Patronymic,
    Street,
    Building,
    BuildingSection,
    Apartment,
    Phone,
}

impl Column {
    pub const ALL: [Column; 8] = [
        Column::Surname,
        Column::Name,
        Column::Patronymic,
        Column::Street,
        Column::Building,
        Column::BuildingSection,
        Column::Apartment,
        Column::Phone,
    ];

    /// Column name in the main table.
    pub fn db_field(self) -> &'static str {
        match self {
            Column::Surname => "fam",
            Column::Name => "names",
            Column::Patronymic => "second_name",
            Column::Street => "street",
            Column::Building => "bldng",
            Column::BuildingSection => "bldng_k",
            Column::Apartment => "appr",
            Column::Phone => "telef",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Column::Surname => "Surname",
            Column::Name => "Name",
            Column::Patronymic => "Patronymic",
            Column::Street => "Street",
            Column::Building => "Building",
            Column::BuildingSection => "Section",
            Column::Apartment => "Apartment",
            Column::Phone => "Phone",
        }
    }

    /// Position in the grid and in the main-table column list.
    pub fn index(self) -> usize {
        Column::ALL
            .iter()
            .position(|c| *c == self)
            .unwrap_or_default()
    }
}

/// Creates any missing table. Existing tables are left untouched.
pub fn bootstrap(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)
        .map_err(|e| DeskError::Query(e.to_string()))?;
    info!("Address book schema is in place");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        bootstrap(&conn).unwrap();
        conn.execute("INSERT INTO street (street) VALUES ('Lenina')", []).unwrap();
        bootstrap(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM street", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_reference_kind_parsing() {
        assert_eq!("surname".parse::<ReferenceKind>().unwrap(), ReferenceKind::Surname);
        assert_eq!("NAME".parse::<ReferenceKind>().unwrap(), ReferenceKind::Name);
        assert_eq!("second_name".parse::<ReferenceKind>().unwrap(), ReferenceKind::Patronymic);
        assert!(matches!(
            "city".parse::<ReferenceKind>(),
            Err(DeskError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_column_order() {
        assert_eq!(Column::Surname.index(), 0);
        assert_eq!(Column::Phone.index(), 7);
        assert_eq!(ReferenceKind::Street.main_column(), Column::Street);
        assert_eq!(Column::BuildingSection.db_field(), "bldng_k");
    }
}
