//! Forms and dialog sessions.
//!
//! A `Form` is a generic value holder over a list of field descriptions; the
//! dialogs compose a form with the record service instead of specializing a
//! window per use case. A dialog session moves
//! `Open -> Editing -> Committed | Cancelled` and performs at most one write.

use crate::core::db::{Column, Connector, ReferenceKind};
use crate::core::{DeskError, OperationResult, Result};
use crate::records::{PersonRecord, RecordService, RecordView, ReferenceValue};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9+()\- ]+$").expect("phone pattern is valid"));

/// How a field is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Pick one display text from a reference table
    Choice(ReferenceKind),
    /// Free text
    Text,
}

/// Format constraint checked on non-blank values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Phone,
}

impl Pattern {
    pub fn matches(self, value: &str) -> bool {
        match self {
            Pattern::Phone => PHONE_PATTERN.is_match(value),
        }
    }
}

/// Description of one form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub column: Column,
    pub kind: FieldKind,
    pub required: bool,
    pub pattern: Option<Pattern>,
}

fn field(name: &'static str, column: Column, kind: FieldKind, required: bool) -> FieldSpec {
    FieldSpec {
        name,
        label: column.label(),
        column,
        kind,
        required,
        pattern: None,
    }
}

/// The eight fields of a person record, in grid order.
pub static PERSON_FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
    vec![
        field("fam", Column::Surname, FieldKind::Choice(ReferenceKind::Surname), true),
        field("name", Column::Name, FieldKind::Choice(ReferenceKind::Name), true),
        field("second_name", Column::Patronymic, FieldKind::Choice(ReferenceKind::Patronymic), false),
        field("street", Column::Street, FieldKind::Choice(ReferenceKind::Street), true),
        field("building", Column::Building, FieldKind::Text, true),
        field("building_korp", Column::BuildingSection, FieldKind::Text, false),
        field("apartment", Column::Apartment, FieldKind::Text, false),
        FieldSpec {
            pattern: Some(Pattern::Phone),
            ..field("phone", Column::Phone, FieldKind::Text, false)
        },
    ]
});

/// Field values keyed by field name. Blank means unset.
#[derive(Debug, Clone)]
pub struct Form {
    fields: &'static [FieldSpec],
    values: HashMap<&'static str, String>,
}

impl Form {
    pub fn new(fields: &'static [FieldSpec]) -> Self {
        Form {
            fields,
            values: HashMap::new(),
        }
    }

    /// An empty form over the person fields.
    pub fn person() -> Self {
        Form::new(PERSON_FIELDS.as_slice())
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let field_spec = self
            .field(name)
            .ok_or_else(|| DeskError::Validation(format!("unknown field '{}'", name)))?;
        self.values.insert(field_spec.name, value.trim().to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    /// Checks required fields and formats. Purely local.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        for field_spec in self.fields {
            let value = self.get(field_spec.name);
            if value.is_empty() {
                if field_spec.required {
                    problems.push(format!("{} is required", field_spec.label));
                }
                continue;
            }
            if let Some(pattern) = field_spec.pattern {
                if !pattern.matches(value) {
                    problems.push(format!("{} has an invalid format", field_spec.label));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(DeskError::Validation(problems.join("; ")))
        }
    }

    /// Builds a record, resolving choice texts to reference ids.
    pub fn to_record(&self, choices: &HashMap<ReferenceKind, Vec<ReferenceValue>>) -> Result<PersonRecord> {
        let mut record = PersonRecord::default();
        for field_spec in self.fields {
            let value = self.get(field_spec.name);
            let text = (!value.is_empty()).then(|| value.to_string());

            match field_spec.kind {
                FieldKind::Choice(kind) => {
                    let id = match text {
                        None => None,
                        Some(text) => Some(resolve_choice(choices, kind, &text)?),
                    };
                    match field_spec.column {
                        Column::Surname => record.surname_id = id,
                        Column::Name => record.name_id = id,
                        Column::Patronymic => record.patronymic_id = id,
                        Column::Street => record.street_id = id,
                        _ => {}
                    }
                }
                FieldKind::Text => match field_spec.column {
                    Column::Building => record.building = text,
                    Column::BuildingSection => record.building_section = text,
                    Column::Apartment => record.apartment = text,
                    Column::Phone => record.phone = text,
                    _ => {}
                },
            }
        }
        Ok(record)
    }

    /// Fills the form from a stored record's display texts.
    pub fn fill_from(&mut self, view: &RecordView) {
        for field_spec in self.fields {
            self.values.insert(field_spec.name, view.display(field_spec.column));
        }
    }
}

fn resolve_choice(
    choices: &HashMap<ReferenceKind, Vec<ReferenceValue>>,
    kind: ReferenceKind,
    text: &str,
) -> Result<i64> {
    choices
        .get(&kind)
        .and_then(|values| values.iter().find(|v| v.text == text))
        .map(|v| v.id)
        .ok_or_else(|| DeskError::Validation(format!("unknown {} '{}'", kind.label(), text)))
}

/// Lifecycle of a dialog session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    /// Reference choices and current data loaded
    Open,
    /// Local edits only, nothing written
    Editing,
    /// The single write succeeded
    Committed,
    /// Closed without writing
    Cancelled,
}

#[derive(Debug, Clone)]
enum DialogMode {
    Insert,
    Update { original: RecordView },
}

/// An insert or update dialog over the person fields.
pub struct DialogSession<'a, C: Connector> {
    service: &'a RecordService<C>,
    mode: DialogMode,
    form: Form,
    choices: HashMap<ReferenceKind, Vec<ReferenceValue>>,
    state: DialogState,
}

impl<'a, C: Connector> DialogSession<'a, C> {
    /// Opens an empty insert dialog.
    pub fn open_insert(service: &'a RecordService<C>) -> Result<Self> {
        Self::open(service, DialogMode::Insert, Form::person())
    }

    /// Opens an update dialog prefilled with `original`.
    pub fn open_update(service: &'a RecordService<C>, original: RecordView) -> Result<Self> {
        let mut form = Form::person();
        form.fill_from(&original);
        Self::open(service, DialogMode::Update { original }, form)
    }

    fn open(service: &'a RecordService<C>, mode: DialogMode, form: Form) -> Result<Self> {
        let mut choices = HashMap::new();
        for field_spec in form.fields() {
            if let FieldKind::Choice(kind) = field_spec.kind {
                choices.insert(kind, service.list_reference_values(kind)?);
            }
        }
        debug!("Dialog opened with {} choice lists", choices.len());

        Ok(DialogSession {
            service,
            mode,
            form,
            choices,
            state: DialogState::Open,
        })
    }

    pub fn state(&self) -> DialogState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, DialogState::Committed | DialogState::Cancelled)
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    /// Display choices of one reference kind.
    pub fn choices(&self, kind: ReferenceKind) -> &[ReferenceValue] {
        self.choices.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The record being edited, when this is an update dialog.
    pub fn original(&self) -> Option<&RecordView> {
        match &self.mode {
            DialogMode::Update { original } => Some(original),
            DialogMode::Insert => None,
        }
    }

    /// Changes one field locally.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.ensure_open()?;
        self.form.set(name, value)?;
        self.state = DialogState::Editing;
        Ok(())
    }

    /// Validates and performs the dialog's single write.
    ///
    /// On any error the session stays open so the values can be corrected.
    /// A successful write closes it as `Committed`; a soft failure keeps it open.
    pub fn commit(&mut self) -> Result<OperationResult> {
        self.ensure_open()?;
        self.form.validate()?;
        let record = self.form.to_record(&self.choices)?;

        let result = match &self.mode {
            DialogMode::Insert => self.service.insert_record(&record)?,
            DialogMode::Update { original } => self.service.update_record(&original.record, &record)?,
        };

        if result.success {
            self.state = DialogState::Committed;
        }
        Ok(result)
    }

    /// Closes the dialog without writing.
    pub fn cancel(&mut self) {
        if !self.is_closed() {
            self.state = DialogState::Cancelled;
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(DeskError::InvalidOperation("the dialog is already closed".to_string()));
        }
        Ok(())
    }
}

/// Maintenance dialog for one reference table.
pub struct ReferenceDialog<'a, C: Connector> {
    service: &'a RecordService<C>,
    kind: ReferenceKind,
    values: Vec<ReferenceValue>,
}

impl<'a, C: Connector> ReferenceDialog<'a, C> {
    pub fn open(service: &'a RecordService<C>, kind: ReferenceKind) -> Result<Self> {
        let values = service.list_reference_values(kind)?;
        Ok(ReferenceDialog { service, kind, values })
    }

    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    pub fn values(&self) -> &[ReferenceValue] {
        &self.values
    }

    pub fn insert(&mut self, new_value: &str) -> Result<OperationResult> {
        let new_value = new_value.trim();
        if new_value.is_empty() {
            return Err(DeskError::Validation("enter a new value".to_string()));
        }
        let result = self.service.insert_reference_value(self.kind, new_value)?;
        self.absorb(&result);
        Ok(result)
    }

    pub fn rename(&mut self, old_value: &str, new_value: &str) -> Result<OperationResult> {
        let new_value = new_value.trim();
        if old_value.is_empty() || new_value.is_empty() {
            return Err(DeskError::Validation(
                "pick a value to rename and enter the new text".to_string(),
            ));
        }
        let result = self
            .service
            .update_reference_value(self.kind, old_value, new_value)?;
        self.absorb(&result);
        Ok(result)
    }

    pub fn remove(&mut self, value: &str) -> Result<OperationResult> {
        if value.is_empty() {
            return Err(DeskError::Validation("pick a value to delete".to_string()));
        }
        let result = self.service.delete_reference_value(self.kind, value)?;
        self.absorb(&result);
        Ok(result)
    }

    // Replaces the local list with the reloaded rows carried by the result
    fn absorb(&mut self, result: &OperationResult) {
        if let Some(rows) = &result.data {
            self.values = rows
                .iter()
                .filter_map(|row| match row.as_slice() {
                    [id, text] => id.parse().ok().map(|id| ReferenceValue {
                        id,
                        text: text.clone(),
                    }),
                    _ => None,
                })
                .collect();
        }
    }
}
