use crate::command_palette::CommandPalette;
use crate::config::UiConfig;
use crate::core::db::{Connector, ReferenceKind};
use crate::core::{DeskError, OperationResult, Result};
use crate::form::{DialogSession, FieldKind, ReferenceDialog};
use crate::records::RecordService;
use crate::results_grid::ResultsGrid;
use std::io::{BufRead, Write};
use tracing::{debug, error};

/// Represents a parsed REPL command.
#[derive(Debug, PartialEq)]
pub enum Command {
    List,
    Search(String),
    Insert,
    Update(i64),
    Delete(i64),
    Ref { kind: ReferenceKind, action: RefAction },
    Next,
    Prev,
    Help,
    Quit,
    Unknown(String),
}

/// What to do with a reference table.
#[derive(Debug, PartialEq)]
pub enum RefAction {
    Show,
    Add(String),
    Rename { old: String, new: String },
    Remove(String),
}

/// Parses a user input string into a corresponding `Command`.
///
/// If the input starts with a colon (`:`), it is interpreted as a command.
/// Otherwise it is a search term.
pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    if !input.starts_with(':') {
        return Command::Search(input.to_string());
    }
    let trimmed = &input[1..];
    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    if parts.is_empty() {
        return Command::Unknown(input.to_string());
    }
    let unknown = || Command::Unknown(input.to_string());
    let id_arg = || parts.get(1).and_then(|s| s.parse::<i64>().ok());

    match parts[0] {
        "list" => Command::List,
        "search" => Command::Search(parts[1..].join(" ")),
        "insert" => Command::Insert,
        "update" => id_arg().map(Command::Update).unwrap_or_else(unknown),
        "delete" => id_arg().map(Command::Delete).unwrap_or_else(unknown),
        "ref" => {
            let kind = match parts.get(1).map(|s| s.parse::<ReferenceKind>()) {
                Some(Ok(kind)) => kind,
                _ => return unknown(),
            };
            let action = match (parts.get(2).copied(), parts.len()) {
                (None, _) => RefAction::Show,
                (Some("add"), n) if n > 3 => RefAction::Add(parts[3..].join(" ")),
                (Some("rm"), n) if n > 3 => RefAction::Remove(parts[3..].join(" ")),
                (Some("rename"), n) if n > 3 => match split_rename(&parts[3..]) {
                    Some((old, new)) => RefAction::Rename { old, new },
                    None => return unknown(),
                },
                _ => return unknown(),
            };
            Command::Ref { kind, action }
        }
        "next" => Command::Next,
        "prev" => Command::Prev,
        "help" => Command::Help,
        "quit" | "q" => Command::Quit,
        _ => unknown(),
    }
}

/// Splits `old words => new words`. Both sides must be non-empty.
fn split_rename(words: &[&str]) -> Option<(String, String)> {
    let arrow = words.iter().position(|w| *w == "=>")?;
    let (old, new) = (&words[..arrow], &words[arrow + 1..]);
    if old.is_empty() || new.is_empty() {
        return None;
    }
    Some((old.join(" "), new.join(" ")))
}

/// Runs the interactive shell until `:quit` or end of input.
///
/// Every database or validation error is reported and the loop continues;
/// only failures writing to `output` end the session.
pub fn run_repl<C, R, W>(service: &RecordService<C>, ui: &UiConfig, input: R, output: W) -> Result<()>
where
    C: Connector,
    R: BufRead,
    W: Write,
{
    let mut repl = Repl {
        service,
        ui,
        input,
        output,
        palette: CommandPalette::new(),
        grid: None,
    };
    repl.run()
}

struct Repl<'a, C: Connector, R, W> {
    service: &'a RecordService<C>,
    ui: &'a UiConfig,
    input: R,
    output: W,
    palette: CommandPalette,
    grid: Option<ResultsGrid>,
}

impl<C: Connector, R: BufRead, W: Write> Repl<'_, C, R, W> {
    fn run(&mut self) -> Result<()> {
        writeln!(self.output, "addrdesk: type :help for commands, :quit to exit.")?;

        while let Some(line) = self.prompt(">")? {
            if line.is_empty() {
                continue;
            }
            let command = parse_command(&line);
            debug!("Parsed command: {:?}", command);
            if command == Command::Quit {
                break;
            }
            if let Err(e) = self.dispatch(command) {
                if let DeskError::Io(_) = e {
                    return Err(e);
                }
                error!("Command failed: {}", e);
                writeln!(self.output, "Error: {}", e.user_message())?;
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::List => {
                let views = self.service.list_record_views()?;
                self.show(ResultsGrid::from_records(&views, self.ui.page_size))
            }
            Command::Search(term) => {
                let views = self.service.search_records(&term)?;
                self.show(ResultsGrid::from_records(&views, self.ui.page_size))
            }
            Command::Insert => self.insert(),
            Command::Update(id) => self.update(id),
            Command::Delete(id) => {
                if !self.confirm_destructive(&format!("Delete record {}?", id))? {
                    return Ok(());
                }
                let result = self.service.delete_record(id)?;
                self.report(&result)?;
                Ok(())
            }
            Command::Ref { kind, action } => self.reference(kind, action),
            Command::Next => self.turn_page(true),
            Command::Prev => self.turn_page(false),
            Command::Help => {
                let help = self.palette.help_text();
                write!(self.output, "{}", help)?;
                writeln!(self.output, "Text without a leading ':' searches the records.")?;
                Ok(())
            }
            Command::Unknown(input) => {
                writeln!(self.output, "Unknown command: {}", input)?;
                let query = input.trim_start_matches(':').split_whitespace().next().unwrap_or("");
                let suggestions = self.palette.filter_commands(query);
                if !query.is_empty() && !suggestions.is_empty() {
                    writeln!(self.output, "Did you mean:")?;
                    for suggestion in suggestions {
                        writeln!(self.output, "  {} - {}", suggestion.usage, suggestion.description)?;
                    }
                }
                Ok(())
            }
            Command::Quit => Ok(()),
        }
    }

    fn insert(&mut self) -> Result<()> {
        let mut session = DialogSession::open_insert(self.service)?;
        let mut retry = false;
        loop {
            if !self.fill(&mut session, retry)? {
                session.cancel();
                writeln!(self.output, "Cancelled.")?;
                return Ok(());
            }
            match session.commit() {
                Ok(result) => {
                    self.report(&result)?;
                    if session.is_closed() {
                        return Ok(());
                    }
                }
                Err(DeskError::Io(e)) => return Err(DeskError::Io(e)),
                Err(e) => writeln!(self.output, "Error: {}", e.user_message())?,
            }
            if !self.ask("Edit again?")? {
                session.cancel();
                writeln!(self.output, "Cancelled.")?;
                return Ok(());
            }
            retry = true;
        }
    }

    fn update(&mut self, id: i64) -> Result<()> {
        let original = match self.service.record_view(id)? {
            Some(view) => view,
            None => {
                writeln!(self.output, "No record with id {}.", id)?;
                return Ok(());
            }
        };
        let mut session = DialogSession::open_update(self.service, original)?;
        writeln!(self.output, "Enter keeps the current value, '-' clears it.")?;
        if !self.fill(&mut session, true)? {
            session.cancel();
            writeln!(self.output, "Cancelled.")?;
            return Ok(());
        }
        let result = session.commit()?;
        self.report(&result)
    }

    /// Prompts for every field. Returns false when input ends.
    ///
    /// With `keep_blank`, an empty answer keeps the current value.
    fn fill(&mut self, session: &mut DialogSession<'_, C>, keep_blank: bool) -> Result<bool> {
        for field_spec in session.form().fields() {
            if let FieldKind::Choice(kind) = field_spec.kind {
                let texts: Vec<&str> = session.choices(kind).iter().map(|v| v.text.as_str()).collect();
                writeln!(self.output, "  {}: {}", kind.label(), texts.join(", "))?;
            }
            let current = session.form().get(field_spec.name).to_string();
            let marker = if field_spec.required { "*" } else { "" };
            let label = if keep_blank && !current.is_empty() {
                format!("{}{} [{}]:", field_spec.label, marker, current)
            } else {
                format!("{}{}:", field_spec.label, marker)
            };

            let value = match self.prompt(&label)? {
                Some(value) => value,
                None => return Ok(false),
            };
            let value = match (keep_blank, value.as_str()) {
                (true, "") => current,
                (true, "-") => String::new(),
                _ => value,
            };
            session.set(field_spec.name, &value)?;
        }
        Ok(true)
    }

    fn reference(&mut self, kind: ReferenceKind, action: RefAction) -> Result<()> {
        let mut dialog = ReferenceDialog::open(self.service, kind)?;
        let result = match action {
            RefAction::Show => None,
            RefAction::Add(value) => Some(dialog.insert(&value)?),
            RefAction::Rename { old, new } => Some(dialog.rename(&old, &new)?),
            RefAction::Remove(value) => {
                if !self.confirm_destructive(&format!("Delete {} '{}'?", kind.label(), value))? {
                    return Ok(());
                }
                Some(dialog.remove(&value)?)
            }
        };
        if let Some(result) = result {
            self.report(&result)?;
        }
        self.show(ResultsGrid::from_reference_values(
            dialog.values(),
            kind.label(),
            self.ui.page_size,
        ))
    }

    fn show(&mut self, grid: ResultsGrid) -> Result<()> {
        write!(self.output, "{}", grid.render())?;
        self.grid = Some(grid);
        Ok(())
    }

    fn report(&mut self, result: &OperationResult) -> Result<()> {
        match (&result.error, result.success) {
            (_, true) => writeln!(self.output, "Saved.")?,
            (Some(msg), false) => writeln!(self.output, "Error: {}", msg)?,
            (None, false) => writeln!(self.output, "Error: the operation failed")?,
        }
        Ok(())
    }

    fn turn_page(&mut self, forward: bool) -> Result<()> {
        let moved = match self.grid.as_mut() {
            Some(grid) if forward => grid.next_page(),
            Some(grid) => grid.prev_page(),
            None => false,
        };
        match (&self.grid, moved) {
            (Some(grid), true) => {
                let rendered = grid.render();
                write!(self.output, "{}", rendered)?;
            }
            _ => writeln!(self.output, "No more pages.")?,
        }
        Ok(())
    }

    fn confirm_destructive(&mut self, question: &str) -> Result<bool> {
        if !self.ui.confirm_destructive {
            return Ok(true);
        }
        self.ask(question)
    }

    fn ask(&mut self, question: &str) -> Result<bool> {
        let answer = self.prompt(&format!("{} [y/N]", question))?;
        Ok(matches!(answer.as_deref(), Some("y") | Some("Y") | Some("yes")))
    }

    /// Writes `label` and reads one trimmed line; `None` at end of input.
    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{} ", label)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_record, DatabaseFixture};
    use std::io::Cursor;

    fn run_script(service: &RecordService, ui: &UiConfig, script: &str) -> String {
        let mut out = Vec::new();
        run_repl(service, ui, Cursor::new(script.to_string()), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command(":list"), Command::List);
        assert_eq!(parse_command(":update 7"), Command::Update(7));
        assert_eq!(parse_command(":delete x"), Command::Unknown(":delete x".to_string()));
        assert_eq!(parse_command("  Ivanov "), Command::Search("Ivanov".to_string()));
        assert_eq!(parse_command(":search Lenina 10"), Command::Search("Lenina 10".to_string()));
        assert_eq!(parse_command(":q"), Command::Quit);
    }

    #[test]
    fn test_parse_ref_commands() {
        assert_eq!(
            parse_command(":ref street"),
            Command::Ref {
                kind: ReferenceKind::Street,
                action: RefAction::Show
            }
        );
        assert_eq!(
            parse_command(":ref street add Bolshaya Sadovaya"),
            Command::Ref {
                kind: ReferenceKind::Street,
                action: RefAction::Add("Bolshaya Sadovaya".to_string())
            }
        );
        assert_eq!(
            parse_command(":ref surname rename Ivanov => Ivanova"),
            Command::Ref {
                kind: ReferenceKind::Surname,
                action: RefAction::Rename {
                    old: "Ivanov".to_string(),
                    new: "Ivanova".to_string()
                }
            }
        );
        assert_eq!(
            parse_command(":ref street rename Bolshaya Sadovaya => Malaya Sadovaya"),
            Command::Ref {
                kind: ReferenceKind::Street,
                action: RefAction::Rename {
                    old: "Bolshaya Sadovaya".to_string(),
                    new: "Malaya Sadovaya".to_string()
                }
            }
        );
        assert_eq!(
            parse_command(":ref street rename Lenina Mira"),
            Command::Unknown(":ref street rename Lenina Mira".to_string())
        );
        assert_eq!(
            parse_command(":ref street rename Lenina =>"),
            Command::Unknown(":ref street rename Lenina =>".to_string())
        );
        assert_eq!(
            parse_command(":ref city add X"),
            Command::Unknown(":ref city add X".to_string())
        );
        assert_eq!(
            parse_command(":ref street add"),
            Command::Unknown(":ref street add".to_string())
        );
    }

    #[test]
    fn test_scripted_insert_and_list() {
        let fixture = DatabaseFixture::with_reference_data().unwrap();
        let service = fixture.service();
        let ui = UiConfig::default();

        // surname, name, patronymic, street, building, section, apartment, phone
        let script = ":insert\nIvanov\nIvan\n\nLenina\n10\n\n1\n555-01-01\n:list\n:quit\n";
        let output = run_script(&service, &ui, script);

        assert!(output.contains("Saved."));
        assert!(output.contains("Ivanov"));
        assert!(output.contains("(1 records)"));
        assert_eq!(service.list_records().unwrap()[0].record, sample_record());
    }

    #[test]
    fn test_validation_error_keeps_loop_alive() {
        let fixture = DatabaseFixture::with_reference_data().unwrap();
        let service = fixture.service();
        let ui = UiConfig::default();

        let script = ":insert\nIvanov\n\n\n\n\n\n\n\nn\n:list\n";
        let output = run_script(&service, &ui, script);

        assert!(output.contains("Error: Name is required"));
        assert!(output.contains("Cancelled."));
        assert!(output.contains("(0 records)"));
    }

    #[test]
    fn test_update_keeps_blank_fields() {
        let fixture = DatabaseFixture::with_reference_data().unwrap();
        let service = fixture.service();
        service.insert_record(&sample_record()).unwrap();
        let ui = UiConfig::default();

        // Only the building changes
        let script = ":update 1\n\n\n\n\n12\n\n\n\n";
        let output = run_script(&service, &ui, script);

        assert!(output.contains("Saved."));
        let record = &service.list_records().unwrap()[0].record;
        assert_eq!(record.building.as_deref(), Some("12"));
        assert_eq!(record.phone.as_deref(), Some("555-01-01"));
    }

    #[test]
    fn test_delete_asks_for_confirmation() {
        let fixture = DatabaseFixture::with_reference_data().unwrap();
        let service = fixture.service();
        service.insert_record(&sample_record()).unwrap();
        let ui = UiConfig::default();

        run_script(&service, &ui, ":delete 1\nn\n");
        assert_eq!(service.list_records().unwrap().len(), 1);

        let output = run_script(&service, &ui, ":delete 1\ny\n:delete 1\ny\n");
        assert!(output.contains("Saved."));
        assert!(output.contains("no record with id 1"));
        assert!(service.list_records().unwrap().is_empty());
    }

    #[test]
    fn test_reference_commands() {
        let fixture = DatabaseFixture::with_reference_data().unwrap();
        let service = fixture.service();
        let ui = UiConfig {
            confirm_destructive: false,
            ..UiConfig::default()
        };

        let output = run_script(&service, &ui, ":ref street add Sadovaya\n:ref street rm Mira\n:ref street\n");
        assert!(output.contains("3 | Sadovaya"));

        let streets: Vec<String> = service
            .list_reference_values(ReferenceKind::Street)
            .unwrap()
            .into_iter()
            .map(|v| v.text)
            .collect();
        assert_eq!(streets, vec!["Lenina", "Sadovaya"]);
    }

    #[test]
    fn test_rename_multi_word_value() {
        let fixture = DatabaseFixture::with_reference_data().unwrap();
        let service = fixture.service();
        let ui = UiConfig::default();

        let script = ":ref street add Bolshaya Sadovaya\n\
                      :ref street rename Bolshaya Sadovaya => Malaya Sadovaya\n";
        let output = run_script(&service, &ui, script);
        assert!(output.contains("3 | Malaya Sadovaya"));

        let streets: Vec<String> = service
            .list_reference_values(ReferenceKind::Street)
            .unwrap()
            .into_iter()
            .map(|v| v.text)
            .collect();
        assert_eq!(streets, vec!["Lenina", "Mira", "Malaya Sadovaya"]);
    }

    #[test]
    fn test_unknown_command_suggests() {
        let fixture = DatabaseFixture::with_schema().unwrap();
        let service = fixture.service();
        let output = run_script(&service, &UiConfig::default(), ":upd\n");
        assert!(output.contains("Unknown command: :upd"));
        assert!(output.contains(":update <id>"));
    }

    #[test]
    fn test_database_errors_are_reported() {
        // No schema: listing fails but the loop keeps going
        let fixture = DatabaseFixture::new().unwrap();
        let service = fixture.service();
        let output = run_script(&service, &UiConfig::default(), ":list\n:help\n");
        assert!(output.contains("Error: The database rejected the request"));
        assert!(output.contains("Available commands:"));
    }
}
