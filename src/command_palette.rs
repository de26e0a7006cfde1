// Command Palette Module for addrdesk
//
// Lists the front-end commands with their descriptions and filters them by
// substring, for `:help` output and "did you mean" suggestions.

#[derive(Debug, Clone)]
pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
}

pub struct CommandPalette {
    commands: Vec<Command>,
}

impl CommandPalette {
    /// Creates a new CommandPalette with every command the REPL understands.
    pub fn new() -> Self {
        let command = |name, usage, description| Command {
            name,
            usage,
            description,
        };
        let commands = vec![
            command("list", ":list", "Show all address book records"),
            command("search", ":search <text>", "Find records by surname, name, patronymic, street or phone"),
            command("insert", ":insert", "Add a record field by field"),
            command("update", ":update <id>", "Edit the record with the given id"),
            command("delete", ":delete <id>", "Delete the record with the given id"),
            command(
                "ref",
                ":ref <kind> [add <value> | rename <old> => <new> | rm <value>]",
                "Show or edit a reference table (surname, name, patronymic, street)",
            ),
            command("next", ":next", "Show the next page of the last listing"),
            command("prev", ":prev", "Show the previous page of the last listing"),
            command("help", ":help", "List all available commands"),
            command("quit", ":quit", "Leave addrdesk"),
        ];
        CommandPalette { commands }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Searches for commands that contain the given query as a substring (case-insensitive)
    /// and returns the filtered list.
    pub fn filter_commands(&self, query: &str) -> Vec<Command> {
        let q = query.to_lowercase();
        self.commands
            .iter()
            .filter(|cmd| cmd.name.contains(&q) || cmd.description.to_lowercase().contains(&q))
            .cloned()
            .collect()
    }

    /// Help text: one line per command.
    pub fn help_text(&self) -> String {
        let width = self.commands.iter().map(|c| c.usage.len()).max().unwrap_or(0);
        let mut output = String::from("Available commands:\n");
        for cmd in &self.commands {
            output.push_str(&format!("  {:<width$}  {}\n", cmd.usage, cmd.description, width = width));
        }
        output
    }
}

impl Default for CommandPalette {
    fn default() -> Self {
        CommandPalette::new()
    }
}
