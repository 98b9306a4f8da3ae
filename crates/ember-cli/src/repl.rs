//! Interactive shell.

use std::borrow::Cow;
use std::cell::RefCell;
use std::error::Error;
use std::fs;
use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;

use ember_lang::{Config, Interpreter};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Context, Editor, Helper};

use crate::prelude;

const MAX_HISTORY_ENTRIES: usize = 1000;

const KEYWORDS: [&str; 8] = ["function", "return", "if", "else", "while", "for", "true", "false"];
const COMMANDS: [&str; 6] = ["exit", "quit", "vars", "history", "clear", "help"];

#[derive(Debug, PartialEq)]
enum CommandAction {
    NotHandled,
    Handled,
    ClearScreen,
    Exit,
}

// ─── Editor helper ────────────────────────────────────────────────────────────

struct ReplHelper {
    symbols: RefCell<Vec<String>>,
}

impl ReplHelper {
    fn new() -> Self {
        Self { symbols: RefCell::new(Vec::new()) }
    }

    fn set_symbols(&self, symbols: Vec<String>) {
        *self.symbols.borrow_mut() = symbols;
    }

    fn candidates(&self, prefix: &str) -> Vec<String> {
        let symbols = self.symbols.borrow();
        let mut out: Vec<String> = KEYWORDS.iter().chain(COMMANDS.iter()).chain(prelude::NAMES.iter())
            .map(|s| s.to_string())
            .chain(symbols.iter().cloned())
            .filter(|s| s.starts_with(prefix) && s != prefix)
            .collect();
        out.sort();
        out.dedup();
        out
    }
}

impl Helper for ReplHelper {}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Result<(usize, Vec<Pair>), ReadlineError> {
        let line = &line[..pos.min(line.len())];
        let start = line
            .char_indices()
            .rev()
            .take_while(|(_, ch)| *ch == '_' || ch.is_ascii_alphanumeric())
            .last()
            .map_or(line.len(), |(idx, _)| idx);

        let prefix = &line[start..];
        if prefix.is_empty() {
            return Ok((start, Vec::new()));
        }

        let pairs = self.candidates(prefix)
            .into_iter()
            .map(|value| Pair { display: value.clone(), replacement: value })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        command_hint(line).map(ToString::to_string)
    }
}

impl Highlighter for ReplHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[2m{hint}\x1b[0m"))
    }
}

impl Validator for ReplHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> Result<ValidationResult, ReadlineError> {
        if needs_more_input(ctx.input()) {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

fn command_hint(line: &str) -> Option<&'static str> {
    match line {
        "exit" | "quit" => Some(" (leave the shell)"),
        "vars" => Some(" (list global variables)"),
        "history" => Some(" (show previous input)"),
        l if l.starts_with("function") && !l.contains('(') => Some(" name(params) { ... }"),
        _ => None,
    }
}

/// An unclosed `{` outside a string literal keeps the editor reading lines.
fn needs_more_input(input: &str) -> bool {
    let mut depth = 0i32;
    let mut in_string = false;
    for line in input.lines() {
        let mut chars = line.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\'' => in_string = !in_string,
                '/' if !in_string && chars.peek() == Some(&'/') => break,
                '{' if !in_string => depth += 1,
                '}' if !in_string => depth -= 1,
                _ => {}
            }
        }
    }
    depth > 0
}

// ─── Session ──────────────────────────────────────────────────────────────────

struct Repl {
    interp: Interpreter,
    history: Vec<String>,
}

impl Repl {
    fn new(config: Config) -> Self {
        let mut interp = Interpreter::with_config(config);
        prelude::install(&mut interp);
        Self { interp, history: load_history() }
    }

    fn handle_command(&self, line: &str) -> CommandAction {
        match line {
            "exit" | "quit" => CommandAction::Exit,
            "help" => {
                print_help();
                CommandAction::Handled
            }
            "vars" => {
                let globals = self.interp.globals();
                if globals.is_empty() {
                    println!("(no variables)");
                }
                for (name, value) in globals {
                    println!("{name} = {value}");
                }
                CommandAction::Handled
            }
            "history" => {
                for (idx, entry) in self.history.iter().enumerate() {
                    println!("{:>4}  {entry}", idx + 1);
                }
                CommandAction::Handled
            }
            "clear" => CommandAction::ClearScreen,
            _ => CommandAction::NotHandled,
        }
    }

    fn record(&mut self, input: &str) {
        self.history.push(input.to_string());
        trim_history(&mut self.history);
    }

    fn eval(&mut self, input: &str) {
        match self.interp.evaluate(input) {
            Ok(value) if !value.is_null() => println!("=> {value}"),
            Ok(_) => {}
            Err(err) => eprintln!("error: {err}"),
        }
    }

    fn symbols(&self) -> Vec<String> {
        self.interp.globals().into_iter().map(|(name, _)| name).collect()
    }
}

pub fn run(config: Config) -> Result<(), Box<dyn Error>> {
    let mut repl = Repl::new(config);

    if !io::stdin().is_terminal() {
        return run_piped(&mut repl);
    }

    println!("Ember {}", env!("CARGO_PKG_VERSION"));
    println!("Type 'help' for commands, 'exit' to quit");

    let mut editor = Editor::<ReplHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(ReplHelper::new()));
    for entry in &repl.history {
        let _ = editor.add_history_entry(entry.as_str());
    }

    loop {
        let line = match editor.readline("ember> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let _ = editor.add_history_entry(input);
        repl.record(input);

        match repl.handle_command(input) {
            CommandAction::Exit => break,
            CommandAction::Handled => continue,
            CommandAction::ClearScreen => {
                editor.clear_screen()?;
                continue;
            }
            CommandAction::NotHandled => {}
        }

        repl.eval(input);
        if let Some(helper) = editor.helper() {
            helper.set_symbols(repl.symbols());
        }
    }

    if let Err(err) = save_history(&repl.history) {
        tracing::warn!("failed to save history: {err}");
    }
    println!("Goodbye!");
    Ok(())
}

/// Line-at-a-time evaluation for redirected input; braces may span lines.
fn run_piped(repl: &mut Repl) -> Result<(), Box<dyn Error>> {
    let mut buffer = String::new();
    for line in io::stdin().lock().lines() {
        let line = line?;
        if buffer.is_empty() {
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            match repl.handle_command(input) {
                CommandAction::Exit => return Ok(()),
                CommandAction::Handled | CommandAction::ClearScreen => continue,
                CommandAction::NotHandled => {}
            }
        } else {
            buffer.push('\n');
        }
        buffer.push_str(&line);

        if needs_more_input(&buffer) {
            continue;
        }
        let input = std::mem::take(&mut buffer);
        repl.eval(input.trim());
    }
    if !buffer.trim().is_empty() {
        repl.eval(buffer.trim());
    }
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  exit, quit    Leave the shell");
    println!("  vars          List global variables");
    println!("  history       Show previous input");
    println!("  clear         Clear the screen");
    println!("  help          Show this message");
    println!();
    println!("Anything else is evaluated as one statement; non-null results are echoed.");
    println!("Unclosed `{{` continues on the next line. Tab completes names.");
}

// ─── History file ─────────────────────────────────────────────────────────────

fn history_path() -> PathBuf {
    match std::env::var("EMBER_HISTORY") {
        Ok(path) => PathBuf::from(path),
        Err(_) => PathBuf::from(".ember_history"),
    }
}

fn load_history() -> Vec<String> {
    let Ok(contents) = fs::read_to_string(history_path()) else {
        return Vec::new();
    };
    let mut history: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect();
    trim_history(&mut history);
    history
}

fn save_history(history: &[String]) -> io::Result<()> {
    let path = history_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    // entries are stored one per line
    let mut encoded = history.iter().map(|e| e.replace('\n', " ")).collect::<Vec<_>>().join("\n");
    if !encoded.is_empty() {
        encoded.push('\n');
    }
    fs::write(path, encoded)
}

fn trim_history(history: &mut Vec<String>) {
    if history.len() > MAX_HISTORY_ENTRIES {
        let excess = history.len() - MAX_HISTORY_ENTRIES;
        history.drain(0..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_brace_needs_more_input() {
        assert!(needs_more_input("function f() {"));
        assert!(needs_more_input("function f() {\n  return 1;"));
        assert!(!needs_more_input("function f() {\n  return 1;\n}"));
        assert!(!needs_more_input("x = '{'"));
        assert!(!needs_more_input("x = 1 // {"));
    }

    #[test]
    fn completion_candidates() {
        let helper = ReplHelper::new();
        helper.set_symbols(vec!["total".into(), "tally".into()]);
        assert_eq!(helper.candidates("ta"), vec!["tally"]);
        assert_eq!(helper.candidates("t"), vec!["tally", "total", "true", "typeof"]);
        assert_eq!(helper.candidates("fun"), vec!["function"]);
        assert!(helper.candidates("function").is_empty());
    }

    #[test]
    fn hints() {
        assert_eq!(command_hint("vars"), Some(" (list global variables)"));
        assert_eq!(command_hint("function"), Some(" name(params) { ... }"));
        assert_eq!(command_hint("function f("), None);
        assert_eq!(command_hint("x"), None);
    }

    #[test]
    fn history_is_capped() {
        let mut history: Vec<String> = (0..MAX_HISTORY_ENTRIES + 5).map(|i| i.to_string()).collect();
        trim_history(&mut history);
        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(history[0], "5");
    }

    #[test]
    fn commands() {
        let repl = Repl { interp: Interpreter::new(), history: Vec::new() };
        assert_eq!(repl.handle_command("quit"), CommandAction::Exit);
        assert_eq!(repl.handle_command("exit"), CommandAction::Exit);
        assert_eq!(repl.handle_command("clear"), CommandAction::ClearScreen);
        assert_eq!(repl.handle_command("vars"), CommandAction::Handled);
        assert_eq!(repl.handle_command("x = 1"), CommandAction::NotHandled);
    }

    #[test]
    fn eval_keeps_state_between_lines() {
        let mut repl = Repl { interp: Interpreter::new(), history: Vec::new() };
        repl.eval("function sq(n) { return n * n; }");
        repl.eval("y = sq(4)");
        assert_eq!(repl.symbols(), vec!["sq", "y"]);
    }
}
