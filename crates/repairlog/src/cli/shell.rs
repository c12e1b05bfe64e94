//! Interactive repair desk session.
//!
//! Each input line is one request. Requests are parsed with clap, run
//! against a [`RepairDesk`], and answered on the output writer. A failed
//! request is reported and the session carries on.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::{error::ErrorKind, Parser, Subcommand};
use tracing::{debug, info};

use crate::auth::{login, Session};
use crate::config::AuthConfig;
use crate::desk::RepairDesk;
use crate::error::{Error, Result};
use crate::record::read_forms;
use crate::render::DocumentRenderer;

const PROMPT: &str = "replog> ";

/// One line of shell input.
#[derive(Debug, Parser)]
#[command(
    name = "replog",
    no_binary_name = true,
    disable_help_subcommand = true,
    disable_help_flag = true,
    disable_version_flag = true
)]
struct Request {
    #[command(subcommand)]
    action: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Start a session
    Login {
        username: String,
        password: Option<String>,
    },
    /// End the session
    Logout,
    /// Show the current session
    Whoami,
    /// Submit records from a JSON file
    Add { file: PathBuf },
    /// List records, newest first
    #[command(alias = "history")]
    List { query: Option<String> },
    /// Show a record as JSON
    Show { id: u64 },
    /// Show the template context of a record
    Flatten { id: u64 },
    /// Render a record to a document
    Export { id: u64, dir: Option<PathBuf> },
    /// Delete a record
    Delete { id: u64 },
    /// List commands
    Help,
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

/// What the shell should do after a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next request.
    Continue,
    /// Stop reading requests.
    Quit,
}

/// Line-oriented session over a [`RepairDesk`].
///
/// Records live in the desk for as long as the shell does; logging out
/// ends the session but keeps the records.
#[derive(Debug)]
pub struct Shell<R, W> {
    desk: RepairDesk<R>,
    auth: AuthConfig,
    session: Option<Session>,
    output_dir: PathBuf,
    out: W,
}

impl<R: DocumentRenderer, W: Write> Shell<R, W> {
    /// Create a shell with no one logged in.
    #[must_use]
    pub fn new(
        desk: RepairDesk<R>,
        auth: AuthConfig,
        output_dir: impl Into<PathBuf>,
        out: W,
    ) -> Self {
        Self {
            desk,
            auth,
            session: None,
            output_dir: output_dir.into(),
            out,
        }
    }

    /// The desk requests run against.
    #[must_use]
    pub fn desk(&self) -> &RepairDesk<R> {
        &self.desk
    }

    /// The current session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Log in, replacing any current session.
    ///
    /// # Errors
    ///
    /// Returns a login error if the credentials are rejected; the current
    /// session is kept in that case.
    pub fn login(&mut self, username: &str, password: &str) -> Result<&Session> {
        let session = login(&self.auth, username, password)?;
        Ok(self.session.insert(session))
    }

    /// Read requests from `input` until it ends or `quit` is entered.
    ///
    /// # Errors
    ///
    /// Returns an error only if reading input or writing output fails.
    pub fn run(&mut self, input: impl BufRead) -> Result<()> {
        let mut lines = input.lines();
        loop {
            write!(self.out, "{PROMPT}")?;
            self.out.flush()?;

            let Some(line) = lines.next() else {
                writeln!(self.out)?;
                break;
            };
            if self.execute(&line?)? == Flow::Quit {
                break;
            }
        }
        Ok(())
    }

    /// Run a single request line.
    ///
    /// # Errors
    ///
    /// Returns an error only if writing output fails. Request failures are
    /// written to the output instead.
    pub fn execute(&mut self, line: &str) -> Result<Flow> {
        let words = match split_words(line) {
            Ok(words) => words,
            Err(message) => {
                writeln!(self.out, "error: {message}")?;
                return Ok(Flow::Continue);
            }
        };
        let Some(command) = words.first().map(String::as_str) else {
            return Ok(Flow::Continue);
        };
        debug!(command, "Shell request");

        let action = match Request::try_parse_from(words.iter().map(String::as_str)) {
            Ok(request) => request.action,
            Err(err) => {
                writeln!(self.out, "{}", parse_error_message(command, &err))?;
                return Ok(Flow::Continue);
            }
        };

        match self.dispatch(action) {
            Ok(flow) => Ok(flow),
            Err(err) => {
                writeln!(self.out, "error: {err}")?;
                Ok(Flow::Continue)
            }
        }
    }

    fn dispatch(&mut self, action: Action) -> Result<Flow> {
        match action {
            Action::Login { username, password } => {
                let message = {
                    let session = self.login(&username, password.as_deref().unwrap_or_default())?;
                    format!("logged in as {} ({})", session.username(), session.role())
                };
                writeln!(self.out, "{message}")?;
            }
            Action::Logout => {
                let session = self.session.take().ok_or(Error::NotLoggedIn)?;
                info!(user = session.username(), "Logged out");
                writeln!(self.out, "logged out {}", session.username())?;
            }
            Action::Whoami => {
                let session = signed_in(self.session.as_ref())?;
                writeln!(self.out, "{} ({})", session.username(), session.role())?;
            }
            Action::Add { file } => {
                let session = signed_in(self.session.as_ref())?;
                for form in read_forms(&file)? {
                    let record = self.desk.submit(session, form)?;
                    writeln!(self.out, "saved {}", record.summary())?;
                }
            }
            Action::List { query } => {
                signed_in(self.session.as_ref())?;
                let records = self.desk.history(query.as_deref().unwrap_or_default());
                if records.is_empty() {
                    writeln!(self.out, "no records")?;
                }
                for record in records {
                    writeln!(self.out, "{}", record.summary())?;
                    let form = &record.form;
                    if !form.problem.is_empty() || !form.action.is_empty() {
                        writeln!(
                            self.out,
                            "    problem: {} | action: {}",
                            form.problem, form.action
                        )?;
                    }
                }
            }
            Action::Show { id } => {
                signed_in(self.session.as_ref())?;
                let record = self.desk.show(id).ok_or(Error::RecordNotFound { id })?;
                writeln!(self.out, "{}", serde_json::to_string_pretty(record)?)?;
            }
            Action::Flatten { id } => {
                signed_in(self.session.as_ref())?;
                let context = self.desk.flatten(id).ok_or(Error::RecordNotFound { id })?;
                for (key, value) in context.iter() {
                    writeln!(self.out, "{key} = {value}")?;
                }
            }
            Action::Export { id, dir } => {
                signed_in(self.session.as_ref())?;
                match self.desk.export(id)? {
                    Some(document) => {
                        let dir = dir.as_deref().unwrap_or(self.output_dir.as_path());
                        let path = document.write_to(dir)?;
                        writeln!(self.out, "exported {}", path.display())?;
                    }
                    None => writeln!(
                        self.out,
                        "warning: template not found; no document produced"
                    )?,
                }
            }
            Action::Delete { id } => {
                let Some(admin) = self.session.as_ref().and_then(Session::require_admin) else {
                    writeln!(self.out, "{}", unknown_command("delete"))?;
                    return Ok(Flow::Continue);
                };
                if !self.desk.delete(&admin, id) {
                    return Err(Error::RecordNotFound { id });
                }
                writeln!(self.out, "deleted record #{id}")?;
            }
            Action::Help => {
                let is_admin = self.session.as_ref().is_some_and(Session::is_admin);
                self.write_help(is_admin)?;
            }
            Action::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn write_help(&mut self, is_admin: bool) -> Result<()> {
        let mut commands = vec![
            ("login <user> [password]", "Start a session"),
            ("logout", "End the session"),
            ("whoami", "Show the current session"),
            ("add <file.json>", "Submit records from a JSON file"),
            ("list [query]", "List records, newest first, by serial number"),
            ("show <id>", "Show a record as JSON"),
            ("flatten <id>", "Show the template context of a record"),
            ("export <id> [dir]", "Render a record to a document"),
        ];
        if is_admin {
            commands.push(("delete <id>", "Delete a record"));
        }
        commands.push(("help", "List commands"));
        commands.push(("quit", "Leave the shell"));

        writeln!(self.out, "Commands:")?;
        for (usage, about) in commands {
            writeln!(self.out, "  {usage:<26}{about}")?;
        }
        writeln!(
            self.out,
            "Quote arguments that contain spaces: add \"my records.json\""
        )?;
        Ok(())
    }
}

/// Split a request line into words. Single or double quotes group text,
/// spaces included, into one word.
fn split_words(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(open) if c == open => quote = None,
            Some(_) => word.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            None => {
                word.push(c);
                in_word = true;
            }
        }
    }

    if let Some(open) = quote {
        return Err(format!("unterminated {open} quote"));
    }
    if in_word {
        words.push(word);
    }
    Ok(words)
}

fn signed_in(session: Option<&Session>) -> Result<&Session> {
    session.ok_or(Error::NotLoggedIn)
}

fn unknown_command(command: &str) -> String {
    format!("unknown command '{command}'; type 'help' for a list")
}

/// Condense a clap error to one line, without the usage block.
fn parse_error_message(command: &str, err: &clap::Error) -> String {
    if err.kind() == ErrorKind::InvalidSubcommand {
        return unknown_command(command);
    }
    let rendered = err.to_string();
    let message: Vec<&str> = rendered
        .lines()
        .map(str::trim)
        .take_while(|line| !line.starts_with("Usage:"))
        .filter(|line| !line.is_empty() && !line.starts_with("For more information"))
        .collect();
    message.join(" ")
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::config::ExportConfig;
    use crate::render::TagTemplateRenderer;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("repairlog_shell_{name}_{}", std::process::id()))
    }

    fn shell(template: &Path, output_dir: &Path) -> Shell<TagTemplateRenderer, Vec<u8>> {
        let export = ExportConfig {
            include_date: false,
            ..ExportConfig::default()
        };
        let desk = RepairDesk::new(TagTemplateRenderer::new(template), export);
        Shell::new(desk, AuthConfig::default(), output_dir, Vec::new())
    }

    fn plain_shell() -> Shell<TagTemplateRenderer, Vec<u8>> {
        shell(
            Path::new("/nonexistent/report_template.txt"),
            &temp_path("unused"),
        )
    }

    fn take_output(shell: &mut Shell<TagTemplateRenderer, Vec<u8>>) -> String {
        String::from_utf8(std::mem::take(&mut shell.out)).unwrap()
    }

    fn run(shell: &mut Shell<TagTemplateRenderer, Vec<u8>>, line: &str) -> String {
        assert_eq!(shell.execute(line).unwrap(), Flow::Continue);
        take_output(shell)
    }

    fn forms_file(name: &str, json: &str) -> PathBuf {
        let path = temp_path(name).with_extension("json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_blank_line_is_ignored() {
        let mut shell = plain_shell();
        assert_eq!(run(&mut shell, "   "), "");
    }

    #[test]
    fn test_login_and_whoami() {
        let mut shell = plain_shell();
        assert!(run(&mut shell, "login admin admin123").contains("logged in as admin (admin)"));
        assert_eq!(run(&mut shell, "whoami"), "admin (admin)\n");
    }

    #[test]
    fn test_failed_login_keeps_previous_session() {
        let mut shell = plain_shell();
        run(&mut shell, "login user");
        let out = run(&mut shell, "login admin wrong");

        assert!(out.contains("error: wrong password for 'admin'"));
        assert_eq!(shell.session().unwrap().username(), "user");
    }

    #[test]
    fn test_requests_need_a_session() {
        let mut shell = plain_shell();
        for line in ["whoami", "list", "show 1", "export 1", "logout"] {
            assert!(run(&mut shell, line).contains("not logged in"), "{line}");
        }
    }

    #[test]
    fn test_unknown_command() {
        let mut shell = plain_shell();
        let out = run(&mut shell, "frobnicate 3");
        assert!(out.contains("unknown command 'frobnicate'"));
    }

    #[test]
    fn test_bad_argument_is_reported() {
        let mut shell = plain_shell();
        run(&mut shell, "login user");
        let out = run(&mut shell, "show abc");

        assert!(out.contains("abc"));
        assert!(!out.contains("Usage:"));
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn test_add_list_show() {
        let file = forms_file(
            "add",
            r#"[{"sn": "AB12", "problem": "no output", "action": "replaced diode"}, {"sn": "CD3"}]"#,
        );
        let mut shell = plain_shell();
        run(&mut shell, "login user");

        let out = run(&mut shell, &format!("add {}", file.display()));
        assert!(out.contains("saved #1"));
        assert!(out.contains("saved #2"));

        let out = run(&mut shell, "list");
        let first = out.lines().next().unwrap();
        assert!(first.starts_with("#2 "));
        assert!(out.contains("problem: no output | action: replaced diode"));

        let out = run(&mut shell, "list ab");
        assert!(out.contains("SN: AB12"));
        assert!(!out.contains("SN: CD3"));

        let out = run(&mut shell, "show 1");
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["sn"], "AB12");
        assert_eq!(value["operator"], "user");

        let _ = std::fs::remove_file(&file);
    }

    #[test]
    fn test_add_rejects_blank_serial_number() {
        let file = forms_file("blank_sn", r#"{"sn": "  ", "model": "X"}"#);
        let mut shell = plain_shell();
        run(&mut shell, "login user");

        let out = run(&mut shell, &format!("add {}", file.display()));
        assert!(out.contains("error: invalid record: sn is required"));
        assert!(shell.desk().store().is_empty());

        let _ = std::fs::remove_file(&file);
    }

    #[test]
    fn test_split_words() {
        assert_eq!(split_words("  show   3 ").unwrap(), vec!["show", "3"]);
        assert_eq!(
            split_words(r#"add "my records.json""#).unwrap(),
            vec!["add", "my records.json"]
        );
        assert_eq!(
            split_words("export 1 'out dir'/reports").unwrap(),
            vec!["export", "1", "out dir/reports"]
        );
        assert_eq!(
            split_words(r#"login user """#).unwrap(),
            vec!["login", "user", ""]
        );
        assert!(split_words(r#"add "unclosed"#).is_err());
    }

    #[test]
    fn test_add_path_with_spaces() {
        let file = temp_path("spaced name").with_extension("json");
        std::fs::write(&file, r#"{"sn": "AB12"}"#).unwrap();
        let mut shell = plain_shell();
        run(&mut shell, "login user");

        let out = run(&mut shell, &format!("add \"{}\"", file.display()));
        assert!(out.contains("saved #1"), "{out}");

        let _ = std::fs::remove_file(&file);
    }

    #[test]
    fn test_unterminated_quote_is_reported() {
        let mut shell = plain_shell();
        run(&mut shell, "login user");
        assert!(run(&mut shell, "add \"records.json").contains("unterminated"));
    }

    #[test]
    fn test_add_keeps_forms_before_an_invalid_one() {
        let file = forms_file("partial", r#"[{"sn": "AB12"}, {"sn": ""}, {"sn": "CD3"}]"#);
        let mut shell = plain_shell();
        run(&mut shell, "login user");

        let out = run(&mut shell, &format!("add {}", file.display()));
        assert!(out.contains("saved #1"));
        assert!(out.contains("error: invalid record: sn is required"));
        assert!(!out.contains("CD3"));
        assert_eq!(shell.desk().store().len(), 1);

        let _ = std::fs::remove_file(&file);
    }

    #[test]
    fn test_list_empty() {
        let mut shell = plain_shell();
        run(&mut shell, "login user");
        assert_eq!(run(&mut shell, "list"), "no records\n");
    }

    #[test]
    fn test_flatten_record() {
        let file = forms_file("flatten", r#"{"sn": "AB12"}"#);
        let mut shell = plain_shell();
        run(&mut shell, "login user");
        run(&mut shell, &format!("add {}", file.display()));

        let out = run(&mut shell, "flatten 1");
        assert!(out.lines().any(|line| line == "sn = AB12"));
        assert!(out.lines().any(|line| line == "vcc = "));

        let _ = std::fs::remove_file(&file);
    }

    #[test]
    fn test_delete_hidden_from_user() {
        let file = forms_file("delete_user", r#"{"sn": "AB12"}"#);
        let mut shell = plain_shell();
        run(&mut shell, "login user");
        run(&mut shell, &format!("add {}", file.display()));

        assert!(run(&mut shell, "delete 1").contains("unknown command 'delete'"));
        assert!(!run(&mut shell, "help").contains("delete"));
        assert_eq!(shell.desk().store().len(), 1);

        let _ = std::fs::remove_file(&file);
    }

    #[test]
    fn test_admin_delete() {
        let file = forms_file("delete_admin", r#"[{"sn": "A"}, {"sn": "B"}]"#);
        let mut shell = plain_shell();
        run(&mut shell, "login admin admin123");
        run(&mut shell, &format!("add {}", file.display()));

        assert!(run(&mut shell, "help").contains("delete <id>"));
        assert_eq!(run(&mut shell, "delete 1"), "deleted record #1\n");
        assert!(run(&mut shell, "delete 1").contains("record 1 not found"));
        assert!(run(&mut shell, "show 2").contains("\"B\""));

        let _ = std::fs::remove_file(&file);
    }

    #[test]
    fn test_export_writes_document() {
        let template = temp_path("template").with_extension("txt");
        std::fs::write(&template, "Unit {{sn}} by {{ operator }}").unwrap();
        let out_dir = temp_path("export_out");
        let file = forms_file("export", r#"{"sn": "AB12"}"#);

        let mut shell = shell(&template, &out_dir);
        run(&mut shell, "login user");
        run(&mut shell, &format!("add {}", file.display()));

        let out = run(&mut shell, "export 1");
        assert!(out.starts_with("exported "));
        let written = std::fs::read_to_string(out_dir.join("Report_AB12.txt")).unwrap();
        assert_eq!(written, "Unit AB12 by user");

        let _ = std::fs::remove_dir_all(&out_dir);
        let _ = std::fs::remove_file(&template);
        let _ = std::fs::remove_file(&file);
    }

    #[test]
    fn test_export_without_template_warns() {
        let file = forms_file("export_missing", r#"{"sn": "AB12"}"#);
        let mut shell = plain_shell();
        run(&mut shell, "login user");
        run(&mut shell, &format!("add {}", file.display()));

        let out = run(&mut shell, "export 1");
        assert!(out.contains("warning: template not found"));

        let _ = std::fs::remove_file(&file);
    }

    #[test]
    fn test_run_until_quit() {
        let file = forms_file("run", r#"{"sn": "AB12"}"#);
        let input = format!(
            "login user\nadd {}\nlogout\nlogin admin admin123\nlist\nquit\nlist\n",
            file.display()
        );
        let mut shell = plain_shell();
        shell.run(input.as_bytes()).unwrap();
        let out = take_output(&mut shell);

        // Records outlive the session that created them.
        assert!(out.contains("logged out user"));
        assert_eq!(out.matches("SN: AB12").count(), 2);
        assert_eq!(out.matches(PROMPT).count(), 6);

        let _ = std::fs::remove_file(&file);
    }

    #[test]
    fn test_run_until_end_of_input() {
        let mut shell = plain_shell();
        shell.run("login user\n".as_bytes()).unwrap();
        assert!(shell.session().is_some());
        assert!(take_output(&mut shell).ends_with(&format!("{PROMPT}\n")));
    }
}
