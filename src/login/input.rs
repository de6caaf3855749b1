//! Username and password resolution from flags, stdin or an interactive prompt

use crate::credential::Credential;
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::registry::domain::resolve_domain;
use crate::registry::scheme::RequestScheme;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, BufRead, IsTerminal, Read};

/// Where interactive input comes from. Fakes return canned values in tests.
pub trait CredentialSource: Send {
    fn prompt_username(&mut self, domain: &str) -> Result<String>;
    fn prompt_password(&mut self) -> Result<String>;
    /// Entire standard input, for `--password-stdin`
    fn read_password_stdin(&mut self) -> Result<String>;
}

/// What the user asked for on the command line
#[derive(Debug, Clone, Default)]
pub struct LoginRequest {
    pub server: String,
    pub username: Option<String>,
    pub password_stdin: bool,
    pub scheme: RequestScheme,
}

impl LoginRequest {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            ..Self::default()
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_password_stdin(mut self, password_stdin: bool) -> Self {
        self.password_stdin = password_stdin;
        self
    }

    pub fn with_scheme(mut self, scheme: RequestScheme) -> Self {
        self.scheme = scheme;
        self
    }
}

/// Turn a request into a complete credential, prompting where needed
pub fn resolve_inputs(
    request: &LoginRequest,
    source: &mut dyn CredentialSource,
) -> Result<Credential> {
    let domain = resolve_domain(&request.server)?;

    if request.password_stdin && request.username.is_none() {
        return Err(RegistryError::InvalidArgument(
            "must provide --username with --password-stdin".to_string(),
        ));
    }

    let username = match &request.username {
        Some(username) => username.trim().to_string(),
        None => source.prompt_username(&domain)?.trim().to_string(),
    };
    if username.is_empty() {
        return Err(RegistryError::InvalidArgument(
            "username cannot be empty".to_string(),
        ));
    }

    let password = if request.password_stdin {
        source.read_password_stdin()?
    } else {
        source.prompt_password()?
    };
    let password = strip_line_ending(&password).to_string();
    if password.is_empty() {
        return Err(RegistryError::InvalidArgument(
            "password cannot be empty".to_string(),
        ));
    }

    Ok(Credential {
        domain,
        username,
        password,
    })
}

fn strip_line_ending(input: &str) -> &str {
    input
        .strip_suffix("\r\n")
        .or_else(|| input.strip_suffix('\n'))
        .unwrap_or(input)
}

/// Reads from the controlling terminal's stdin
pub struct TerminalSource {
    output: Logger,
}

impl TerminalSource {
    pub fn new(output: Logger) -> Self {
        Self { output }
    }

    fn read_line(&self, label: &str) -> Result<String> {
        self.output.prompt(label);
        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(RegistryError::InvalidArgument(format!(
                "no input available for '{}'",
                label.trim_end_matches([' ', ':'])
            )));
        }
        Ok(line)
    }

    /// Read a line with terminal echo off. Piped stdin falls back to a plain read.
    fn read_hidden(&self, label: &str) -> Result<String> {
        if !io::stdin().is_terminal() {
            return self.read_line(label);
        }

        self.output.prompt(label);
        terminal::enable_raw_mode()?;
        let typed = read_hidden_keys();
        let restored = terminal::disable_raw_mode();
        self.output.prompt("\n");

        let typed = typed?;
        restored?;
        typed.ok_or(RegistryError::Cancelled)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum HiddenKey {
    Continue,
    Submit,
    Abort,
}

fn read_hidden_keys() -> io::Result<Option<String>> {
    let mut line = String::new();
    loop {
        if let Event::Key(key) = event::read()? {
            match apply_hidden_key(&mut line, key) {
                HiddenKey::Continue => {}
                HiddenKey::Submit => return Ok(Some(line)),
                HiddenKey::Abort => return Ok(None),
            }
        }
    }
}

// Raw mode swallows SIGINT, so Ctrl-C is handled here
fn apply_hidden_key(line: &mut String, key: KeyEvent) -> HiddenKey {
    if key.kind == KeyEventKind::Release {
        return HiddenKey::Continue;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => HiddenKey::Submit,
        KeyCode::Esc => HiddenKey::Abort,
        KeyCode::Char('c') if ctrl => HiddenKey::Abort,
        KeyCode::Char('u') if ctrl => {
            line.clear();
            HiddenKey::Continue
        }
        KeyCode::Char(_) if ctrl => HiddenKey::Continue,
        KeyCode::Char(c) => {
            line.push(c);
            HiddenKey::Continue
        }
        KeyCode::Backspace => {
            line.pop();
            HiddenKey::Continue
        }
        _ => HiddenKey::Continue,
    }
}

impl CredentialSource for TerminalSource {
    fn prompt_username(&mut self, domain: &str) -> Result<String> {
        self.output
            .detail(&format!("Prompting for username for {}", domain));
        self.read_line("Username: ")
    }

    fn prompt_password(&mut self) -> Result<String> {
        self.read_hidden("Password: ")
    }

    fn read_password_stdin(&mut self) -> Result<String> {
        let mut input = String::new();
        io::stdin().lock().read_to_string(&mut input)?;
        Ok(input)
    }
}
