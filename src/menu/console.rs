// Copyright (c) 2025 Sean McNamara <smcnam@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, BufRead, BufReader, IsTerminal, Write};

/// Line-mode I/O handed to handlers while the menu is suspended, and used
/// directly by the scripted subcommands.
pub struct Console {
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
    interactive: bool,
}

impl Console {
    pub fn stdio() -> Self {
        let interactive = io::stdin().is_terminal();
        Self {
            input: Box::new(BufReader::new(io::stdin())),
            output: Box::new(io::stdout()),
            interactive,
        }
    }

    /// Console over arbitrary streams. Secrets are read as plain lines.
    pub fn new(input: impl BufRead + 'static, output: impl Write + 'static) -> Self {
        Self {
            input: Box::new(input),
            output: Box::new(output),
            interactive: false,
        }
    }

    pub fn heading(&mut self, title: &str) -> io::Result<()> {
        writeln!(self.output)?;
        writeln!(self.output, "=== {} ===", title)?;
        writeln!(self.output)?;
        self.output.flush()
    }

    pub fn println(&mut self, line: impl AsRef<str>) -> io::Result<()> {
        writeln!(self.output, "{}", line.as_ref())?;
        self.output.flush()
    }

    /// Write without a newline; used for streamed model output.
    pub fn print(&mut self, text: &str) -> io::Result<()> {
        write!(self.output, "{}", text)?;
        self.output.flush()
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Ask a question and return the trimmed answer.
    pub fn prompt(&mut self, question: &str) -> io::Result<String> {
        write!(self.output, "{}: ", question)?;
        self.output.flush()?;
        Ok(self.read_line()?.trim().to_string())
    }

    /// Like [`prompt`](Self::prompt); an empty answer yields `default`.
    pub fn prompt_default(&mut self, question: &str, default: &str) -> io::Result<String> {
        let answer = self.prompt(&format!("{} [{}]", question, default))?;
        Ok(if answer.is_empty() { default.to_string() } else { answer })
    }

    /// Read a secret without echoing it on an interactive terminal.
    pub fn prompt_secret(&mut self, question: &str) -> io::Result<String> {
        write!(self.output, "{}: ", question)?;
        self.output.flush()?;
        if !self.interactive {
            return Ok(self.read_line()?.trim().to_string());
        }

        terminal::enable_raw_mode()?;
        let secret = read_hidden();
        let restored = terminal::disable_raw_mode();
        writeln!(self.output)?;
        restored?;
        Ok(secret?.trim().to_string())
    }

    /// Yes/no question, default no.
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let answer = self.prompt(&format!("{} [y/N]", question))?;
        Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
    }

    /// Numbered choice. `None` when the answer is empty or out of range.
    pub fn choose(&mut self, question: &str, options: &[String]) -> io::Result<Option<usize>> {
        for (i, option) in options.iter().enumerate() {
            writeln!(self.output, "  {:>3}. {}", i + 1, option)?;
        }
        let answer = self.prompt(&format!("{} (1-{}, empty to cancel)", question, options.len()))?;
        if answer.is_empty() {
            return Ok(None);
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => Ok(Some(n - 1)),
            _ => {
                self.println(format!("'{}' is not a valid choice", answer))?;
                Ok(None)
            }
        }
    }

    /// Wait for Enter. A closed input counts as acknowledged.
    pub fn pause(&mut self) -> io::Result<()> {
        write!(self.output, "\nPress Enter to return to the menu...")?;
        self.output.flush()?;
        match self.read_line() {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn read_hidden() -> io::Result<String> {
    let mut secret = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(secret),
            KeyCode::Backspace => {
                secret.pop();
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "cancelled"));
            }
            KeyCode::Esc => {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "cancelled"));
            }
            KeyCode::Char(c) => secret.push(c),
            _ => {}
        }
    }
}
