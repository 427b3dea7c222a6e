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

use anyhow::Result;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::panic;
use std::sync::Once;

use super::render::{self, Status, View};
use super::state::{MenuState, Transition};
use super::{Console, Handler, Key, MenuContext, MenuNode, Outcome};

static PANIC_HOOK: Once = Once::new();

/// Map a terminal key event to a navigation key.
pub fn map_key(key: KeyEvent) -> Option<Key> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Key::Exit),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Key::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Key::Down),
        KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => Some(Key::Enter),
        KeyCode::Esc | KeyCode::Left | KeyCode::Backspace | KeyCode::Char('h') | KeyCode::Char('q') => {
            Some(Key::Back)
        }
        _ => None,
    }
}

fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, cursor::Show)
}

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let _ = restore_terminal();
            previous(info);
        }));
    });
}

/// Raw mode plus alternate screen for as long as the session is active.
/// Dropping the session restores the terminal.
struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl TerminalSession {
    fn enter() -> Result<Self> {
        install_panic_hook();
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen, cursor::Hide) {
            let _ = disable_raw_mode();
            return Err(e.into());
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self {
            terminal,
            active: true,
        })
    }

    /// Back to line mode for a handler.
    fn suspend(&mut self) -> Result<()> {
        self.active = false;
        restore_terminal()?;
        Ok(())
    }

    /// Re-enter raw mode and force a full repaint.
    fn resume(&mut self) -> Result<()> {
        enable_raw_mode()?;
        self.active = true;
        execute!(io::stdout(), EnterAlternateScreen, cursor::Hide)?;
        self.terminal.clear()?;
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        if self.active {
            let _ = restore_terminal();
        }
    }
}

/// Run the menu rooted at `root` until the user leaves it.
///
/// Only an invalid root is an error; handler failures are reported in the
/// status line and the menu carries on.
pub fn run<C: MenuContext>(root: MenuNode<C>, ctx: &mut C) -> Result<()> {
    let mut state = MenuState::new(&root, ctx)?;
    let mut session = TerminalSession::enter()?;
    let mut status: Option<Status> = None;
    tracing::info!(root = %root.label, "menu started");

    loop {
        let context = ctx.context_line();
        session
            .terminal
            .draw(|frame| render::draw(frame, &View::of(&state, &context, status.as_ref())))?;

        let key = match event::read()? {
            Event::Key(key) => match map_key(key) {
                Some(key) => key,
                None => continue,
            },
            // The next draw picks up the new size.
            Event::Resize(_, _) => continue,
            _ => continue,
        };

        status = None;
        match state.handle(key, ctx) {
            Transition::Redraw => {}
            Transition::Notice(message) => status = Some(Status::Notice(message)),
            Transition::Terminate => break,
            Transition::Dispatch { label, handler } => {
                tracing::debug!(action = %label, depth = state.depth(), "dispatching");
                session.suspend()?;
                let result = dispatch(&label, &handler, ctx);
                session.resume()?;

                match result {
                    Ok(outcome) => match state.apply(outcome, ctx) {
                        Transition::Terminate => break,
                        Transition::Notice(message) => status = Some(Status::Info(message)),
                        _ => {}
                    },
                    Err(e) => {
                        tracing::warn!(action = %label, error = %format!("{:#}", e), "menu action failed");
                        state.refresh(ctx);
                        if state.is_terminated() {
                            break;
                        }
                        status = Some(Status::Error(format!("{}: {:#}", label, e)));
                    }
                }
            }
        }
    }

    tracing::info!("menu finished");
    Ok(())
}

fn dispatch<C>(label: &str, handler: &Handler<C>, ctx: &mut C) -> Result<Outcome> {
    let mut console = Console::stdio();
    console.heading(label)?;
    tracing::info!(action = label, "running menu action");
    let result = handler(ctx, &mut console);
    match &result {
        Ok(Outcome::Message(message)) => console.println(message)?,
        Ok(_) => {}
        Err(e) => console.println(format!("Error: {:#}", e))?,
    }
    console.pause()?;
    result
}
