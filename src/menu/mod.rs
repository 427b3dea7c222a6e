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

//! Menu navigation engine.
//!
//! A menu is a tree of [`MenuNode`]s. The engine keeps a stack of open
//! frames ([`state::MenuState`]), draws the top frame with ratatui
//! ([`render`]), and hands the terminal back in line mode ([`Console`])
//! whenever a handler runs ([`engine`]).
//!
//! Everything is generic over a context type `C` that handlers mutate. There
//! is no global state: two engines over two contexts do not interact.

pub mod console;
pub mod engine;
pub mod render;
pub mod state;

use std::fmt;
use std::rc::Rc;

pub use console::Console;

/// Produces the children of a dynamic submenu from the current context.
pub type Generator<C> = Rc<dyn Fn(&C) -> anyhow::Result<Vec<MenuNode<C>>>>;

/// Runs a menu action with the terminal in line mode.
pub type Handler<C> = Rc<dyn Fn(&mut C, &mut Console) -> anyhow::Result<Outcome>>;

/// What the engine does after a handler returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Return to the same frame and selection.
    Done,
    /// Like `Done`, with a message in the status line.
    Message(String),
    /// Close the current frame.
    Back,
    /// Leave the menu entirely.
    Exit,
}

/// Navigation input, decoupled from the terminal backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Enter,
    Back,
    Exit,
}

pub enum NodeKind<C> {
    Submenu(Vec<MenuNode<C>>),
    Dynamic(Generator<C>),
    Handler(Handler<C>),
    Back,
    Exit,
}

pub struct MenuNode<C> {
    pub label: String,
    pub hint: String,
    pub kind: NodeKind<C>,
}

impl<C> MenuNode<C> {
    pub fn submenu(label: impl Into<String>, hint: impl Into<String>, children: Vec<MenuNode<C>>) -> Self {
        Self {
            label: label.into(),
            hint: hint.into(),
            kind: NodeKind::Submenu(children),
        }
    }

    pub fn dynamic<F>(label: impl Into<String>, hint: impl Into<String>, generator: F) -> Self
    where
        F: Fn(&C) -> anyhow::Result<Vec<MenuNode<C>>> + 'static,
    {
        Self {
            label: label.into(),
            hint: hint.into(),
            kind: NodeKind::Dynamic(Rc::new(generator)),
        }
    }

    pub fn handler<F>(label: impl Into<String>, hint: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut C, &mut Console) -> anyhow::Result<Outcome> + 'static,
    {
        Self {
            label: label.into(),
            hint: hint.into(),
            kind: NodeKind::Handler(Rc::new(handler)),
        }
    }

    pub fn back() -> Self {
        Self {
            label: "Back".to_string(),
            hint: "Return to the previous menu".to_string(),
            kind: NodeKind::Back,
        }
    }

    pub fn exit() -> Self {
        Self {
            label: "Exit".to_string(),
            hint: "Quit grepo".to_string(),
            kind: NodeKind::Exit,
        }
    }
}

// Derive would require `C: Clone`; only the Rc handles are cloned.
impl<C> Clone for NodeKind<C> {
    fn clone(&self) -> Self {
        match self {
            NodeKind::Submenu(children) => NodeKind::Submenu(children.clone()),
            NodeKind::Dynamic(generator) => NodeKind::Dynamic(Rc::clone(generator)),
            NodeKind::Handler(handler) => NodeKind::Handler(Rc::clone(handler)),
            NodeKind::Back => NodeKind::Back,
            NodeKind::Exit => NodeKind::Exit,
        }
    }
}

impl<C> Clone for MenuNode<C> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            hint: self.hint.clone(),
            kind: self.kind.clone(),
        }
    }
}

impl<C> fmt::Debug for MenuNode<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            NodeKind::Submenu(children) => format!("Submenu({})", children.len()),
            NodeKind::Dynamic(_) => "Dynamic".to_string(),
            NodeKind::Handler(_) => "Handler".to_string(),
            NodeKind::Back => "Back".to_string(),
            NodeKind::Exit => "Exit".to_string(),
        };
        f.debug_struct("MenuNode")
            .field("label", &self.label)
            .field("kind", &kind)
            .finish()
    }
}

/// Context the engine can summarize in its header line.
pub trait MenuContext {
    fn context_line(&self) -> String;
}
