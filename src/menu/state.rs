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

use anyhow::{Context, Result};

use super::{Generator, Handler, Key, MenuNode, NodeKind, Outcome};
use crate::error::GrepoError;

/// One open menu level.
pub struct Frame<C> {
    pub label: String,
    pub children: Vec<MenuNode<C>>,
    pub selected: usize,
    source: Option<Generator<C>>,
}

/// What the engine must do after a key or a handler outcome.
pub enum Transition<C> {
    Redraw,
    Notice(String),
    Dispatch { label: String, handler: Handler<C> },
    Terminate,
}

/// Stack of open frames. The top frame is the one displayed; its `selected`
/// index is always within its children while the stack is non-empty.
pub struct MenuState<C> {
    stack: Vec<Frame<C>>,
}

/// Children of a branch node plus, for dynamic nodes, the generator to
/// re-run on refresh. `None` for leaves.
fn expand<C>(node: &MenuNode<C>, ctx: &C) -> Result<Option<(Vec<MenuNode<C>>, Option<Generator<C>>)>> {
    match &node.kind {
        NodeKind::Submenu(children) => Ok(Some((children.clone(), None))),
        NodeKind::Dynamic(generator) => {
            let children = generator(ctx).with_context(|| format!("Could not open '{}'", node.label))?;
            Ok(Some((children, Some(generator.clone()))))
        }
        _ => Ok(None),
    }
}

impl<C> MenuState<C> {
    /// Open `root`. A root that is a leaf or has no children is fatal.
    pub fn new(root: &MenuNode<C>, ctx: &C) -> Result<Self> {
        let mut state = Self { stack: Vec::new() };
        state.push(root, ctx).map_err(|e| {
            anyhow::Error::new(GrepoError::InvalidMenuState(format!("root menu '{}': {:#}", root.label, e)))
        })?;
        Ok(state)
    }

    pub fn is_terminated(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn top(&self) -> Option<&Frame<C>> {
        self.stack.last()
    }

    pub fn selected_node(&self) -> Option<&MenuNode<C>> {
        self.top().and_then(|f| f.children.get(f.selected))
    }

    /// Frame labels from the root to the top.
    pub fn breadcrumb(&self) -> Vec<&str> {
        self.stack.iter().map(|f| f.label.as_str()).collect()
    }

    /// Open `node` as a new frame with the first child selected. Nothing
    /// changes on error.
    pub fn push(&mut self, node: &MenuNode<C>, ctx: &C) -> Result<()> {
        let Some((children, source)) = expand(node, ctx)? else {
            return Err(GrepoError::InvalidMenuState(format!("'{}' is not a submenu", node.label)).into());
        };
        if children.is_empty() {
            return Err(GrepoError::InvalidMenuState(format!("'{}' has no entries", node.label)).into());
        }
        self.stack.push(Frame {
            label: node.label.clone(),
            children,
            selected: 0,
            source,
        });
        Ok(())
    }

    /// Close the top frame. The uncovered frame keeps its selection.
    pub fn pop(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(_) => Ok(()),
            None => Err(GrepoError::InvalidMenuState("pop on an empty menu stack".to_string()).into()),
        }
    }

    pub fn handle(&mut self, key: Key, ctx: &C) -> Transition<C> {
        let Some(frame) = self.stack.last_mut() else {
            return Transition::Terminate;
        };
        let len = frame.children.len();

        match key {
            Key::Up => {
                frame.selected = (frame.selected + len - 1) % len;
                Transition::Redraw
            }
            Key::Down => {
                frame.selected = (frame.selected + 1) % len;
                Transition::Redraw
            }
            Key::Back => self.back(),
            Key::Exit => {
                self.stack.clear();
                Transition::Terminate
            }
            Key::Enter => {
                let node = frame.children[frame.selected].clone();
                match &node.kind {
                    NodeKind::Submenu(_) | NodeKind::Dynamic(_) => match self.push(&node, ctx) {
                        Ok(()) => Transition::Redraw,
                        Err(e) => {
                            tracing::debug!(label = %node.label, error = %e, "submenu not opened");
                            Transition::Notice(format!("{:#}", e))
                        }
                    },
                    NodeKind::Handler(handler) => Transition::Dispatch {
                        label: node.label.clone(),
                        handler: handler.clone(),
                    },
                    NodeKind::Back => self.back(),
                    NodeKind::Exit => {
                        self.stack.clear();
                        Transition::Terminate
                    }
                }
            }
        }
    }

    fn back(&mut self) -> Transition<C> {
        // Cannot fail: handle() returned early on an empty stack.
        let _ = self.pop();
        if self.stack.is_empty() {
            Transition::Terminate
        } else {
            Transition::Redraw
        }
    }

    /// Apply a handler's outcome, then regenerate dynamic frames.
    pub fn apply(&mut self, outcome: Outcome, ctx: &C) -> Transition<C> {
        let transition = match outcome {
            Outcome::Done => Transition::Redraw,
            Outcome::Message(message) => Transition::Notice(message),
            Outcome::Back => self.back(),
            Outcome::Exit => {
                self.stack.clear();
                return Transition::Terminate;
            }
        };
        self.refresh(ctx);
        if self.stack.is_empty() {
            return Transition::Terminate;
        }
        transition
    }

    /// Re-run the generators of dynamic frames, clamping selections. A frame
    /// whose generator now yields nothing is closed along with every frame
    /// above it. A failing generator keeps the previous children.
    pub fn refresh(&mut self, ctx: &C) {
        let mut truncate_at = None;
        for (i, frame) in self.stack.iter_mut().enumerate() {
            let Some(generator) = frame.source.clone() else {
                continue;
            };
            match generator(ctx) {
                Ok(children) if children.is_empty() => {
                    truncate_at = Some(i);
                    break;
                }
                Ok(children) => {
                    frame.selected = frame.selected.min(children.len() - 1);
                    frame.children = children;
                }
                Err(e) => {
                    tracing::warn!(label = %frame.label, error = %e, "menu refresh failed; keeping entries");
                }
            }
        }
        if let Some(i) = truncate_at {
            self.stack.truncate(i);
        }
    }
}
