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

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::state::MenuState;

const KEY_HINTS: &str = "↑/k ↓/j move · Enter/→ open · Esc/←/q back · Ctrl+C quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Info(String),
    Notice(String),
    Error(String),
}

/// Everything one frame of the menu screen shows.
pub struct View<'a> {
    pub breadcrumb: Vec<&'a str>,
    pub context: &'a str,
    pub items: Vec<&'a str>,
    pub selected: usize,
    pub hint: &'a str,
    pub status: Option<&'a Status>,
}

impl<'a> View<'a> {
    pub fn of<C>(state: &'a MenuState<C>, context: &'a str, status: Option<&'a Status>) -> Self {
        let (items, selected) = match state.top() {
            Some(frame) => (frame.children.iter().map(|n| n.label.as_str()).collect(), frame.selected),
            None => (Vec::new(), 0),
        };
        let hint = state.selected_node().map(|n| n.hint.as_str()).unwrap_or("");
        Self {
            breadcrumb: state.breadcrumb(),
            context,
            items,
            selected,
            hint,
            status,
        }
    }
}

/// Draw `view` over the whole frame. Output depends only on `view` and the
/// frame size.
pub fn draw(frame: &mut Frame, view: &View) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let header = Paragraph::new(Line::from(Span::styled(
        view.context,
        Style::default().fg(Color::Gray),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                format!(" {} ", view.breadcrumb.join(" › ")),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );
    frame.render_widget(header, chunks[0]);

    let items: Vec<ListItem> = view.items.iter().map(|label| ListItem::new(*label)).collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("› ");
    let mut list_state = ListState::default();
    list_state.select(Some(view.selected));
    frame.render_stateful_widget(list, chunks[1], &mut list_state);

    let hint = Paragraph::new(view.hint)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Description "));
    frame.render_widget(hint, chunks[2]);

    let status = match view.status {
        Some(Status::Info(msg)) => Span::styled(msg.as_str(), Style::default().fg(Color::Green)),
        Some(Status::Notice(msg)) => Span::styled(msg.as_str(), Style::default().fg(Color::Yellow)),
        Some(Status::Error(msg)) => Span::styled(
            msg.as_str(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        None => Span::raw(""),
    };
    frame.render_widget(Paragraph::new(Line::from(status)), chunks[3]);

    frame.render_widget(
        Paragraph::new(Span::styled(KEY_HINTS, Style::default().fg(Color::DarkGray))),
        chunks[4],
    );
}
