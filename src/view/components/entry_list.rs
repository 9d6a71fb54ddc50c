use tui::{
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState},
};

use super::StatefulContainer;
use crate::{
    listing::{Entry, EntryKind},
    view::browser::ViewState,
};

fn icon(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Folder => "[D]",
        EntryKind::Video => "[V]",
        EntryKind::Image => "[I]",
        EntryKind::Document => "[F]",
    }
}

fn make_entry_item(entry: &Entry, pending_delete: bool) -> ListItem<'static> {
    let mut spans = vec![
        Span::styled(
            format!("{} ", icon(entry.kind)),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(entry.name.clone()),
    ];
    if entry.kind.is_folder() {
        spans.push(Span::raw("/"));
    }
    if let Some(size) = &entry.size {
        spans.push(Span::styled(
            format!("  {}", size),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if let Some(modified_at) = entry.modified_at {
        let local = modified_at.with_timezone(&chrono::Local);
        spans.push(Span::styled(
            format!("  {}", local.format("%Y-%m-%d %H:%M")),
            Style::default().fg(Color::DarkGray),
        ));
    }
    let item = ListItem::new(Spans::from(spans));
    if pending_delete {
        item.style(Style::default().fg(Color::Red))
    } else {
        item
    }
}

/// Cursor over the entries of the directory shown by the view
#[derive(Default)]
pub struct EntryList {
    state: ListState,
    len: usize,
}

impl EntryList {
    pub fn new() -> EntryList {
        EntryList::default()
    }

    /// Points the cursor at the first of `len` fresh entries
    pub fn reset(&mut self, len: usize) {
        self.len = len;
        self.state.select(if len > 0 { Some(0) } else { None });
    }

    /// Index of the highlighted entry
    pub fn selected(&self) -> Option<usize> {
        self.state.selected().filter(|i| *i < self.len)
    }

    pub fn get_selected<'a>(&self, entries: &'a [Entry]) -> Option<&'a Entry> {
        self.selected().and_then(|i| entries.get(i))
    }

    pub fn make_entry_list(
        state: &ViewState,
        pending_delete: Option<&Entry>,
        title: String,
    ) -> List<'static> {
        let items: Vec<ListItem> = match state {
            ViewState::Idle(_) => Vec::new(),
            ViewState::Loading(_) => vec![ListItem::new("Loading...")],
            ViewState::Error { message, .. } => vec![
                ListItem::new(message.clone()).style(Style::default().fg(Color::Red)),
                ListItem::new("Press r to retry"),
            ],
            ViewState::Loaded { entries, .. } if entries.is_empty() => {
                vec![ListItem::new("This folder is empty")]
            }
            ViewState::Loaded { entries, .. } => entries
                .iter()
                .map(|e| make_entry_item(e, pending_delete.map(|p| &p.key) == Some(&e.key)))
                .collect(),
        };
        List::new(items)
            .block(Block::default().title(title).borders(Borders::ALL))
            .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED))
            .highlight_symbol("> ")
    }
}

impl StatefulContainer for EntryList {
    fn get_current(&self) -> ListState {
        self.state.clone()
    }

    fn next(&mut self) {
        if self.len > 0 {
            let i = match self.state.selected() {
                Some(i) => {
                    if i >= self.len - 1 {
                        0
                    } else {
                        i + 1
                    }
                }
                None => 0,
            };

            self.state.select(Some(i));
        }
    }

    fn previous(&mut self) {
        if self.len > 0 {
            let i = match self.state.selected() {
                Some(i) => {
                    if i == 0 {
                        self.len - 1
                    } else {
                        i - 1
                    }
                }
                None => 0,
            };

            self.state.select(Some(i));
        }
    }
}
