use crossterm::{
    event::{DisableMouseCapture, KeyCode, KeyEvent},
    execute,
    terminal::{disable_raw_mode, LeaveAlternateScreen},
};
use std::{error::Error, io::Stdout};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use tui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Span, Spans},
    widgets::{Clear, Paragraph},
    Terminal,
};

use crate::{
    error::BrowseError,
    listing::Entry,
    view::{
        browser::{BrowserView, ListingRequest, SelectOutcome, Shell},
        components::{
            centered_rect,
            err::{make_notification_list, Notification},
            make_preview, EntryList, StatefulContainer,
        },
        event::Event,
    },
};

const LIST_HINTS: &str =
    "j/k move   ENTER open   BACKSPACE up   r refresh   d delete   ESC quit";

/// Full-screen bucket browser
pub struct BrowserScreen<B: Backend> {
    term: Terminal<B>,
    view: BrowserView,
    list: EntryList,
    shell: Box<dyn Shell>,
    events: UnboundedSender<Event<KeyEvent>>,
    user: String,
}

impl<B: Backend> BrowserScreen<B> {
    pub fn new(
        term: Terminal<B>,
        view: BrowserView,
        shell: Box<dyn Shell>,
        events: UnboundedSender<Event<KeyEvent>>,
    ) -> BrowserScreen<B> {
        BrowserScreen {
            term,
            view,
            list: EntryList::new(),
            shell,
            events,
            user: whoami::username(),
        }
    }

    /// Kicks off the listing of the bucket root
    pub fn start(&mut self) {
        let request = self.view.start();
        self.dispatch(request);
    }

    /// Runs a listing on a background task; the result comes back as `Event::Listed`
    fn dispatch(&mut self, request: ListingRequest) {
        self.list.reset(0);
        let projector = self.view.projector();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = projector.list(&request.prefix()).await;
            if events.send(Event::Listed(request, result)).is_err() {
                debug!("Event loop closed before listing finished");
            }
        });
    }

    /// Applies a listing that came back over the event channel; false if it was stale
    pub fn handle_listing(
        &mut self,
        request: ListingRequest,
        result: Result<Vec<Entry>, BrowseError>,
    ) -> bool {
        if !self.view.complete_listing(request, result) {
            return false;
        }
        let len = self.view.entries().map(|e| e.len()).unwrap_or(0);
        self.list.reset(len);
        true
    }

    pub fn handle_notification(&mut self, notification: Notification) {
        self.view.notify(notification);
    }

    fn selected_entry(&self) -> Option<Entry> {
        let entries = self.view.entries()?;
        self.list.get_selected(entries).cloned()
    }

    pub async fn handle_event(&mut self, event: KeyEvent) {
        if !self.view.notifications().is_empty() {
            if event.code == KeyCode::Enter {
                self.view.dismiss_notifications();
            }
            return;
        }

        if self.view.pending_delete().is_some() {
            match event.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    if let Some(request) = self.view.confirm_delete().await {
                        self.dispatch(request);
                    }
                }
                _ => self.view.cancel_delete(),
            }
            return;
        }

        if let Some(preview) = self.view.preview() {
            let previewed = preview.entry.clone();
            self.view.preview_activity();
            match event.code {
                KeyCode::Backspace => self.view.close_preview(),
                KeyCode::Char('d') => {
                    self.view.request_delete(&previewed);
                }
                _ => (),
            }
            return;
        }

        match event.code {
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(entry) = self.selected_entry() {
                    let outcome = self.view.select(&entry, self.shell.as_ref()).await;
                    if let SelectOutcome::Navigate(request) = outcome {
                        self.dispatch(request);
                    }
                }
            }
            KeyCode::Backspace => {
                if let Some(request) = self.view.back() {
                    self.dispatch(request);
                }
            }
            KeyCode::Down | KeyCode::Char('j') => self.list.next(),
            KeyCode::Up | KeyCode::Char('k') => self.list.previous(),
            KeyCode::Char('r') => {
                let request = self.view.refresh();
                self.dispatch(request);
            }
            KeyCode::Char('d') => {
                if let Some(entry) = self.selected_entry() {
                    self.view.request_delete(&entry);
                }
            }
            _ => (),
        }
    }

    fn footer(&self) -> Spans<'static> {
        match self.view.pending_delete() {
            Some(entry) => Spans::from(Span::styled(
                format!("Delete '{}'? y/n", entry.name),
                Style::default().fg(Color::Red),
            )),
            None => Spans::from(Span::styled(
                LIST_HINTS,
                Style::default().fg(Color::DarkGray),
            )),
        }
    }

    pub fn render(&mut self) -> Result<(), Box<dyn Error>> {
        let term_size = self.term.size()?;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(term_size);

        if !self.view.notifications().is_empty() {
            let err_list = make_notification_list(self.view.notifications());
            self.term.draw(|f| {
                f.render_widget(err_list, chunks[1]);
            })?;
            return Ok(());
        }

        let header = Paragraph::new(format!(
            "{}@{}: {}",
            self.user,
            self.view.resource_name(),
            self.view.path().display()
        ));
        let list = EntryList::make_entry_list(
            self.view.state(),
            self.view.pending_delete(),
            format!(" {}/{} ", self.view.resource_name(), self.view.path().prefix()),
        );
        let footer = Paragraph::new(self.footer());
        let preview = self.view.preview().map(|session| {
            make_preview(session, self.view.now(), self.view.controls_visible())
        });
        let mut list_state = self.list.get_current();

        self.term.draw(|f| {
            f.render_widget(header, chunks[0]);
            f.render_stateful_widget(list, chunks[1], &mut list_state);
            f.render_widget(footer, chunks[2]);
            if let Some(preview) = preview {
                let area = centered_rect(70, 50, f.size());
                f.render_widget(Clear, area);
                f.render_widget(preview, area);
            }
        })?;
        Ok(())
    }
}

impl BrowserScreen<CrosstermBackend<Stdout>> {
    pub fn shutdown(&mut self) -> Result<(), Box<dyn Error>> {
        disable_raw_mode()?;
        execute!(
            self.term.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        self.term.show_cursor()?;
        self.term.clear()?;
        Ok(())
    }
}
