use tui::widgets::ListState;

pub mod downloads;
mod entry_list;
pub mod err;
mod preview_popup;

pub use downloads::DownloadShell;
pub use entry_list::EntryList;
pub use preview_popup::{centered_rect, make_preview};

pub trait StatefulContainer {
    fn previous(&mut self);
    fn next(&mut self);
    fn get_current(&self) -> ListState;
}
