use super::{browser::ListingRequest, components::err::Notification};
use crate::{error::BrowseError, listing::Entry};

/// Everything the screen's event loop reacts to
pub enum Event<I> {
    Input(I),
    Shutdown,
    Tick,
    /// A listing finished on a background task
    Listed(ListingRequest, Result<Vec<Entry>, BrowseError>),
    /// Background work has something to tell the user
    Notify(Notification),
}
