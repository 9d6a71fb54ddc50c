//! Module that defines user-facing notifications
use std::fmt::{self};

use tui::widgets::{List, ListItem};

use crate::error::BrowseError;

/// Non-fatal message shown to the user until dismissed
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    component: String,
    code: String,
    message: String,
}

impl Notification {
    pub fn new(component: String, message: String, code: String) -> Notification {
        Notification {
            component,
            message,
            code,
        }
    }

    /// Informational notice that isn't tied to a failure
    pub fn info(component: &str, message: String) -> Notification {
        Notification::new(component.to_owned(), message, String::from("Info"))
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&BrowseError> for Notification {
    fn from(err: &BrowseError) -> Self {
        let component = match err {
            BrowseError::Listing { .. } => "Listing",
            BrowseError::Access { .. } | BrowseError::NotFound { .. } => "Preview",
            BrowseError::Delete { .. } => "Delete",
        };
        Notification::new(component.to_owned(), err.to_string(), err.code().to_owned())
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Notification: {{ Component: {}, Message: {}, Code: {:?} }}",
            &self.component, &self.message, &self.code
        )
    }
}

/// Renders the notification stack with a dismissal hint
pub fn make_notification_list(notifications: &[Notification]) -> List<'static> {
    let mut items: Vec<ListItem> = notifications
        .iter()
        .map(|n| match n.code() {
            "Info" => ListItem::new(format!("{}: {}", n.component(), n.message())),
            code => ListItem::new(format!("{} Err: {} - {}", n.component(), code, n.message())),
        })
        .collect();
    items.push(ListItem::new("Press ENTER to continue"));
    List::new(items)
}
