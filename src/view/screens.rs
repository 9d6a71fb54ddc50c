mod browser_screen;

pub use browser_screen::BrowserScreen;
