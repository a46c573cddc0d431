// SPDX-License-Identifier: GPL-3.0-only

//! Terminal application shell
//!
//! Owns the screen stack and the terminal itself. Screens express stack
//! changes as [`Transition`] values returned from their key and tick hooks;
//! the shell applies them and drives the appear/close notifications screens
//! use to manage their resources. Ownership is explicit: the scan screen
//! owns its capture controller, the display screen owns its raster, and
//! screens communicate only through constructor arguments.

mod display_screen;
mod scan_screen;
mod widgets;

use std::io::{self, stdout};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Frame, Terminal, backend::CrosstermBackend, layout::Rect};
use tracing::debug;

use crate::config::Config;
use crate::constants::timing;

pub use display_screen::CodeDisplayScreen;
pub use scan_screen::ScanScreen;

/// Stack change requested by a screen
pub enum Transition {
    None,
    Push(Box<dyn Screen>),
    Pop,
    Quit,
}

/// A full-screen view managed by the navigation shell
pub trait Screen {
    /// The screen became the visible top of the stack
    fn on_appear(&mut self, area: Rect);
    /// The terminal was resized while this screen is visible
    fn on_resize(&mut self, area: Rect);
    /// A key press reached this screen
    fn on_key(&mut self, key: KeyEvent) -> Transition;
    /// Periodic pulse between input polls
    fn tick(&mut self) -> Transition;
    fn draw(&mut self, frame: &mut Frame<'_>);
    /// The screen is leaving the stack for good
    fn will_close(&mut self);
}

/// Stack-based navigation over full-screen views
pub struct NavigationShell {
    stack: Vec<Box<dyn Screen>>,
}

impl NavigationShell {
    pub fn new(root: Box<dyn Screen>) -> Self {
        Self { stack: vec![root] }
    }

    /// Run the scanner UI to completion
    pub fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
        // The capture backend needs GStreamer before any session exists
        gstreamer::init()?;

        let mut shell = Self::new(Box::new(ScanScreen::new(config)));

        // Set up terminal
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = shell.run_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let size = terminal.size()?;
        let mut area = Rect::new(0, 0, size.width, size.height);

        if let Some(screen) = self.stack.last_mut() {
            screen.on_appear(area);
        }

        loop {
            let transition = match self.stack.last_mut() {
                Some(screen) => screen.tick(),
                None => break,
            };
            if self.apply(transition, area) {
                break;
            }

            if let Some(screen) = self.stack.last_mut() {
                terminal.draw(|frame| screen.draw(frame))?;
            }

            // Poll input with a timeout so frames keep flowing
            if event::poll(Duration::from_millis(timing::EVENT_POLL_MS))? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        // Ctrl+C quits from anywhere
                        let transition = if key.code == KeyCode::Char('c')
                            && key.modifiers.contains(KeyModifiers::CONTROL)
                        {
                            Transition::Quit
                        } else {
                            match self.stack.last_mut() {
                                Some(screen) => screen.on_key(key),
                                None => break,
                            }
                        };
                        if self.apply(transition, area) {
                            break;
                        }
                    }
                    Event::Resize(width, height) => {
                        area = Rect::new(0, 0, width, height);
                        if let Some(screen) = self.stack.last_mut() {
                            screen.on_resize(area);
                        }
                    }
                    _ => {}
                }
            }
        }

        debug!("Shell loop finished");
        Ok(())
    }

    /// Apply a transition; true means the loop should end
    fn apply(&mut self, transition: Transition, area: Rect) -> bool {
        match transition {
            Transition::None => false,
            Transition::Push(mut screen) => {
                screen.on_appear(area);
                self.stack.push(screen);
                false
            }
            Transition::Pop => {
                if let Some(mut closing) = self.stack.pop() {
                    closing.will_close();
                }
                match self.stack.last_mut() {
                    Some(revealed) => {
                        revealed.on_appear(area);
                        false
                    }
                    None => true,
                }
            }
            Transition::Quit => {
                while let Some(mut screen) = self.stack.pop() {
                    screen.will_close();
                }
                true
            }
        }
    }
}
