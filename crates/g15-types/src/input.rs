//! Button decoding.
//!
//! Every input source (daemon key reader, remote listener) produces raw
//! command lines of the form `BUTTON <NAME>`. This module turns those lines
//! into typed events.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Indicator;

/// Command prefix shared by every input source.
pub const BUTTON_PREFIX: &str = "BUTTON";

/// One of the three M-keys that select a binding layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MKey {
    M1,
    M2,
    M3,
}

impl MKey {
    pub const ALL: [MKey; 3] = [Self::M1, Self::M2, Self::M3];

    /// 1-based layer number.
    pub fn number(self) -> u8 {
        match self {
            Self::M1 => 1,
            Self::M2 => 2,
            Self::M3 => 3,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::M1),
            2 => Some(Self::M2),
            3 => Some(Self::M3),
            _ => None,
        }
    }

    /// The indicator light belonging to this key.
    pub fn indicator(self) -> Indicator {
        match self {
            Self::M1 => Indicator::M1,
            Self::M2 => Indicator::M2,
            Self::M3 => Indicator::M3,
        }
    }
}

impl fmt::Display for MKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.number())
    }
}

/// The four soft buttons under the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LcdButton {
    Lcd1,
    Lcd2,
    Lcd3,
    Lcd4,
}

impl LcdButton {
    pub fn number(self) -> u8 {
        match self {
            Self::Lcd1 => 1,
            Self::Lcd2 => 2,
            Self::Lcd3 => 3,
            Self::Lcd4 => 4,
        }
    }
}

/// A decoded button press.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ButtonEvent {
    /// Select (or deselect) an M-key binding layer.
    Mode(MKey),
    /// Cycle to the next screen.
    ChangeScreen,
    /// One of the soft buttons under the panel.
    Lcd(LcdButton),
    /// Any other key name, looked up in the active layer's bindings.
    Custom(String),
}

impl ButtonEvent {
    /// Decode a raw command line.
    ///
    /// Returns `None` for anything that is not `BUTTON <NAME>`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        if tokens.next()? != BUTTON_PREFIX {
            return None;
        }
        let name = tokens.next()?;
        Some(Self::from_name(name))
    }

    /// Decode a bare key name such as `G5` or `LCD2`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "M1" => Self::Mode(MKey::M1),
            "M2" => Self::Mode(MKey::M2),
            "M3" => Self::Mode(MKey::M3),
            "CHG" => Self::ChangeScreen,
            "LCD1" => Self::Lcd(LcdButton::Lcd1),
            "LCD2" => Self::Lcd(LcdButton::Lcd2),
            "LCD3" => Self::Lcd(LcdButton::Lcd3),
            "LCD4" => Self::Lcd(LcdButton::Lcd4),
            other => Self::Custom(other.to_string()),
        }
    }

    /// Format a key name as a command line.
    pub fn command_line(name: &str) -> String {
        format!("{BUTTON_PREFIX} {name}")
    }
}
