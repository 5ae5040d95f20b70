//! Menu model: an ordered list of labelled actions with a wrapping cursor.

/// What selecting a built-in menu entry does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    ReloadConfig,
    /// Open the "Unload Plugin" submenu.
    UnloadMenu,
    /// Open the "Reload Plugin" submenu.
    ReloadMenu,
    Unload(String),
    Reload(String),
    BackToMain,
    CloseMenu,
    Quit,
}

/// One selectable entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem<T> {
    pub label: String,
    pub action: T,
}

/// Ordered menu with a cursor that wraps at both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuModel<T = MenuAction> {
    name: String,
    items: Vec<MenuItem<T>>,
    cursor: usize,
}

impl<T> MenuModel<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            cursor: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append an entry. The cursor goes back to the top.
    pub fn add_item(&mut self, label: impl Into<String>, action: T) {
        self.items.push(MenuItem {
            label: label.into(),
            action,
        });
        self.cursor = 0;
    }

    /// Builder form of [`add_item`](Self::add_item).
    pub fn with_item(mut self, label: impl Into<String>, action: T) -> Self {
        self.add_item(label, action);
        self
    }

    /// Move down, wrapping from the last entry to the first.
    pub fn next(&mut self) {
        if !self.items.is_empty() {
            self.cursor = (self.cursor + 1) % self.items.len();
        }
    }

    /// Move up, wrapping from the first entry to the last.
    pub fn previous(&mut self) {
        if !self.items.is_empty() {
            self.cursor = self.cursor.checked_sub(1).unwrap_or(self.items.len() - 1);
        }
    }

    /// Label under the cursor; empty for an empty menu.
    pub fn current_label(&self) -> &str {
        self.items
            .get(self.cursor)
            .map(|i| i.label.as_str())
            .unwrap_or("")
    }

    /// Action under the cursor; `None` for an empty menu.
    pub fn current_action(&self) -> Option<&T> {
        self.items.get(self.cursor).map(|i| &i.action)
    }

    /// 1-based cursor position (1 even when empty).
    pub fn position(&self) -> usize {
        self.cursor + 1
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[MenuItem<T>] {
        &self.items
    }

    /// `[pos/count]` indicator shown in the menu bar.
    pub fn indicator(&self) -> String {
        format!("[{}/{}]", self.position(), self.size())
    }
}
