#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerItem {
    pub id: String,
    pub label: String,
    pub detail: Option<String>,
}

impl PickerItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PickerState {
    pub title: String,
    pub items: Vec<PickerItem>,
    pub selected: usize,
}

impl PickerState {
    pub fn new<T: Into<String>>(title: T, items: Vec<PickerItem>, selected: usize) -> Self {
        let selected = if items.is_empty() {
            0
        } else {
            selected.min(items.len() - 1)
        };
        Self {
            title: title.into(),
            items,
            selected,
        }
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.items.get(self.selected).map(|i| i.id.as_str())
    }

    pub fn selected_item(&self) -> Option<&PickerItem> {
        self.items.get(self.selected)
    }

    pub fn move_up(&mut self) {
        if !self.items.is_empty() {
            if self.selected == 0 {
                self.selected = self.items.len() - 1;
            } else {
                self.selected -= 1;
            }
        }
    }

    pub fn move_down(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + 1) % self.items.len();
        }
    }

    /// Keep the selection on the same item id after the list is rebuilt.
    pub fn replace_items(&mut self, items: Vec<PickerItem>) {
        let previous = self.selected_id().map(|id| id.to_string());
        self.items = items;
        self.selected = previous
            .and_then(|id| self.items.iter().position(|i| i.id == id))
            .unwrap_or(0);
        if self.selected >= self.items.len() {
            self.selected = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picker() -> PickerState {
        PickerState::new(
            "Chats",
            vec![
                PickerItem::new("a", "Alpha"),
                PickerItem::new("b", "Beta"),
                PickerItem::new("c", "Gamma"),
            ],
            0,
        )
    }

    #[test]
    fn navigation_wraps_both_ways() {
        let mut p = picker();
        p.move_up();
        assert_eq!(p.selected_id(), Some("c"));
        p.move_down();
        assert_eq!(p.selected_id(), Some("a"));
    }

    #[test]
    fn empty_picker_is_inert() {
        let mut p = PickerState::new("Empty", vec![], 0);
        p.move_down();
        p.move_up();
        assert_eq!(p.selected_id(), None);
    }

    #[test]
    fn replace_items_keeps_the_selected_id() {
        let mut p = picker();
        p.move_down();
        assert_eq!(p.selected_id(), Some("b"));
        p.replace_items(vec![
            PickerItem::new("x", "New"),
            PickerItem::new("b", "Beta (renamed)"),
        ]);
        assert_eq!(p.selected_id(), Some("b"));
        p.replace_items(vec![PickerItem::new("z", "Only")]);
        assert_eq!(p.selected_id(), Some("z"));
    }
}
