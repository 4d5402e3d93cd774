//! Patch List View - the visible patches with their tags
//!
//! Displays the filtered patch list with keyboard navigation.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use crate::models::{Category, CategorySet};

/// Row displayed in the patch list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRow {
    pub file_name: String,
    pub tags: CategorySet,
}

/// Color used for a category badge
pub fn category_color(category: Category) -> Color {
    match category {
        Category::Api => Color::Cyan,
        Category::Performance => Color::Magenta,
        Category::BugFix => Color::Yellow,
        Category::Security => Color::Red,
        Category::SpigotFix => Color::LightBlue,
        Category::Other => Color::Gray,
    }
}

/// State for the patch list view
pub struct PatchListView {
    /// Visible rows, in catalog order
    pub items: Vec<PatchRow>,
    /// Selected row index
    pub selected: usize,
    /// List widget state
    pub list_state: ListState,
    /// Block title, usually the active filter
    pub title: String,
}

impl Default for PatchListView {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchListView {
    pub fn new() -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            items: Vec::new(),
            selected: 0,
            list_state,
            title: String::new(),
        }
    }

    /// Replace the rows, keeping the selection in range
    pub fn update_items(&mut self, items: Vec<PatchRow>) {
        self.items = items;
        if self.selected >= self.items.len() {
            self.selected = self.items.len().saturating_sub(1);
        }
        self.list_state.select(Some(self.selected));
    }

    /// Move selection down
    pub fn select_next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.selected = (self.selected + 1).min(self.items.len() - 1);
        self.list_state.select(Some(self.selected));
    }

    /// Move selection up
    pub fn select_previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.selected = self.selected.saturating_sub(1);
        self.list_state.select(Some(self.selected));
    }

    /// Move selection by a page
    pub fn page_down(&mut self, page: usize) {
        if self.items.is_empty() {
            return;
        }
        self.selected = (self.selected + page).min(self.items.len() - 1);
        self.list_state.select(Some(self.selected));
    }

    pub fn page_up(&mut self, page: usize) {
        self.selected = self.selected.saturating_sub(page);
        self.list_state.select(Some(self.selected));
    }

    /// Jump to top
    pub fn select_first(&mut self) {
        self.selected = 0;
        self.list_state.select(Some(0));
    }

    /// Jump to bottom
    pub fn select_last(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.selected = self.items.len() - 1;
        self.list_state.select(Some(self.selected));
    }

    /// Index of the selected row, if there are any rows
    pub fn selected_index(&self) -> Option<usize> {
        (!self.items.is_empty()).then_some(self.selected)
    }

    pub fn selected_item(&self) -> Option<&PatchRow> {
        self.items.get(self.selected)
    }

    /// Render the view
    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", self.title));

        if self.items.is_empty() {
            let empty = Paragraph::new("No patches match this filter")
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            frame.render_widget(empty, area);
            return;
        }

        let list_items: Vec<ListItem> = self
            .items
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let marker = if idx == self.selected { ">" } else { " " };
                let mut spans = vec![
                    Span::raw(format!(" {} ", marker)),
                    Span::raw(row.file_name.clone()),
                ];
                for category in row.tags.iter() {
                    spans.push(Span::raw(" "));
                    spans.push(Span::styled(
                        format!("[{}]", category.code()),
                        Style::default()
                            .fg(category_color(category))
                            .add_modifier(Modifier::BOLD),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let list = List::new(list_items)
            .block(block)
            .highlight_style(Style::default().bg(Color::DarkGray));

        frame.render_stateful_widget(list, area, &mut self.list_state);
    }
}
