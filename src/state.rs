use crate::config::Config;
use crate::executor::{self, ClipboardAccess, Notifications};
use crate::matcher::{self, SEARCH_LIMIT};
use crate::model::Entry;
use crate::sources::{LoadEvent, LoadOutcome};
use crate::store::EntryStore;
use crate::window::{Point, WindowController};

/// Progress of the background catalog load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Syncing,
    Ready(usize),
    Failed(String),
}

/// Status line shown under the search box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    pub text: String,
    pub is_error: bool,
}

impl LoadStatus {
    pub fn indicator(&self) -> Option<Indicator> {
        match self {
            LoadStatus::Syncing => Some(Indicator {
                text: "Syncing waypoints...".to_string(),
                is_error: false,
            }),
            LoadStatus::Ready(_) => None,
            LoadStatus::Failed(_) => Some(Indicator {
                text: "Waypoint sync failed".to_string(),
                is_error: true,
            }),
        }
    }
}

/// What a pointer press at some surface position lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Outside,
    Close,
    Header,
    SearchBox,
    Result(usize),
    Panel,
}

pub struct AppState {
    pub config: Config,
    pub store: EntryStore,
    pub filtered_indices: Vec<usize>,
    pub selected_index: usize,
    pub scroll_offset: usize,
    pub query: String,
    pub window: WindowController,
    pub load_status: LoadStatus,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let window = WindowController::new(
            config.layout.clone(),
            config.general.position,
            config.general.fade_factor,
        );
        Self {
            config,
            store: EntryStore::new(),
            filtered_indices: Vec::new(),
            selected_index: 0,
            scroll_offset: 0,
            query: String::new(),
            window,
            load_status: LoadStatus::Syncing,
        }
    }

    pub fn update_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.update_filter();
    }

    pub fn update_filter(&mut self) {
        self.filtered_indices = matcher::search_indices(&self.query, self.store.all(), SEARCH_LIMIT);
        self.window.on_results_changed(self.filtered_indices.len());
        self.selected_index = 0;
        self.scroll_offset = 0;
    }

    /// Applies a message from the loader thread. Returns true when the
    /// panel needs a redraw.
    pub fn apply_load_event(&mut self, event: LoadEvent) -> bool {
        match event {
            LoadEvent::Entries(entries) => {
                let before = self.store.len();
                for entry in entries {
                    self.store.try_add(entry);
                }
                if self.store.len() == before || !matcher::is_searchable(&self.query) {
                    return false;
                }
                self.refilter_keeping_selection();
                true
            }
            LoadEvent::Finished(outcome) => {
                self.finish_load(outcome);
                true
            }
        }
    }

    pub fn finish_load(&mut self, outcome: LoadOutcome) {
        self.load_status = match outcome {
            LoadOutcome::Completed(_) => LoadStatus::Ready(self.store.len()),
            LoadOutcome::Failed(err) => {
                log::warn!("Waypoint sync failed with {} entries loaded: {}", self.store.len(), err);
                LoadStatus::Failed(err.to_string())
            }
        };
    }

    fn refilter_keeping_selection(&mut self) {
        let selected = self.selected_index;
        let scroll = self.scroll_offset;
        self.update_filter();
        let len = self.filtered_indices.len();
        self.selected_index = selected.min(len.saturating_sub(1));
        self.scroll_offset = scroll.min(self.max_scroll());
    }

    pub fn placeholder(&self) -> String {
        match self.load_status {
            LoadStatus::Ready(count) => format!("Search {count} waypoints..."),
            _ => "Search Waypoints...".to_string(),
        }
    }

    pub fn result(&self, index: usize) -> Option<&Entry> {
        self.filtered_indices
            .get(index)
            .map(|&idx| &self.store.all()[idx])
    }

    pub fn get_selected(&self) -> Option<&Entry> {
        self.result(self.selected_index)
    }

    /// Results currently scrolled into view, with their result index.
    pub fn visible_results(&self) -> impl Iterator<Item = (usize, &Entry)> {
        let rows = self.window.visible_rows();
        let entries = self.store.all();
        self.filtered_indices
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(rows)
            .map(move |(i, &idx)| (i, &entries[idx]))
    }

    pub fn move_selection(&mut self, delta: i32) {
        if self.filtered_indices.is_empty() {
            self.selected_index = 0;
            return;
        }

        let len = self.filtered_indices.len() as i32;
        let new_index = (self.selected_index as i32 + delta).rem_euclid(len);
        self.selected_index = new_index as usize;

        let rows = self.window.visible_rows().max(1);
        if self.selected_index < self.scroll_offset {
            self.scroll_offset = self.selected_index;
        } else if self.selected_index >= self.scroll_offset + rows {
            self.scroll_offset = self.selected_index + 1 - rows;
        }
    }

    fn max_scroll(&self) -> usize {
        self.filtered_indices
            .len()
            .saturating_sub(self.window.visible_rows())
    }

    pub fn scroll(&mut self, rows: i32) {
        let target = self.scroll_offset as i64 + rows as i64;
        self.scroll_offset = target.clamp(0, self.max_scroll() as i64) as usize;
    }

    pub fn hit_test(&self, p: Point) -> Hit {
        let panel = self.window.panel();
        if !panel.contains(p) {
            return Hit::Outside;
        }
        let origin = panel.origin;

        if self.window.close_button().offset(origin).contains(p) {
            return Hit::Close;
        }
        if p.y - origin.y < self.window.layout().drag_zone {
            return Hit::Header;
        }
        if self.window.search_box().offset(origin).contains(p) {
            return Hit::SearchBox;
        }
        if let Some(area) = self.window.results_area().map(|r| r.offset(origin)) {
            if area.contains(p) {
                let row = ((p.y - area.origin.y) / self.window.layout().item_height) as usize;
                let index = self.scroll_offset.saturating_add(row);
                if index < self.filtered_indices.len() {
                    return Hit::Result(index);
                }
            }
        }
        Hit::Panel
    }

    /// Copies the result's reference and closes the panel.
    pub fn link(
        &mut self,
        index: usize,
        clipboard: &dyn ClipboardAccess,
        notifications: &dyn Notifications,
    ) -> bool {
        if !self.window.is_open() {
            return false;
        }
        let Some(entry) = self.result(index) else {
            return false;
        };
        executor::link_entry(entry, clipboard, notifications);
        self.window.toggle();
        true
    }

    pub fn teardown(&mut self) {
        if !self.store.is_empty() {
            log::debug!("Dropping {} waypoints", self.store.len());
        }
        self.store.clear();
        self.filtered_indices.clear();
        self.selected_index = 0;
        self.scroll_offset = 0;
        self.window.on_results_changed(0);
    }
}
