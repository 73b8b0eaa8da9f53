use serde::Deserialize;

/// Kind of a point of interest as reported by the map catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoiKind {
    Waypoint,
    Landmark,
    Vista,
    Unlock,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: u32,                   // Catalog id, unique within a store
    pub name: Option<String>,      // Display name, may be missing in the catalog
    pub reference: Option<String>, // Chat link copied on selection
    search_key: String,            // Lowercased name, empty when unnamed
}

impl Entry {
    pub fn new(id: u32, name: Option<String>, reference: Option<String>) -> Self {
        let search_key = name.as_deref().map(str::to_lowercase).unwrap_or_default();
        Self {
            id,
            name,
            reference,
            search_key,
        }
    }

    /// The name to show, or `None` when the catalog gave an empty or missing one.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.trim().is_empty())
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref().filter(|r| !r.is_empty())
    }

    /// Entries that can be shown and linked: named and carrying a reference.
    pub fn is_linkable(&self) -> bool {
        self.display_name().is_some() && self.reference().is_some()
    }

    pub fn search_key(&self) -> &str {
        &self.search_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_key_is_lowercased_name() {
        let entry = Entry::new(1, Some("Cornerstone Waypoint".into()), Some("[&BAEAAAA=]".into()));
        assert_eq!(entry.search_key(), "cornerstone waypoint");
        assert!(entry.is_linkable());
    }

    #[test]
    fn unnamed_or_unlinked_entries_are_not_linkable() {
        let unnamed = Entry::new(1, None, Some("[&BAEAAAA=]".into()));
        assert_eq!(unnamed.display_name(), None);
        assert_eq!(unnamed.search_key(), "");
        assert!(!unnamed.is_linkable());

        let blank = Entry::new(2, Some("   ".into()), Some("[&BAIAAAA=]".into()));
        assert!(!blank.is_linkable());

        let no_link = Entry::new(3, Some("Vigil Keep".into()), None);
        assert!(!no_link.is_linkable());

        let empty_link = Entry::new(4, Some("Vigil Keep".into()), Some(String::new()));
        assert!(!empty_link.is_linkable());
    }
}
