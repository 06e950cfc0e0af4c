use studio_core::history::HistoryEntry;

/// Linear undo/redo list of results.
///
/// Invariant: `current` is `None` exactly when `entries` is empty, otherwise
/// it indexes a valid entry. Pushing after an undo drops the abandoned branch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    entries: Vec<HistoryEntry>,
    current: Option<usize>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial(entry: HistoryEntry) -> Self {
        Self {
            entries: vec![entry],
            current: Some(0),
        }
    }

    /// Rebuild from persisted parts, refusing an index that breaks the invariant.
    pub fn from_parts(entries: Vec<HistoryEntry>, current: Option<usize>) -> Result<Self, String> {
        match (entries.is_empty(), current) {
            (true, None) => {}
            (false, Some(i)) if i < entries.len() => {}
            (true, Some(i)) => return Err(format!("index {i} into an empty history")),
            (false, None) => {
                return Err(format!("no current index for {} entries", entries.len()))
            }
            (false, Some(i)) => {
                return Err(format!(
                    "index {i} out of range for {} entries",
                    entries.len()
                ))
            }
        }
        Ok(Self { entries, current })
    }

    /// Append as the new current entry. Returns how many redo entries were dropped.
    pub fn push(&mut self, entry: HistoryEntry) -> usize {
        let keep = self.current.map_or(0, |i| i + 1);
        let discarded = self.entries.len() - keep;
        self.entries.truncate(keep);
        self.entries.push(entry);
        self.current = Some(self.entries.len() - 1);
        discarded
    }

    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        match self.current {
            Some(i) if i > 0 => {
                self.current = Some(i - 1);
                self.entries.get(i - 1)
            }
            _ => None,
        }
    }

    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        match self.current {
            Some(i) if i + 1 < self.entries.len() => {
                self.current = Some(i + 1);
                self.entries.get(i + 1)
            }
            _ => None,
        }
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.current.and_then(|i| self.entries.get(i))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.current, Some(i) if i > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.current, Some(i) if i + 1 < self.entries.len())
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
