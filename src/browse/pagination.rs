/// What happened to a fetched listing page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageProgress {
    /// Results were added to the pool
    Loaded { reached_initial: bool },
    /// The page lies beyond the clamped page limit
    Exhausted,
    /// Filters changed while the page was in flight
    Stale,
    /// A page after the initial ones failed and loading stopped
    Stopped,
}

/// Page cursor over the listing API
///
/// Pages are zero-based. The first page clamps `max_pages` to the listing's
/// `total_pages`, and keeps `initial_pages` below the clamp. The first draw
/// happens once page `initial_pages` has been loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    max_pages: u32,
    initial_pages: u32,
    total_pages: Option<u32>,
    next_index: u32,
    stopped: bool,
    generation: u64,
}

impl Paginator {
    pub fn new(max_pages: u32, initial_pages: u32) -> Self {
        Self {
            max_pages,
            initial_pages,
            total_pages: None,
            next_index: 0,
            stopped: false,
            generation: 0,
        }
    }

    /// Next page to fetch, if loading should continue
    pub fn next_page(&self) -> Option<u32> {
        (!self.stopped && self.next_index < self.max_pages).then_some(self.next_index)
    }

    /// Records a successfully fetched page and advances the cursor.
    pub fn record_page(&mut self, index: u32, total_pages: u32) -> PageProgress {
        if index == 0 {
            self.total_pages = Some(total_pages);
            self.max_pages = self.max_pages.min(total_pages);
            if self.max_pages <= self.initial_pages {
                self.initial_pages = self.max_pages.saturating_sub(1);
            }
        }

        if index >= self.max_pages {
            return PageProgress::Exhausted;
        }

        self.next_index = self.next_index.max(index + 1);
        PageProgress::Loaded {
            reached_initial: index == self.initial_pages,
        }
    }

    /// Whether the page that triggers the first draw has been loaded
    pub fn initial_loaded(&self) -> bool {
        self.next_index > self.initial_pages
    }

    /// Whether a failure on `index` must be surfaced to the caller
    pub fn is_initial(&self, index: u32) -> bool {
        index <= self.initial_pages
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Allows `pages` more pages, up to the listing's total, and resumes loading.
    pub fn extend(&mut self, pages: u32) {
        let extended = self.max_pages.saturating_add(pages);
        self.max_pages = match self.total_pages {
            Some(total) => extended.min(total),
            None => extended,
        };
        self.stopped = false;
    }

    /// Starts over with fresh limits. Pages fetched under an older generation
    /// are discarded.
    pub fn reset(&mut self, max_pages: u32, initial_pages: u32) {
        let generation = self.generation.wrapping_add(1);
        *self = Self::new(max_pages, initial_pages);
        self.generation = generation;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub fn initial_pages(&self) -> u32 {
        self.initial_pages
    }
}
