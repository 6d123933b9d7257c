/// Splits line-oriented command output into messages no longer than a
/// character budget, never breaking a single entry across two messages.
#[derive(Debug)]
pub struct Paginator {
    limit: usize,
    current: String,
    current_chars: usize,
    pages: Vec<String>,
}

impl Paginator {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            current: String::new(),
            current_chars: 0,
            pages: Vec::new(),
        }
    }

    /// Start with a heading on the first page.
    pub fn with_header(limit: usize, header: &str) -> Self {
        let mut pager = Self::new(limit);
        pager.push(header);
        pager
    }

    /// Append one entry, starting a new page first if it would not fit.
    ///
    /// An entry longer than the limit on its own gets a page to itself.
    pub fn push(&mut self, entry: &str) {
        let chars = entry.chars().count();
        if self.current_chars > 0 && self.current_chars + chars > self.limit {
            self.pages.push(std::mem::take(&mut self.current));
            self.current_chars = 0;
        }
        self.current.push_str(entry);
        self.current_chars += chars;
    }

    pub fn finish(mut self) -> Vec<String> {
        if !self.current.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}
