use serde_json::Value;

use super::RepoApi;
use crate::types::HarvestError;

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub number: u32,
    pub items: Vec<Value>,
}

/// Lazy walk over an owner's repository pages, starting at page 1.
///
/// The first empty page ends the sequence and is not yielded; nothing else
/// (headers, counts) is consulted. An error is yielded once and the iterator
/// is exhausted afterwards.
pub struct Pages<'a, A: RepoApi + ?Sized> {
    api: &'a A,
    owner: &'a str,
    next_page: u32,
    done: bool,
}

impl<'a, A: RepoApi + ?Sized> Pages<'a, A> {
    pub fn new(api: &'a A, owner: &'a str) -> Self {
        Self {
            api,
            owner,
            next_page: 1,
            done: false,
        }
    }

    /// Drains the sequence, concatenating batches in page order.
    pub fn collect_items(self) -> Result<(u32, Vec<Value>), HarvestError> {
        let mut pages = 0;
        let mut items = Vec::new();
        for page in self {
            let page = page?;
            pages = page.number;
            items.extend(page.items);
        }
        Ok((pages, items))
    }
}

impl<A: RepoApi + ?Sized> Iterator for Pages<'_, A> {
    type Item = Result<Page, HarvestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let number = self.next_page;
        log::debug!("fetching page {} for {}", number, self.owner);
        match self.api.fetch_page(self.owner, number, super::PER_PAGE) {
            Ok(items) if items.is_empty() => {
                log::debug!("page {} is empty, pagination finished", number);
                self.done = true;
                None
            }
            Ok(items) => {
                self.next_page += 1;
                Some(Ok(Page { number, items }))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
