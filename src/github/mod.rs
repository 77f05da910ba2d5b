use serde_json::Value;

use crate::types::HarvestError;

pub mod client;
pub mod pages;

pub use client::GithubClient;
pub use pages::Pages;

/// Fixed page size requested from the API.
pub const PER_PAGE: u32 = 100;

/// One page of an owner's repository listing.
///
/// Implemented by [`GithubClient`] over HTTP; tests plug in fakes.
pub trait RepoApi {
    fn fetch_page(&self, owner: &str, page: u32, per_page: u32)
        -> Result<Vec<Value>, HarvestError>;
}

impl<T: RepoApi + ?Sized> RepoApi for &T {
    fn fetch_page(
        &self,
        owner: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Value>, HarvestError> {
        (**self).fetch_page(owner, page, per_page)
    }
}
