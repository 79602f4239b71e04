//! Draining paginated list RPCs.

use std::future::Future;

use crate::backend::{BackendError, Page};

/// Fetch every page of a listing, following continuation tokens.
///
/// Stops once the reported total has been received, the backend returns no
/// continuation token, or a page comes back empty.
pub async fn drain_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, BackendError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, BackendError>>,
{
    let mut items = Vec::new();
    let mut token = None;
    loop {
        let page = fetch(token.take()).await?;
        let received = page.items.len();
        items.extend(page.items);

        if received == 0
            || page.next_page_token.is_empty()
            || items.len() as i64 >= page.total_size
        {
            return Ok(items);
        }
        token = Some(page.next_page_token);
    }
}
