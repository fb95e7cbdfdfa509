//! Reference resolution for API responses.
//!
//! Requests and books store user/book IDs. Before they are returned, the
//! referenced rows are fetched in one query per table and joined in memory.

use std::collections::{BTreeSet, HashMap};

use crate::{
    error::AppResult,
    models::{Book, BookDetails, BookRequest, BookRequestDetails, BookSummary, UserSummary},
    repository::Repository,
};

fn unique_ids(ids: impl Iterator<Item = Option<i32>>) -> Vec<i32> {
    ids.flatten().collect::<BTreeSet<_>>().into_iter().collect()
}

async fn user_summaries(repository: &Repository, ids: &[i32]) -> AppResult<HashMap<i32, UserSummary>> {
    Ok(repository
        .users
        .get_many(ids)
        .await?
        .iter()
        .map(|user| (user.id, UserSummary::from(user)))
        .collect())
}

async fn book_summaries(repository: &Repository, ids: &[i32]) -> AppResult<HashMap<i32, BookSummary>> {
    Ok(repository
        .books
        .get_many(ids)
        .await?
        .iter()
        .map(|book| (book.id, BookSummary::from(book)))
        .collect())
}

/// Join requests with already fetched books and users, keeping request order
pub fn join_requests(
    requests: Vec<BookRequest>,
    books: &HashMap<i32, BookSummary>,
    users: &HashMap<i32, UserSummary>,
) -> Vec<BookRequestDetails> {
    requests
        .into_iter()
        .map(|request| {
            let book = request.book_id.and_then(|id| books.get(&id).cloned());
            let user = request.user_id.and_then(|id| users.get(&id).cloned());
            BookRequestDetails::new(request, book, user)
        })
        .collect()
}

/// Resolve book and user of each request
pub async fn request_details(
    repository: &Repository,
    requests: Vec<BookRequest>,
) -> AppResult<Vec<BookRequestDetails>> {
    let book_ids = unique_ids(requests.iter().map(|r| r.book_id));
    let user_ids = unique_ids(requests.iter().map(|r| r.user_id));

    let books = book_summaries(repository, &book_ids).await?;
    let users = user_summaries(repository, &user_ids).await?;

    Ok(join_requests(requests, &books, &users))
}

/// Resolve the book of each request only (the user is the caller)
pub async fn request_details_with_book(
    repository: &Repository,
    requests: Vec<BookRequest>,
) -> AppResult<Vec<BookRequestDetails>> {
    let book_ids = unique_ids(requests.iter().map(|r| r.book_id));
    let books = book_summaries(repository, &book_ids).await?;

    Ok(join_requests(requests, &books, &HashMap::new()))
}

/// Resolve `addedBy` and `issuedTo` of each book
pub async fn book_details(repository: &Repository, books: Vec<Book>) -> AppResult<Vec<BookDetails>> {
    let user_ids = unique_ids(books.iter().flat_map(|b| [b.added_by, b.issued_to]));
    let users = user_summaries(repository, &user_ids).await?;

    Ok(books
        .into_iter()
        .map(|book| {
            let added_by = book.added_by.and_then(|id| users.get(&id).cloned());
            let issued_to = book.issued_to.and_then(|id| users.get(&id).cloned());
            BookDetails::new(book, added_by, issued_to)
        })
        .collect())
}
