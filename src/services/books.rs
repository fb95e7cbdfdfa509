//! Book inventory service

use validator::Validate;

use crate::{
    error::AppResult,
    models::book::{Book, BookDetails, CreateBook, UpdateBook},
    repository::Repository,
};

use super::lookup;

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Books with the adding admin and current borrower resolved
    pub async fn list_books_detailed(&self) -> AppResult<Vec<BookDetails>> {
        let books = self.repository.books.list().await?;
        lookup::book_details(&self.repository, books).await
    }

    pub async fn add_book(&self, admin_id: i32, book: CreateBook) -> AppResult<Book> {
        let new_book = book.into_new_book()?;
        let created = self.repository.books.create(&new_book, admin_id).await?;
        tracing::info!(book_id = created.id, admin_id, "Added book \"{}\"", created.title);
        Ok(created)
    }

    pub async fn update_book(&self, id: i32, book: UpdateBook) -> AppResult<Book> {
        book.validate()?;
        self.repository.books.update(id, &book).await
    }

    /// Delete a book that is not currently issued
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Deleted book");
        Ok(())
    }
}
