//! Book (catalog entry) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::user::UserSummary;

/// Book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub year: i32,
    /// Cover image reference (URL or path)
    pub image: String,
    pub available: bool,
    /// Admin who added the book
    pub added_by: Option<i32>,
    /// Borrower, set exactly when the book is not available
    pub issued_to: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    pub fn is_issued(&self) -> bool {
        !self.available && self.issued_to.is_some()
    }
}

/// Book with its user references resolved (admin listing)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookDetails {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub year: i32,
    pub image: String,
    pub available: bool,
    pub added_by: Option<UserSummary>,
    pub issued_to: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookDetails {
    pub fn new(book: Book, added_by: Option<UserSummary>, issued_to: Option<UserSummary>) -> Self {
        BookDetails {
            id: book.id,
            title: book.title,
            author: book.author,
            year: book.year,
            image: book.image,
            available: book.available,
            added_by,
            issued_to,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

/// Referenced book as shown inside requests
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookSummary {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub year: i32,
    pub image: String,
}

impl From<&Book> for BookSummary {
    fn from(book: &Book) -> Self {
        BookSummary {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            year: book.year,
            image: book.image.clone(),
        }
    }
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(required(message = "Missing required fields"), length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(required(message = "Missing required fields"), length(min = 1, message = "Author cannot be empty"))]
    pub author: Option<String>,
    #[validate(required(message = "Missing required fields"))]
    pub year: Option<i32>,
    #[validate(required(message = "Missing required fields"), length(min = 1, message = "Image cannot be empty"))]
    pub image: Option<String>,
}

/// Validated book fields ready for insertion
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub year: i32,
    pub image: String,
}

impl CreateBook {
    /// Validate and extract the required fields
    pub fn into_new_book(self) -> Result<NewBook, crate::error::AppError> {
        self.validate()?;
        match (self.title, self.author, self.year, self.image) {
            (Some(title), Some(author), Some(year), Some(image)) => Ok(NewBook {
                title,
                author,
                year,
                image,
            }),
            _ => Err(crate::error::AppError::Validation(
                "Missing required fields".to_string(),
            )),
        }
    }
}

/// Partial book update; availability is owned by the request workflow
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author cannot be empty"))]
    pub author: Option<String>,
    pub year: Option<i32>,
    #[validate(length(min = 1, message = "Image cannot be empty"))]
    pub image: Option<String>,
}
