use thiserror::Error;

use crate::model::{CatalogError, ContentItemError, ItemIdError, NoteError, RatingError};

/// Union of the domain validation errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    ItemId(#[from] ItemIdError),
    #[error(transparent)]
    ContentItem(#[from] ContentItemError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Rating(#[from] RatingError),
    #[error(transparent)]
    Note(#[from] NoteError),
}
