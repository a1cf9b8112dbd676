mod catalog;
mod engagement;
mod ids;
mod item;
mod layout;
mod note;
mod progress;

pub use ids::{Fingerprint, ItemId, ItemIdError};

pub use catalog::{Catalog, CatalogError};
pub use engagement::{Feedback, Like, Rating, RatingError};
pub use item::{ContentItem, ContentItemDraft, ContentItemError, MediaSource};
pub use layout::{MAX_PANEL_WIDTH, MIN_PANEL_WIDTH, PanelLayout};
pub use note::{MAX_NOTE_CHARS, Note, NoteError};
pub use progress::{COMPLETION_THRESHOLD, FULL_PERCENTAGE, ProgressRecord, ProgressUpdate};
