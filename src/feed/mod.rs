//! Feed and navigation: what the user is looking at, and which page comes
//! next.

mod controller;
mod nav;
pub mod resume;
mod state;

pub use controller::{FeedController, FeedHandle};
pub use nav::NavStack;
pub use resume::resume_index;
pub use state::{
    FeedCommand, FeedError, FeedEvent, FeedState, LoadTicket, PageRequest, ViewMode,
};
