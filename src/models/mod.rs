mod page;
mod url;
mod user;
mod visit;

pub use page::{Page, PageError};
pub use url::{AliasListing, CreateUrlRequest, Owner};
pub use user::User;
pub use visit::{GeoLocation, NewVisit, Visit};
