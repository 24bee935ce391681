//! Types shared between the Tubegrab client library and its front-ends.
pub mod errors;
pub mod models;
pub mod url;

pub use errors::{ClientError, ClientResult, ErrorKind, ValidationError};
pub use models::{FormatOption, VideoInfo};
