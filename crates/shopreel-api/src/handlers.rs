//! Request handlers.

use axum::extract::FromRequest;

use crate::error::ApiError;

pub mod assets;
pub mod generate;
pub mod health;
pub mod jobs;
pub mod membership;
pub mod parse_video;
pub mod projects;
pub mod video;

pub use assets::*;
pub use generate::*;
pub use health::*;
pub use jobs::*;
pub use membership::*;
pub use parse_video::*;
pub use projects::*;
pub use video::*;

/// JSON body whose rejections render as an [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
