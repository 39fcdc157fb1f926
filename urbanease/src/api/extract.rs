//! Extractors that report rejections through [`Error`], so a malformed body, path or query
//! string gets the same `{"message": ...}` JSON body and 400 status as any other bad request.

use crate::errors::Error;
use axum::extract::{FromRequest, FromRequestParts};

/// `axum::Json` with JSON error bodies
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` with JSON error bodies
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct ApiPath<T>(pub T);

/// `axum::extract::Query` with JSON error bodies
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct ApiQuery<T>(pub T);
