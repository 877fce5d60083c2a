//! Thin wrappers over axum extractors whose rejections render through
//! [`AppError`] instead of axum's plain-text bodies.

use axum::extract::{FromRequestParts, Path as AxumPath, Query as AxumQuery};

use crate::error::AppError;

#[derive(FromRequestParts)]
#[from_request(via(AxumPath), rejection(AppError))]
pub struct Path<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(AxumQuery), rejection(AppError))]
pub struct Query<T>(pub T);
