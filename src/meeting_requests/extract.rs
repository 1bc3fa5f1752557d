//! Extractors whose rejections render as [`MeetingRequestsError`] bodies.

use axum::extract::{FromRequest, FromRequestParts};

use super::error::MeetingRequestsError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(MeetingRequestsError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(MeetingRequestsError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(MeetingRequestsError))]
pub struct ApiPath<T>(pub T);
