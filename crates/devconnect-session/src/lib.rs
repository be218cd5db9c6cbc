//! Session client for the DevConnect REST API.
//!
//! This crate provides:
//! - [`SessionClient`]: bearer-token session management with a single
//!   automatic refresh-and-retry on `401`
//! - An explicit FSM for the session status (`rust-fsm`)
//! - [`SocialApi`]: typed wrappers for users, follows, posts, likes,
//!   comments and search
//! - The wire models shared by every view layer

mod auth_fsm;
mod client;
mod error;
mod models;
mod request;
mod social;

pub use auth_fsm::session_machine;
pub use auth_fsm::{
    SessionInput, SessionMachine, SessionMachineState, SessionStatus, StatusChangedPayload,
};
pub use client::{SessionClient, SessionSnapshot, StatusCallback};
pub use error::{SessionError, SessionResult};
pub use models::{
    Comment, FollowResult, FollowStatus, ImageUpload, Listing, Post, ProfileUpdate, UserProfile,
    ALLOWED_IMAGE_TYPES, MAX_IMAGE_BYTES,
};
pub use social::SocialApi;
