//! Drape storefront library.
//!
//! Client-side storefront services: the live product catalog, a durable
//! cart priced against that catalog, the checkout gate and order
//! submission, order tracking and the user profile. Views hold an
//! [`state::AppState`] and call into these services; the remote document
//! store and client storage sit behind traits so tests can swap them.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod orders;
pub mod profile;
pub mod remote;
pub mod scroll;
pub mod search;
pub mod session;
pub mod state;
pub mod storage;
pub mod subscription;
