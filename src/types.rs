// src/types.rs

//! Small shared type aliases.

use std::future::Future;
use std::pin::Pin;

/// Boxed, sendable future used at the crate's trait seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
