// tagshelf shared type definitions
// Each submodule defines types used across the library, the store backends and the RPC layer.

pub mod ai;
pub mod bookmark;
pub mod errors;
pub mod notification;
pub mod score;
pub mod settings;
