// tagshelf state managers
// Managers own loaded library state and route mutations through the record store.

pub mod bookmark_manager;
