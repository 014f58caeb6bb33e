//! Queue-entry CRUD: reads (including the due-batch fetch) in `read`,
//! state transitions in `write`.

mod read;
mod write;
