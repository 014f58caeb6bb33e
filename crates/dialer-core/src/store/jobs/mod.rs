//! Job CRUD: reads in `read`, writes and aggregate recomputation in `write`.

mod read;
mod write;
