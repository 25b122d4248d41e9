//! Async streaming front end for block I/O.

mod block_stream;

pub use block_stream::{
    BlockSink,
    BlockStream,
    DEFAULT_BLOCK_SIZE,
};
