mod pipeline;
mod transport;

pub use pipeline::{LoadState, NullObserver, SpriteObserver};
pub use transport::{
    ErrorReason, FileTransport, Resource, ResourceKind, Response, ResponseError, Transport,
};
