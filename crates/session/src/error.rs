use testbed_kernel::WorldError;
use testbed_protocol::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no demo at index {0}")]
    UnknownDemo(usize),
    #[error("demo registry is empty")]
    NoDemos,
    #[error("demo failed to build: {0}")]
    Demo(#[from] WorldError),
    #[error("step requested before any world was sent")]
    NoWorld,
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}
