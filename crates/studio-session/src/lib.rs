pub mod session;
pub mod snapshot;
pub mod timeline;


pub use session::GenerationSession;
pub use snapshot::SessionSnapshot;
pub use timeline::Timeline;
