pub mod credentials;
pub mod file;
pub mod memory;
pub mod traits;

pub use credentials::SharedCredentials;
pub use file::FilePeerStore;
pub use memory::MemoryPeerStore;
pub use traits::PeerStore;
