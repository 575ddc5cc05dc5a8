// Client module - listing fetch and background downloads

mod connection;
mod coordinator;
mod receiver;
mod session;
mod status;

pub use connection::ClientConnection;
pub use coordinator::DownloadCoordinator;
pub use receiver::FileReceiver;
pub use session::{NoopObserver, TransferObserver, TransferSession};
pub use status::{StatusBoard, StatusWriter, TransferStatus};
