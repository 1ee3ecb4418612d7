pub mod client;
pub mod dataset;
pub mod timestamp;
pub mod user;

pub use client::Client;
pub use dataset::{CreatorColumn, Dataset, DatasetFile, DatasetStatus, FileStatus, NewDataset, NewDatasetFile};
pub use user::{AppUser, ClientGrant};
