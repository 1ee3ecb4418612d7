pub mod dataset_service;
pub mod integrity;

pub use dataset_service::{
    DatasetDetail, DatasetError, DatasetInput, DatasetService, FileInput, ProcessOutcome,
};
pub use integrity::Integrity;
