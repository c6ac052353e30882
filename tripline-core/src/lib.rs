pub mod email;
pub mod error;
pub mod identity;
pub mod notify;
pub mod quote;
pub mod repository;
pub mod token;
pub mod trip;

pub use error::{NotifyError, StoreError, WorkflowError, WorkflowResult};
