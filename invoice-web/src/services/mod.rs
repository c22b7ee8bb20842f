pub mod auth;
pub mod notion;
pub mod store;

pub use auth::{AuthError, Authenticator, ConfiguredIssuer};
pub use notion::NotionClient;
pub use store::{InvoicePage, InvoiceStore, ListQuery, StoreError};
