pub mod company;
pub mod credentials;
pub mod invoice;
pub mod issuer;

pub use company::CompanyProfile;
pub use credentials::{Credentials, FieldErrors, LoginForm};
pub use invoice::{Invoice, InvoiceItem, InvoiceListItem, InvoiceStatus};
pub use issuer::Issuer;
