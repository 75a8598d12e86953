pub mod credentials;
pub mod page;
pub mod transport;

pub use credentials::FileCredentialStore;
pub use page::HtmlPage;
pub use transport::ReqwestTransport;
