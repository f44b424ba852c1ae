//! Access tokens and authenticated HTTP against a Dataverse environment.

mod service;
mod session;
mod transport;

pub use service::{AuthService, CachedToken, REFRESH_BUFFER, RequestOptions, TOKEN_VALIDITY};
pub use session::{HostSession, TokenProvider};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
