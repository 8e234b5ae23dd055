mod requests;
mod responses;

pub use requests::{LoginRequest, SignupRequest};
pub use responses::{
    ErrorResponse, HealthResponse, LogoutResponse, SignupResponse, TokenResponse,
};
