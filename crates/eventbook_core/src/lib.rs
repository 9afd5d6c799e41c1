pub mod domain;
pub mod ports;

pub use domain::{
    AuthResponse, Event, EventFilters, EventPatch, LoginCredentials, PaginatedResponse, Registration,
    RegistrationStatus, Session, SignupCredentials, SortOrder, Speaker, User, UserPatch,
};
pub use ports::{
    ApiError, ApiResult, HttpTransport, Method, SecureStorage, StorageError, StorageResult,
    TokenProvider, WireRequest, WireResponse,
};
