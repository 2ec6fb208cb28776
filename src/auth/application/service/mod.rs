pub mod credential_resolver;
pub mod login_service;
