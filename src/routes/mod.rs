/// Router Module Index
///
/// Routes are split by access level so protection is applied per router rather
/// than per handler registration.

/// Unauthenticated routes: health check and login.
pub mod public;

/// Routes behind the `AuthUser` middleware. Department permissions are checked
/// inside each handler.
pub mod authenticated;

/// Routes nested under `/admin`. Every handler requires the ADMIN role.
pub mod admin;
