// Authentication module
// Decision: Cookie-based JWT sessions, one cookie per principal kind
// Decision: A missing or invalid cookie means "not logged in", never an error by itself

pub mod middleware;
pub mod routes;
pub mod session;

pub use middleware::{LoginAdmin, LoginUser, MaybeUser};
pub use routes::routes;
pub use session::{SessionService, ADMIN_COOKIE, USER_COOKIE};
