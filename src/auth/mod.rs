pub mod claims;
pub mod gate;
pub mod jwt;
pub mod password;

pub use claims::Claims;
pub use gate::{authenticate, AuthRejection};
pub use jwt::{JwtKeys, TokenError, TokenService};
