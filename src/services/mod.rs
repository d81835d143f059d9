pub mod auth_service;
pub use auth_service::{AccessToken, AuthError, AuthService, Registration};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod player_service;
pub use player_service::{PlayerError, PlayerService};

pub mod player_service_impl;
pub use player_service_impl::SeaOrmPlayerService;

pub mod password;
pub use password::PasswordHasher;

pub mod rate_limit;
pub use rate_limit::{RateLimited, RateLimiter};

pub mod token;
pub use token::{TokenError, TokenService};
