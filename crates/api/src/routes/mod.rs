mod health;
mod lookup;

pub use health::health_router;
pub use lookup::lookup_router;
