pub mod auth;
pub mod bookings;
pub mod cars;
pub mod comments;
pub mod images;
pub mod payments;
pub mod promotions;
pub mod providers;
