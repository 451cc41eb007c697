pub mod booked_car;
pub mod booking;
pub mod car;
pub mod comment;
pub mod promotion;
pub mod rental_car_provider;
pub mod user;
