pub mod restaurant;
pub mod restaurant_cuisine;
pub mod review;
pub mod user;
