pub mod auth;
pub mod image;
pub mod restaurant;
pub mod review;
