pub mod auth;
pub mod cuisine;
pub mod restaurant;
pub mod review;
pub mod shared;
