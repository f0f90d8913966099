pub mod lookup;
pub mod rating;
pub mod restaurant;
pub mod review;
