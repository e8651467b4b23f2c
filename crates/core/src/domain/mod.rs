pub mod contact;
pub mod deal;
pub mod device;
pub mod opportunity;
pub mod product;
