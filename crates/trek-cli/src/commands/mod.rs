pub mod category;
pub mod common;
pub mod convert;
pub mod currency;
pub mod expense;
pub mod sync;
pub mod trip;
