pub mod memory;
pub mod theater;

pub use memory::TheaterStore;
pub use theater::{Theater, TheaterId};
