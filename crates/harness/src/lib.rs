pub mod client;
pub mod fixtures;
pub mod office;

pub use client::TestClient;
pub use office::TestOffice;
