pub mod chunk;
pub mod embed;
pub mod extract;
pub mod search;
pub mod status;
