pub mod catalog;
pub mod message;
pub mod recommendation;
pub mod result;
