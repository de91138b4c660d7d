pub mod errors;
pub mod ids;
pub mod messages;
pub mod normalize;
pub mod provider;
pub mod tools;
