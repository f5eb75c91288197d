pub mod demographics;
pub mod election;
