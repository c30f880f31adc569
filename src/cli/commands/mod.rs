pub mod events;
pub mod keygen;
pub mod school;
