pub mod blob;
pub mod entities;
pub mod intake;
mod legacy;
