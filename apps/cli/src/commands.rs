pub mod import;
pub mod mine;
pub mod verify;
