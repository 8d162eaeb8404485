pub mod args;
pub mod create;
pub mod info;
pub mod library;
