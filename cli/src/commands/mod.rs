pub mod filter;
pub mod path_error;
