pub mod assembler;
pub mod schema;
