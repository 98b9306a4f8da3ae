pub mod binop_registry;
pub mod object;
