mod mem_tree;
mod path;
mod tree;
mod value;

pub use mem_tree::*;
pub use path::*;
pub use tree::*;
pub use value::*;

#[cfg(test)]
mod value_test;
