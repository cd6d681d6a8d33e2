pub mod printer;

pub use printer::{PrintOptions, Printer, print_expr, print_stmt, print_type};
