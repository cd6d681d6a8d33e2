pub mod grammar;

pub use grammar::{
    ParserError, SourceError, parse_compilation_unit, parse_expression,
    parse_expression_source, parse_replacement, parse_replacement_source, parse_source,
    parse_statement,
};
