pub mod token;
pub mod tokenizer;

pub use token::{Token, TokenKind};
pub use tokenizer::{LexResult, LexerError, tokenize};
