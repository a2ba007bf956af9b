//! pbgen-compiler
//!
//! This crate implements:
//!  1) A tokenizer + parser + [`TextLoader`] for `.proto`-style schema files,
//!  2) The [`Compiler`] engine: directory expansion, skip lists, import-first
//!     ordering and per-file dedup,
//!  3) The extension points every target language plugs into
//!     ([`TypeResolver`], [`Writer`], [`Backend`]),
//!  4) Two backends: [`backends::java`] (one class per definition) and
//!     [`backends::rust`] (one module per schema file),
//!  5) Error types (`GenError` and friends) and [`CompilerConfig`].

pub mod backend;
pub mod backends;
pub mod compiler;
pub mod config;
pub mod error;
pub mod loader;
pub mod parser;
pub mod resolver;
pub mod tokenizer;
pub mod utils;
pub mod writer;

pub use backend::Backend;
pub use compiler::{CompileStats, Compiler};
pub use config::{CompilerConfig, SkipList};
pub use error::{ConfigError, GenError, LoadError, ResolveError};
pub use loader::{Loader, TextLoader};
pub use resolver::{Resolved, TypeResolver};
pub use writer::{Output, Writer};
