//! # ALAN-2022 Compiler
//!
//! A whole-program compiler for ALAN-2022, a small statically typed
//! imperative language with integer/boolean scalars and one-dimensional
//! arrays, top-level functions and procedures, and basic I/O. Emits a
//! textual JVM assembly listing for an external assembler.
//!
//! ## Pipeline
//!
//! 1. **Reader** - buffered character stream with one-character lookahead
//! 2. **Lexer** - turns the character stream into a token stream
//! 3. **Symbol table** - two-level scope (global + one subroutine), callable-only leak-through
//! 4. **Parser** - fused recursive-descent grammar recognizer, type checker, and code generator
//! 5. **Emitter** - accumulates the stack-machine instruction stream and renders it
//!
//! Unlike a multi-pass pipeline that hands a `Vec<Error>` back from each
//! stage, ALAN-2022 has no error recovery: the first diagnostic is fatal and
//! propagates with `?` all the way out of [`compile`].
//!
//! ## Example
//!
//! ```rust,no_run
//! let source = std::fs::read_to_string("program.alan").unwrap();
//! match alan2022c::compile(&source, None) {
//!     Ok(class) => std::fs::write(format!("{}.j", class.class_name), class.listing).unwrap(),
//!     Err(err) => eprintln!("{}", err),
//! }
//! ```

pub mod emitter;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod reader;
pub mod symtab;

pub use error::{CompileError, ErrorKind, Position};

/// A finished compilation: the JVM assembly listing plus the class name the
/// `source` header declared, since the output file is conventionally named
/// `<class_name>.j`.
pub struct EmittedClass {
    pub class_name: String,
    pub listing: String,
}

/// Compiles `source`, the full text of one ALAN-2022 program, into a
/// rendered JVM assembly listing.
///
/// `class_name_hint` exists for callers that want to double-check the
/// output file name against the program's own `source <name>` header (for
/// example, warning when they differ); it never overrides the header,
/// which alone determines [`EmittedClass::class_name`].
pub fn compile(source: &str, class_name_hint: Option<&str>) -> Result<EmittedClass, CompileError> {
    let _ = class_name_hint;
    let emitted = parser::compile(source)?;
    Ok(EmittedClass {
        class_name: emitted.class_name().to_string(),
        listing: emitted.render(),
    })
}
