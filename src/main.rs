use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;

use alan2022c::error::{format_with_file, CompileError, ErrorKind, Position};

/// System errors (spec.md §7) have no source position of their own — they
/// happen before or after the scanner ever runs — so they're reported at
/// the nominal `(1, 1)` the rest of the diagnostic sink expects a `Position`
/// to carry.
const NO_POS: Position = Position::new(1, 1);

fn die(path: &str, err: CompileError) -> ! {
    eprintln!("{}", format_with_file(path, &err));
    std::process::exit(1);
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: alanc <file.alan>");
        std::process::exit(1);
    }
    let source_path = &args[1];

    // The assembler hand-off env var is checked before the source file is
    // even opened: its absence is fatal regardless of whether the program
    // would otherwise compile.
    let jasmin_jar = env::var("JASMIN_JAR")
        .unwrap_or_else(|_| die(source_path, CompileError::new(ErrorKind::JasminJarUnset, NO_POS)));

    let source = fs::read_to_string(source_path).unwrap_or_else(|io_err| {
        die(
            source_path,
            CompileError::new(ErrorKind::CannotOpenSource(io_err.to_string()), NO_POS),
        )
    });

    let class_name_hint = Path::new(source_path).file_stem().and_then(|s| s.to_str());
    let class = alan2022c::compile(&source, class_name_hint)
        .unwrap_or_else(|err| die(source_path, err));

    let out_path = format!("{}.j", class.class_name);
    if let Err(io_err) = fs::write(&out_path, &class.listing) {
        die(
            &out_path,
            CompileError::new(ErrorKind::CannotWriteOutput(io_err.to_string()), NO_POS),
        );
    }

    match Command::new("java").arg("-jar").arg(&jasmin_jar).arg(&out_path).status() {
        Ok(status) if status.success() => {}
        Ok(status) => die(
            &out_path,
            CompileError::new(
                ErrorKind::AssemblerInvocationFailure(format!("exited with {}", status)),
                NO_POS,
            ),
        ),
        Err(io_err) => die(
            &out_path,
            CompileError::new(ErrorKind::AssemblerInvocationFailure(io_err.to_string()), NO_POS),
        ),
    }
}
