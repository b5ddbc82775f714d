pub(crate) use std::path::Path;

pub(crate) use crate::ast::Ast;
pub(crate) use crate::codegen::{Emission, Emitter, Export};
pub(crate) use crate::config::CompileOptions;
pub(crate) use crate::diagnostic::{render_diagnostics, Diagnostic};
pub(crate) use crate::ir::Module;
pub(crate) use crate::span::Span;
pub(crate) use crate::{lexer, parser};

mod session;

pub use session::{Session, SessionError};

#[cfg(test)]
mod tests;

/// Lex and parse `source`, rendering any diagnostics to stderr.
pub fn parse_source(source: &str, filename: &str) -> Result<Ast, Vec<Diagnostic>> {
    parse_source_silent(source).map_err(|errors| {
        render_diagnostics(&errors, filename, source);
        errors
    })
}

/// Lex and parse `source` without rendering diagnostics.
pub fn parse_source_silent(source: &str) -> Result<Ast, Vec<Diagnostic>> {
    let (tokens, lex_errors) = lexer::Lexer::new(source).tokenize();
    if !lex_errors.is_empty() {
        return Err(lex_errors);
    }
    parser::Parser::new(tokens).parse_program()
}

/// Compile a source string to IR with default options.
pub fn compile(source: &str, filename: &str) -> Result<Module, Vec<Diagnostic>> {
    compile_with_options(source, filename, &CompileOptions::default())
}

/// Compile a source string to IR.
pub fn compile_with_options(
    source: &str,
    filename: &str,
    options: &CompileOptions,
) -> Result<Module, Vec<Diagnostic>> {
    let ast = parse_source(source, filename)?;
    match compile_ast(&ast, options, &[], "__unit0") {
        Ok(emission) => Ok(emission.module),
        Err(errors) => {
            render_diagnostics(&errors, filename, source);
            Err(errors)
        }
    }
}

/// Read and compile a file. I/O failures are reported as diagnostics.
pub fn compile_file(path: &Path) -> Result<Module, Vec<Diagnostic>> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        vec![Diagnostic::error(
            format!("cannot read '{}': {}", path.display(), e),
            Span::dummy(),
        )]
    })?;
    compile(&source, &path.to_string_lossy())
}

/// Emit one parsed unit against the functions exported by earlier units.
pub(crate) fn compile_ast(
    ast: &Ast,
    options: &CompileOptions,
    exports: &[Export],
    unit_name: &str,
) -> Result<Emission, Vec<Diagnostic>> {
    Emitter::new(ast)
        .with_options(options.clone())
        .with_exports(exports)
        .and_then(|emitter| emitter.with_unit_name(unit_name).emit_program())
        .map_err(|e| vec![e.into()])
}

/// BLAKE3 hash of each function's textual IR, in module order.
pub fn function_hashes(module: &Module) -> Vec<(String, blake3::Hash)> {
    module
        .functions
        .iter()
        .map(|func| (func.name.clone(), blake3::hash(func.to_string().as_bytes())))
        .collect()
}

/// Hash of the whole module: the function hashes folded in module order.
pub fn module_hash(module: &Module) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    for (name, hash) in function_hashes(module) {
        hasher.update(name.as_bytes());
        hasher.update(hash.as_bytes());
    }
    hasher.finalize()
}
