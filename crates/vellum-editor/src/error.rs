use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;
use vellum_model::{ModelError, SchemaError};

/// Errors raised while composing extensions or running the editor.
#[derive(Debug, Error, Diagnostic)]
pub enum EditorError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),

    #[error("no extension provides a {direction} rule for type {type_name}")]
    #[diagnostic(code(vellum::editor::parser_config))]
    ParserConfig {
        type_name: SmolStr,
        direction: &'static str,
    },

    #[error("unknown command: {name}")]
    #[diagnostic(code(vellum::editor::unknown_command))]
    UnknownCommand { name: SmolStr },
}
