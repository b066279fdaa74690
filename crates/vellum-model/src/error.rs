use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised while compiling a schema or constructing typed nodes.
#[derive(Debug, Error, Diagnostic)]
pub enum SchemaError {
    #[error("duplicate type name in schema: {name}")]
    #[diagnostic(code(vellum::schema::duplicate_type))]
    DuplicateType { name: SmolStr },

    #[error("content model of {referrer} references unknown or later-declared type {missing}")]
    #[diagnostic(code(vellum::schema::unresolved_reference))]
    UnresolvedReference { referrer: SmolStr, missing: SmolStr },

    #[error("unknown type: {name}")]
    #[diagnostic(code(vellum::schema::unknown_type))]
    UnknownType { name: SmolStr },

    #[error("node {parent} does not allow child {child}")]
    #[diagnostic(code(vellum::schema::disallowed_child))]
    DisallowedChild { parent: SmolStr, child: SmolStr },
}

/// Errors raised while resolving positions or applying steps.
#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),

    #[error("position {pos} out of range (content size {size})")]
    #[diagnostic(code(vellum::model::position_out_of_range))]
    PositionOutOfRange { pos: usize, size: usize },

    #[error("unsupported replace shape at {from}..{to}")]
    #[diagnostic(code(vellum::model::unsupported_replace))]
    UnsupportedReplace { from: usize, to: usize },
}
