// Error taxonomy for the extraction pipeline.
//
// Only syntax and structure problems are errors. Missing sections and
// missing leaves are absorbed by the extractor and never show up here.
use std::io;
use std::path::PathBuf;

/// Text shown to the user for any fatal extraction failure.
pub const USER_MESSAGE: &str =
    "The file does not match the required format. Please upload a valid XML report file.";

/// The input is not well-formed XML.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("invalid utf-8 in element or attribute name")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("element <{0}> is never closed")]
    Unclosed(String),

    #[error("closing tag </{found}> does not match <{expected}>")]
    MismatchedEnd { expected: String, found: String },

    #[error("document has no root element")]
    Empty,

    #[error("document has more than one root element")]
    MultipleRoots,

    #[error("text found outside the root element")]
    TextOutsideRoot,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("malformed report: {0}")]
    Syntax(#[from] ParseError),

    #[error("report root is <{found}>, expected <{expected}>")]
    Structure { expected: String, found: String },
}

impl ExtractError {
    /// Both variants collapse to the same retryable message.
    pub fn user_message(&self) -> &'static str {
        USER_MESSAGE
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("cannot read schema file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid schema: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("cannot serialize built-in schema: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{0} is not an XML file")]
    NotXml(PathBuf),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl LoadError {
    pub fn user_message(&self) -> String {
        match self {
            LoadError::NotXml(_) => "Please upload a valid XML file.".to_string(),
            LoadError::Io { path, .. } => format!("Could not read {}.", path.display()),
            LoadError::Extract(e) => e.user_message().to_string(),
        }
    }
}
