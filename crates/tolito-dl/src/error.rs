use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DownloadError {
    #[error("Invalid URL: {url}")]
    #[diagnostic(code(tolito_dl::invalid_url))]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    #[diagnostic(
        code(tolito_dl::network),
        help("Check your internet connection or try another mirror")
    )]
    Network(#[from] Box<ureq::Error>),

    #[error("HTTP {status}: {url}")]
    #[diagnostic(code(tolito_dl::http_error))]
    HttpError { status: u16, url: String },

    #[error("Server returned an empty body: {url}")]
    #[diagnostic(code(tolito_dl::empty_body))]
    EmptyBody { url: String },

    #[error("I/O error while {action}: {source}")]
    #[diagnostic(code(tolito_dl::io))]
    Io {
        action: String,
        source: std::io::Error,
    },

    #[error("Could not derive a file name from the URL")]
    #[diagnostic(
        code(tolito_dl::no_filename),
        help("Pass an explicit output path")
    )]
    NoFilename,

    #[error("Invalid response from server")]
    #[diagnostic(code(tolito_dl::invalid_response))]
    InvalidResponse,
}

pub type Result<T> = std::result::Result<T, DownloadError>;

impl From<ureq::Error> for DownloadError {
    fn from(e: ureq::Error) -> Self {
        Self::Network(Box::new(e))
    }
}

pub(crate) trait IoContext<T> {
    fn io_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|source| {
            DownloadError::Io {
                action: context(),
                source,
            }
        })
    }
}
