use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Input '{input}' failed to initialize: {message}")]
    Init { input: String, message: String },
    #[error("Input '{input}' failed to gather: {message}")]
    Gather { input: String, message: String },
    #[error("Input '{input}' produced a measurement without a name.")]
    MissingName { input: String },
    #[error("{context}: {source}")]
    External {
        context: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl InputError {
    pub fn gather<I, M>(input: I, message: M) -> Self
    where
        I: Into<String>,
        M: Into<String>,
    {
        Self::Gather {
            input: input.into(),
            message: message.into(),
        }
    }
}
