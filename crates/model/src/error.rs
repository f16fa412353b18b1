/// The kind of error a backend may report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendErrorKind {
    /// The request never got a response (connection, TLS, timeout...).
    Network,
    /// The remote API answered with an error status.
    Api,
    /// The response could not be decoded.
    Decode,
    /// Any other errors.
    Other,
}
