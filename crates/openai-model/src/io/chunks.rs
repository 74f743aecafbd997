#[cfg(test)]
use std::collections::VecDeque;
use std::fmt::{self, Display, Formatter};

use bytes::Bytes;
use reqwest::Response;

/// The body stream broke off.
#[derive(Debug, PartialEq, Eq)]
pub struct Error(pub String);

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A source of raw body chunks.
pub enum Chunks {
    Response(Response),
    #[cfg(test)]
    Fixed(VecDeque<Bytes>),
}

impl Chunks {
    #[inline]
    pub fn from_response(response: Response) -> Self {
        Chunks::Response(response)
    }

    #[cfg(test)]
    pub fn from_slices(slices: &[&'static [u8]]) -> Self {
        Chunks::Fixed(slices.iter().map(|s| Bytes::from_static(s)).collect())
    }

    /// Returns the next chunk, or `None` once the body is exhausted.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        match self {
            Chunks::Response(response) => {
                response.chunk().await.map_err(|err| Error(err.to_string()))
            }
            #[cfg(test)]
            Chunks::Fixed(queue) => Ok(queue.pop_front()),
        }
    }
}
