#[cfg(test)]
use std::collections::VecDeque;

use bytes::Bytes;
use reqwest::Response;

/// The body stream broke off.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error(pub String);

enum Source {
    Http(Response),
    #[cfg(test)]
    Fixture(VecDeque<&'static [u8]>),
}

/// A response body, read one network chunk at a time.
pub struct Chunks {
    source: Source,
    received: usize,
}

impl Chunks {
    pub fn from_response(response: Response) -> Self {
        Self {
            source: Source::Http(response),
            received: 0,
        }
    }

    /// Replays `chunks` as if they had arrived one by one.
    #[cfg(test)]
    pub fn from_fixture(chunks: &[&'static [u8]]) -> Self {
        Self {
            source: Source::Fixture(chunks.iter().copied().collect()),
            received: 0,
        }
    }

    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        let chunk = match &mut self.source {
            Source::Http(response) => response
                .chunk()
                .await
                .map_err(|err| Error(format!("{err}")))?,
            #[cfg(test)]
            Source::Fixture(chunks) => {
                chunks.pop_front().map(Bytes::from_static)
            }
        };
        match &chunk {
            Some(bytes) => self.received += bytes.len(),
            None => trace!("body ended after {} bytes", self.received),
        }
        Ok(chunk)
    }
}
