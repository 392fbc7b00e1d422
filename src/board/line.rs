use async_trait::async_trait;
use log::debug;
use tokio::io::{self, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};

use super::{BoardCommand, BoardLink, LinkEvent};
use crate::error::BoardLinkError;

/// A board relayed over a byte stream, one token per line in and one framed
/// command per line out. The stream counts as connected from the start.
pub struct LineLink<R, W> {
    lines: Lines<BufReader<R>>,
    writer: W,
    announced: bool,
}

pub type StdioLink = LineLink<io::Stdin, io::Stdout>;

impl StdioLink {
    pub fn stdio() -> Self {
        LineLink::new(io::stdin(), io::stdout())
    }
}

impl<R, W> LineLink<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
            announced: false,
        }
    }

    /// Next non-empty token, or `None` at end of stream.
    pub(crate) async fn read_token(&mut self) -> Result<Option<String>, BoardLinkError> {
        loop {
            match self.lines.next_line().await.map_err(BoardLinkError::Read)? {
                Some(line) => {
                    let token = line.trim();
                    if !token.is_empty() {
                        return Ok(Some(token.to_string()));
                    }
                }
                None => return Ok(None),
            }
        }
    }

    pub(crate) async fn write_command(&mut self, command: &BoardCommand) -> io::Result<()> {
        let frame = command.frame();
        debug!("{} sent to board", frame);
        self.writer.write_all(frame.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<R, W> BoardLink for LineLink<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn next_event(&mut self) -> Result<LinkEvent, BoardLinkError> {
        if !self.announced {
            self.announced = true;
            return Ok(LinkEvent::Connected);
        }
        Ok(match self.read_token().await? {
            Some(token) => LinkEvent::Token(token),
            None => LinkEvent::Closed,
        })
    }

    async fn send(&mut self, command: &BoardCommand) -> Result<(), BoardLinkError> {
        self.write_command(command)
            .await
            .map_err(|source| BoardLinkError::Write {
                command: command.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_rt::test]
    async fn reads_tokens_until_end_of_stream() {
        let input: &[u8] = b"e1e1\n\n  e2e4 \r\n";
        let mut link = LineLink::new(input, Vec::new());
        assert_eq!(link.next_event().await.unwrap(), LinkEvent::Connected);
        assert_eq!(
            link.next_event().await.unwrap(),
            LinkEvent::Token("e1e1".into())
        );
        assert_eq!(
            link.next_event().await.unwrap(),
            LinkEvent::Token("e2e4".into())
        );
        assert_eq!(link.next_event().await.unwrap(), LinkEvent::Closed);
    }

    #[actix_rt::test]
    async fn writes_framed_commands() {
        let input: &[u8] = b"";
        let mut link = LineLink::new(input, Vec::new());
        link.send(&BoardCommand::Connected).await.unwrap();
        link.send(&BoardCommand::Move("g8f6".into())).await.unwrap();
        assert_eq!(link.into_writer(), b"xCONNECTEDz\nxg8f6z\n");
    }
}
