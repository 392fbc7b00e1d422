use async_trait::async_trait;
use log::{info, warn};
use std::io;
use std::net::SocketAddr;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;

use super::{BoardCommand, BoardLink, LineLink, LinkEvent};
use crate::error::BoardLinkError;

/// Accepts one board relay at a time. When it drops, the next connection
/// resumes the same game. Commands cannot be sent while no relay is
/// connected, and a failed write is an error.
pub struct TcpLink {
    listener: TcpListener,
    conn: Option<LineLink<OwnedReadHalf, OwnedWriteHalf>>,
}

impl TcpLink {
    pub async fn bind(addr: &str) -> Result<Self, BoardLinkError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| BoardLinkError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        info!("Waiting for the board on {}", addr);
        Ok(Self {
            listener,
            conn: None,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

#[async_trait]
impl BoardLink for TcpLink {
    async fn next_event(&mut self) -> Result<LinkEvent, BoardLinkError> {
        let Some(conn) = self.conn.as_mut() else {
            let (stream, peer) = self.listener.accept().await.map_err(BoardLinkError::Read)?;
            info!("Board connected from {}", peer);
            let (reader, writer) = stream.into_split();
            self.conn = Some(LineLink::new(reader, writer));
            return Ok(LinkEvent::Connected);
        };
        match conn.read_token().await {
            Ok(Some(token)) => Ok(LinkEvent::Token(token)),
            Ok(None) => {
                self.conn = None;
                Ok(LinkEvent::Disconnected)
            }
            Err(e) => {
                warn!("{}", e);
                self.conn = None;
                Ok(LinkEvent::Disconnected)
            }
        }
    }

    async fn send(&mut self, command: &BoardCommand) -> Result<(), BoardLinkError> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(BoardLinkError::Write {
                command: command.to_string(),
                source: io::Error::new(io::ErrorKind::NotConnected, "board is not connected"),
            });
        };
        if let Err(source) = conn.write_command(command).await {
            self.conn = None;
            return Err(BoardLinkError::Write {
                command: command.to_string(),
                source,
            });
        }
        Ok(())
    }
}
