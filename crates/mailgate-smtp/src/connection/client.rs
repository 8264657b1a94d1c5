//! Type-state SMTP client.

use super::{ServerInfo, SmtpStream};
use crate::command::{Command, encode_data};
use crate::error::{Error, Result};
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::marker::PhantomData;

/// Greeting read, EHLO may have been sent.
#[derive(Debug)]
pub struct Connected;

/// AUTH accepted.
#[derive(Debug)]
pub struct Authenticated;

/// MAIL FROM accepted.
#[derive(Debug)]
pub struct MailTransaction;

/// At least one RCPT TO accepted.
#[derive(Debug)]
pub struct RecipientAdded;

/// DATA accepted, waiting for content.
#[derive(Debug)]
pub struct Data;

/// SMTP client whose state parameter restricts the commands available.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

impl<S> Client<S> {
    fn into_state<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }

    /// Greeting and EHLO information.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    async fn send_command(&mut self, cmd: &Command) -> Result<Reply> {
        tracing::debug!(command = cmd.verb(), "SMTP >>");
        self.stream.write_all(&cmd.serialize()).await?;
        let reply = self.stream.read_reply().await?;
        tracing::debug!(code = reply.code.as_u16(), "SMTP <<");
        Ok(reply)
    }

    /// Sends a command and requires a reply matching `accept`.
    async fn expect(&mut self, cmd: &Command, accept: fn(ReplyCode) -> bool) -> Result<Reply> {
        let reply = self.send_command(cmd).await?;
        if accept(reply.code) {
            Ok(reply)
        } else {
            Err(Error::reply(reply.code.as_u16(), reply.text()))
        }
    }

    /// Sends QUIT. Available in every state.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not answer with 221 or 2xx.
    pub async fn quit(mut self) -> Result<()> {
        self.expect(&Command::Quit, ReplyCode::is_success).await?;
        Ok(())
    }
}

impl Client<Connected> {
    /// Reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting cannot be read or is not 220.
    pub async fn from_stream(mut stream: SmtpStream) -> Result<Self> {
        let greeting = stream.read_reply().await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(Error::reply(greeting.code.as_u16(), greeting.text()));
        }

        let hostname = greeting
            .lines
            .first()
            .and_then(|line| line.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        tracing::debug!(server = %hostname, "SMTP greeting received");

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                ..ServerInfo::default()
            },
            _state: PhantomData,
        })
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if EHLO is rejected.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let cmd = Command::Ehlo {
            hostname: client_hostname.to_string(),
        };
        let reply = self.expect(&cmd, ReplyCode::is_success).await?;

        // First line is the server's identity, the rest are keywords.
        self.server_info.extensions = reply.lines.iter().skip(1).map(|l| Extension::parse(l)).collect();
        Ok(self)
    }

    /// Negotiates STARTTLS and repeats EHLO over the encrypted channel.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not advertised, is rejected, or the
    /// handshake fails.
    pub async fn starttls(mut self, tls_hostname: &str, client_hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        self.expect(&Command::StartTls, ReplyCode::is_success).await?;
        self.stream = self.stream.upgrade_to_tls(tls_hostname).await?;
        tracing::debug!("SMTP connection upgraded to TLS");

        // Capabilities from before the handshake are discarded.
        self.server_info.extensions.clear();
        self.ehlo(client_hostname).await
    }

    /// Authenticates with the given mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the credentials.
    pub async fn authenticate(
        self,
        mechanism: AuthMechanism,
        username: &str,
        secret: &str,
    ) -> Result<Client<Authenticated>> {
        match mechanism {
            AuthMechanism::Plain => self.auth_plain(username, secret).await,
            AuthMechanism::Login => self.auth_login(username, secret).await,
        }
    }

    /// AUTH PLAIN with an initial response.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the credentials.
    pub async fn auth_plain(mut self, username: &str, secret: &str) -> Result<Client<Authenticated>> {
        let credentials = format!("\0{username}\0{secret}");
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(STANDARD.encode(credentials.as_bytes())),
        };
        self.expect(&cmd, ReplyCode::is_success).await?;
        Ok(self.into_state())
    }

    /// AUTH LOGIN, answering the username and password challenges.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects either step.
    pub async fn auth_login(mut self, username: &str, secret: &str) -> Result<Client<Authenticated>> {
        let start = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        };
        self.expect(&start, ReplyCode::is_intermediate).await?;

        let user = Command::AuthResponse(STANDARD.encode(username.as_bytes()));
        self.expect(&user, ReplyCode::is_intermediate).await?;

        let pass = Command::AuthResponse(STANDARD.encode(secret.as_bytes()));
        self.expect(&pass, ReplyCode::is_success).await?;

        Ok(self.into_state())
    }
}

impl Client<Authenticated> {
    /// Starts a mail transaction.
    ///
    /// `size` is declared only when the server advertised SIZE, and the
    /// message is refused locally if it exceeds the advertised limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is too large or MAIL FROM is rejected.
    pub async fn mail_from(mut self, from: Address, size: Option<usize>) -> Result<Client<MailTransaction>> {
        let limit = self.server_info.max_message_size();
        if let (Some(size), Some(limit)) = (size, limit) {
            if size > limit {
                return Err(Error::MessageTooLarge { size, limit });
            }
        }

        let advertised = self
            .server_info
            .extensions
            .iter()
            .any(|ext| matches!(ext, Extension::Size(_)));
        let cmd = Command::MailFrom {
            from,
            size: size.filter(|_| advertised),
        };
        self.expect(&cmd, ReplyCode::is_success).await?;
        Ok(self.into_state())
    }
}

impl Client<MailTransaction> {
    /// Adds the first recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if RCPT TO is rejected.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Client<RecipientAdded>> {
        self.expect(&Command::RcptTo { to }, ReplyCode::is_success).await?;
        Ok(self.into_state())
    }
}

impl Client<RecipientAdded> {
    /// Sends DATA and waits for 354.
    ///
    /// # Errors
    ///
    /// Returns an error if DATA is not answered with 354.
    pub async fn data(mut self) -> Result<Client<Data>> {
        self.expect(&Command::Data, |code| code == ReplyCode::START_DATA).await?;
        Ok(self.into_state())
    }
}

impl Client<Data> {
    /// Transmits the message and completes the transaction.
    ///
    /// Line endings are normalized and leading dots stuffed; the
    /// terminating `.` line is added.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the server rejects the message.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<Authenticated>> {
        self.stream.write_all(&encode_data(message)).await?;

        let reply = self.stream.read_reply().await?;
        if !reply.is_success() {
            return Err(Error::reply(reply.code.as_u16(), reply.text()));
        }
        tracing::debug!(code = reply.code.as_u16(), "SMTP message accepted");

        Ok(self.into_state())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::connection::connect;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    /// Serves one connection: writes each reply after reading one line,
    /// except the greeting which is written first. Returns received lines.
    async fn scripted_server(greeting: &'static str, replies: Vec<&'static str>) -> (u16, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut reader = BufReader::new(read);
            let mut received = Vec::new();

            write.write_all(greeting.as_bytes()).await.unwrap();
            let mut replies = replies.into_iter();
            let mut in_data = false;

            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).await.unwrap() == 0 {
                    break;
                }
                let line = line.trim_end().to_string();
                received.push(line.clone());

                if in_data {
                    if line != "." {
                        continue;
                    }
                    in_data = false;
                }

                let Some(reply) = replies.next() else { break };
                write.write_all(reply.as_bytes()).await.unwrap();
                if reply.starts_with("354") {
                    in_data = true;
                }
            }
            received
        });

        (port, handle)
    }

    #[tokio::test]
    async fn test_full_transaction_with_auth_plain() {
        let (port, server) = scripted_server(
            "220 mock.local ESMTP\r\n",
            vec![
                "250-mock.local\r\n250-AUTH PLAIN LOGIN\r\n250 SIZE 10000\r\n",
                "235 ok\r\n",
                "250 sender ok\r\n",
                "250 rcpt ok\r\n",
                "354 go ahead\r\n",
                "250 queued\r\n",
                "221 bye\r\n",
            ],
        )
        .await;

        let stream = connect("127.0.0.1", port).await.unwrap();
        let client = Client::from_stream(stream).await.unwrap();
        assert_eq!(client.server_info().hostname, "mock.local");

        let client = client.ehlo("relay.test").await.unwrap();
        assert_eq!(client.server_info().max_message_size(), Some(10000));

        let client = client.auth_plain("relay@example.com", "s3cret").await.unwrap();
        let client = client
            .mail_from(Address::new("relay@example.com").unwrap(), Some(20))
            .await
            .unwrap();
        let client = client
            .rcpt_to(Address::new("alice@example.com").unwrap())
            .await
            .unwrap();
        let client = client.data().await.unwrap();
        let client = client.send_message(b"Subject: hi\r\n\r\n.dot\r\n").await.unwrap();
        client.quit().await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(received[0], "EHLO relay.test");
        assert_eq!(
            received[1],
            format!("AUTH PLAIN {}", STANDARD.encode("\0relay@example.com\0s3cret"))
        );
        assert_eq!(received[2], "MAIL FROM:<relay@example.com> SIZE=20");
        assert_eq!(received[3], "RCPT TO:<alice@example.com>");
        assert_eq!(received[4], "DATA");
        assert!(received.contains(&"..dot".to_string()));
        assert_eq!(received.last().unwrap(), "QUIT");
    }

    #[tokio::test]
    async fn test_auth_login_exchange() {
        let (port, server) = scripted_server(
            "220 mock.local\r\n",
            vec![
                "250-mock.local\r\n250 AUTH LOGIN\r\n",
                "334 VXNlcm5hbWU6\r\n",
                "334 UGFzc3dvcmQ6\r\n",
                "235 ok\r\n",
            ],
        )
        .await;

        let client = Client::from_stream(connect("127.0.0.1", port).await.unwrap())
            .await
            .unwrap()
            .ehlo("relay.test")
            .await
            .unwrap();
        let mechanism = client.server_info().preferred_auth();
        assert_eq!(mechanism, AuthMechanism::Login);

        let client = client.authenticate(mechanism, "user", "pass").await.unwrap();
        drop(client);

        let received = server.await.unwrap();
        assert_eq!(received[1], "AUTH LOGIN");
        assert_eq!(received[2], STANDARD.encode("user"));
        assert_eq!(received[3], STANDARD.encode("pass"));
    }

    #[tokio::test]
    async fn test_auth_rejected() {
        let (port, _server) = scripted_server(
            "220 mock.local\r\n",
            vec!["250 mock.local\r\n", "535 5.7.8 bad credentials\r\n"],
        )
        .await;

        let client = Client::from_stream(connect("127.0.0.1", port).await.unwrap())
            .await
            .unwrap()
            .ehlo("relay.test")
            .await
            .unwrap();
        let err = client.auth_plain("user", "wrong").await.unwrap_err();
        assert_eq!(err.code(), Some(535));
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_rejected_greeting() {
        let (port, _server) = scripted_server("554 go away\r\n", vec![]).await;
        let err = Client::from_stream(connect("127.0.0.1", port).await.unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(554));
    }

    #[tokio::test]
    async fn test_starttls_requires_advertisement() {
        let (port, _server) = scripted_server("220 mock.local\r\n", vec!["250 mock.local\r\n"]).await;
        let client = Client::from_stream(connect("127.0.0.1", port).await.unwrap())
            .await
            .unwrap()
            .ehlo("relay.test")
            .await
            .unwrap();
        let err = client.starttls("mock.local", "relay.test").await.unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }

    #[tokio::test]
    async fn test_message_too_large_is_refused_locally() {
        let (port, server) = scripted_server(
            "220 mock.local\r\n",
            vec!["250-mock.local\r\n250 SIZE 10\r\n", "235 ok\r\n"],
        )
        .await;

        let client = Client::from_stream(connect("127.0.0.1", port).await.unwrap())
            .await
            .unwrap()
            .ehlo("relay.test")
            .await
            .unwrap()
            .auth_plain("u", "p")
            .await
            .unwrap();
        let err = client
            .mail_from(Address::new("u@example.com").unwrap(), Some(11))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MessageTooLarge { size: 11, limit: 10 }));
        drop(server);
    }
}
