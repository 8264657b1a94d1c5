//! Scripted mail servers on loopback for integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::time::Duration;

use mailgate_core::{Endpoint, GatewayConfig, Secret, Security};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::task::JoinHandle;

pub const SERVICE_ADDRESS: &str = "relay@example.com";
pub const SERVICE_SECRET: &str = "s3cret";

/// Config pointing both endpoints at loopback, in plaintext.
pub fn config(smtp_port: u16, imap_port: u16) -> GatewayConfig {
    GatewayConfig {
        submission: Endpoint::new("127.0.0.1", smtp_port, Security::None),
        retrieval: Endpoint::new("127.0.0.1", imap_port, Security::None),
        service_account_address: SERVICE_ADDRESS.to_string(),
        service_account_secret: Some(Secret::new(SERVICE_SECRET)),
        timeout: Duration::from_millis(500),
        ..GatewayConfig::default()
    }
}

/// A port nothing listens on.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Accepts one connection and never answers.
pub async fn silent_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });
    port
}

/// What an SMTP session saw.
#[derive(Debug, Default)]
pub struct SmtpSession {
    /// Command lines, DATA content excluded.
    pub commands: Vec<String>,
    /// Each accepted DATA payload, dot-unstuffed, CRLF line endings.
    pub messages: Vec<String>,
}

/// Serves one SMTP connection, answering by verb.
pub async fn smtp_server(accept_auth: bool) -> (u16, JoinHandle<SmtpSession>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut reader = BufReader::new(read);
        let mut session = SmtpSession::default();

        write.write_all(b"220 mock.local ESMTP\r\n").await.unwrap();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                break;
            }
            let line = line.trim_end().to_string();
            let verb = line
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_ascii_uppercase();
            session.commands.push(line);

            let reply: &[u8] = match verb.as_str() {
                "EHLO" => b"250-mock.local\r\n250-AUTH PLAIN LOGIN\r\n250 SIZE 1000000\r\n",
                "AUTH" if accept_auth => b"235 2.7.0 accepted\r\n",
                "AUTH" => b"535 5.7.8 bad credentials\r\n",
                "MAIL" | "RCPT" => b"250 ok\r\n",
                "DATA" => {
                    write.write_all(b"354 go ahead\r\n").await.unwrap();
                    let mut message = String::new();
                    loop {
                        let mut data_line = String::new();
                        if reader.read_line(&mut data_line).await.unwrap_or(0) == 0 {
                            return session;
                        }
                        if data_line == ".\r\n" {
                            break;
                        }
                        let unstuffed = data_line.strip_prefix('.').unwrap_or(&data_line);
                        message.push_str(unstuffed);
                    }
                    session.messages.push(message);
                    b"250 2.0.0 queued\r\n"
                }
                "QUIT" => {
                    write.write_all(b"221 bye\r\n").await.unwrap();
                    break;
                }
                _ => b"502 not implemented\r\n",
            };
            write.write_all(reply).await.unwrap();
        }
        session
    });

    (port, handle)
}

/// Serves one IMAP connection holding `messages` in its inbox.
///
/// LOGIN succeeds only for the service account credentials. Returns the
/// command lines received.
pub async fn imap_server(messages: Vec<Vec<u8>>) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut reader = BufReader::new(read);
        let mut received = Vec::new();

        write
            .write_all(b"* OK [CAPABILITY IMAP4rev1] mock ready\r\n")
            .await
            .unwrap();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                break;
            }
            let line = line.trim_end().to_string();
            received.push(line.clone());

            let mut words = line.split_whitespace();
            let tag = words.next().unwrap_or("*").to_string();
            let verb = words.next().unwrap_or_default().to_ascii_uppercase();
            let args: Vec<&str> = words.collect();

            match verb.as_str() {
                "LOGIN" => {
                    if args == [SERVICE_ADDRESS, SERVICE_SECRET] {
                        reply(&mut write, format!("{tag} OK LOGIN completed\r\n")).await;
                    } else {
                        reply(&mut write, format!("{tag} NO [AUTHENTICATIONFAILED] invalid credentials\r\n")).await;
                    }
                }
                "SELECT" => {
                    reply(
                        &mut write,
                        format!(
                            "* {} EXISTS\r\n* 0 RECENT\r\n* FLAGS (\\Seen)\r\n{tag} OK [READ-WRITE] SELECT completed\r\n",
                            messages.len()
                        ),
                    )
                    .await;
                }
                "SEARCH" => {
                    let ids: String = (1..=messages.len()).map(|n| format!(" {n}")).collect();
                    reply(&mut write, format!("* SEARCH{ids}\r\n{tag} OK SEARCH completed\r\n")).await;
                }
                "FETCH" => {
                    let seq: usize = args.first().and_then(|s| s.parse().ok()).unwrap_or(0);
                    match messages.get(seq.wrapping_sub(1)) {
                        Some(raw) => {
                            let mut out = format!("* {seq} FETCH (RFC822 {{{}}}\r\n", raw.len()).into_bytes();
                            out.extend_from_slice(raw);
                            out.extend_from_slice(format!(")\r\n{tag} OK FETCH completed\r\n").as_bytes());
                            write.write_all(&out).await.unwrap();
                        }
                        None => reply(&mut write, format!("{tag} NO no such message\r\n")).await,
                    }
                }
                "LOGOUT" => {
                    reply(&mut write, format!("* BYE logging out\r\n{tag} OK LOGOUT completed\r\n")).await;
                    break;
                }
                _ => reply(&mut write, format!("{tag} BAD unknown command\r\n")).await,
            }
        }
        received
    });

    (port, handle)
}

async fn reply(write: &mut OwnedWriteHalf, text: String) {
    write.write_all(text.as_bytes()).await.unwrap();
}

/// A single-part plain-text message.
pub fn plain_message(from: &str, subject: &str, body: &str) -> Vec<u8> {
    format!("From: {from}\r\nSubject: {subject}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{body}")
        .into_bytes()
}
