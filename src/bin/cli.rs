//! FerrumKV CLI Client
//!
//! Interactive prompt: each input line is sent as one command and the reply
//! is printed the way redis-cli prints it.

use anyhow::{bail, Context};
use bytes::{Buf, Bytes, BytesMut};
use clap::Parser;
use ferrumkv::protocol::{encode, RespParser, RespValue};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// FerrumKV CLI
#[derive(Parser, Debug)]
#[command(name = "ferrumkv-cli")]
#[command(about = "Interactive client for the FerrumKV server")]
struct Args {
    /// Server host
    #[arg(default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(default_value_t = 6379)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let mut stream = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("could not connect to {}", addr))?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut buffer = BytesMut::with_capacity(4096);

    loop {
        print!("{}>", addr);
        std::io::stdout().flush()?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };

        let line = line.trim();
        if line == "quit" {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let request = RespValue::command(
            line.split_whitespace()
                .map(|token| Bytes::copy_from_slice(token.as_bytes())),
        );
        stream.write_all(&encode(&request)).await?;

        let reply = read_reply(&mut stream, &mut buffer).await?;
        println!("{}", reply.to_display_string());
    }

    Ok(())
}

/// Read until exactly one reply decodes
async fn read_reply(stream: &mut TcpStream, buffer: &mut BytesMut) -> anyhow::Result<RespValue> {
    loop {
        if let Some((reply, consumed)) = RespParser::parse(&buffer[..])? {
            buffer.advance(consumed);
            return Ok(reply);
        }

        if stream.read_buf(buffer).await? == 0 {
            bail!("server closed the connection");
        }
    }
}
