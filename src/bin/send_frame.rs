// SPDX-License-Identifier: AGPL-3.0-or-later

//! Interactive test client (`spec.md` §1: "the interactive test client"
//! is an out-of-scope external collaborator, specified only as a thing
//! that must exist). Connects to a running router, sends one
//! authorization request built from CLI arguments, and prints the
//! decoded reply.
//!
//! Usage: `send_frame <host:port> <pan> <amount> <stan>`

use std::env;

use anyhow::{bail, Context, Result};
use authz_router::{
    model::{mti, InternalRequest},
    translate,
    wire::{read_frame, write_frame},
};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let [_, addr, pan, amount, stan] = args.as_slice() else {
        bail!("usage: send_frame <host:port> <pan> <amount> <stan>");
    };

    let request = InternalRequest {
        mti: mti::AUTH_REQUEST.to_string(),
        pan: pan.clone(),
        amount: amount.clone(),
        transmission_time: chrono::Utc::now().format("%m%d%H%M%S").to_string(),
        stan: stan.clone(),
        region: None,
    };

    let mut stream = TcpStream::connect(addr).await.with_context(|| format!("connecting to {addr}"))?;
    let frame = translate::request_to_frame(&request)?;
    write_frame(&mut stream, &frame).await?;

    let reply = read_frame(&mut stream)
        .await?
        .context("connection closed before a reply was received")?;
    let response = translate::frame_to_request(&reply).ok();

    println!("reply frame: {reply:?}");
    if let Some(echoed) = response {
        println!("echoed stan: {}", echoed.stan);
    }
    Ok(())
}
