//! CLI command handlers for link, check and qr.

use std::time::Duration;

use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::link::{HttpLinkClient, LinkApi, LinkSession, LinkStatus};
use crate::qr::render_terminal;

use super::{CheckArgs, LinkArgs, QrArgs};

/// Handle `warplink link`.
pub async fn handle_link(
    config: LinkConfig,
    args: &LinkArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = LinkSession::from_config(config)?;
    session.request_code().await;

    if session.status() == LinkStatus::Error {
        return Err("could not obtain a link code (see log for details)".into());
    }
    let code = session.code();
    if code.is_empty() {
        return Err(LinkError::InvalidState("server returned an empty link code".into()).into());
    }

    if !args.no_qr {
        println!("{}", render_terminal(&args.link_page)?);
    }
    println!("🔗 Visit: {}", args.link_page);
    println!("📋 Enter code: {code}");
    println!("⏳ Waiting for link...");

    let snapshot = match session
        .wait_until_linked(Duration::from_secs(args.timeout))
        .await
    {
        Ok(snapshot) => snapshot,
        Err(LinkError::Timeout(_)) => {
            session.teardown();
            return Err(format!("code {code} was not redeemed within {}s", args.timeout).into());
        }
        Err(e) => return Err(e.into()),
    };

    println!("✅ Linked!");
    match snapshot.account.as_ref().and_then(|account| account.username()) {
        Some(username) => {
            println!("   User: {username}");
            println!("   Avatar: {}", session.avatar_url());
        }
        None => println!("   ⚠️  Account details unavailable"),
    }
    println!("   Token: {}", snapshot.token);
    Ok(())
}

/// Handle `warplink check <code>`.
pub async fn handle_check(
    config: LinkConfig,
    args: &CheckArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = HttpLinkClient::from_config(&config)?;
    let reply = client.poll_user(&args.code).await?;
    match reply.linked_token() {
        Some(token) => {
            let account = client.fetch_account(&token).await?;
            println!("✅ {}: linked", args.code);
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
        None => println!("⏳ {}: waiting", args.code),
    }
    Ok(())
}

/// Handle `warplink qr <text>`.
pub fn handle_qr(args: &QrArgs) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_terminal(&args.text)?);
    Ok(())
}
