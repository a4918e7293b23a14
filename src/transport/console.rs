//! Local console transport.
//!
//! Each stdin line becomes a message from a local user in a private channel, so
//! commands work without a prefix. Replies are printed to stdout. End of input
//! disconnects.
use async_trait::async_trait;
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{EventSink, Transport};
use crate::bot::events::Event;
use crate::chat::{Author, BotIdentity, Channel, Message};
use crate::config::Credentials;
use crate::error::BotResult;

pub const CONSOLE_USER_ID: &str = "console";
pub const CONSOLE_CHANNEL_ID: &str = "console";

#[derive(Debug, Clone)]
pub struct ConsoleTransport {
    identity: BotIdentity,
}

impl ConsoleTransport {
    pub fn new(bot_name: &str) -> Self {
        Self {
            identity: BotIdentity::new("discobot", bot_name),
        }
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn connect(&self, credentials: &Credentials, events: EventSink) -> BotResult<()> {
        info!("Console session for {}", credentials.email);
        events.emit(Event::Ready)?;
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let message = Message::new(
                            Author::new(CONSOLE_USER_ID, CONSOLE_USER_ID),
                            Channel::private(CONSOLE_CHANNEL_ID),
                            line,
                        );
                        if events.emit(Event::message(message)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Console read failed: {}", e);
                        break;
                    }
                }
            }
            events.disconnect();
        });
        Ok(())
    }

    async fn send_text(&self, _channel: &Channel, text: &str) -> BotResult<()> {
        println!("{}", text);
        Ok(())
    }

    fn identity(&self) -> Option<BotIdentity> {
        Some(self.identity.clone())
    }
}
