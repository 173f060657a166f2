//! Dashboard Watch - GPTMaker workspace change notifier
//!
//! Signs in to the dashboard user directory, then polls the workspace chat
//! list and logs every "new chats" and "new messages" notification until
//! interrupted.

mod error;

use std::sync::Arc;

use dashboard_core::{
    AuthService, ChatPoller, ChatQuery, DashboardConfig, DashboardData, DashboardEvent, EventBus,
    UserDirectory, UserRecord,
};
use gptmaker_api::GptMakerClient;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::error::{Result, WatchError};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("dashboard_watch=info".parse()?)
        .add_directive("dashboard_core=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting dashboard watcher...");

    let config = DashboardConfig::from_env();

    let auth = AuthService::new(UserDirectory::from_config(&config));
    let user = sign_in(&auth, &config).await?;

    let workspace_id = config
        .gptmaker_workspace_id
        .clone()
        .or_else(|| user.as_ref().and_then(|u| u.workspace_id.clone()))
        .ok_or_else(|| WatchError::Config("GPTMAKER_WORKSPACE_ID is not set".to_string()))?;
    let token = config
        .gptmaker_api_token
        .clone()
        .or_else(|| user.as_ref().and_then(|u| u.gptmaker_token.clone()))
        .ok_or_else(|| WatchError::Config("GPTMAKER_API_TOKEN is not set".to_string()))?;

    info!("Workspace: {}", workspace_id);
    info!("Cache TTL: {} seconds", config.cache_ttl.as_secs());
    info!(
        "Polling every {} ms",
        config.polling_frequency.as_millis()
    );

    let api = GptMakerClient::with_base_url(&config.gptmaker_api_url, &token);
    let data = Arc::new(DashboardData::new(api, &workspace_id, config.cache_ttl));

    match data.dashboard_stats().await {
        Ok(stats) => info!(
            total_chats = stats.total_chats,
            open_chats = stats.open_chats,
            unread_chats = stats.unread_chats,
            total_agents = stats.total_agents,
            active_agents = stats.active_agents,
            "Workspace overview"
        ),
        Err(e) => warn!(error = %e, "Could not load workspace overview"),
    }

    let events = EventBus::new();
    let notifier = tokio::spawn(log_events(events.subscribe()));

    let query = ChatQuery {
        page: 1,
        page_size: config.chats_page_size,
        include_messages: config.poll_include_messages,
    };
    let poller = ChatPoller::with_frequency(data.clone(), events, query, config.polling_frequency);
    poller.start_polling().await;

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }

    info!("Shutting down...");
    poller.stop_polling().await;
    notifier.abort();
    auth.logout().await;

    Ok(())
}

/// Sign in when credentials were configured; otherwise run anonymously
async fn sign_in(auth: &AuthService, config: &DashboardConfig) -> Result<Option<UserRecord>> {
    match (&config.dashboard_email, &config.dashboard_password) {
        (Some(email), Some(password)) => {
            let session = auth.login(email, password).await?;
            info!(
                user = %session.user.email,
                mock = auth.directory().is_mock(),
                "Signed in"
            );
            Ok(Some(session.user))
        }
        _ => Ok(None),
    }
}

async fn log_events(mut rx: broadcast::Receiver<DashboardEvent>) {
    loop {
        match rx.recv().await {
            Ok(DashboardEvent::NewChatsDetected {
                new_chats,
                all_chats,
            }) => {
                for chat in &new_chats {
                    info!(
                        chat_id = chat.chat_id().unwrap_or_default(),
                        name = chat.name.as_deref().unwrap_or("unknown"),
                        "New chat"
                    );
                }
                info!(
                    new = new_chats.len(),
                    total = all_chats.len(),
                    "New chats detected"
                );
            }
            Ok(DashboardEvent::NewMessagesDetected {
                chats_with_new_messages,
            }) => {
                for entry in &chats_with_new_messages {
                    let preview = entry
                        .chat
                        .messages
                        .last()
                        .and_then(|m| m.content.as_deref())
                        .unwrap_or_default();
                    info!(
                        chat_id = entry.chat.chat_id().unwrap_or_default(),
                        count = entry.new_messages_count,
                        preview = %preview,
                        "New messages"
                    );
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Notification consumer lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
