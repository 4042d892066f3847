use chatplug::prelude::*;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Plugin logic
// ---------------------------------------------------------------------------

/// Configuration the plugin asks for on startup.
fn configuration_fields() -> Vec<ConfigurationField> {
    vec![ConfigurationField {
        kind: "text".into(),
        default_value: "echo: ".into(),
        optional: true,
        hint: "Prefix added to echoed messages".into(),
        mask: false,
    }]
}

/// Builds the reply the plugin sends back for a delivered message.
fn echo(event: &MessageReceived, prefix: &str) -> OutgoingMessage {
    let message = &event.message;
    OutgoingMessage {
        body: format!("{prefix}{}", message.body),
        origin_id: format!("echo-{}", message.id),
        origin_thread_id: event.target_thread_id.clone(),
        username: "echo".into(),
        author_origin_id: "echo-bot".into(),
        author_avatar_url: String::new(),
        attachments: message
            .attachments
            .iter()
            .map(|a| AttachmentInput {
                origin_id: a.origin_id.clone(),
                kind: a.kind.clone(),
                source_url: a.source_url.clone(),
            })
            .collect(),
    }
}

/// Every query matches a single thread named after it.
fn search_results(request: &SearchRequest) -> Vec<SearchThreadInput> {
    if request.query.trim().is_empty() {
        return Vec::new();
    }
    vec![SearchThreadInput {
        origin_id: format!("echo-{}", request.query),
        name: request.query.clone(),
        icon_url: String::new(),
    }]
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

fn config_from_env() -> ClientConfig {
    let mut config = ClientConfig::default();
    if let Ok(url) = std::env::var("CHATPLUG_WS_URL") {
        config.ws_url = url;
    }
    if let Ok(url) = std::env::var("CHATPLUG_HTTP_URL") {
        config.http_url = url;
    }
    if let Ok(token) = std::env::var("CHATPLUG_ACCESS_TOKEN") {
        config.access_token = token;
    }
    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config_from_env();
    tracing::info!(ws = %config.ws_url, http = %config.http_url, "starting echo plugin");

    let (client, mut inbox) = ChatPlugClient::builder().config(config).connect().await?;
    client.subscribe_messages().await?;
    client.subscribe_search_requests().await?;
    client.subscribe_configuration(&configuration_fields()).await?;
    client.set_instance_initialized().await?;

    serve(&client, &mut inbox, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await;

    client.close().await?;
    Ok(())
}

/// Answers inbox events until the connection ends or `shutdown` resolves.
async fn serve(client: &ChatPlugClient, inbox: &mut Inbox, shutdown: impl Future<Output = ()>) {
    tokio::pin!(shutdown);
    let mut prefix = String::from("echo: ");
    loop {
        tokio::select! {
            event = inbox.messages.recv() => match event {
                Some(event) => {
                    // Failures are already logged by the client.
                    let _ = client.send_message(&echo(&event, &prefix)).await;
                }
                None => {
                    tracing::info!("connection closed");
                    break;
                }
            },
            Some(request) = inbox.search_requests.recv() => {
                let _ = client
                    .set_search_response(&request.query, &search_results(&request))
                    .await;
            }
            Some(answer) = inbox.configuration.recv() => {
                if let Some(value) = answer.field_values.first() {
                    tracing::info!(prefix = %value, "configuration received");
                    prefix = value.clone();
                }
            }
            Some(e) = inbox.errors.recv() => {
                tracing::error!(error = %e, "connection lost");
                break;
            }
            () = &mut shutdown => {
                tracing::info!("shutting down");
                break;
            }
        }
    }
}
