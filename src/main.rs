use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use swipe_session::{
    logging, services::HttpRecommendationProvider, Config, DecisionOutcome, Direction, Session,
    SessionView,
};

const HELP: &str = "commands: right|r (like), left|l (discard), liked, disliked, refill, login, quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    logging::init_tracing(&config.log_filter)?;

    let provider = Arc::new(HttpRecommendationProvider::from_config(&config)?);
    let authenticated = check_auth(&provider).await;
    let (auth_tx, auth_rx) = watch::channel(authenticated);

    let session = Session::new(provider.clone(), auth_rx, config.session());
    let watcher = session.watch_auth();

    // Render every published view change
    let mut view_rx = session.subscribe();
    let default_poster = config.default_poster_url.clone();
    let renderer = tokio::spawn(async move {
        while view_rx.changed().await.is_ok() {
            let view = view_rx.borrow_and_update().clone();
            render(&view, &default_poster);
        }
    });

    println!("Connected to {}", config.api_base_url);
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "quit" | "q" => break,
            "liked" => print_list("Liked", &session.accepted().await),
            "disliked" => print_list("Disliked", &session.rejected().await),
            "refill" => {
                let outcome = session.request_refill().await;
                println!("Refill: {:?}", outcome);
            }
            "login" => {
                let authenticated = check_auth(&provider).await;
                auth_tx.send_replace(authenticated);
            }
            "r" => spawn_decision(&session, Direction::Accept),
            "l" => spawn_decision(&session, Direction::Reject),
            other => match Direction::from_swipe(other) {
                Some(direction) => spawn_decision(&session, direction),
                None => println!("{}", HELP),
            },
        }
    }

    drop(auth_tx);
    watcher.await?;
    renderer.abort();
    Ok(())
}

async fn check_auth(provider: &HttpRecommendationProvider) -> bool {
    match provider.check_auth_status().await {
        Ok(true) => true,
        Ok(false) => {
            tracing::warn!("Not authenticated; log in and set SWIPE_SESSION_COOKIE");
            false
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to check authentication status");
            false
        }
    }
}

/// Decisions run in the background so input typed during the settle window
/// reaches the resolver (and gets dropped there)
fn spawn_decision(session: &Session, direction: Direction) {
    let session = session.clone();
    tokio::spawn(async move {
        if let DecisionOutcome::Ignored(reason) = session.trigger_decision(direction).await {
            tracing::debug!(reason = ?reason, "Input ignored");
        }
    });
}

fn render(view: &SessionView, default_poster: &str) {
    if let Some(animating) = &view.animating {
        println!("  ...{} ({})", animating.direction.as_swipe(), animating.item_id);
        return;
    }

    match view.top() {
        Some(item) => {
            println!();
            println!("[{}] {}", item.id, item.title);
            if !item.genres.is_empty() {
                println!("  {}", item.genres.join(" | "));
            }
            println!("  {}", item.poster_or(default_poster));
            println!("  {} more queued", view.queue.len() - 1);
        }
        None => {
            println!();
            println!("No more Movies!");
            println!("Come back later for more recommendations.");
        }
    }

    if let Some(direction) = view.last_direction {
        println!("  Last swipe: {}", direction.as_swipe());
    }
}

fn print_list(label: &str, items: &[swipe_session::Item]) {
    if items.is_empty() {
        println!("{}: none yet", label);
        return;
    }
    println!("{}:", label);
    for item in items {
        println!("  [{}] {}", item.id, item.title);
    }
}
