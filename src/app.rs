//! Interactive application glue: login prompt and chat loop.
//!
//! Deliberately thin - the credential lifecycle lives in `auth` and the
//! request handling in `api`. This module only wires them together and
//! talks to the terminal.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::auth::{
    HttpRefreshExchange, LoginKeychain, RefreshCoordinator, SessionController, TokenStore,
    REVALIDATE_INTERVAL_SECS,
};
use crate::config::Config;

pub struct App {
    config: Config,
    client: ApiClient,
    session: Arc<SessionController>,
    revalidate_every: Duration,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let base_url = config.api_base_url()?;

        let store = match Config::state_dir() {
            Some(dir) => TokenStore::new(dir),
            None => {
                warn!("no data directory available, credential will not persist");
                TokenStore::disabled()
            }
        };

        let lookahead = config.expiry_lookahead();
        let revalidate_every = Duration::from_secs(
            config
                .revalidate_interval_secs
                .unwrap_or(REVALIDATE_INTERVAL_SECS),
        );

        let http = ApiClient::default_http().context("Failed to build HTTP client")?;
        let exchange = Arc::new(HttpRefreshExchange::new(http.clone(), base_url.clone()));
        let refresher = RefreshCoordinator::new(exchange, store.clone());
        let client = ApiClient::new(http, base_url, store.clone(), refresher.clone())
            .with_lookahead(lookahead);
        let session = Arc::new(SessionController::new(store, refresher).with_lookahead(lookahead));

        Ok(Self {
            config,
            client,
            session,
            revalidate_every,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let state = self.session.initialize().await;
        if !state.is_authenticated() {
            self.login_flow().await?;
        }
        self.session.start_revalidation(self.revalidate_every);

        if let Some(identity) = self.session.identity().await {
            println!("Logged in as {}", identity.email);
        }
        println!("Type a message, or /history, /logout, /quit");

        self.chat_loop().await
    }

    async fn login_flow(&mut self) -> Result<()> {
        loop {
            let default_email = self.config.last_email.clone().unwrap_or_default();
            let email = if default_email.is_empty() {
                prompt("Email: ")?
            } else {
                let entered = prompt(&format!("Email [{default_email}]: "))?;
                if entered.is_empty() {
                    default_email
                } else {
                    entered
                }
            };
            if email.is_empty() {
                continue;
            }

            let password = match LoginKeychain::recall(&email) {
                Some(remembered) => remembered,
                None => rpassword::prompt_password("Password: ")
                    .context("Failed to read password")?,
            };

            match self.client.login(&email, &password).await {
                Ok(_) => {
                    if self.session.establish().await.is_authenticated() {
                        info!(email = %email, "login succeeded");
                        if let Err(e) = LoginKeychain::remember(&email, &password) {
                            warn!(error = %e, "could not remember password");
                        }
                        self.config.last_email = Some(email);
                        if let Err(e) = self.config.save() {
                            warn!(error = %e, "could not save config");
                        }
                        return Ok(());
                    }
                    eprintln!("Login returned an unusable credential, try again.");
                }
                Err(e) => {
                    // A stale remembered password should not lock the user
                    // into a failing loop.
                    let _ = LoginKeychain::forget(&email);
                    eprintln!("Login failed: {e}");
                }
            }
        }
    }

    async fn chat_loop(&mut self) -> Result<()> {
        let stdin = io::stdin();
        loop {
            print!("> ");
            io::stdout().flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                return Ok(()); // EOF
            }
            let line = line.trim();

            match line {
                "" => continue,
                "/quit" => return Ok(()),
                "/logout" => {
                    self.session.logout().await;
                    println!("Logged out.");
                    self.login_flow().await?;
                    self.session.start_revalidation(self.revalidate_every);
                }
                "/history" => match self.client.chat_history().await {
                    Ok(history) => {
                        for msg in &history {
                            println!("[{}] you: {}", msg.created_at.format("%Y-%m-%d %H:%M"), msg.message);
                            println!("{:>18}  {}", "assistant:", msg.response);
                        }
                        if history.is_empty() {
                            println!("(no history)");
                        }
                    }
                    Err(e) => eprintln!("Could not fetch history: {e}"),
                },
                message => match self.client.send_message(message).await {
                    Ok(envelope) => {
                        let reply = envelope
                            .data
                            .as_ref()
                            .and_then(|d| d.get("response"))
                            .and_then(|r| r.as_str())
                            .map(str::to_string)
                            .unwrap_or(envelope.message);
                        println!("{reply}");
                    }
                    Err(e) => eprintln!("Send failed: {e}"),
                },
            }
        }
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
