//! Interactive front end: maps [`Command`]s onto a [`Session`].

use std::{fmt::Write as _, future::Future};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use engine::{
    Backend, Candidate, Clock, ConsumeOutcome, DiscoveryQuery, DispatchResult, Gesture,
    GestureInterpreter, KeyValueStore, RefillSource, RemoteSync, Session, SessionEvent,
};

use crate::{
    api::{ApiClient, ApiError},
    commands::{Command, HELP},
};

/// Source of the authoritative currency balance.
pub trait BalanceSource: Send + Sync {
    fn fetch_balance(&self) -> impl Future<Output = Result<u64, ApiError>> + Send;
}

impl BalanceSource for ApiClient {
    async fn fetch_balance(&self) -> Result<u64, ApiError> {
        Ok(self.wallet().await?.balance)
    }
}

/// What the loop should do after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Why [`Shell::run`] returned.
#[derive(Debug, PartialEq, Eq)]
pub enum Exit {
    Quit,
    EndOfInput,
    ReadError,
    Interrupted,
}

pub struct Shell<B, S, C> {
    session: Session<B, S, C>,
    gestures: GestureInterpreter,
    query: DiscoveryQuery,
}

impl<B, S, C> Shell<B, S, C>
where
    B: Backend + BalanceSource,
    S: KeyValueStore,
    C: Clock,
{
    pub fn new(
        session: Session<B, S, C>,
        gestures: GestureInterpreter,
        query: DiscoveryQuery,
    ) -> Self {
        Self {
            session,
            gestures,
            query,
        }
    }

    /// Run one command and return the text to show.
    pub async fn execute(&mut self, command: Command) -> (String, Flow) {
        let reply = match command {
            Command::Drag { dx, dy } => {
                self.gestures.drag_start(0.0, 0.0);
                self.gestures.drag_move(dx, dy);
                match self.gestures.drag_end(dx, dy) {
                    Some(gesture) => self.gesture(gesture).await,
                    None => "no drag in progress".to_string(),
                }
            }
            Command::Like => self.gesture(Gesture::CommitRight).await,
            Command::Pass => self.gesture(Gesture::CommitLeft).await,
            Command::Tap => self.gesture(Gesture::Tap).await,
            Command::Refill => self.refill().await,
            Command::Status => self.status().await,
            Command::Matches => self.matches().await,
            Command::Wallet => self.wallet().await,
            Command::Credit(amount) => {
                self.session.credit(amount).await;
                let balance = self.session.quota_state().await.currency_balance;
                format!("credited {amount}, balance {balance}")
            }
            Command::Suspend => match self.session.suspend().await {
                Ok(()) => "state saved".to_string(),
                Err(err) => format!("could not save state: {err}"),
            },
            Command::Help => HELP.to_string(),
            Command::Quit => return ("bye".to_string(), Flow::Quit),
        };
        (reply, Flow::Continue)
    }

    /// Read commands from `input` until quit, end of input, a read error or
    /// `interrupt` resolves. Never bails out early: callers always get to
    /// shut the session down afterwards.
    pub async fn run<R, I>(
        &mut self,
        input: R,
        interrupt: I,
        mut print: impl FnMut(&str),
    ) -> Exit
    where
        R: AsyncBufRead + Unpin,
        I: Future<Output = ()>,
    {
        let mut lines = input.lines();
        tokio::pin!(interrupt);
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let line = match line {
                        Ok(Some(line)) => line,
                        Ok(None) => return Exit::EndOfInput,
                        Err(err) => {
                            tracing::warn!("reading commands failed, stopping: {err}");
                            return Exit::ReadError;
                        }
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match line.parse::<Command>() {
                        Ok(command) => {
                            let (reply, flow) = self.execute(command).await;
                            print(&reply);
                            if flow == Flow::Quit {
                                return Exit::Quit;
                            }
                        }
                        Err(err) => print(&err.to_string()),
                    }
                }
                () = &mut interrupt => {
                    if let Err(err) = self.session.suspend().await {
                        tracing::warn!("flush on interrupt failed: {err}");
                    }
                    return Exit::Interrupted;
                }
            }
        }
    }

    pub async fn refill(&self) -> String {
        match self.session.refill(&self.query).await {
            RefillSource::Backend { count } => format!("loaded {count} profiles"),
            RefillSource::Fallback { count, reason } => {
                format!("offline deck with {count} profiles ({reason})")
            }
        }
    }

    async fn gesture(&self, gesture: Gesture) -> String {
        let top = self.session.current_candidate().await;
        match self.session.handle_gesture(gesture).await {
            DispatchResult::Committed {
                action,
                outcome,
                remote,
            } => {
                let name = top.as_ref().map_or("?", |c| c.name.as_str());
                let mut reply = format!("{action} {name}");
                match outcome {
                    ConsumeOutcome::AllowedPaid => {
                        let balance = self.session.quota_state().await.currency_balance;
                        let _ = write!(reply, " (paid, balance {balance})");
                    }
                    _ => {
                        let left = self.session.free_remaining().await;
                        let _ = write!(reply, " ({left} free left)");
                    }
                }
                if remote == RemoteSync::SkippedFallback {
                    reply.push_str(" [offline profile]");
                }
                reply
            }
            DispatchResult::Blocked => format!(
                "out of swipes: free allowance resets in {}, or `credit` more currency",
                format_duration(self.session.time_until_reset().await)
            ),
            DispatchResult::Ignored => match (gesture, top) {
                (Gesture::Tap, Some(candidate)) => describe(&candidate),
                _ => "drag cancelled".to_string(),
            },
            DispatchResult::NoCandidate => "deck is empty, try `refill`".to_string(),
        }
    }

    async fn status(&self) -> String {
        let state = self.session.quota_state().await;
        let (cursor, len) = self.session.deck_position().await;
        let top = match self.session.current_candidate().await {
            Some(candidate) => describe(&candidate),
            None => "no profile".to_string(),
        };
        format!(
            "{top}\ncard {} of {len}, {} free left, balance {}, reset in {}",
            if len == 0 { 0 } else { cursor + 1 },
            self.session.free_remaining().await,
            state.currency_balance,
            format_duration(self.session.time_until_reset().await),
        )
    }

    async fn matches(&self) -> String {
        let matches = self.session.matches().await;
        if matches.is_empty() {
            return "no matches yet".to_string();
        }
        matches
            .iter()
            .map(|m| format!("{} with {} at {}", m.id, m.counterparty_id, m.matched_at_iso()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn wallet(&self) -> String {
        match self.session.backend().fetch_balance().await {
            Ok(balance) => {
                self.session.refresh_balance(balance).await;
                format!("balance {balance}")
            }
            Err(err) => {
                tracing::warn!("wallet refresh failed: {err}");
                format!("could not reach the wallet: {err}")
            }
        }
    }
}

/// One-line rendering of a session event.
pub fn announce(event: &SessionEvent) -> String {
    match event {
        SessionEvent::Matched(m) => format!("it's a match! {} ({})", m.counterparty_id, m.id),
        SessionEvent::QuotaReset { next_reset_at } => format!(
            "free swipes refilled, next reset at {}",
            next_reset_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        ),
    }
}

fn describe(candidate: &Candidate) -> String {
    let mut line = candidate.name.clone();
    if let Some(age) = candidate.age {
        let _ = write!(line, ", {age}");
    }
    if !candidate.tags.is_empty() {
        let _ = write!(line, " [{}]", candidate.tags.join(", "));
    }
    line
}

fn format_duration(duration: chrono::Duration) -> String {
    let minutes = duration.num_minutes();
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}
