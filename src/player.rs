//! Single-active-player coordination.
//!
//! Every embedded player on a page registers with a [`PlayerCoordinator`]. When one
//! of them reports `PLAYING`, every other player that is still playing a different
//! video gets paused, so at most one video is audible at a time. The last PLAYING
//! report wins.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Sessions with no registration or state report for this long are dropped.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Upper bound on players registered under one page session.
pub const MAX_PLAYERS_PER_SESSION: usize = 64;

/// Playback states as reported by the YouTube IFrame API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum PlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl TryFrom<i32> for PlayerState {
    type Error = PlayerError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            -1 => Ok(PlayerState::Unstarted),
            0 => Ok(PlayerState::Ended),
            1 => Ok(PlayerState::Playing),
            2 => Ok(PlayerState::Paused),
            3 => Ok(PlayerState::Buffering),
            5 => Ok(PlayerState::Cued),
            other => Err(PlayerError::UnknownState(other)),
        }
    }
}

impl From<PlayerState> for i32 {
    fn from(state: PlayerState) -> i32 {
        match state {
            PlayerState::Unstarted => -1,
            PlayerState::Ended => 0,
            PlayerState::Playing => 1,
            PlayerState::Paused => 2,
            PlayerState::Buffering => 3,
            PlayerState::Cued => 5,
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PlayerError {
    #[error("player {0} is already registered")]
    AlreadyRegistered(String),
    #[error("player {0} is not registered")]
    NotRegistered(String),
    #[error("unknown player state code {0}")]
    UnknownState(i32),
    #[error("widget command failed: {0}")]
    Widget(String),
    #[error("session already holds the maximum of {0} players")]
    TooManyPlayers(usize),
}

/// Handle to one embedded playback widget.
pub trait PlaybackWidget: Send {
    fn state(&self) -> PlayerState;
    fn pause(&mut self) -> Result<(), PlayerError>;
    fn destroy(&mut self) -> Result<(), PlayerError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackEvent {
    Played { video_id: String },
    Paused { video_id: String },
    Ended { video_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PausedPlayer {
    pub container_id: String,
    pub video_id: String,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub event: Option<PlaybackEvent>,
    pub paused: Vec<PausedPlayer>,
}

struct RegisteredPlayer<W> {
    video_id: String,
    widget: W,
}

pub struct PlayerCoordinator<W> {
    players: HashMap<String, RegisteredPlayer<W>>,
    currently_playing: Option<String>,
}

impl<W> Default for PlayerCoordinator<W> {
    fn default() -> Self {
        Self {
            players: HashMap::new(),
            currently_playing: None,
        }
    }
}

impl<W: PlaybackWidget> PlayerCoordinator<W> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn currently_playing(&self) -> Option<&str> {
        self.currently_playing.as_deref()
    }

    pub fn widget(&self, container_id: &str) -> Option<&W> {
        self.players.get(container_id).map(|p| &p.widget)
    }

    pub fn widget_mut(&mut self, container_id: &str) -> Option<&mut W> {
        self.players.get_mut(container_id).map(|p| &mut p.widget)
    }

    pub fn widgets_mut(&mut self) -> impl Iterator<Item = (&str, &mut W)> {
        self.players
            .iter_mut()
            .map(|(container, player)| (container.as_str(), &mut player.widget))
    }

    #[tracing::instrument(name = "Register player", skip(self, widget))]
    pub fn register(
        &mut self,
        container_id: &str,
        video_id: &str,
        widget: W,
    ) -> Result<(), PlayerError> {
        if self.players.contains_key(container_id) {
            tracing::debug!("Player {} already exists", container_id);
            return Err(PlayerError::AlreadyRegistered(container_id.to_string()));
        }

        self.players.insert(
            container_id.to_string(),
            RegisteredPlayer {
                video_id: video_id.to_string(),
                widget,
            },
        );
        tracing::info!("Player initialized: {} -> {}", container_id, video_id);
        Ok(())
    }

    /// Applies a state report from one widget and returns what changed.
    #[tracing::instrument(name = "Player state change", skip(self))]
    pub fn handle_state_change(
        &mut self,
        container_id: &str,
        state: PlayerState,
    ) -> Result<Transition, PlayerError> {
        let video_id = self
            .players
            .get(container_id)
            .map(|p| p.video_id.clone())
            .ok_or_else(|| PlayerError::NotRegistered(container_id.to_string()))?;

        let transition = match state {
            PlayerState::Playing => {
                if self.currently_playing.as_deref() == Some(video_id.as_str()) {
                    Transition::default()
                } else {
                    tracing::debug!("New video {} started, pausing others", video_id);
                    let paused = self.pause_all_except(&video_id);
                    self.currently_playing = Some(video_id.clone());
                    Transition {
                        event: Some(PlaybackEvent::Played { video_id }),
                        paused,
                    }
                }
            }
            PlayerState::Paused => {
                self.clear_if_current(&video_id);
                Transition {
                    event: Some(PlaybackEvent::Paused { video_id }),
                    paused: Vec::new(),
                }
            }
            PlayerState::Ended => {
                self.clear_if_current(&video_id);
                Transition {
                    event: Some(PlaybackEvent::Ended { video_id }),
                    paused: Vec::new(),
                }
            }
            PlayerState::Unstarted | PlayerState::Buffering | PlayerState::Cued => {
                Transition::default()
            }
        };

        Ok(transition)
    }

    fn clear_if_current(&mut self, video_id: &str) {
        if self.currently_playing.as_deref() == Some(video_id) {
            self.currently_playing = None;
        }
    }

    /// Pauses every playing widget bound to a different video.
    pub fn pause_all_except(&mut self, except_video_id: &str) -> Vec<PausedPlayer> {
        let mut paused = Vec::new();

        for (container_id, player) in self.players.iter_mut() {
            if player.video_id == except_video_id || player.widget.state() != PlayerState::Playing {
                continue;
            }
            match player.widget.pause() {
                Ok(()) => {
                    tracing::debug!("Paused video {} (player {})", player.video_id, container_id);
                    paused.push(PausedPlayer {
                        container_id: container_id.clone(),
                        video_id: player.video_id.clone(),
                    });
                }
                Err(e) => tracing::error!("Error pausing player {}: {}", container_id, e),
            }
        }

        paused.sort_by(|a, b| a.container_id.cmp(&b.container_id));
        paused
    }

    pub fn pause_all(&mut self) -> Vec<PausedPlayer> {
        let mut paused = Vec::new();

        for (container_id, player) in self.players.iter_mut() {
            if player.widget.state() != PlayerState::Playing {
                continue;
            }
            match player.widget.pause() {
                Ok(()) => paused.push(PausedPlayer {
                    container_id: container_id.clone(),
                    video_id: player.video_id.clone(),
                }),
                Err(e) => tracing::error!("Error pausing player {}: {}", container_id, e),
            }
        }

        self.currently_playing = None;
        paused.sort_by(|a, b| a.container_id.cmp(&b.container_id));
        paused
    }

    /// Destroys every widget and forgets them all.
    pub fn cleanup(&mut self) -> usize {
        let count = self.players.len();
        for (container_id, mut player) in self.players.drain() {
            if let Err(e) = player.widget.destroy() {
                tracing::error!("Error destroying player {}: {}", container_id, e);
            }
        }
        self.currently_playing = None;
        count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetCommand {
    Pause,
    Destroy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedCommand {
    pub container_id: String,
    pub command: WidgetCommand,
}

/// A widget living in a browser. Its state is whatever the page last reported;
/// commands are queued until the page picks them up.
#[derive(Debug)]
pub struct RemoteWidget {
    state: PlayerState,
    pending: Vec<WidgetCommand>,
}

impl RemoteWidget {
    pub fn new() -> Self {
        Self {
            state: PlayerState::Unstarted,
            pending: Vec::new(),
        }
    }

    pub fn report(&mut self, state: PlayerState) {
        self.state = state;
    }

    pub fn take_commands(&mut self) -> Vec<WidgetCommand> {
        std::mem::take(&mut self.pending)
    }
}

impl Default for RemoteWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackWidget for RemoteWidget {
    fn state(&self) -> PlayerState {
        self.state
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        self.state = PlayerState::Paused;
        self.pending.push(WidgetCommand::Pause);
        Ok(())
    }

    fn destroy(&mut self) -> Result<(), PlayerError> {
        self.pending.push(WidgetCommand::Destroy);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateReport {
    pub transition: Transition,
    pub commands: Vec<QueuedCommand>,
}

struct PageSession {
    coordinator: PlayerCoordinator<RemoteWidget>,
    last_seen: Instant,
}

impl PageSession {
    fn new() -> Self {
        Self {
            coordinator: PlayerCoordinator::new(),
            last_seen: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_seen = Instant::now();
    }
}

/// Coordinators for every open page, keyed by a page-session id chosen by the page.
///
/// A page normally closes its session when it unloads. Sessions whose page went
/// away without saying so are evicted once they have been idle for
/// [`SESSION_IDLE_TIMEOUT`].
#[derive(Clone)]
pub struct PlayerHub {
    sessions: Arc<Mutex<HashMap<String, PageSession>>>,
    idle_timeout: Duration,
}

impl Default for PlayerHub {
    fn default() -> Self {
        Self::with_idle_timeout(SESSION_IDLE_TIMEOUT)
    }
}

impl PlayerHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            idle_timeout,
        }
    }

    pub async fn register(
        &self,
        session_id: &str,
        container_id: &str,
        video_id: &str,
    ) -> Result<(), PlayerError> {
        let mut sessions = self.sessions.lock().await;
        Self::evict_idle(&mut sessions, self.idle_timeout);

        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(PageSession::new);
        session.touch();

        if session.coordinator.len() >= MAX_PLAYERS_PER_SESSION {
            tracing::warn!("Session {} reached the player limit", session_id);
            return Err(PlayerError::TooManyPlayers(MAX_PLAYERS_PER_SESSION));
        }

        session
            .coordinator
            .register(container_id, video_id, RemoteWidget::new())
    }

    pub async fn report_state(
        &self,
        session_id: &str,
        container_id: &str,
        state: PlayerState,
    ) -> Result<StateReport, PlayerError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| PlayerError::NotRegistered(container_id.to_string()))?;
        session.touch();
        let coordinator = &mut session.coordinator;

        let widget = coordinator
            .widget_mut(container_id)
            .ok_or_else(|| PlayerError::NotRegistered(container_id.to_string()))?;
        widget.report(state);

        let transition = coordinator.handle_state_change(container_id, state)?;

        let mut commands: Vec<QueuedCommand> = coordinator
            .widgets_mut()
            .flat_map(|(container, widget)| {
                widget
                    .take_commands()
                    .into_iter()
                    .map(move |command| QueuedCommand {
                        container_id: container.to_string(),
                        command,
                    })
            })
            .collect();
        commands.sort_by(|a, b| a.container_id.cmp(&b.container_id));

        Ok(StateReport { transition, commands })
    }

    /// Tears down a page session. Returns how many players were destroyed.
    pub async fn close(&self, session_id: &str) -> usize {
        let mut sessions = self.sessions.lock().await;
        match sessions.remove(session_id) {
            Some(mut session) => session.coordinator.cleanup(),
            None => 0,
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    fn evict_idle(sessions: &mut HashMap<String, PageSession>, idle_timeout: Duration) {
        let before = sessions.len();
        sessions.retain(|_, session| {
            let alive = session.last_seen.elapsed() < idle_timeout;
            if !alive {
                session.coordinator.cleanup();
            }
            alive
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!("Evicted {} idle player sessions", evicted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeWidget {
        state: Option<PlayerState>,
        pauses: usize,
        destroyed: bool,
        fail_pause: bool,
    }

    impl FakeWidget {
        fn playing() -> Self {
            Self {
                state: Some(PlayerState::Playing),
                ..Default::default()
            }
        }
    }

    impl PlaybackWidget for FakeWidget {
        fn state(&self) -> PlayerState {
            self.state.unwrap_or(PlayerState::Unstarted)
        }

        fn pause(&mut self) -> Result<(), PlayerError> {
            if self.fail_pause {
                return Err(PlayerError::Widget("iframe gone".to_string()));
            }
            self.pauses += 1;
            self.state = Some(PlayerState::Paused);
            Ok(())
        }

        fn destroy(&mut self) -> Result<(), PlayerError> {
            self.destroyed = true;
            Ok(())
        }
    }

    #[test]
    fn state_codes_round_trip_through_i32() {
        assert_eq!(PlayerState::try_from(1), Ok(PlayerState::Playing));
        assert_eq!(PlayerState::try_from(-1), Ok(PlayerState::Unstarted));
        assert_eq!(PlayerState::try_from(4), Err(PlayerError::UnknownState(4)));
        assert_eq!(i32::from(PlayerState::Cued), 5);
    }

    #[test]
    fn duplicate_container_is_rejected() {
        let mut coordinator = PlayerCoordinator::new();
        coordinator.register("player-a", "vid-a", FakeWidget::default()).unwrap();
        let err = coordinator
            .register("player-a", "vid-b", FakeWidget::default())
            .unwrap_err();
        assert_eq!(err, PlayerError::AlreadyRegistered("player-a".to_string()));
        assert_eq!(coordinator.len(), 1);
    }

    #[test]
    fn playing_pauses_other_playing_players() {
        let mut coordinator = PlayerCoordinator::new();
        coordinator.register("player-a", "vid-a", FakeWidget::playing()).unwrap();
        coordinator.register("player-b", "vid-b", FakeWidget::default()).unwrap();
        coordinator.register("player-c", "vid-c", FakeWidget::playing()).unwrap();

        coordinator.widget_mut("player-b").unwrap().state = Some(PlayerState::Playing);
        let transition = coordinator
            .handle_state_change("player-b", PlayerState::Playing)
            .unwrap();

        assert_eq!(
            transition.event,
            Some(PlaybackEvent::Played { video_id: "vid-b".to_string() })
        );
        let paused: Vec<&str> = transition.paused.iter().map(|p| p.container_id.as_str()).collect();
        assert_eq!(paused, vec!["player-a", "player-c"]);
        assert_eq!(coordinator.widget("player-b").unwrap().pauses, 0);
        assert_eq!(coordinator.currently_playing(), Some("vid-b"));
    }

    #[test]
    fn repeated_playing_for_current_video_is_a_no_op() {
        let mut coordinator = PlayerCoordinator::new();
        coordinator.register("player-a", "vid-a", FakeWidget::playing()).unwrap();
        coordinator.handle_state_change("player-a", PlayerState::Playing).unwrap();

        let again = coordinator.handle_state_change("player-a", PlayerState::Playing).unwrap();
        assert_eq!(again, Transition::default());
    }

    #[test]
    fn players_sharing_a_video_do_not_pause_each_other() {
        let mut coordinator = PlayerCoordinator::new();
        coordinator.register("hero", "vid-a", FakeWidget::playing()).unwrap();
        coordinator.register("grid", "vid-a", FakeWidget::playing()).unwrap();

        let transition = coordinator.handle_state_change("grid", PlayerState::Playing).unwrap();
        assert!(transition.paused.is_empty());
    }

    #[test]
    fn pause_and_end_clear_current_video() {
        let mut coordinator = PlayerCoordinator::new();
        coordinator.register("player-a", "vid-a", FakeWidget::playing()).unwrap();
        coordinator.handle_state_change("player-a", PlayerState::Playing).unwrap();

        let transition = coordinator.handle_state_change("player-a", PlayerState::Paused).unwrap();
        assert_eq!(
            transition.event,
            Some(PlaybackEvent::Paused { video_id: "vid-a".to_string() })
        );
        assert_eq!(coordinator.currently_playing(), None);

        coordinator.handle_state_change("player-a", PlayerState::Playing).unwrap();
        coordinator.handle_state_change("player-a", PlayerState::Ended).unwrap();
        assert_eq!(coordinator.currently_playing(), None);
    }

    #[test]
    fn buffering_changes_nothing() {
        let mut coordinator = PlayerCoordinator::new();
        coordinator.register("player-a", "vid-a", FakeWidget::playing()).unwrap();
        let transition = coordinator.handle_state_change("player-a", PlayerState::Buffering).unwrap();
        assert_eq!(transition, Transition::default());
    }

    #[test]
    fn unknown_container_is_an_error() {
        let mut coordinator: PlayerCoordinator<FakeWidget> = PlayerCoordinator::new();
        let err = coordinator.handle_state_change("ghost", PlayerState::Playing).unwrap_err();
        assert_eq!(err, PlayerError::NotRegistered("ghost".to_string()));
    }

    #[test]
    fn failing_widget_does_not_stop_the_sweep() {
        let mut coordinator = PlayerCoordinator::new();
        coordinator
            .register(
                "broken",
                "vid-a",
                FakeWidget {
                    fail_pause: true,
                    ..FakeWidget::playing()
                },
            )
            .unwrap();
        coordinator.register("ok", "vid-b", FakeWidget::playing()).unwrap();

        let paused = coordinator.pause_all_except("vid-c");
        assert_eq!(paused.len(), 1);
        assert_eq!(paused[0].container_id, "ok");
    }

    #[test]
    fn pause_all_and_cleanup() {
        let mut coordinator = PlayerCoordinator::new();
        coordinator.register("player-a", "vid-a", FakeWidget::playing()).unwrap();
        coordinator.register("player-b", "vid-b", FakeWidget::default()).unwrap();
        coordinator.handle_state_change("player-a", PlayerState::Playing).unwrap();

        let paused = coordinator.pause_all();
        assert_eq!(paused.len(), 1);
        assert_eq!(coordinator.currently_playing(), None);

        assert_eq!(coordinator.cleanup(), 2);
        assert!(coordinator.is_empty());
    }

    #[tokio::test]
    async fn hub_returns_pause_commands_for_other_players() {
        let hub = PlayerHub::new();
        hub.register("page-1", "player-a", "vid-a").await.unwrap();
        hub.register("page-1", "player-b", "vid-b").await.unwrap();

        let first = hub.report_state("page-1", "player-a", PlayerState::Playing).await.unwrap();
        assert!(first.commands.is_empty());

        let second = hub.report_state("page-1", "player-b", PlayerState::Playing).await.unwrap();
        assert_eq!(
            second.commands,
            vec![QueuedCommand {
                container_id: "player-a".to_string(),
                command: WidgetCommand::Pause,
            }]
        );
    }

    #[tokio::test]
    async fn hub_sessions_are_isolated() {
        let hub = PlayerHub::new();
        hub.register("page-1", "player-a", "vid-a").await.unwrap();
        hub.register("page-2", "player-a", "vid-b").await.unwrap();

        hub.report_state("page-1", "player-a", PlayerState::Playing).await.unwrap();
        let other = hub.report_state("page-2", "player-a", PlayerState::Playing).await.unwrap();
        assert!(other.commands.is_empty());

        assert_eq!(hub.close("page-1").await, 1);
        assert_eq!(hub.session_count().await, 1);
        assert_eq!(hub.close("missing").await, 0);
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted_on_next_registration() {
        tokio::time::pause();
        let hub = PlayerHub::new();
        for i in 0..100 {
            hub.register(&format!("page-{i}"), "player-a", "vid-a").await.unwrap();
        }
        assert_eq!(hub.session_count().await, 100);

        tokio::time::advance(SESSION_IDLE_TIMEOUT / 2).await;
        hub.report_state("page-0", "player-a", PlayerState::Playing).await.unwrap();
        tokio::time::advance(SESSION_IDLE_TIMEOUT / 2 + Duration::from_secs(1)).await;

        hub.register("page-new", "player-a", "vid-a").await.unwrap();
        assert_eq!(hub.session_count().await, 2);
        assert!(hub.report_state("page-0", "player-a", PlayerState::Paused).await.is_ok());
        assert_eq!(
            hub.report_state("page-1", "player-a", PlayerState::Playing).await.unwrap_err(),
            PlayerError::NotRegistered("player-a".to_string())
        );
    }

    #[tokio::test]
    async fn session_player_count_is_capped() {
        let hub = PlayerHub::new();
        for i in 0..MAX_PLAYERS_PER_SESSION {
            hub.register("page-1", &format!("player-{i}"), "vid-a").await.unwrap();
        }

        let err = hub.register("page-1", "player-extra", "vid-a").await.unwrap_err();
        assert_eq!(err, PlayerError::TooManyPlayers(MAX_PLAYERS_PER_SESSION));
        assert!(hub.register("page-2", "player-extra", "vid-a").await.is_ok());
    }

    #[tokio::test]
    async fn closed_session_resumes_after_players_register_again() {
        let hub = PlayerHub::new();
        hub.register("page-1", "player-a", "vid-a").await.unwrap();
        hub.register("page-1", "player-b", "vid-b").await.unwrap();
        hub.close("page-1").await;

        let err = hub.report_state("page-1", "player-a", PlayerState::Playing).await.unwrap_err();
        assert_eq!(err, PlayerError::NotRegistered("player-a".to_string()));

        hub.register("page-1", "player-a", "vid-a").await.unwrap();
        hub.report_state("page-1", "player-a", PlayerState::Playing).await.unwrap();
        hub.register("page-1", "player-b", "vid-b").await.unwrap();
        let report = hub.report_state("page-1", "player-b", PlayerState::Playing).await.unwrap();
        assert_eq!(report.commands.len(), 1);
        assert_eq!(report.commands[0].container_id, "player-a");
    }
}
