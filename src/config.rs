//! Launch parameters and client configuration.

use std::time::Duration;

use url::Url;

use crate::error::{BingoError, Result};
use crate::protocol::{CardId, GameId, PlayerId, Stake};
use crate::registry::DEFAULT_CARD_POOL_SIZE;
use crate::timer::DEFAULT_PURCHASE_TICKS;

/// Coordinator address used when none is supplied.
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8000";

/// Stake tier assumed when the launch query omits `room`.
pub const DEFAULT_ROOM: Stake = 5;

/// Round assumed when the launch query omits `game_id`.
pub const DEFAULT_GAME_ID: GameId = 1;

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_WINNER_DISPLAY: Duration = Duration::from_secs(10);
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ── LaunchParams ────────────────────────────────────────────────────

/// The (room, game, player) triple a session is scoped to.
///
/// # Example
///
/// ```
/// use bingo_client::config::LaunchParams;
///
/// let launch = LaunchParams::from_query("room=10&game_id=77", 12345).unwrap();
/// assert_eq!(launch.room, 10);
/// assert_eq!(launch.channel_path(), "/ws/77/12345");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchParams {
    /// Stake tier. Always positive.
    pub room: Stake,
    pub game_id: GameId,
    pub player_id: PlayerId,
}

impl LaunchParams {
    /// # Errors
    ///
    /// Returns [`BingoError::InvalidLaunchParams`] if `room` is zero.
    pub fn new(room: Stake, game_id: GameId, player_id: PlayerId) -> Result<Self> {
        if room == 0 {
            return Err(BingoError::InvalidLaunchParams(
                "room stake must be positive".into(),
            ));
        }
        Ok(Self {
            room,
            game_id,
            player_id,
        })
    }

    /// Read `room` and `game_id` from a launch query string such as
    /// `?room=10&game_id=3`. Values are percent-decoded. Missing keys fall
    /// back to the defaults; unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::InvalidLaunchParams`] when a present value is not
    /// an integer or the stake is zero.
    pub fn from_query(query: &str, player_id: PlayerId) -> Result<Self> {
        let mut room = DEFAULT_ROOM;
        let mut game_id = DEFAULT_GAME_ID;

        let query = query.strip_prefix('?').unwrap_or(query);
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "room" => room = parse_param(&key, &value)?,
                "game_id" => game_id = parse_param(&key, &value)?,
                _ => {}
            }
        }
        Self::new(room, game_id, player_id)
    }

    /// Read the launch parameters from the query of a full page URL.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::InvalidLaunchParams`] if `page` is not a URL or
    /// its query is invalid as for [`from_query`](Self::from_query).
    pub fn from_url(page: &str, player_id: PlayerId) -> Result<Self> {
        let page = Url::parse(page)
            .map_err(|e| BingoError::InvalidLaunchParams(format!("{page:?}: {e}")))?;
        Self::from_query(page.query().unwrap_or_default(), player_id)
    }

    /// Path of the coordination channel for this triple.
    pub fn channel_path(&self) -> String {
        format!("/ws/{}/{}", self.game_id, self.player_id)
    }

    /// Full channel URL under the given `ws://` or `wss://` server base.
    ///
    /// The channel segments are appended to any path the base already has;
    /// a query on the base (an auth token, say) is kept.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::InvalidLaunchParams`] if `base` does not parse
    /// or is not a WebSocket URL.
    pub fn channel_url(&self, base: &str) -> Result<Url> {
        let mut url = Url::parse(base)
            .map_err(|e| BingoError::InvalidLaunchParams(format!("server url {base:?}: {e}")))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(BingoError::InvalidLaunchParams(format!(
                "server url {base:?} is not ws:// or wss://"
            )));
        }
        let game_id = self.game_id.to_string();
        let player_id = self.player_id.to_string();
        url.path_segments_mut()
            .map_err(|()| {
                BingoError::InvalidLaunchParams(format!("server url {base:?} cannot carry a path"))
            })?
            .pop_if_empty()
            .extend(["ws", game_id.as_str(), player_id.as_str()]);
        Ok(url)
    }
}

fn parse_param<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| BingoError::InvalidLaunchParams(format!("{key}={value:?} is not an integer")))
}

// ── BingoConfig ─────────────────────────────────────────────────────

/// Configuration for a bingo session and its client loop.
///
/// # Example
///
/// ```
/// use bingo_client::config::{BingoConfig, LaunchParams};
/// use std::time::Duration;
///
/// let launch = LaunchParams::new(5, 1, 42).unwrap();
/// let config = BingoConfig::new(launch)
///     .with_purchase_ticks(30)
///     .with_winner_display(Duration::from_secs(3));
/// assert_eq!(config.purchase_ticks, 30);
/// ```
#[derive(Debug, Clone)]
pub struct BingoConfig {
    pub launch: LaunchParams,
    /// Length of the purchase window, in ticks.
    pub purchase_ticks: u32,
    /// Wall-clock length of one countdown tick.
    pub tick_interval: Duration,
    /// How long the winner popup stays up before it hides itself.
    pub winner_display: Duration,
    /// Highest card id the coordinator hands out.
    pub card_pool_size: CardId,
    /// Capacity of the bounded event channel.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Time allowed for a graceful shutdown before the loop is aborted.
    pub shutdown_timeout: Duration,
    /// How long `BingoClient::connect` waits for the
    /// WebSocket handshake.
    pub connect_timeout: Duration,
}

impl BingoConfig {
    pub fn new(launch: LaunchParams) -> Self {
        Self {
            launch,
            purchase_ticks: DEFAULT_PURCHASE_TICKS,
            tick_interval: DEFAULT_TICK_INTERVAL,
            winner_display: DEFAULT_WINNER_DISPLAY,
            card_pool_size: DEFAULT_CARD_POOL_SIZE,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_purchase_ticks(mut self, ticks: u32) -> Self {
        self.purchase_ticks = ticks;
        self
    }

    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    #[must_use]
    pub fn with_winner_display(mut self, duration: Duration) -> Self {
        self.winner_display = duration;
        self
    }

    #[must_use]
    pub fn with_card_pool_size(mut self, size: CardId) -> Self {
        self.card_pool_size = size;
        self
    }

    /// Set the capacity of the bounded event channel. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults_when_keys_missing() {
        let launch = LaunchParams::from_query("", 9).unwrap();
        assert_eq!(launch, LaunchParams::new(DEFAULT_ROOM, DEFAULT_GAME_ID, 9).unwrap());
    }

    #[test]
    fn query_reads_room_and_game_and_ignores_others() {
        let launch = LaunchParams::from_query("?lang=am&room=20&game_id=314", 1).unwrap();
        assert_eq!(launch.room, 20);
        assert_eq!(launch.game_id, 314);
    }

    #[test]
    fn query_rejects_zero_stake_and_garbage() {
        assert!(matches!(
            LaunchParams::from_query("room=0", 1),
            Err(BingoError::InvalidLaunchParams(_))
        ));
        assert!(matches!(
            LaunchParams::from_query("game_id=abc", 1),
            Err(BingoError::InvalidLaunchParams(_))
        ));
    }

    #[test]
    fn query_values_are_percent_decoded() {
        let launch = LaunchParams::from_query("room=%31%30&game_id=3", 1).unwrap();
        assert_eq!(launch.room, 10);
        assert_eq!(launch.game_id, 3);
    }

    #[test]
    fn launch_params_read_from_page_url() {
        let launch =
            LaunchParams::from_url("https://t.me/app/play?room=50&game_id=12#top", 4).unwrap();
        assert_eq!(launch, LaunchParams::new(50, 12, 4).unwrap());
        assert!(matches!(
            LaunchParams::from_url("not a url", 4),
            Err(BingoError::InvalidLaunchParams(_))
        ));
    }

    #[test]
    fn channel_url_joins_without_double_slash() {
        let launch = LaunchParams::new(5, 3, 777).unwrap();
        assert_eq!(
            launch.channel_url("ws://host:8000/").unwrap().as_str(),
            "ws://host:8000/ws/3/777"
        );
        assert_eq!(
            launch.channel_url(DEFAULT_SERVER_URL).unwrap().as_str(),
            "ws://127.0.0.1:8000/ws/3/777"
        );
    }

    #[test]
    fn channel_url_keeps_base_path_and_query() {
        let launch = LaunchParams::new(5, 3, 7).unwrap();
        assert_eq!(
            launch.channel_url("ws://host:8000/?token=abc").unwrap().as_str(),
            "ws://host:8000/ws/3/7?token=abc"
        );
        assert_eq!(
            launch.channel_url("wss://example.com/bingo/").unwrap().as_str(),
            "wss://example.com/bingo/ws/3/7"
        );
    }

    #[test]
    fn channel_url_rejects_non_websocket_bases() {
        let launch = LaunchParams::new(5, 3, 7).unwrap();
        for base in ["http://host:8000", "not a url", ""] {
            assert!(
                matches!(launch.channel_url(base), Err(BingoError::InvalidLaunchParams(_))),
                "{base:?} accepted"
            );
        }
    }

    #[test]
    fn config_defaults() {
        let config = BingoConfig::new(LaunchParams::new(5, 1, 1).unwrap());
        assert_eq!(config.purchase_ticks, 20);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.winner_display, Duration::from_secs(10));
        assert_eq!(config.card_pool_size, 1000);
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn event_channel_capacity_is_clamped_to_one() {
        let config =
            BingoConfig::new(LaunchParams::new(5, 1, 1).unwrap()).with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }
}
