//! The single "current weather" slot and the rules for writing to it.
//!
//! [`SessionState`] is plain data with synchronous transitions so it can be
//! unit tested without a runtime. [`WeatherSession`] pairs it with a
//! [`WeatherClient`] and runs the fetches.
//!
//! Every fetch is tagged with a [`Ticket`]. Only the most recently issued
//! ticket may write its result; anything older is dropped when it lands
//! (last-started-wins).

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::{
    error::{FetchError, FetchOutcome},
    geolocation::LocationProvider,
    model::{Coordinates, LocationQuery, UnitSystem, WeatherSnapshot},
    provider::WeatherClient,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// User-initiated lookup by name or coordinates.
    Search,
    /// Re-fetch of the current snapshot after the unit system changed.
    UnitRefresh,
}

/// Permission to write one fetch result, plus the unit system that fetch
/// must request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    seq: u64,
    kind: FetchKind,
    units: UnitSystem,
}

impl Ticket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }
}

/// Work a state transition asks the owner to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Refetch { query: LocationQuery, units: UnitSystem },
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    snapshot: Option<WeatherSnapshot>,
    /// Query that produced `snapshot`.
    origin: Option<LocationQuery>,
    error: Option<String>,
    units: UnitSystem,
    issued: u64,
    pending: Option<u64>,
}

impl SessionState {
    pub fn new(units: UnitSystem) -> Self {
        Self {
            units,
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Issue a ticket for a new fetch in the current unit system. Clears the
    /// visible error.
    pub fn begin(&mut self, kind: FetchKind) -> Ticket {
        self.issued += 1;
        self.pending = Some(self.issued);
        self.error = None;
        Ticket {
            seq: self.issued,
            kind,
            units: self.units,
        }
    }

    /// Apply a finished fetch. Stale results are dropped.
    ///
    /// Returns a re-fetch when the applied snapshot is in a unit system the
    /// session has since moved away from.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        query: LocationQuery,
        outcome: FetchOutcome,
    ) -> Option<Effect> {
        if ticket.seq != self.issued {
            info!(
                seq = ticket.seq,
                latest = self.issued,
                "Discarding result of a superseded fetch"
            );
            return None;
        }
        self.pending = None;

        match outcome {
            Ok(snapshot) => {
                let stale_units = snapshot.units != self.units;
                self.snapshot = Some(snapshot);
                self.origin = Some(query);
                self.error = None;
                if stale_units {
                    return self.refetch();
                }
            }
            Err(err) => {
                self.error = Some(err.user_message().to_string());
                // A failed unit refresh keeps the last good reading on screen.
                if ticket.kind == FetchKind::Search {
                    self.snapshot = None;
                    self.origin = None;
                }
            }
        }
        None
    }

    /// Forget a fetch whose caller stopped waiting for it. Only the latest
    /// ticket affects `is_loading`, so older ones are ignored.
    pub fn abandon(&mut self, seq: u64) {
        if self.pending == Some(seq) {
            debug!(seq, "Fetch abandoned before it finished");
            self.pending = None;
        }
    }

    /// Record a failure that happened before any fetch was issued
    /// (blank input, no location). The snapshot is left alone.
    pub fn reject(&mut self, err: &FetchError) {
        self.error = Some(err.user_message().to_string());
    }

    /// Change the unit system. When a snapshot exists and the value actually
    /// changed, asks for exactly one re-fetch keyed off the snapshot's
    /// coordinates (or, lacking those, the query that produced it).
    pub fn set_units(&mut self, units: UnitSystem) -> Option<Effect> {
        if self.units == units {
            return None;
        }
        self.units = units;
        self.refetch()
    }

    fn refetch(&self) -> Option<Effect> {
        let snapshot = self.snapshot.as_ref()?;
        let query = match snapshot.coordinates {
            Some(Coordinates { lat, lon }) => LocationQuery::by_coordinates(lat, lon),
            None => self.origin.clone()?,
        };
        Some(Effect::Refetch {
            query,
            units: self.units,
        })
    }
}

/// Marks a ticket abandoned if the fetch future is dropped before it
/// completes.
struct InFlight<'a> {
    abandoned: &'a AtomicU64,
    seq: u64,
    finished: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.abandoned.fetch_max(self.seq, Ordering::AcqRel);
        }
    }
}

/// Owner of the session state, driving fetches through a [`WeatherClient`].
#[derive(Debug)]
pub struct WeatherSession<C> {
    client: C,
    state: Mutex<SessionState>,
    /// Highest ticket whose fetch was dropped mid-flight. Folded into the
    /// state on every lock, since `Drop` cannot await the mutex.
    abandoned: AtomicU64,
}

impl<C: WeatherClient> WeatherSession<C> {
    pub fn new(client: C, units: UnitSystem) -> Self {
        Self {
            client,
            state: Mutex::new(SessionState::new(units)),
            abandoned: AtomicU64::new(0),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Look up weather by city name.
    pub async fn search(&self, name: &str) -> FetchOutcome {
        self.start(LocationQuery::by_name(name)).await
    }

    /// Look up weather for already resolved coordinates.
    pub async fn fetch_at(&self, coords: Coordinates) -> FetchOutcome {
        self.start(LocationQuery::ByCoordinates(coords)).await
    }

    /// Ask the location collaborator for a position, then fetch for it.
    pub async fn locate(&self, provider: &dyn LocationProvider) -> FetchOutcome {
        match provider.current_position().await {
            Ok(coords) => self.fetch_at(coords).await,
            Err(err) => {
                let err = FetchError::from(err);
                self.lock().await.reject(&err);
                Err(err)
            }
        }
    }

    /// Change the unit system. Returns the outcome of the re-fetch if one
    /// was needed.
    pub async fn set_units(&self, units: UnitSystem) -> Option<FetchOutcome> {
        let effect = self.lock().await.set_units(units)?;
        Some(self.run_effect(effect).await)
    }

    pub async fn toggle_units(&self) -> Option<FetchOutcome> {
        let next = self.units().await.toggled();
        self.set_units(next).await
    }

    pub async fn snapshot(&self) -> Option<WeatherSnapshot> {
        self.lock().await.snapshot().cloned()
    }

    pub async fn error(&self) -> Option<String> {
        self.lock().await.error().map(str::to_owned)
    }

    pub async fn is_loading(&self) -> bool {
        self.lock().await.is_loading()
    }

    pub async fn units(&self) -> UnitSystem {
        self.lock().await.units()
    }

    /// Copy of the whole state, for rendering.
    pub async fn state(&self) -> SessionState {
        self.lock().await.clone()
    }

    async fn lock(&self) -> MutexGuard<'_, SessionState> {
        let mut state = self.state.lock().await;
        let abandoned = self.abandoned.load(Ordering::Acquire);
        if abandoned != 0 {
            state.abandon(abandoned);
        }
        state
    }

    async fn start(&self, query: LocationQuery) -> FetchOutcome {
        let query = match query.validate() {
            Ok(query) => query,
            Err(err) => {
                self.lock().await.reject(&err);
                return Err(err);
            }
        };
        self.run(query, FetchKind::Search).await
    }

    async fn run_effect(&self, effect: Effect) -> FetchOutcome {
        match effect {
            Effect::Refetch { query, units } => {
                debug!(%query, %units, "Re-fetching for new unit system");
                self.run(query, FetchKind::UnitRefresh).await
            }
        }
    }

    /// Run one fetch, then any re-fetch its completion asks for. Returns the
    /// last outcome.
    async fn run(&self, mut query: LocationQuery, mut kind: FetchKind) -> FetchOutcome {
        loop {
            let ticket = self.lock().await.begin(kind);
            let mut in_flight = InFlight {
                abandoned: &self.abandoned,
                seq: ticket.seq(),
                finished: false,
            };

            let outcome = self.client.fetch_weather(&query, ticket.units()).await;

            let effect = self.lock().await.complete(ticket, query, outcome.clone());
            in_flight.finished = true;

            match effect {
                Some(Effect::Refetch { query: next, units }) => {
                    debug!(query = %next, %units, "Units changed mid-fetch, re-fetching");
                    query = next;
                    kind = FetchKind::UnitRefresh;
                }
                None => return outcome,
            }
        }
    }
}
