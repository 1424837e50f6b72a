//! store.rs
//!
//! Состояние приложения в памяти: все коллекции плюс собранная карта мест.
//! Менять состояние можно только через `dispatch(Action)`.
//!
//! Полные загрузки нумеруются монотонно (`FetchTicket::seq`). Ответ загрузки, начатой
//! раньше уже примененной, отбрасывается. Изменения, пришедшие во время загрузки,
//! пишутся в журнал и проигрываются поверх ее результата, чтобы не потеряться.

use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::gateway::Dataset;
use crate::models::{Agent, Booking, CustomerType, Expense, Tour};
use crate::realtime::events::{ChangeEvent, Record, RecordSet, Table};
use crate::services::reconciler::{self, SeatMap};

/// То, что видят обработчики запросов.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub tours: Vec<Tour>,
    pub agents: Vec<Agent>,
    pub customer_types: Vec<CustomerType>,
    pub bookings: Vec<Booking>,
    pub expenses: Vec<Expense>,
    pub seat_map: SeatMap,
    /// Растет при каждом примененном действии
    pub version: u64,
    /// Была ли хоть одна успешная полная загрузка
    pub loaded: bool,
}

impl Snapshot {
    pub fn tour(&self, name: &str) -> Option<&Tour> {
        self.tours.iter().find(|t| t.name == name)
    }

    pub fn booking(&self, id: Uuid) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub fn customer_type(&self, label: &str) -> Option<&CustomerType> {
        self.customer_types.iter().find(|c| c.label == label)
    }

    pub fn expense(&self, id: Uuid) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id == id)
    }
}

/// Квитанция полной загрузки.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    journal_mark: u64,
}

#[derive(Debug)]
pub enum Action {
    Loaded(FetchTicket, Dataset),
    LoadFailed(FetchTicket),
    Changed(ChangeEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Ответ устаревшей загрузки, состояние не тронуто
    Stale,
    /// Изменение нельзя применить точечно, нужна полная загрузка
    ResyncRequired,
}

#[derive(Debug)]
pub struct StoreState {
    snapshot: Snapshot,
    next_fetch_seq: u64,
    last_applied_fetch: u64,
    next_change_seq: u64,
    /// seq загрузки -> отметка журнала на момент ее начала
    in_flight: BTreeMap<u64, u64>,
    journal: VecDeque<(u64, ChangeEvent)>,
}

impl StoreState {
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot::default(),
            next_fetch_seq: 1,
            last_applied_fetch: 0,
            next_change_seq: 0,
            in_flight: BTreeMap::new(),
            journal: VecDeque::new(),
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        let ticket = FetchTicket {
            seq: self.next_fetch_seq,
            journal_mark: self.next_change_seq,
        };
        self.next_fetch_seq += 1;
        self.in_flight.insert(ticket.seq, ticket.journal_mark);
        ticket
    }

    /// Единственная точка изменения состояния.
    pub fn reduce(&mut self, action: Action) -> Outcome {
        match action {
            Action::Loaded(ticket, dataset) => self.on_loaded(ticket, dataset),
            Action::LoadFailed(ticket) => {
                // последнее согласованное состояние остается как есть
                self.in_flight.remove(&ticket.seq);
                self.trim_journal();
                Outcome::Stale
            }
            Action::Changed(ChangeEvent::Invalidated) => Outcome::ResyncRequired,
            Action::Changed(event) => {
                let rebuild = apply_change(&mut self.snapshot, &event);
                if !self.in_flight.is_empty() {
                    self.journal.push_back((self.next_change_seq, event));
                }
                self.next_change_seq += 1;
                if rebuild {
                    self.rebuild_seat_map();
                }
                self.snapshot.version += 1;
                Outcome::Applied
            }
        }
    }

    fn on_loaded(&mut self, ticket: FetchTicket, dataset: Dataset) -> Outcome {
        self.in_flight.remove(&ticket.seq);
        if ticket.seq <= self.last_applied_fetch {
            debug!("Dropping stale fetch #{} (already at #{})", ticket.seq, self.last_applied_fetch);
            self.trim_journal();
            return Outcome::Stale;
        }
        self.last_applied_fetch = ticket.seq;
        // более ранние загрузки все равно будут отброшены
        self.in_flight.retain(|&seq, _| seq > ticket.seq);

        let Dataset { tours, agents, customer_types, bookings, expenses } = dataset;
        self.snapshot.tours = tours;
        self.snapshot.agents = agents;
        self.snapshot.customer_types = customer_types;
        self.snapshot.bookings = bookings;
        self.snapshot.expenses = expenses;

        let replay: Vec<ChangeEvent> = self
            .journal
            .iter()
            .filter(|(seq, _)| *seq >= ticket.journal_mark)
            .map(|(_, e)| e.clone())
            .collect();
        if !replay.is_empty() {
            debug!("Replaying {} changes on top of fetch #{}", replay.len(), ticket.seq);
        }
        for event in &replay {
            apply_change(&mut self.snapshot, event);
        }
        self.trim_journal();

        self.rebuild_seat_map();
        self.snapshot.loaded = true;
        self.snapshot.version += 1;
        Outcome::Applied
    }

    fn trim_journal(&mut self) {
        match self.in_flight.values().min().copied() {
            Some(mark) => {
                while self.journal.front().is_some_and(|(seq, _)| *seq < mark) {
                    self.journal.pop_front();
                }
            }
            None => self.journal.clear(),
        }
    }

    fn rebuild_seat_map(&mut self) {
        self.snapshot.seat_map = reconciler::reconcile(&self.snapshot.tours, &self.snapshot.bookings);
    }
}

fn upsert_by<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T, &T) -> bool) {
    match items.iter_mut().find(|existing| same(existing, &item)) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}

/// Точечно применяет изменение. Возвращает true, если нужно пересобрать карту мест.
fn apply_change(s: &mut Snapshot, event: &ChangeEvent) -> bool {
    match event {
        ChangeEvent::Upserted { record } => match record.clone() {
            Record::Tour(t) => {
                upsert_by(&mut s.tours, t, |a, b| a.name == b.name);
                true
            }
            Record::Agent(a) => {
                upsert_by(&mut s.agents, a, |x, y| x.code.eq_ignore_ascii_case(&y.code));
                false
            }
            Record::CustomerType(c) => {
                upsert_by(&mut s.customer_types, c, |a, b| a.label == b.label);
                false
            }
            Record::Booking(b) => {
                upsert_by(&mut s.bookings, b, |x, y| x.id == y.id);
                true
            }
            Record::Expense(e) => {
                upsert_by(&mut s.expenses, e, |x, y| x.id == y.id);
                false
            }
        },
        ChangeEvent::Deleted { table, key } => match table {
            Table::Tours => {
                s.tours.retain(|t| &t.name != key);
                true
            }
            Table::Agents => {
                s.agents.retain(|a| !a.code.eq_ignore_ascii_case(key));
                false
            }
            Table::CustomerTypes => {
                s.customer_types.retain(|c| &c.label != key);
                false
            }
            Table::Bookings => match key.parse::<Uuid>() {
                Ok(id) => {
                    s.bookings.retain(|b| b.id != id);
                    true
                }
                Err(_) => {
                    warn!("Ignoring booking delete with malformed id `{}`", key);
                    false
                }
            },
            Table::Expenses => match key.parse::<Uuid>() {
                Ok(id) => {
                    s.expenses.retain(|e| e.id != id);
                    false
                }
                Err(_) => {
                    warn!("Ignoring expense delete with malformed id `{}`", key);
                    false
                }
            },
        },
        ChangeEvent::Replaced { records } => {
            match records.clone() {
                RecordSet::Agents(agents) => s.agents = agents,
                RecordSet::CustomerTypes(types) => s.customer_types = types,
            }
            false
        }
        ChangeEvent::TourRenamed { from, tour } => {
            if from != &tour.name {
                s.tours.retain(|t| t.name != tour.name);
            }
            match s.tours.iter_mut().find(|t| &t.name == from) {
                Some(slot) => *slot = tour.clone(),
                None => s.tours.push(tour.clone()),
            }
            for b in s.bookings.iter_mut().filter(|b| &b.tour_name == from) {
                b.tour_name = tour.name.clone();
            }
            for e in s.expenses.iter_mut().filter(|e| e.tour_name.as_deref() == Some(from.as_str())) {
                e.tour_name = Some(tour.name.clone());
            }
            true
        }
        ChangeEvent::Invalidated => false,
    }
}

/// Потокобезопасная обертка над `StoreState`.
#[derive(Debug)]
pub struct AppStore {
    state: RwLock<StoreState>,
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AppStore {
    pub fn new() -> Self {
        Self { state: RwLock::new(StoreState::new()) }
    }

    pub async fn begin_fetch(&self) -> FetchTicket {
        self.state.write().await.begin_fetch()
    }

    pub async fn dispatch(&self, action: Action) -> Outcome {
        self.dispatch_versioned(action).await.0
    }

    /// То же, плюс версия снимка сразу после действия (под той же блокировкой).
    pub async fn dispatch_versioned(&self, action: Action) -> (Outcome, u64) {
        let mut state = self.state.write().await;
        let outcome = state.reduce(action);
        (outcome, state.snapshot.version)
    }

    /// Начать полную загрузку. Брошенная `PendingFetch` снимает свою квитанцию сама.
    pub async fn start_fetch(self: &Arc<Self>) -> PendingFetch {
        let ticket = self.begin_fetch().await;
        PendingFetch { store: self.clone(), ticket: Some(ticket) }
    }

    pub async fn snapshot(&self) -> RwLockReadGuard<'_, Snapshot> {
        RwLockReadGuard::map(self.state.read().await, |s| &s.snapshot)
    }
}

/// Загрузка, начатая через `AppStore::start_fetch`.
///
/// Если future загрузки отменили (клиент оборвал `POST /api/admin/resync`),
/// квитанция убирается из `in_flight` при drop, и журнал перестает расти.
#[derive(Debug)]
pub struct PendingFetch {
    store: Arc<AppStore>,
    ticket: Option<FetchTicket>,
}

impl PendingFetch {
    pub fn seq(&self) -> u64 {
        self.ticket.map_or(0, |t| t.seq)
    }

    /// Применить результат чтения. Квитанция забирается только под блокировкой,
    /// так что отмена во время ожидания блокировки тоже обрабатывается в drop.
    pub async fn finish<E>(mut self, result: Result<Dataset, E>) -> Result<Outcome, E> {
        let mut state = self.store.state.write().await;
        let Some(ticket) = self.ticket.take() else {
            return Ok(Outcome::Stale);
        };
        match result {
            Ok(dataset) => Ok(state.reduce(Action::Loaded(ticket, dataset))),
            Err(e) => {
                state.reduce(Action::LoadFailed(ticket));
                Err(e)
            }
        }
    }
}

impl Drop for PendingFetch {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else { return };
        debug!("Fetch #{} abandoned", ticket.seq);
        match self.store.state.try_write() {
            Ok(mut state) => {
                state.reduce(Action::LoadFailed(ticket));
            }
            Err(_) => {
                let store = self.store.clone();
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        store.dispatch(Action::LoadFailed(ticket)).await;
                    });
                }
            }
        }
    }
}
